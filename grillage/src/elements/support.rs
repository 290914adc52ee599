//! Nodal restraints

use serde::{Deserialize, Serialize};

/// Restrained DOFs at a node, in the order [DX, DY, DZ, RX, RY, RZ]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restraint {
    /// Restrained in X translation
    pub dx: bool,
    /// Restrained in Y translation
    pub dy: bool,
    /// Restrained in Z translation
    pub dz: bool,
    /// Restrained in X rotation
    pub rx: bool,
    /// Restrained in Y rotation
    pub ry: bool,
    /// Restrained in Z rotation
    pub rz: bool,
}

impl Restraint {
    /// No DOF restrained
    pub fn free() -> Self {
        Self::default()
    }

    /// All DOFs restrained
    pub fn fixed() -> Self {
        Self::from_array([true; 6])
    }

    /// Translations restrained, rotations free
    pub fn pinned() -> Self {
        Self::from_array([true, true, true, false, false, false])
    }

    /// Free to slide along the span (x), vertical and transverse translations held
    pub fn roller_x() -> Self {
        Self::from_array([false, true, true, false, false, false])
    }

    pub fn from_array(dofs: [bool; 6]) -> Self {
        Self {
            dx: dofs[0],
            dy: dofs[1],
            dz: dofs[2],
            rx: dofs[3],
            ry: dofs[4],
            rz: dofs[5],
        }
    }

    /// Build from a 0/1 fixity vector such as `[1, 1, 1, 0, 0, 0]`
    pub fn from_vector(fixity: [u8; 6]) -> Self {
        Self::from_array(fixity.map(|f| f != 0))
    }

    pub fn as_array(&self) -> [bool; 6] {
        [self.dx, self.dy, self.dz, self.rx, self.ry, self.rz]
    }

    /// Get list of restrained DOF indices (0-5)
    pub fn restrained_dofs(&self) -> Vec<usize> {
        (0..6).filter(|&i| self.as_array()[i]).collect()
    }

    /// Get list of free DOF indices (0-5)
    pub fn free_dofs(&self) -> Vec<usize> {
        (0..6).filter(|&i| !self.as_array()[i]).collect()
    }

    /// Check if any DOF is restrained
    pub fn is_supported(&self) -> bool {
        self.as_array().iter().any(|&r| r)
    }

    /// Union of two restraints
    pub fn merge(&self, other: &Restraint) -> Self {
        let a = self.as_array();
        let b = other.as_array();
        Self::from_array(std::array::from_fn(|i| a[i] || b[i]))
    }

    /// Release every DOF that `other` restrains
    pub fn release(&self, other: &Restraint) -> Self {
        let a = self.as_array();
        let b = other.as_array();
        Self::from_array(std::array::from_fn(|i| a[i] && !b[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_support() {
        let support = Restraint::fixed();
        assert_eq!(support.restrained_dofs(), vec![0, 1, 2, 3, 4, 5]);
        assert!(support.free_dofs().is_empty());
    }

    #[test]
    fn test_pinned_and_roller_vectors() {
        assert_eq!(Restraint::pinned(), Restraint::from_vector([1, 1, 1, 0, 0, 0]));
        assert_eq!(Restraint::roller_x(), Restraint::from_vector([0, 1, 1, 0, 0, 0]));
        assert_eq!(Restraint::roller_x().restrained_dofs(), vec![1, 2]);
    }

    #[test]
    fn test_merge_and_release() {
        let merged = Restraint::roller_x().merge(&Restraint::from_vector([1, 0, 0, 0, 0, 1]));
        assert_eq!(merged.as_array(), [true, true, true, false, false, true]);

        let released = Restraint::pinned().release(&Restraint::from_vector([1, 0, 0, 0, 0, 0]));
        assert_eq!(released, Restraint::roller_x());
        assert!(!Restraint::free().is_supported());
    }
}
