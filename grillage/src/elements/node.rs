//! Node element - a grid intersection of the deck

use serde::{Deserialize, Serialize};

use super::{NodeTag, Restraint};
use crate::geometry::PlanPoint;

/// A grillage node. Position is fixed once the mesh is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique tag
    pub tag: NodeTag,
    /// Longitudinal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
    /// Transverse coordinate
    pub z: f64,
    /// Boundary condition, `None` when the node is unrestrained
    pub restraint: Option<Restraint>,
}

impl Node {
    /// Create a new unrestrained node
    pub fn new(tag: NodeTag, x: f64, y: f64, z: f64) -> Self {
        Self {
            tag,
            x,
            y,
            z,
            restraint: None,
        }
    }

    /// Attach a restraint
    pub fn with_restraint(mut self, restraint: Restraint) -> Self {
        self.restraint = Some(restraint);
        self
    }

    /// Get the coordinates as an array
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Position in the deck plane
    pub fn plan(&self) -> PlanPoint {
        PlanPoint::new(self.x, self.z)
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// True when at least one DOF is restrained
    pub fn is_supported(&self) -> bool {
        self.restraint.map_or(false, |r| r.is_supported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = Node::new(3, 1.0, 2.0, 3.0);
        assert_eq!(node.tag, 3);
        assert_eq!(node.coords(), [1.0, 2.0, 3.0]);
        assert!(!node.is_supported());
    }

    #[test]
    fn test_node_distance() {
        let n1 = Node::new(1, 0.0, 0.0, 0.0);
        let n2 = Node::new(2, 3.0, 0.0, 4.0);
        assert!((n1.distance_to(&n2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_free_restraint_is_not_a_support() {
        let node = Node::new(1, 0.0, 0.0, 0.0).with_restraint(Restraint::free());
        assert!(!node.is_supported());
    }
}
