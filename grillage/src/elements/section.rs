//! Section properties for grillage members
//!
//! Local y is vertical for every grillage member, so `iz` governs bending
//! under vertical load and `iy` bending in the deck plane.

use serde::{Deserialize, Serialize};

/// Cross-section properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Cross-sectional area
    pub a: f64,
    /// Moment of inertia about local y-axis (in-plane bending)
    pub iy: f64,
    /// Moment of inertia about local z-axis (vertical bending)
    pub iz: f64,
    /// Torsional constant
    pub j: f64,
    /// `a`, `iy` and `iz` are given per unit width and scaled by each member's tributary width
    #[serde(default)]
    pub unit_width: bool,
}

impl Section {
    /// Create a new section with basic properties
    pub fn new(a: f64, iy: f64, iz: f64, j: f64) -> Self {
        Self {
            a,
            iy,
            iz,
            j,
            unit_width: false,
        }
    }

    /// Solid rectangle of the given horizontal width and vertical depth
    pub fn rectangular(width: f64, depth: f64) -> Self {
        let a = width * depth;
        let iz = width * depth.powi(3) / 12.0;
        let iy = depth * width.powi(3) / 12.0;

        // Torsional constant for rectangle (approximate)
        let (long, short) = if width > depth { (width, depth) } else { (depth, width) };
        let j = long * short.powi(3) / 3.0 * (1.0 - 0.63 * short / long);

        Self::new(a, iy, iz, j)
    }

    /// Slab strip of unit width and thickness `t`, scaled by member spacing.
    ///
    /// Torsion of a slab strip is shared between the two directions, hence `t^3 / 6`.
    pub fn slab(thickness: f64) -> Self {
        let t = thickness;
        Self {
            a: t,
            iy: t / 12.0,
            iz: t.powi(3) / 12.0,
            j: t.powi(3) / 6.0,
            unit_width: true,
        }
    }

    /// Mark the properties as per unit width
    pub fn per_unit_width(mut self) -> Self {
        self.unit_width = true;
        self
    }

    /// Area and bending inertias multiplied by `width`; torsion constant `j` is
    /// kept as given. Unchanged unless the section is per unit width
    pub fn scaled(&self, width: f64) -> Self {
        if !self.unit_width {
            return self.clone();
        }
        Self {
            a: self.a * width,
            iy: self.iy * width,
            iz: self.iz * width,
            j: self.j,
            unit_width: false,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        [self.a, self.iy, self.iz, self.j]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

impl Default for Section {
    fn default() -> Self {
        Self::rectangular(0.5, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangular_section() {
        let section = Section::rectangular(0.3, 0.5);
        assert_relative_eq!(section.a, 0.15);
        assert_relative_eq!(section.iz, 0.3 * 0.5_f64.powi(3) / 12.0);
        assert!(section.iz > section.iy);
    }

    #[test]
    fn test_unit_width_scaling() {
        let slab = Section::slab(0.2);
        let scaled = slab.scaled(2.5);
        assert_relative_eq!(scaled.a, 0.5);
        assert_relative_eq!(scaled.iz, 2.5 * 0.008 / 12.0);
        assert!(!scaled.unit_width);

        let beam = Section::rectangular(0.5, 1.0);
        assert_eq!(beam.scaled(2.5), beam);

        let strip = Section::new(0.3, 0.01, 0.002, 0.004).per_unit_width();
        let wide = strip.scaled(2.0);
        assert_relative_eq!(wide.iy, 0.02);
        assert_relative_eq!(wide.iz, 0.004);
        assert_relative_eq!(wide.j, 0.004);
    }
}
