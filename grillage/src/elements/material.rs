//! Material properties

use serde::{Deserialize, Serialize};

/// Linear elastic material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Modulus of elasticity (Young's modulus)
    pub e: f64,
    /// Shear modulus
    pub g: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density
    pub rho: f64,
}

impl Material {
    /// Create a new material with given properties
    pub fn new(e: f64, g: f64, nu: f64, rho: f64) -> Self {
        Self { e, g, nu, rho }
    }

    /// Create a new isotropic material from E and nu
    /// G is calculated as E / (2 * (1 + nu))
    pub fn isotropic(e: f64, nu: f64, rho: f64) -> Self {
        let g = e / (2.0 * (1.0 + nu));
        Self::new(e, g, nu, rho)
    }

    /// Create a standard steel material (SI units)
    pub fn steel() -> Self {
        Self::new(200e9, 77e9, 0.3, 7850.0)
    }

    /// Create a concrete material from its compressive strength in Pa
    pub fn concrete(fc: f64) -> Self {
        // E = 4700 * sqrt(f'c in MPa) MPa
        let fc_mpa = fc / 1e6;
        let e = 4700.0 * fc_mpa.sqrt() * 1e6;
        Self::isotropic(e, 0.2, 2400.0)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.e.is_finite() && self.e > 0.0 && self.g.is_finite() && self.g > 0.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::concrete(40e6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isotropic_material() {
        let mat = Material::isotropic(200e9, 0.3, 7850.0);
        let expected_g = 200e9 / (2.0 * 1.3);
        assert!((mat.g - expected_g).abs() < 1.0);
    }

    #[test]
    fn test_concrete_modulus() {
        let concrete = Material::concrete(25e6);
        assert!((concrete.e - 23_500e6).abs() < 1.0);
        assert!(concrete.is_valid());
        assert!(!Material::new(0.0, 1.0, 0.2, 0.0).is_valid());
    }
}
