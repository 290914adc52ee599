//! Typed views of compiled results

use serde::{Deserialize, Serialize};

use crate::elements::{ElementTag, NodeTag};

/// Displacement results at a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    /// Longitudinal displacement
    pub dx: f64,
    /// Vertical deflection
    pub dy: f64,
    /// Transverse displacement
    pub dz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }

    /// Get translation magnitude
    pub fn translation_magnitude(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }
}

/// Reaction forces at a supported node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reactions {
    pub fx: f64,
    /// Vertical reaction
    pub fy: f64,
    pub fz: f64,
    pub mx: f64,
    pub my: f64,
    pub mz: f64,
}

impl Reactions {
    /// Create from array [FX, FY, FZ, MX, MY, MZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            fx: arr[0],
            fy: arr[1],
            fz: arr[2],
            mx: arr[3],
            my: arr[4],
            mz: arr[5],
        }
    }

    /// Get total force magnitude
    pub fn force_magnitude(&self) -> f64 {
        (self.fx.powi(2) + self.fy.powi(2) + self.fz.powi(2)).sqrt()
    }
}

/// Internal forces at one end of a grillage member, in member axes.
///
/// Local y is vertical, so `shear_y` is the vertical shear and `moment_z`
/// the bending moment of the deck.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberForces {
    /// Axial force (positive = tension)
    pub axial: f64,
    pub shear_y: f64,
    pub shear_z: f64,
    pub torsion: f64,
    pub moment_y: f64,
    pub moment_z: f64,
}

impl MemberForces {
    /// Create from local force array at i-node
    pub fn from_i_node_forces(forces: &[f64; 12]) -> Self {
        Self {
            axial: -forces[0],
            shear_y: forces[1],
            shear_z: forces[2],
            torsion: -forces[3],
            moment_y: forces[4],
            moment_z: forces[5],
        }
    }

    /// Create from local force array at j-node
    pub fn from_j_node_forces(forces: &[f64; 12]) -> Self {
        Self {
            axial: forces[6],
            shear_y: -forces[7],
            shear_z: -forces[8],
            torsion: forces[9],
            moment_y: forces[10],
            moment_z: forces[11],
        }
    }
}

/// Governing values of one case over all of its steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub case: String,
    /// Largest vertical deflection magnitude
    pub max_deflection: f64,
    pub max_deflection_node: Option<NodeTag>,
    pub max_deflection_step: Option<usize>,
    /// Largest vertical reaction magnitude
    pub max_reaction: f64,
    pub max_reaction_node: Option<NodeTag>,
    /// Largest bending moment magnitude at any member end
    pub max_moment: f64,
    pub max_moment_member: Option<ElementTag>,
    pub max_moment_step: Option<usize>,
    pub completed_steps: usize,
    pub failed_steps: usize,
}
