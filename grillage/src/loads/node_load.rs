//! Loads acting directly on nodes

use serde::{Deserialize, Serialize};

use crate::elements::NodeTag;

/// A load applied directly to a node, given by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    /// Loaded node
    pub node: NodeTag,
    /// Force in X direction
    pub fx: f64,
    /// Force in Y direction
    pub fy: f64,
    /// Force in Z direction
    pub fz: f64,
    /// Moment about X axis
    pub mx: f64,
    /// Moment about Y axis
    pub my: f64,
    /// Moment about Z axis
    pub mz: f64,
}

impl NodeLoad {
    /// Create a new node load with all components
    pub fn new(node: NodeTag, fx: f64, fy: f64, fz: f64, mx: f64, my: f64, mz: f64) -> Self {
        Self {
            node,
            fx,
            fy,
            fz,
            mx,
            my,
            mz,
        }
    }

    /// Create a force-only node load
    pub fn force(node: NodeTag, fx: f64, fy: f64, fz: f64) -> Self {
        Self::new(node, fx, fy, fz, 0.0, 0.0, 0.0)
    }

    /// Create a load in Y direction
    pub fn fy(node: NodeTag, value: f64) -> Self {
        Self::force(node, 0.0, value, 0.0)
    }

    /// Get the load as an array [FX, FY, FZ, MX, MY, MZ]
    pub fn as_array(&self) -> [f64; 6] {
        [self.fx, self.fy, self.fz, self.mx, self.my, self.mz]
    }
}

/// Statically equivalent global nodal action produced by load mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAction {
    pub node: NodeTag,
    /// Components [FX, FY, FZ, MX, MY, MZ]
    pub load: [f64; 6],
    /// Load case the action belongs to
    pub case: String,
}

impl LoadAction {
    pub fn new(node: NodeTag, load: [f64; 6], case: &str) -> Self {
        Self {
            node,
            load,
            case: case.to_string(),
        }
    }

    /// Scale the action by a factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            node: self.node,
            load: self.load.map(|v| v * factor),
            case: self.case.clone(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.load.iter().all(|&v| v == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_load_array() {
        let load = NodeLoad::fy(4, -10.0);
        assert_eq!(load.as_array(), [0.0, -10.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scaled_action() {
        let action = LoadAction::new(2, [1.0, -2.0, 0.0, 0.0, 0.5, 0.0], "dead");
        let scaled = action.scaled(2.0);
        assert_eq!(scaled.load, [2.0, -4.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(scaled.case, "dead");
        assert!(!scaled.is_zero());
    }
}
