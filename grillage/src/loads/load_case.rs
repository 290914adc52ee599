//! Load cases and the load patterns sent to the solver

use serde::{Deserialize, Serialize};

use super::{LoadAction, LoadDescriptor, NodeLoad};

/// A named static load case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadCase {
    /// Name of the load case
    pub name: String,
    /// Description of the load case
    #[serde(default)]
    pub description: Option<String>,
    /// Loads positioned on the deck
    #[serde(default)]
    pub loads: Vec<LoadDescriptor>,
    /// Loads applied directly to nodes
    #[serde(default)]
    pub nodal: Vec<NodeLoad>,
}

impl LoadCase {
    /// Create a new empty load case
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Add a positioned load
    pub fn with_load(mut self, load: impl Into<LoadDescriptor>) -> Self {
        self.loads.push(load.into());
        self
    }

    /// Add a direct nodal load
    pub fn with_nodal(mut self, load: NodeLoad) -> Self {
        self.nodal.push(load);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty() && self.nodal.is_empty()
    }
}

/// Nodal actions of one analysis step, tagged for the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPattern {
    /// Pattern tag, unique across one orchestrated run
    pub tag: usize,
    pub case: String,
    /// Placement index for moving loads, `None` for a static case
    pub step: Option<usize>,
    /// One action per loaded node, ascending node tag
    pub actions: Vec<LoadAction>,
}

impl LoadPattern {
    pub fn new(tag: usize, case: &str, step: Option<usize>, actions: Vec<LoadAction>) -> Self {
        Self {
            tag,
            case: case.to_string(),
            step,
            actions,
        }
    }

    /// Sum of all actions [FX, FY, FZ, MX, MY, MZ], moments taken about each node
    pub fn total(&self) -> [f64; 6] {
        let mut total = [0.0; 6];
        for action in &self.actions {
            for (t, v) in total.iter_mut().zip(action.load) {
                *t += v;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loads::PointLoad;

    #[test]
    fn test_load_case_builder() {
        let case = LoadCase::new("live")
            .with_description("lane load")
            .with_load(PointLoad::downward(1.0, 1.0, 10.0))
            .with_nodal(NodeLoad::fy(3, -1.0));
        assert_eq!(case.loads.len(), 1);
        assert_eq!(case.nodal.len(), 1);
        assert!(!case.is_empty());
        assert!(LoadCase::new("empty").is_empty());
    }

    #[test]
    fn test_pattern_total() {
        let pattern = LoadPattern::new(
            1,
            "live",
            None,
            vec![
                LoadAction::new(1, [0.0, -2.0, 0.0, 0.0, 0.0, 0.0], "live"),
                LoadAction::new(2, [0.0, -3.0, 0.0, 0.0, 0.0, 1.0], "live"),
            ],
        );
        assert_eq!(pattern.total(), [0.0, -5.0, 0.0, 0.0, 0.0, 1.0]);
    }
}
