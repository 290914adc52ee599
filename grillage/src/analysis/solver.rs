//! Boundary to the finite element solver

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::elements::{ElementTag, Material, NodeTag, Restraint, Section};
use crate::error::{GrillageError, GrillageResult};
use crate::loads::LoadPattern;
use crate::mesh::Mesh;

/// Failure reported by a solver for one analysis step
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolverError {
    #[error("analysis did not converge: {0}")]
    Divergence(String),

    #[error("model rejected by solver: {0}")]
    InvalidModel(String),
}

/// A finite element solver driven one step at a time.
///
/// Every step calls `wipe`, then `define` and `apply`, then `analyze`; nothing
/// defined for a previous step may influence the next one.
pub trait Solver {
    /// Drop the current model and all applied loads
    fn wipe(&mut self);

    /// Define nodes, restraints and elements
    fn define(&mut self, model: &ModelDefinition) -> Result<(), SolverError>;

    /// Apply a load pattern to the defined model
    fn apply(&mut self, pattern: &LoadPattern) -> Result<(), SolverError>;

    /// Run the analysis and return the raw response (blocking)
    fn analyze(&mut self) -> Result<RawResponse, SolverError>;
}

impl<S: Solver + ?Sized> Solver for &mut S {
    fn wipe(&mut self) {
        (**self).wipe()
    }

    fn define(&mut self, model: &ModelDefinition) -> Result<(), SolverError> {
        (**self).define(model)
    }

    fn apply(&mut self, pattern: &LoadPattern) -> Result<(), SolverError> {
        (**self).apply(pattern)
    }

    fn analyze(&mut self) -> Result<RawResponse, SolverError> {
        (**self).analyze()
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn wipe(&mut self) {
        (**self).wipe()
    }

    fn define(&mut self, model: &ModelDefinition) -> Result<(), SolverError> {
        (**self).define(model)
    }

    fn apply(&mut self, pattern: &LoadPattern) -> Result<(), SolverError> {
        (**self).apply(pattern)
    }

    fn analyze(&mut self) -> Result<RawResponse, SolverError> {
        (**self).analyze()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub tag: NodeTag,
    pub coords: [f64; 3],
    pub restraint: Option<Restraint>,
}

/// Element with resolved properties; `section` is already scaled by the member width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    pub tag: ElementTag,
    pub nodes: [NodeTag; 2],
    pub local_x: [f64; 3],
    pub local_z: [f64; 3],
    pub material: Material,
    pub section: Section,
}

/// Everything a solver needs to build one step's model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub nodes: Vec<NodeDefinition>,
    pub elements: Vec<ElementDefinition>,
}

impl ModelDefinition {
    /// Build fresh definitions from the mesh and its assigned properties
    pub fn from_mesh(mesh: &Mesh) -> GrillageResult<Self> {
        let table = mesh.properties().ok_or_else(|| {
            GrillageError::InvalidInput("no properties assigned to the mesh".to_string())
        })?;

        let nodes = mesh
            .nodes()
            .iter()
            .map(|node| NodeDefinition {
                tag: node.tag,
                coords: node.coords(),
                restraint: node.restraint.filter(Restraint::is_supported),
            })
            .collect();

        let mut elements = Vec::with_capacity(mesh.elements().len());
        for element in mesh.elements() {
            let property = element.property.as_ref().ok_or_else(|| {
                GrillageError::InvalidInput(format!(
                    "element {} ({}) has no section assigned",
                    element.tag,
                    element.group.map_or("ungrouped", |g| g.name())
                ))
            })?;
            let material = table.material(&property.material)?.clone();
            let section = table.section(&property.section)?.scaled(property.width);
            elements.push(ElementDefinition {
                tag: element.tag,
                nodes: element.nodes,
                local_x: element.orientation.local_x,
                local_z: element.orientation.local_z,
                material,
                section,
            });
        }

        Ok(Self { nodes, elements })
    }
}

/// Unprocessed solver output of one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// [DX, DY, DZ, RX, RY, RZ] per node
    pub displacements: BTreeMap<NodeTag, [f64; 6]>,
    /// [FX, FY, FZ, MX, MY, MZ] per restrained node, zero on free DOFs
    pub reactions: BTreeMap<NodeTag, [f64; 6]>,
    /// Local end forces [i-end 6, j-end 6] per element
    pub forces: BTreeMap<ElementTag, [f64; 12]>,
}
