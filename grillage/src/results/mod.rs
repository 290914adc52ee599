//! Compiled analysis results keyed by case, step, entity and quantity

mod compiler;
mod records;
mod set;

pub use compiler::ResultCompiler;
pub use records::{AnalysisSummary, MemberForces, NodeDisplacement, Reactions};
pub use set::{EnvelopeValue, Extremum, ResultQuery, ResultSet, StepFailure};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::elements::{ElementTag, NodeTag};

/// Degree of freedom in the order used by raw solver arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dof {
    DX,
    DY,
    DZ,
    RX,
    RY,
    RZ,
}

impl Dof {
    pub const ALL: [Dof; 6] = [Dof::DX, Dof::DY, Dof::DZ, Dof::RX, Dof::RY, Dof::RZ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemberEnd {
    I,
    J,
}

impl MemberEnd {
    /// Offset of this end in a 12-component force array
    pub fn offset(self) -> usize {
        match self {
            MemberEnd::I => 0,
            MemberEnd::J => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Entity {
    Node(NodeTag),
    Element(ElementTag),
}

/// What a stored value measures; forces are local end forces as returned by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Displacement(Dof),
    Reaction(Dof),
    Force(MemberEnd, Dof),
}

/// Unique key of one result value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultKey {
    pub case: String,
    pub step: Option<usize>,
    pub entity: Entity,
    pub quantity: Quantity,
}

impl ResultKey {
    pub fn new(case: &str, step: Option<usize>, entity: Entity, quantity: Quantity) -> Self {
        Self {
            case: case.to_string(),
            step,
            entity,
            quantity,
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.case)?;
        if let Some(step) = self.step {
            write!(f, "[{}]", step)?;
        }
        write!(f, " {:?} {:?}", self.entity, self.quantity)
    }
}

/// One row of the tabular export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub key: ResultKey,
    pub value: f64,
}
