//! Error types for grillage modelling

use thiserror::Error;

use crate::elements::{ElementTag, NodeTag};

/// Main error type for grillage operations
#[derive(Error, Debug)]
pub enum GrillageError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Load position ({x:.4}, {z:.4}) lies outside the meshed deck")]
    OutOfDomainLoad { x: f64, z: f64 },

    #[error("Analysis of case '{case}' (step {step:?}) failed: {reason}")]
    SolverDivergence {
        case: String,
        step: Option<usize>,
        reason: String,
    },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Node {0} not found in mesh")]
    NodeNotFound(NodeTag),

    #[error("Element {0} not found in mesh")]
    ElementNotFound(ElementTag),

    #[error("Material '{0}' not found in property table")]
    MaterialNotFound(String),

    #[error("Section '{0}' not found in property table")]
    SectionNotFound(String),

    #[error("Load case '{0}' not found in results")]
    LoadCaseNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for grillage operations
pub type GrillageResult<T> = Result<T, GrillageError>;
