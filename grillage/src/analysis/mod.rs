//! Analysis options, per-step state tracking and the solver boundary

mod linear;
mod orchestrator;
mod solver;

pub use linear::LinearSolver;
pub use orchestrator::{AnalysisOrchestrator, StepId, StepOutcome, StepResult};
pub use solver::{ElementDefinition, ModelDefinition, NodeDefinition, RawResponse, Solver, SolverError};

use serde::{Deserialize, Serialize};

use crate::error::{GrillageError, GrillageResult};

/// Linear equation solver used by `LinearSolver`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearBackend {
    /// Dense LU decomposition
    Dense,
    /// Skyline Cholesky factorisation of the sparse stiffness matrix
    SkylineCholesky,
    /// Jacobi-preconditioned conjugate gradient
    Pcg,
}

impl Default for LinearBackend {
    fn default() -> Self {
        Self::SkylineCholesky
    }
}

/// Options for structural analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Equation solver
    pub backend: LinearBackend,
    /// Relative residual tolerance for iterative solves
    pub tolerance: f64,
    /// Maximum iterations for iterative solves
    pub max_iterations: usize,
    /// Check static equilibrium after analysis
    pub check_statics: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            backend: LinearBackend::SkylineCholesky,
            tolerance: 1e-9,
            max_iterations: 10_000,
            check_statics: true,
        }
    }
}

impl AnalysisOptions {
    /// Create options for linear analysis
    pub fn linear() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: LinearBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn without_statics_check(mut self) -> Self {
        self.check_statics = false;
        self
    }
}

/// Lifecycle of one analysis step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// Nothing sent to the solver yet
    #[default]
    Idle,
    /// Model and loads defined in the solver
    Built,
    /// Solver returned a response
    Solved,
    /// Response stored for compilation
    Collected,
    /// Solver reported a failure
    Failed,
}

/// Guards the legal transitions of one step
#[derive(Debug, Clone, Default)]
pub struct StepMachine {
    state: StepState,
}

impl StepMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    /// Move to `next`, failing with `InvariantViolation` on an illegal transition
    pub fn advance(&mut self, next: StepState) -> GrillageResult<()> {
        use StepState::*;
        let current = self.state();
        let legal = matches!(
            (current, next),
            (Idle, Built) | (Built, Solved) | (Solved, Collected) | (Idle, Failed) | (Built, Failed)
        );
        if !legal {
            return Err(GrillageError::InvariantViolation(format!(
                "illegal step transition {:?} -> {:?}",
                current, next
            )));
        }
        log::debug!("step {:?} -> {:?}", current, next);
        self.state = next;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state(), StepState::Collected | StepState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = AnalysisOptions::default();
        assert_eq!(options.backend, LinearBackend::SkylineCholesky);
        assert!(options.check_statics);
        let pcg = AnalysisOptions::linear()
            .with_backend(LinearBackend::Pcg)
            .with_tolerance(1e-12)
            .with_max_iter(50);
        assert_eq!(pcg.max_iterations, 50);
    }

    #[test]
    fn test_step_machine_happy_path() {
        let mut machine = StepMachine::new();
        assert_eq!(machine.state(), StepState::Idle);
        machine.advance(StepState::Built).unwrap();
        machine.advance(StepState::Solved).unwrap();
        machine.advance(StepState::Collected).unwrap();
        assert!(machine.is_terminal());
    }

    #[test]
    fn test_step_machine_rejects_skips() {
        let mut machine = StepMachine::new();
        assert!(matches!(
            machine.advance(StepState::Solved),
            Err(GrillageError::InvariantViolation(_))
        ));
        machine.advance(StepState::Built).unwrap();
        machine.advance(StepState::Failed).unwrap();
        assert!(machine.advance(StepState::Solved).is_err());
    }
}
