//! Drives the solver step by step for static and moving load cases

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ModelDefinition, RawResponse, Solver, SolverError, StepMachine, StepState};
use crate::error::{GrillageError, GrillageResult};
use crate::loads::{LoadCase, LoadMapper, LoadPattern, MovingLoadCase, PathTraverser, Placement};
use crate::mesh::Mesh;
use crate::results::{ResultCompiler, ResultSet};

/// Identifies one analysis step: a static case has no step index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId {
    pub case: String,
    pub step: Option<usize>,
}

impl StepId {
    pub fn static_case(case: &str) -> Self {
        Self {
            case: case.to_string(),
            step: None,
        }
    }

    pub fn moving(case: &str, step: usize) -> Self {
        Self {
            case: case.to_string(),
            step: Some(step),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{}[{}]", self.case, step),
            None => write!(f, "{}", self.case),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    Completed(RawResponse),
    Failed(SolverError),
}

/// Outcome of one step together with its final state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub id: StepId,
    pub state: StepState,
    /// Tag of the load pattern sent to the solver
    pub pattern_tag: usize,
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Completed(_))
    }

    pub fn response(&self) -> Option<&RawResponse> {
        match &self.outcome {
            StepOutcome::Completed(response) => Some(response),
            StepOutcome::Failed(_) => None,
        }
    }
}

/// Runs load cases against a mesh through a `Solver`.
///
/// Each step tears the solver model down and rebuilds it from the mesh, so a
/// sequence can be stopped between any two steps.
pub struct AnalysisOrchestrator<'m, S: Solver> {
    mesh: &'m Mesh,
    solver: S,
    next_tag: usize,
    results: Vec<StepResult>,
}

impl<'m, S: Solver> AnalysisOrchestrator<'m, S> {
    pub fn new(mesh: &'m Mesh, solver: S) -> Self {
        Self {
            mesh,
            solver,
            next_tag: 1,
            results: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &'m Mesh {
        self.mesh
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn into_solver(self) -> S {
        self.solver
    }

    /// Steps run so far, in execution order
    pub fn step_results(&self) -> &[StepResult] {
        &self.results
    }

    /// Analyse one static load case as a single step
    pub fn run_static(&mut self, case: &LoadCase) -> GrillageResult<&StepResult> {
        let pattern = LoadMapper::new(self.mesh).map_case(case, self.next_tag)?;
        self.run_step(StepId::static_case(&case.name), pattern)
    }

    /// Analyse every placement of a moving load case; returns the number of steps run
    pub fn run_moving(&mut self, case: &MovingLoadCase) -> GrillageResult<usize> {
        let mesh = self.mesh;
        let traversal = PathTraverser::traverse(case, mesh)?;
        log::info!(
            "moving load case '{}': {} placements over {:.3} m",
            case.name,
            traversal.placement_count(),
            case.path.length()
        );
        self.run_placements(&case.name, traversal)
    }

    /// Analyse the given placements under the case name `name`.
    ///
    /// Solver failures are stored on their step and the sequence continues;
    /// a load that cannot be mapped aborts the run.
    pub fn run_placements<I>(&mut self, name: &str, placements: I) -> GrillageResult<usize>
    where
        I: IntoIterator<Item = Placement>,
    {
        let mapper = LoadMapper::new(self.mesh);
        let mut count = 0;
        for placement in placements {
            let actions = mapper.map(&placement.to_descriptor(), name)?;
            let pattern = LoadPattern::new(self.next_tag, name, Some(placement.step), actions);
            self.run_step(StepId::moving(name, placement.step), pattern)?;
            count += 1;
        }
        Ok(count)
    }

    /// Compile every step run so far into a result set
    pub fn compile(&self) -> GrillageResult<ResultSet> {
        ResultCompiler::compile(&self.results)
    }

    fn run_step(&mut self, id: StepId, pattern: LoadPattern) -> GrillageResult<&StepResult> {
        if self.results.iter().any(|r| r.id == id) {
            return Err(GrillageError::InvariantViolation(format!(
                "step {} has already been analysed",
                id
            )));
        }

        let mut machine = StepMachine::new();
        self.solver.wipe();
        let model = ModelDefinition::from_mesh(self.mesh)?;

        let built = self
            .solver
            .define(&model)
            .and_then(|_| self.solver.apply(&pattern));
        let outcome = match built {
            Ok(()) => {
                machine.advance(StepState::Built)?;
                match self.solver.analyze() {
                    Ok(response) => {
                        machine.advance(StepState::Solved)?;
                        machine.advance(StepState::Collected)?;
                        StepOutcome::Completed(response)
                    }
                    Err(err) => {
                        machine.advance(StepState::Failed)?;
                        StepOutcome::Failed(err)
                    }
                }
            }
            Err(err) => {
                machine.advance(StepState::Failed)?;
                StepOutcome::Failed(err)
            }
        };

        match &outcome {
            StepOutcome::Completed(_) => log::debug!(
                "step {} solved with pattern {} ({} loaded nodes)",
                id,
                pattern.tag,
                pattern.actions.len()
            ),
            StepOutcome::Failed(err) => log::warn!("step {} failed: {}", id, err),
        }

        self.next_tag += 1;
        self.results.push(StepResult {
            id,
            state: machine.state(),
            pattern_tag: pattern.tag,
            outcome,
        });
        let last = self.results.len() - 1;
        Ok(&self.results[last])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Material, Section};
    use crate::geometry::{GeometryModel, PlanPoint};
    use crate::loads::{Axle, LoadPath, PointLoad};
    use crate::mesh::{GridMesher, MemberGroup, PropertyTable};

    /// Records calls and fails `analyze` on the listed call numbers
    #[derive(Default)]
    struct ScriptedSolver {
        fail_on: Vec<usize>,
        analyze_calls: usize,
        wipes: usize,
        defined: bool,
        tags: Vec<usize>,
    }

    impl Solver for ScriptedSolver {
        fn wipe(&mut self) {
            self.wipes += 1;
            self.defined = false;
        }

        fn define(&mut self, _model: &ModelDefinition) -> Result<(), SolverError> {
            if self.defined {
                return Err(SolverError::InvalidModel("stale model".to_string()));
            }
            self.defined = true;
            Ok(())
        }

        fn apply(&mut self, pattern: &LoadPattern) -> Result<(), SolverError> {
            self.tags.push(pattern.tag);
            Ok(())
        }

        fn analyze(&mut self) -> Result<RawResponse, SolverError> {
            self.analyze_calls += 1;
            if self.fail_on.contains(&self.analyze_calls) {
                Err(SolverError::Divergence("scripted".to_string()))
            } else {
                Ok(RawResponse::default())
            }
        }
    }

    fn mesh() -> Mesh {
        let mut mesh = GridMesher::generate(&GeometryModel::new(20.0, 8.0, 4, 5)).unwrap();
        let table = PropertyTable::new()
            .with_material("concrete", Material::concrete(40e6))
            .with_section("beam", Section::rectangular(0.5, 1.0))
            .with_section("slab", Section::slab(0.25))
            .with_group(MemberGroup::EdgeBeam, "concrete", "beam")
            .with_group(MemberGroup::InteriorBeam, "concrete", "beam")
            .with_group(MemberGroup::TransverseSlab, "concrete", "slab")
            .with_group(MemberGroup::EndTransverse, "concrete", "slab");
        mesh.assign_properties(table).unwrap();
        mesh
    }

    fn truck() -> MovingLoadCase {
        MovingLoadCase::new(
            "truck",
            LoadPath::straight(PlanPoint::new(0.0, 4.0), PlanPoint::new(20.0, 4.0)),
            5.0,
        )
        .with_axle(Axle::new(0.0, -100.0))
        .with_axle(Axle::new(4.0, -100.0))
    }

    #[test]
    fn test_failed_step_does_not_stop_sequence() {
        let mesh = mesh();
        let solver = ScriptedSolver {
            fail_on: vec![2],
            ..Default::default()
        };
        let mut orchestrator = AnalysisOrchestrator::new(&mesh, solver);
        let steps = orchestrator.run_moving(&truck()).unwrap();
        assert_eq!(steps, 5);

        let results = orchestrator.step_results();
        assert_eq!(results.len(), 5);
        assert_eq!(results[1].state, StepState::Failed);
        assert!(!results[1].is_completed());
        assert!(results[1].response().is_none());
        assert!(results[2].response().is_some());
        assert!(results
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != 1)
            .all(|(_, r)| r.state == StepState::Collected));
    }

    #[test]
    fn test_every_step_rebuilds_the_model() {
        let mesh = mesh();
        let mut orchestrator = AnalysisOrchestrator::new(&mesh, ScriptedSolver::default());
        let dead = LoadCase::new("dead").with_load(PointLoad::downward(10.0, 4.0, 50.0));
        orchestrator.run_static(&dead).unwrap();
        orchestrator.run_moving(&truck()).unwrap();

        let solver = orchestrator.into_solver();
        assert_eq!(solver.wipes, 6);
        assert_eq!(solver.tags, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_bounded_placements() {
        let mesh = mesh();
        let case = truck();
        let mut orchestrator = AnalysisOrchestrator::new(&mesh, ScriptedSolver::default());
        let traversal = PathTraverser::traverse(&case, &mesh).unwrap();
        let run = orchestrator.run_placements("truck", traversal.take(2)).unwrap();
        assert_eq!(run, 2);
        assert_eq!(orchestrator.step_results()[1].id, StepId::moving("truck", 1));
    }

    #[test]
    fn test_repeated_case_is_rejected() {
        let mesh = mesh();
        let mut orchestrator = AnalysisOrchestrator::new(&mesh, ScriptedSolver::default());
        let dead = LoadCase::new("dead").with_load(PointLoad::downward(10.0, 4.0, 50.0));
        orchestrator.run_static(&dead).unwrap();
        assert!(matches!(
            orchestrator.run_static(&dead),
            Err(GrillageError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_out_of_domain_load_aborts() {
        let mesh = mesh();
        let mut orchestrator = AnalysisOrchestrator::new(&mesh, ScriptedSolver::default());
        let case = LoadCase::new("off").with_load(PointLoad::downward(25.0, 4.0, 50.0));
        assert!(matches!(
            orchestrator.run_static(&case),
            Err(GrillageError::OutOfDomainLoad { .. })
        ));
        assert!(orchestrator.step_results().is_empty());
    }

    #[test]
    fn test_unassigned_mesh_is_fatal() {
        let mesh = GridMesher::generate(&GeometryModel::new(20.0, 8.0, 4, 5)).unwrap();
        let mut orchestrator = AnalysisOrchestrator::new(&mesh, ScriptedSolver::default());
        let dead = LoadCase::new("dead").with_load(PointLoad::downward(10.0, 4.0, 50.0));
        assert!(matches!(
            orchestrator.run_static(&dead),
            Err(GrillageError::InvalidInput(_))
        ));
    }
}
