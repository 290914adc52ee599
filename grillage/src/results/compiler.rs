use super::{Dof, Entity, MemberEnd, Quantity, ResultKey, ResultSet};
use crate::analysis::{RawResponse, StepId, StepOutcome, StepResult, StepState};
use crate::error::{GrillageError, GrillageResult};

/// Turns raw step responses into a keyed `ResultSet`
pub struct ResultCompiler;

impl ResultCompiler {
    pub fn compile(steps: &[StepResult]) -> GrillageResult<ResultSet> {
        let mut set = ResultSet::default();
        for step in steps {
            match &step.outcome {
                StepOutcome::Completed(response) => {
                    if step.state != StepState::Collected {
                        return Err(GrillageError::InvariantViolation(format!(
                            "step {} has a response but ended in state {:?}",
                            step.id, step.state
                        )));
                    }
                    set.record_step(&step.id)?;
                    Self::add_response(&mut set, &step.id, response)?;
                }
                StepOutcome::Failed(error) => set.record_failure(step.id.clone(), error.clone())?,
            }
        }
        log::info!(
            "compiled {} values from {} steps ({} failed)",
            set.len(),
            steps.len(),
            set.failures().len()
        );
        Ok(set)
    }

    fn add_response(set: &mut ResultSet, id: &StepId, response: &RawResponse) -> GrillageResult<()> {
        let key = |entity, quantity| ResultKey::new(&id.case, id.step, entity, quantity);

        for (&node, values) in &response.displacements {
            for dof in Dof::ALL {
                set.insert(
                    key(Entity::Node(node), Quantity::Displacement(dof)),
                    values[dof.index()],
                )?;
            }
        }
        for (&node, values) in &response.reactions {
            for dof in Dof::ALL {
                set.insert(
                    key(Entity::Node(node), Quantity::Reaction(dof)),
                    values[dof.index()],
                )?;
            }
        }
        for (&element, values) in &response.forces {
            for end in [MemberEnd::I, MemberEnd::J] {
                for dof in Dof::ALL {
                    set.insert(
                        key(Entity::Element(element), Quantity::Force(end, dof)),
                        values[end.offset() + dof.index()],
                    )?;
                }
            }
        }
        Ok(())
    }
}
