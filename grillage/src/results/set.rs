use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    AnalysisSummary, Dof, Entity, MemberEnd, MemberForces, NodeDisplacement, Quantity, Reactions,
    ResultKey, ResultRow,
};
use crate::analysis::{SolverError, StepId};
use crate::elements::{ElementTag, NodeTag};
use crate::error::{GrillageError, GrillageResult};
use crate::loads::LoadCombination;

/// A step whose analysis failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub id: StepId,
    pub error: SolverError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
    /// Largest magnitude, sign preserved
    AbsMax,
}

/// Extreme values of one quantity over the steps of a case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeValue {
    pub max: f64,
    pub max_step: Option<usize>,
    pub min: f64,
    pub min_step: Option<usize>,
}

impl EnvelopeValue {
    /// Value with the largest magnitude
    pub fn governing(&self) -> f64 {
        if self.max.abs() >= self.min.abs() {
            self.max
        } else {
            self.min
        }
    }
}

/// Filter for `ResultSet::select`; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultQuery {
    case: Option<String>,
    step: Option<Option<usize>>,
    entity: Option<Entity>,
    quantity: Option<Quantity>,
}

impl ResultQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_case(mut self, case: &str) -> Self {
        self.case = Some(case.to_string());
        self
    }

    pub fn at_step(mut self, step: Option<usize>) -> Self {
        self.step = Some(step);
        self
    }

    pub fn for_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn of_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn matches(&self, key: &ResultKey) -> bool {
        self.case.as_ref().map_or(true, |c| *c == key.case)
            && self.step.map_or(true, |s| s == key.step)
            && self.entity.map_or(true, |e| e == key.entity)
            && self.quantity.map_or(true, |q| q == key.quantity)
    }
}

/// Queryable store of compiled results.
///
/// Every value has a unique `ResultKey`; completed and failed steps are
/// tracked per case so missing values can be told apart from failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    values: BTreeMap<ResultKey, f64>,
    steps: BTreeMap<String, BTreeSet<Option<usize>>>,
    failures: Vec<StepFailure>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn has_step(&self, id: &StepId) -> bool {
        self.steps
            .get(&id.case)
            .map_or(false, |steps| steps.contains(&id.step))
            || self.failures.iter().any(|f| f.id == *id)
    }

    pub(crate) fn record_step(&mut self, id: &StepId) -> GrillageResult<()> {
        if self.has_step(id) {
            return Err(GrillageError::InvariantViolation(format!(
                "step {} appears more than once",
                id
            )));
        }
        self.steps.entry(id.case.clone()).or_default().insert(id.step);
        Ok(())
    }

    pub(crate) fn record_failure(&mut self, id: StepId, error: SolverError) -> GrillageResult<()> {
        if self.has_step(&id) {
            return Err(GrillageError::InvariantViolation(format!(
                "step {} appears more than once",
                id
            )));
        }
        self.failures.push(StepFailure { id, error });
        Ok(())
    }

    pub(crate) fn insert(&mut self, key: ResultKey, value: f64) -> GrillageResult<()> {
        if self.values.contains_key(&key) {
            return Err(GrillageError::InvariantViolation(format!(
                "duplicate result key {}",
                key
            )));
        }
        self.values.insert(key, value);
        Ok(())
    }

    /// Cases with at least one completed step
    pub fn cases(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }

    /// Completed steps of `case` in ascending order
    pub fn completed_steps(&self, case: &str) -> Vec<Option<usize>> {
        self.steps
            .get(case)
            .map(|steps| steps.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// Fails with the first recorded step failure, if any
    pub fn ensure_complete(&self) -> GrillageResult<()> {
        match self.failures.first() {
            Some(failure) => Err(GrillageError::SolverDivergence {
                case: failure.id.case.clone(),
                step: failure.id.step,
                reason: failure.error.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn value(
        &self,
        case: &str,
        step: Option<usize>,
        entity: Entity,
        quantity: Quantity,
    ) -> Option<f64> {
        self.values
            .get(&ResultKey::new(case, step, entity, quantity))
            .copied()
    }

    pub fn select(&self, query: &ResultQuery) -> Vec<ResultRow> {
        self.values
            .iter()
            .filter(|(key, _)| query.matches(key))
            .map(|(key, value)| ResultRow {
                key: key.clone(),
                value: *value,
            })
            .collect()
    }

    /// Value of one quantity against step number, i.e. an influence line for moving cases
    pub fn series(&self, case: &str, entity: Entity, quantity: Quantity) -> Vec<(Option<usize>, f64)> {
        self.completed_steps(case)
            .into_iter()
            .filter_map(|step| self.value(case, step, entity, quantity).map(|v| (step, v)))
            .collect()
    }

    /// Maximum and minimum of a quantity over all steps of a case
    pub fn envelope(
        &self,
        case: &str,
        entity: Entity,
        quantity: Quantity,
    ) -> GrillageResult<EnvelopeValue> {
        self.check_case(case)?;
        let series = self.series(case, entity, quantity);
        let (&(first_step, first), rest) = series.split_first().ok_or_else(|| {
            GrillageError::InvalidInput(format!(
                "no {:?} results for {:?} in case '{}'",
                quantity, entity, case
            ))
        })?;

        let mut envelope = EnvelopeValue {
            max: first,
            max_step: first_step,
            min: first,
            min_step: first_step,
        };
        for &(step, value) in rest {
            if value > envelope.max {
                envelope.max = value;
                envelope.max_step = step;
            }
            if value < envelope.min {
                envelope.min = value;
                envelope.min_step = step;
            }
        }
        Ok(envelope)
    }

    /// Extreme value of `quantity` over every entity and step of a case
    pub fn critical(
        &self,
        case: &str,
        quantity: Quantity,
        extremum: Extremum,
    ) -> Option<(ResultKey, f64)> {
        let better = |candidate: f64, current: f64| match extremum {
            Extremum::Max => candidate > current,
            Extremum::Min => candidate < current,
            Extremum::AbsMax => candidate.abs() > current.abs(),
        };
        self.values
            .iter()
            .filter(|(key, _)| key.case == case && key.quantity == quantity)
            .fold(None, |best: Option<(&ResultKey, f64)>, (key, &value)| match best {
                Some((_, current)) if !better(value, current) => best,
                _ => Some((key, value)),
            })
            .map(|(key, value)| (key.clone(), value))
    }

    pub fn node_displacement(
        &self,
        case: &str,
        step: Option<usize>,
        node: NodeTag,
    ) -> Option<NodeDisplacement> {
        let mut values = [0.0; 6];
        for dof in Dof::ALL {
            values[dof.index()] =
                self.value(case, step, Entity::Node(node), Quantity::Displacement(dof))?;
        }
        Some(NodeDisplacement::from_array(values))
    }

    /// Reactions of a restrained node; `None` for free nodes
    pub fn reactions(&self, case: &str, step: Option<usize>, node: NodeTag) -> Option<Reactions> {
        let mut values = [0.0; 6];
        for dof in Dof::ALL {
            values[dof.index()] =
                self.value(case, step, Entity::Node(node), Quantity::Reaction(dof))?;
        }
        Some(Reactions::from_array(values))
    }

    pub fn member_forces(
        &self,
        case: &str,
        step: Option<usize>,
        element: ElementTag,
        end: MemberEnd,
    ) -> Option<MemberForces> {
        let mut forces = [0.0; 12];
        for end in [MemberEnd::I, MemberEnd::J] {
            for dof in Dof::ALL {
                forces[end.offset() + dof.index()] = self.value(
                    case,
                    step,
                    Entity::Element(element),
                    Quantity::Force(end, dof),
                )?;
            }
        }
        Some(match end {
            MemberEnd::I => MemberForces::from_i_node_forces(&forces),
            MemberEnd::J => MemberForces::from_j_node_forces(&forces),
        })
    }

    /// Governing deflection, reaction and moment of a case
    pub fn summary(&self, case: &str) -> GrillageResult<AnalysisSummary> {
        self.check_case(case)?;
        let mut summary = AnalysisSummary {
            case: case.to_string(),
            completed_steps: self.completed_steps(case).len(),
            failed_steps: self.failures.iter().filter(|f| f.id.case == case).count(),
            ..Default::default()
        };

        for (key, value) in self.values.iter().filter(|(key, _)| key.case == case) {
            let magnitude = value.abs();
            match (key.entity, key.quantity) {
                (Entity::Node(node), Quantity::Displacement(Dof::DY))
                    if magnitude > summary.max_deflection =>
                {
                    summary.max_deflection = magnitude;
                    summary.max_deflection_node = Some(node);
                    summary.max_deflection_step = key.step;
                }
                (Entity::Node(node), Quantity::Reaction(Dof::DY))
                    if magnitude > summary.max_reaction =>
                {
                    summary.max_reaction = magnitude;
                    summary.max_reaction_node = Some(node);
                }
                (Entity::Element(element), Quantity::Force(_, Dof::RZ))
                    if magnitude > summary.max_moment =>
                {
                    summary.max_moment = magnitude;
                    summary.max_moment_member = Some(element);
                    summary.max_moment_step = key.step;
                }
                _ => {}
            }
        }
        Ok(summary)
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        self.select(&ResultQuery::new())
    }

    pub fn to_json(&self) -> GrillageResult<String> {
        Ok(serde_json::to_string_pretty(&self.rows())?)
    }

    /// Factored sum of static cases, stored as a static case named after the combination
    pub fn combine(&self, combination: &LoadCombination) -> GrillageResult<ResultSet> {
        let mut sums: BTreeMap<(Entity, Quantity), f64> = BTreeMap::new();
        let mut any = false;
        for (case, factor) in combination.cases() {
            self.check_case(case)?;
            if let Some(failure) = self.failures.iter().find(|f| f.id.case == case) {
                return Err(GrillageError::SolverDivergence {
                    case: case.to_string(),
                    step: failure.id.step,
                    reason: failure.error.to_string(),
                });
            }
            if self.completed_steps(case) != [None] {
                return Err(GrillageError::InvalidInput(format!(
                    "case '{}' has several steps; only static cases can be combined",
                    case
                )));
            }
            for (key, value) in self.values.iter().filter(|(key, _)| key.case == case) {
                *sums.entry((key.entity, key.quantity)).or_insert(0.0) += factor * value;
            }
            any = true;
        }
        if !any {
            return Err(GrillageError::InvalidInput(format!(
                "combination '{}' has no non-zero factors",
                combination.name
            )));
        }

        let mut combined = ResultSet::default();
        combined.record_step(&StepId::static_case(&combination.name))?;
        for ((entity, quantity), value) in sums {
            combined.insert(ResultKey::new(&combination.name, None, entity, quantity), value)?;
        }
        log::debug!(
            "combination '{}' produced {} values",
            combination.name,
            combined.len()
        );
        Ok(combined)
    }

    /// Add all results of `other`; fails without modifying `self` on any shared step or key
    pub fn merge(&mut self, other: ResultSet) -> GrillageResult<()> {
        for (case, steps) in &other.steps {
            for step in steps {
                let id = StepId {
                    case: case.clone(),
                    step: *step,
                };
                if self.has_step(&id) {
                    return Err(GrillageError::InvariantViolation(format!(
                        "step {} appears more than once",
                        id
                    )));
                }
            }
        }
        if let Some(failure) = other.failures.iter().find(|f| self.has_step(&f.id)) {
            return Err(GrillageError::InvariantViolation(format!(
                "step {} appears more than once",
                failure.id
            )));
        }
        if let Some(key) = other.values.keys().find(|k| self.values.contains_key(*k)) {
            return Err(GrillageError::InvariantViolation(format!(
                "duplicate result key {}",
                key
            )));
        }

        for (case, steps) in other.steps {
            self.steps.entry(case).or_default().extend(steps);
        }
        self.failures.extend(other.failures);
        self.values.extend(other.values);
        Ok(())
    }

    fn check_case(&self, case: &str) -> GrillageResult<()> {
        if self.steps.contains_key(case) || self.failures.iter().any(|f| f.id.case == case) {
            Ok(())
        } else {
            Err(GrillageError::LoadCaseNotFound(case.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{RawResponse, StepOutcome, StepResult, StepState};
    use crate::results::ResultCompiler;
    use approx::assert_relative_eq;

    fn response(deflection: f64) -> RawResponse {
        let mut raw = RawResponse::default();
        raw.displacements.insert(1, [0.0; 6]);
        raw.displacements.insert(2, [0.0, deflection, 0.0, 0.0, 0.0, 0.0]);
        raw.reactions.insert(1, [0.0, -deflection * 10.0, 0.0, 0.0, 0.0, 0.0]);
        raw.forces.insert(
            1,
            [0.0, 1.0, 0.0, 0.0, 0.0, 2.0 * deflection, 0.0, -1.0, 0.0, 0.0, 0.0, 3.0 * deflection],
        );
        raw
    }

    fn completed(id: StepId, deflection: f64) -> StepResult {
        StepResult {
            id,
            state: StepState::Collected,
            pattern_tag: 1,
            outcome: StepOutcome::Completed(response(deflection)),
        }
    }

    fn moving_set() -> ResultSet {
        let steps = vec![
            completed(StepId::moving("truck", 0), -1.0),
            completed(StepId::moving("truck", 1), -4.0),
            completed(StepId::moving("truck", 2), 0.5),
            StepResult {
                id: StepId::moving("truck", 3),
                state: StepState::Failed,
                pattern_tag: 4,
                outcome: StepOutcome::Failed(SolverError::Divergence("singular".to_string())),
            },
        ];
        ResultCompiler::compile(&steps).unwrap()
    }

    #[test]
    fn test_envelope_reports_steps() {
        let set = moving_set();
        let envelope = set
            .envelope("truck", Entity::Node(2), Quantity::Displacement(Dof::DY))
            .unwrap();
        assert_eq!(envelope.min, -4.0);
        assert_eq!(envelope.min_step, Some(1));
        assert_eq!(envelope.max, 0.5);
        assert_eq!(envelope.max_step, Some(2));
        assert_eq!(envelope.governing(), -4.0);
    }

    #[test]
    fn test_series_skips_failed_steps() {
        let set = moving_set();
        let series = set.series("truck", Entity::Node(2), Quantity::Displacement(Dof::DY));
        assert_eq!(series, vec![(Some(0), -1.0), (Some(1), -4.0), (Some(2), 0.5)]);
        assert_eq!(set.failures().len(), 1);
        assert!(matches!(
            set.ensure_complete(),
            Err(GrillageError::SolverDivergence { step: Some(3), .. })
        ));
    }

    #[test]
    fn test_unknown_case() {
        let set = moving_set();
        assert!(matches!(
            set.envelope("lane", Entity::Node(2), Quantity::Displacement(Dof::DY)),
            Err(GrillageError::LoadCaseNotFound(_))
        ));
        assert!(set.summary("lane").is_err());
    }

    #[test]
    fn test_critical_and_summary() {
        let set = moving_set();
        let (key, value) = set
            .critical("truck", Quantity::Force(MemberEnd::J, Dof::RZ), Extremum::AbsMax)
            .unwrap();
        assert_eq!(key.step, Some(1));
        assert_eq!(value, -12.0);

        let summary = set.summary("truck").unwrap();
        assert_eq!(summary.max_deflection, 4.0);
        assert_eq!(summary.max_deflection_node, Some(2));
        assert_eq!(summary.max_deflection_step, Some(1));
        assert_eq!(summary.max_moment, 12.0);
        assert_eq!(summary.completed_steps, 3);
        assert_eq!(summary.failed_steps, 1);
    }

    #[test]
    fn test_typed_views() {
        let set = moving_set();
        let d = set.node_displacement("truck", Some(1), 2).unwrap();
        assert_eq!(d.dy, -4.0);
        assert_eq!(set.reactions("truck", Some(1), 1).unwrap().fy, 40.0);
        assert!(set.reactions("truck", Some(1), 2).is_none());
        let j = set.member_forces("truck", Some(1), 1, MemberEnd::J).unwrap();
        assert_eq!(j.shear_y, 1.0);
        assert_eq!(j.moment_z, -12.0);
    }

    #[test]
    fn test_select_by_query() {
        let set = moving_set();
        let rows = set.select(
            &ResultQuery::new()
                .for_case("truck")
                .at_step(Some(2))
                .for_entity(Entity::Node(2)),
        );
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.key.step == Some(2)));
        assert!(set.to_json().unwrap().contains("Displacement"));
    }

    #[test]
    fn test_combination_arithmetic() {
        let steps = vec![
            completed(StepId::static_case("dead"), -2.0),
            completed(StepId::static_case("live"), -1.0),
        ];
        let set = ResultCompiler::compile(&steps).unwrap();
        let combo = LoadCombination::new("ULS")
            .with_case("dead", 1.2)
            .with_case("live", 1.5);
        let combined = set.combine(&combo).unwrap();
        let dy = combined
            .value("ULS", None, Entity::Node(2), Quantity::Displacement(Dof::DY))
            .unwrap();
        assert_relative_eq!(dy, 1.2 * -2.0 + 1.5 * -1.0);
        assert_eq!(combined.completed_steps("ULS"), vec![None]);

        let mut all = set.clone();
        all.merge(combined.clone()).unwrap();
        assert_eq!(all.len(), set.len() + combined.len());
        assert!(matches!(all.merge(combined), Err(GrillageError::InvariantViolation(_))));
    }

    #[test]
    fn test_combination_rejects_moving_and_unknown_cases() {
        let set = moving_set();
        let moving = LoadCombination::single("LL", "truck");
        assert!(set.combine(&moving).is_err());
        let unknown = LoadCombination::single("DL", "dead");
        assert!(matches!(
            set.combine(&unknown),
            Err(GrillageError::LoadCaseNotFound(_))
        ));
    }
}
