//! Linear static 3D frame solver (direct stiffness method, 6 DOF per node)

use std::collections::{BTreeMap, BTreeSet};

use super::{AnalysisOptions, LinearBackend, ModelDefinition, RawResponse, Solver, SolverError};
use crate::elements::NodeTag;
use crate::loads::LoadPattern;
use crate::math::{self, Mat12, SkylineCholesky, SparseMatrixBuilder, Vec12};

/// Relative tolerance of the global equilibrium check
const STATICS_TOL: f64 = 1e-6;

/// Bundled solver implementing the `Solver` boundary in-process
#[derive(Debug, Clone, Default)]
pub struct LinearSolver {
    options: AnalysisOptions,
    model: Option<ModelDefinition>,
    patterns: Vec<LoadPattern>,
}

struct Assembly {
    /// First global DOF of every node
    dof_of: BTreeMap<NodeTag, usize>,
    /// Free equation number of every global DOF
    equation: Vec<Option<usize>>,
    n_free: usize,
    element_data: Vec<(Mat12, Mat12)>,
}

impl LinearSolver {
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options,
            model: None,
            patterns: Vec::new(),
        }
    }

    /// True while a model is defined (between `define` and `wipe`)
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    fn validate(model: &ModelDefinition) -> Result<(), SolverError> {
        let mut tags = BTreeSet::new();
        for node in &model.nodes {
            if !tags.insert(node.tag) {
                return Err(SolverError::InvalidModel(format!("duplicate node tag {}", node.tag)));
            }
            if node.coords.iter().any(|c| !c.is_finite()) {
                return Err(SolverError::InvalidModel(format!(
                    "node {} has non-finite coordinates",
                    node.tag
                )));
            }
        }

        let coords: BTreeMap<_, _> = model.nodes.iter().map(|n| (n.tag, n.coords)).collect();
        let mut element_tags = BTreeSet::new();
        for element in &model.elements {
            if !element_tags.insert(element.tag) {
                return Err(SolverError::InvalidModel(format!(
                    "duplicate element tag {}",
                    element.tag
                )));
            }
            let [a, b] = element.nodes;
            let (Some(ca), Some(cb)) = (coords.get(&a), coords.get(&b)) else {
                return Err(SolverError::InvalidModel(format!(
                    "element {} references an undefined node",
                    element.tag
                )));
            };
            let length = (0..3).map(|k| (cb[k] - ca[k]).powi(2)).sum::<f64>().sqrt();
            if length < 1e-10 {
                return Err(SolverError::InvalidModel(format!(
                    "element {} has zero length",
                    element.tag
                )));
            }
            if !element.material.is_valid() || !element.section.is_valid() {
                return Err(SolverError::InvalidModel(format!(
                    "element {} has non-positive stiffness properties",
                    element.tag
                )));
            }
        }
        Ok(())
    }

    fn assemble(model: &ModelDefinition) -> Assembly {
        let mut dof_of = BTreeMap::new();
        let mut equation = vec![None; model.nodes.len() * 6];
        let mut n_free = 0;
        for (k, node) in model.nodes.iter().enumerate() {
            dof_of.insert(node.tag, k * 6);
            let restrained = node.restraint.map(|r| r.as_array()).unwrap_or([false; 6]);
            for (d, fixed) in restrained.into_iter().enumerate() {
                if !fixed {
                    equation[k * 6 + d] = Some(n_free);
                    n_free += 1;
                }
            }
        }

        let coords: BTreeMap<_, _> = model.nodes.iter().map(|n| (n.tag, n.coords)).collect();
        let element_data = model
            .elements
            .iter()
            .map(|element| {
                let [a, b] = element.nodes;
                let (ca, cb) = (coords[&a], coords[&b]);
                let length = (0..3).map(|k| (cb[k] - ca[k]).powi(2)).sum::<f64>().sqrt();
                let s = &element.section;
                let m = &element.material;
                let k_local = math::member_local_stiffness(m.e, m.g, s.a, s.iy, s.iz, s.j, length);
                let t = math::transformation_matrix(&element.local_x, &element.local_z);
                (k_local, t)
            })
            .collect();

        Assembly {
            dof_of,
            equation,
            n_free,
            element_data,
        }
    }

    fn element_dofs(assembly: &Assembly, nodes: [NodeTag; 2]) -> [usize; 12] {
        let (a, b) = (assembly.dof_of[&nodes[0]], assembly.dof_of[&nodes[1]]);
        std::array::from_fn(|k| if k < 6 { a + k } else { b + k - 6 })
    }

    fn solve(&self, builder: &SparseMatrixBuilder, p: &math::Vec) -> Result<math::Vec, SolverError> {
        let d = match self.options.backend {
            LinearBackend::Dense => math::solve_linear_system(&builder.to_dense(), p)
                .ok_or_else(|| SolverError::Divergence("singular stiffness matrix".to_string()))?,
            LinearBackend::SkylineCholesky => {
                let mut skyline = SkylineCholesky::new(&builder.to_csr());
                skyline.factorize().map_err(|e| {
                    SolverError::Divergence(format!("{}; the structure is unstable", e))
                })?;
                skyline.solve(p)
            }
            LinearBackend::Pcg => math::solve_pcg(
                &builder.to_csr(),
                p,
                self.options.tolerance,
                self.options.max_iterations,
            )
            .ok_or_else(|| {
                SolverError::Divergence(format!(
                    "PCG did not reach tolerance {:e} in {} iterations",
                    self.options.tolerance, self.options.max_iterations
                ))
            })?,
        };
        if d.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::Divergence("non-finite displacements".to_string()));
        }
        Ok(d)
    }

    fn check_statics(
        model: &ModelDefinition,
        loads: &BTreeMap<NodeTag, [f64; 6]>,
        reactions: &BTreeMap<NodeTag, [f64; 6]>,
    ) -> Result<(), SolverError> {
        let coords: BTreeMap<_, _> = model.nodes.iter().map(|n| (n.tag, n.coords)).collect();
        let extent = model
            .nodes
            .iter()
            .flat_map(|n| n.coords)
            .fold(1.0_f64, |acc, c| acc.max(c.abs()));

        let mut residual = [0.0; 6];
        let mut scale = 0.0_f64;
        for (tag, load) in loads.iter().chain(reactions.iter()) {
            let r = coords[tag];
            let f = [load[0], load[1], load[2]];
            let moment = [
                r[1] * f[2] - r[2] * f[1],
                r[2] * f[0] - r[0] * f[2],
                r[0] * f[1] - r[1] * f[0],
            ];
            for k in 0..3 {
                residual[k] += f[k];
                residual[k + 3] += load[k + 3] + moment[k];
            }
            scale = scale.max(f.iter().fold(0.0_f64, |m, v| m.max(v.abs())));
        }
        let scale = scale.max(1.0);

        let force_error = residual[..3].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let moment_error = residual[3..].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if force_error > STATICS_TOL * scale || moment_error > STATICS_TOL * scale * extent {
            return Err(SolverError::Divergence(format!(
                "statics check failed: force residual {:e}, moment residual {:e}",
                force_error, moment_error
            )));
        }
        Ok(())
    }
}

impl Solver for LinearSolver {
    fn wipe(&mut self) {
        self.model = None;
        self.patterns.clear();
    }

    fn define(&mut self, model: &ModelDefinition) -> Result<(), SolverError> {
        if self.model.is_some() {
            return Err(SolverError::InvalidModel(
                "a model is already defined; wipe before defining another".to_string(),
            ));
        }
        Self::validate(model)?;
        self.model = Some(model.clone());
        Ok(())
    }

    fn apply(&mut self, pattern: &LoadPattern) -> Result<(), SolverError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| SolverError::InvalidModel("no model defined".to_string()))?;
        for action in &pattern.actions {
            if !model.nodes.iter().any(|n| n.tag == action.node) {
                return Err(SolverError::InvalidModel(format!(
                    "load pattern {} loads undefined node {}",
                    pattern.tag, action.node
                )));
            }
            if action.load.iter().any(|v| !v.is_finite()) {
                return Err(SolverError::InvalidModel(format!(
                    "load pattern {} has a non-finite load on node {}",
                    pattern.tag, action.node
                )));
            }
        }
        self.patterns.push(pattern.clone());
        Ok(())
    }

    fn analyze(&mut self) -> Result<RawResponse, SolverError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| SolverError::InvalidModel("no model defined".to_string()))?;
        let assembly = Self::assemble(model);
        if assembly.n_free == 0 {
            return Err(SolverError::InvalidModel("no free degrees of freedom".to_string()));
        }

        let mut builder = SparseMatrixBuilder::new(assembly.n_free);
        for (element, (k_local, t)) in model.elements.iter().zip(&assembly.element_data) {
            let k_global = t.transpose() * k_local * t;
            let dofs = Self::element_dofs(&assembly, element.nodes);
            builder.add_element_matrix(&dofs.map(|d| assembly.equation[d]), &k_global);
        }

        let mut loads: BTreeMap<NodeTag, [f64; 6]> = BTreeMap::new();
        for action in self.patterns.iter().flat_map(|p| &p.actions) {
            let entry = loads.entry(action.node).or_insert([0.0; 6]);
            for (e, v) in entry.iter_mut().zip(action.load) {
                *e += v;
            }
        }
        let mut p = math::Vec::zeros(assembly.n_free);
        for (tag, load) in &loads {
            let base = assembly.dof_of[tag];
            for (k, v) in load.iter().enumerate() {
                if let Some(eq) = assembly.equation[base + k] {
                    p[eq] += v;
                }
            }
        }

        let d_free = self.solve(&builder, &p)?;
        let mut d_full = vec![0.0; assembly.equation.len()];
        for (dof, eq) in assembly.equation.iter().enumerate() {
            if let Some(eq) = eq {
                d_full[dof] = d_free[*eq];
            }
        }

        let mut response = RawResponse::default();
        for node in &model.nodes {
            let base = assembly.dof_of[&node.tag];
            response
                .displacements
                .insert(node.tag, std::array::from_fn(|k| d_full[base + k]));
        }

        let mut end_forces: BTreeMap<NodeTag, [f64; 6]> = BTreeMap::new();
        for (element, (k_local, t)) in model.elements.iter().zip(&assembly.element_data) {
            let dofs = Self::element_dofs(&assembly, element.nodes);
            let d_global = Vec12::from_fn(|k, _| d_full[dofs[k]]);
            let f_local = k_local * (t * d_global);
            let f_global = t.transpose() * f_local;

            response
                .forces
                .insert(element.tag, std::array::from_fn(|k| f_local[k]));
            for (end, node) in element.nodes.iter().enumerate() {
                let entry = end_forces.entry(*node).or_insert([0.0; 6]);
                for k in 0..6 {
                    entry[k] += f_global[end * 6 + k];
                }
            }
        }

        for node in &model.nodes {
            let Some(restraint) = node.restraint.filter(|r| r.is_supported()) else {
                continue;
            };
            let mut reaction = end_forces.get(&node.tag).copied().unwrap_or([0.0; 6]);
            if let Some(load) = loads.get(&node.tag) {
                for k in 0..6 {
                    reaction[k] -= load[k];
                }
            }
            for (k, fixed) in restraint.as_array().into_iter().enumerate() {
                if !fixed {
                    reaction[k] = 0.0;
                }
            }
            response.reactions.insert(node.tag, reaction);
        }

        if self.options.check_statics {
            Self::check_statics(model, &loads, &response.reactions)?;
        }

        log::debug!(
            "linear solve: {} equations, {} stiffness terms, {} loaded nodes",
            assembly.n_free,
            builder.nnz(),
            loads.len()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ElementDefinition, NodeDefinition};
    use crate::elements::{Material, Restraint, Section};
    use crate::loads::LoadAction;
    use approx::assert_relative_eq;

    fn simply_supported_beam(spans: usize, length: f64) -> ModelDefinition {
        let n = spans + 1;
        let nodes = (0..n)
            .map(|k| NodeDefinition {
                tag: k + 1,
                coords: [length * k as f64 / spans as f64, 0.0, 0.0],
                restraint: if k == 0 {
                    Some(Restraint::from_vector([1, 1, 1, 1, 0, 0]))
                } else if k == n - 1 {
                    Some(Restraint::from_vector([0, 1, 1, 0, 0, 0]))
                } else {
                    Some(Restraint::from_vector([0, 0, 1, 0, 0, 0]))
                },
            })
            .collect();
        let elements = (0..spans)
            .map(|k| ElementDefinition {
                tag: k + 1,
                nodes: [k + 1, k + 2],
                local_x: [1.0, 0.0, 0.0],
                local_z: [0.0, 0.0, 1.0],
                material: Material::steel(),
                section: Section::new(0.01, 1e-4, 2e-4, 1e-5),
            })
            .collect();
        ModelDefinition { nodes, elements }
    }

    fn midspan_load(node: NodeTag, p: f64) -> LoadPattern {
        LoadPattern::new(1, "test", None, vec![LoadAction::new(node, [0.0, p, 0.0, 0.0, 0.0, 0.0], "test")])
    }

    fn run(options: AnalysisOptions) -> RawResponse {
        let mut solver = LinearSolver::new(options);
        solver.define(&simply_supported_beam(4, 10.0)).unwrap();
        solver.apply(&midspan_load(3, -10_000.0)).unwrap();
        solver.analyze().unwrap()
    }

    #[test]
    fn test_simply_supported_midspan_deflection() {
        let response = run(AnalysisOptions::default());
        // PL^3 / 48EI
        let expected = -10_000.0 * 1000.0 / (48.0 * 200e9 * 2e-4);
        assert_relative_eq!(response.displacements[&3][1], expected, max_relative = 1e-9);
        assert_relative_eq!(response.reactions[&1][1], 5_000.0, max_relative = 1e-9);
        assert_relative_eq!(response.reactions[&5][1], 5_000.0, max_relative = 1e-9);
    }

    #[test]
    fn test_backends_agree() {
        let skyline = run(AnalysisOptions::default());
        let dense = run(AnalysisOptions::default().with_backend(LinearBackend::Dense));
        let pcg = run(AnalysisOptions::default()
            .with_backend(LinearBackend::Pcg)
            .with_tolerance(1e-12));
        for tag in 1..=5 {
            for k in 0..6 {
                let a = skyline.displacements[&tag][k];
                assert_relative_eq!(a, dense.displacements[&tag][k], epsilon = 1e-12, max_relative = 1e-8);
                assert_relative_eq!(a, pcg.displacements[&tag][k], epsilon = 1e-12, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn test_midspan_moment_from_element_forces() {
        let response = run(AnalysisOptions::default());
        // Element 2 ends at midspan: Mz at j-end = PL/4
        let forces = response.forces[&2];
        assert_relative_eq!(forces[11].abs(), 10_000.0 * 10.0 / 4.0, max_relative = 1e-9);
    }

    #[test]
    fn test_define_twice_requires_wipe() {
        let mut solver = LinearSolver::default();
        let model = simply_supported_beam(2, 4.0);
        solver.define(&model).unwrap();
        assert!(matches!(solver.define(&model), Err(SolverError::InvalidModel(_))));
        solver.wipe();
        assert!(!solver.has_model());
        assert!(solver.define(&model).is_ok());
    }

    #[test]
    fn test_wipe_drops_loads() {
        let mut solver = LinearSolver::default();
        let model = simply_supported_beam(2, 4.0);
        solver.define(&model).unwrap();
        solver.apply(&midspan_load(2, -1.0)).unwrap();
        solver.wipe();
        solver.define(&model).unwrap();
        let response = solver.analyze().unwrap();
        assert!(response.displacements.values().flatten().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unstable_structure_diverges() {
        let mut model = simply_supported_beam(2, 4.0);
        for node in &mut model.nodes {
            node.restraint = None;
        }
        let mut solver = LinearSolver::default();
        solver.define(&model).unwrap();
        solver.apply(&midspan_load(2, -1.0)).unwrap();
        assert!(matches!(solver.analyze(), Err(SolverError::Divergence(_))));
    }

    #[test]
    fn test_rejects_unknown_nodes() {
        let mut solver = LinearSolver::default();
        solver.define(&simply_supported_beam(2, 4.0)).unwrap();
        assert!(solver.apply(&midspan_load(42, -1.0)).is_err());

        let mut model = simply_supported_beam(2, 4.0);
        model.elements[0].nodes = [1, 9];
        solver.wipe();
        assert!(matches!(solver.define(&model), Err(SolverError::InvalidModel(_))));
    }
}
