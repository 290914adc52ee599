//! Mapping of positioned loads onto statically equivalent nodal actions
//!
//! Every load is reduced to point loads inside single grid cells. A point load
//! is shared between the four cell corners by the bilinear shape functions,
//! which preserves the resultant and its first moments.

use std::collections::BTreeMap;

use super::{LineLoad, LoadAction, LoadCase, LoadDescriptor, LoadDirection, LoadPattern, PatchLoad};
use crate::elements::NodeTag;
use crate::error::{GrillageError, GrillageResult};
use crate::geometry::PlanPoint;
use crate::mesh::Mesh;

/// Relative tolerance on the clipped patch area
const AREA_TOL: f64 = 1e-9;

type Accumulator = BTreeMap<NodeTag, [f64; 6]>;

/// Maps load descriptors onto a mesh without modifying it
#[derive(Debug, Clone, Copy)]
pub struct LoadMapper<'m> {
    mesh: &'m Mesh,
}

impl<'m> LoadMapper<'m> {
    pub fn new(mesh: &'m Mesh) -> Self {
        Self { mesh }
    }

    /// Nodal actions equivalent to `load`, one per loaded node in ascending tag order.
    ///
    /// Fails with `OutOfDomainLoad` when any part of the load lies off the deck;
    /// no partial result is returned.
    pub fn map(&self, load: &LoadDescriptor, case: &str) -> GrillageResult<Vec<LoadAction>> {
        let mut acc = Accumulator::new();
        self.accumulate(load, &mut acc)?;
        Ok(Self::into_actions(acc, case))
    }

    /// Map every load of a case plus its direct nodal loads into one pattern
    pub fn map_case(&self, case: &LoadCase, tag: usize) -> GrillageResult<LoadPattern> {
        let mut acc = Accumulator::new();
        for load in &case.loads {
            self.accumulate(load, &mut acc)?;
        }
        for nodal in &case.nodal {
            self.mesh.node(nodal.node)?;
            let entry = acc.entry(nodal.node).or_insert([0.0; 6]);
            for (e, v) in entry.iter_mut().zip(nodal.as_array()) {
                *e += v;
            }
        }
        let actions = Self::into_actions(acc, &case.name);
        log::debug!(
            "mapped load case '{}' onto {} nodes",
            case.name,
            actions.len()
        );
        Ok(LoadPattern::new(tag, &case.name, None, actions))
    }

    fn into_actions(acc: Accumulator, case: &str) -> Vec<LoadAction> {
        acc.into_iter()
            .map(|(node, load)| LoadAction::new(node, load, case))
            .filter(|action| !action.is_zero())
            .collect()
    }

    fn accumulate(&self, load: &LoadDescriptor, acc: &mut Accumulator) -> GrillageResult<()> {
        match load {
            LoadDescriptor::Point(point) => {
                check_finite(point.magnitude, "point load magnitude")?;
                self.add_point(point.position, point.direction, point.magnitude, acc)
            }
            LoadDescriptor::Line(line) => self.add_line(line, acc),
            LoadDescriptor::Patch(patch) => self.add_patch(patch, acc),
            LoadDescriptor::Compound(loads) => {
                for load in loads {
                    self.accumulate(load, acc)?;
                }
                Ok(())
            }
        }
    }

    fn add_point(
        &self,
        at: PlanPoint,
        direction: LoadDirection,
        value: f64,
        acc: &mut Accumulator,
    ) -> GrillageResult<()> {
        let hit = self
            .mesh
            .find_cell(at)
            .ok_or(GrillageError::OutOfDomainLoad { x: at.x, z: at.z })?;
        Self::distribute(hit.nodes, hit.weights, direction, value, acc);
        Ok(())
    }

    fn distribute(
        nodes: [NodeTag; 4],
        weights: [f64; 4],
        direction: LoadDirection,
        value: f64,
        acc: &mut Accumulator,
    ) {
        for (node, weight) in nodes.into_iter().zip(weights) {
            if weight != 0.0 {
                acc.entry(node).or_insert([0.0; 6])[direction.index()] += value * weight;
            }
        }
    }

    fn add_line(&self, line: &LineLoad, acc: &mut Accumulator) -> GrillageResult<()> {
        check_finite(line.start_intensity, "line load start intensity")?;
        check_finite(line.end_intensity, "line load end intensity")?;
        let length = line.length();
        if !(length.is_finite() && length > 0.0) {
            return Err(GrillageError::InvalidInput(
                "line load needs two distinct end points".to_string(),
            ));
        }

        // Both ends on the deck keep the whole (convex) line on it
        for end in [line.start, line.end] {
            if !self.mesh.contains_point(end) {
                return Err(GrillageError::OutOfDomainLoad { x: end.x, z: end.z });
            }
        }

        let breaks = self.grid_crossings(line.start, line.end);
        let intensity = |t: f64| line.start_intensity + (line.end_intensity - line.start_intensity) * t;

        let mut segment = Accumulator::new();
        for pair in breaks.windows(2) {
            let (ta, tb) = (pair[0], pair[1]);
            let l = length * (tb - ta);
            let (wa, wb) = (intensity(ta), intensity(tb));
            let pa = line.start.lerp(&line.end, ta);
            let pb = line.start.lerp(&line.end, tb);
            self.add_point(pa, line.direction, l * (2.0 * wa + wb) / 6.0, &mut segment)?;
            self.add_point(pb, line.direction, l * (wa + 2.0 * wb) / 6.0, &mut segment)?;
        }
        merge(acc, segment);
        Ok(())
    }

    /// Sorted line parameters in [0, 1] where `a -> b` crosses a grid line, ends included
    fn grid_crossings(&self, a: PlanPoint, b: PlanPoint) -> Vec<f64> {
        let mut ts = vec![0.0, 1.0];

        let dz = b.z - a.z;
        if dz.abs() > f64::EPSILON {
            for &z in self.mesh.offsets() {
                ts.push((z - a.z) / dz);
            }
        }

        let grid = self.mesh.grid();
        for i in 0..grid.rows() {
            for j in 0..grid.cols() - 1 {
                let (Some(p), Some(q)) = (self.mesh.node_at(i, j), self.mesh.node_at(i, j + 1)) else {
                    continue;
                };
                if let Some(t) = segment_intersection(a, b, p.plan(), q.plan()) {
                    ts.push(t);
                }
            }
        }

        ts.retain(|t| t.is_finite() && (0.0..=1.0).contains(t));
        ts.sort_by(f64::total_cmp);
        ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);
        ts
    }

    fn add_patch(&self, patch: &PatchLoad, acc: &mut Accumulator) -> GrillageResult<()> {
        check_finite(patch.intensity, "patch load intensity")?;
        if patch.vertices.len() < 3 || patch.vertices.iter().any(|p| !(p.x.is_finite() && p.z.is_finite())) {
            return Err(GrillageError::InvalidInput(
                "patch load needs at least 3 finite vertices".to_string(),
            ));
        }
        let total_area = signed_area(&patch.vertices).abs();
        if total_area <= f64::EPSILON {
            return Err(GrillageError::InvalidInput(
                "patch load polygon has no area".to_string(),
            ));
        }

        if let Some(outside) = patch.vertices.iter().find(|p| !self.mesh.contains_point(**p)) {
            return Err(GrillageError::OutOfDomainLoad {
                x: outside.x,
                z: outside.z,
            });
        }

        let grid = self.mesh.grid();
        let mut covered = 0.0;
        let mut cells = Accumulator::new();
        for i in 0..grid.rows() - 1 {
            for j in 0..grid.cols() - 1 {
                let Some(cell) = self.mesh.cell_polygon(i, j) else {
                    continue;
                };
                let clipped = clip_polygon(&patch.vertices, &cell);
                if clipped.len() < 3 {
                    continue;
                }
                let area = signed_area(&clipped);
                covered += area.abs();
                if area.abs() <= AREA_TOL * total_area {
                    continue;
                }

                let centroid = polygon_centroid(&clipped, area);
                let hit = self
                    .mesh
                    .locate_in_cell(centroid, i, j)
                    .or_else(|| self.mesh.find_cell(centroid))
                    .ok_or_else(|| {
                        GrillageError::InvariantViolation(format!(
                            "clipped patch centroid ({:.4}, {:.4}) is outside cell ({}, {})",
                            centroid.x, centroid.z, i, j
                        ))
                    })?;
                Self::distribute(
                    hit.nodes,
                    hit.weights,
                    patch.direction,
                    patch.intensity * area.abs(),
                    &mut cells,
                );
            }
        }

        // Vertices on the deck do not rule out edges leaving it
        if (covered - total_area).abs() > AREA_TOL * total_area + f64::EPSILON {
            let outside = polygon_centroid(&patch.vertices, signed_area(&patch.vertices));
            return Err(GrillageError::OutOfDomainLoad {
                x: outside.x,
                z: outside.z,
            });
        }

        merge(acc, cells);
        Ok(())
    }
}

fn check_finite(value: f64, what: &str) -> GrillageResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GrillageError::InvalidInput(format!("{} must be finite", what)))
    }
}

fn merge(acc: &mut Accumulator, other: Accumulator) {
    for (node, load) in other {
        let entry = acc.entry(node).or_insert([0.0; 6]);
        for (e, v) in entry.iter_mut().zip(load) {
            *e += v;
        }
    }
}

fn cross(o: PlanPoint, a: PlanPoint, b: PlanPoint) -> f64 {
    (a.x - o.x) * (b.z - o.z) - (a.z - o.z) * (b.x - o.x)
}

/// Parameter along `a -> b` where it crosses segment `p -> q`, if it does
fn segment_intersection(a: PlanPoint, b: PlanPoint, p: PlanPoint, q: PlanPoint) -> Option<f64> {
    let r = (b.x - a.x, b.z - a.z);
    let s = (q.x - p.x, q.z - p.z);
    let denom = r.0 * s.1 - r.1 * s.0;
    if denom.abs() < 1e-15 {
        return None;
    }
    let ap = (p.x - a.x, p.z - a.z);
    let t = (ap.0 * s.1 - ap.1 * s.0) / denom;
    let u = (ap.0 * r.1 - ap.1 * r.0) / denom;
    let on_segment = |v: f64| (-1e-12..=1.0 + 1e-12).contains(&v);
    (on_segment(t) && on_segment(u)).then(|| t.clamp(0.0, 1.0))
}

/// Shoelace area in the (x, z) plane, positive for counter-clockwise polygons
fn signed_area(polygon: &[PlanPoint]) -> f64 {
    let n = polygon.len();
    (0..n)
        .map(|k| {
            let a = polygon[k];
            let b = polygon[(k + 1) % n];
            a.x * b.z - b.x * a.z
        })
        .sum::<f64>()
        / 2.0
}

fn polygon_centroid(polygon: &[PlanPoint], area: f64) -> PlanPoint {
    let n = polygon.len();
    let (mut cx, mut cz) = (0.0, 0.0);
    for k in 0..n {
        let a = polygon[k];
        let b = polygon[(k + 1) % n];
        let f = a.x * b.z - b.x * a.z;
        cx += (a.x + b.x) * f;
        cz += (a.z + b.z) * f;
    }
    PlanPoint::new(cx / (6.0 * area), cz / (6.0 * area))
}

/// Sutherland-Hodgman clipping of `subject` against the convex counter-clockwise `clip`
fn clip_polygon(subject: &[PlanPoint], clip: &[PlanPoint; 4]) -> Vec<PlanPoint> {
    let mut output: Vec<PlanPoint> = subject.to_vec();
    for k in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let (e0, e1) = (clip[k], clip[(k + 1) % clip.len()]);
        let input = std::mem::take(&mut output);
        let inside = |p: PlanPoint| cross(e0, e1, p) >= 0.0;
        for m in 0..input.len() {
            let current = input[m];
            let previous = input[(m + input.len() - 1) % input.len()];
            match (inside(previous), inside(current)) {
                (true, true) => output.push(current),
                (true, false) => output.extend(line_intersection(previous, current, e0, e1)),
                (false, true) => {
                    output.extend(line_intersection(previous, current, e0, e1));
                    output.push(current);
                }
                (false, false) => {}
            }
        }
    }
    output
}

/// Intersection of segment `p -> q` with the infinite line through `e0, e1`
fn line_intersection(p: PlanPoint, q: PlanPoint, e0: PlanPoint, e1: PlanPoint) -> Option<PlanPoint> {
    let dp = cross(e0, e1, p);
    let dq = cross(e0, e1, q);
    let denom = dp - dq;
    if denom.abs() < 1e-300 {
        return None;
    }
    Some(p.lerp(&q, dp / denom))
}
