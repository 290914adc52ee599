//! Moving loads: vehicles traversing a path across the deck

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{LoadDescriptor, LoadDirection, PointLoad};
use crate::error::{GrillageError, GrillageResult};
use crate::geometry::PlanPoint;
use crate::mesh::Mesh;

/// Relative tolerance for an exact number of increments along the path
const STEP_TOL: f64 = 1e-9;

/// One axle of a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axle {
    /// Distance behind the lead axle, measured along the path
    pub offset: f64,
    /// Signed load along the case direction (negative for gravity with `FY`)
    pub weight: f64,
    /// Distance between the two wheels; `None` loads the axle as a single point
    #[serde(default)]
    pub track_width: Option<f64>,
}

impl Axle {
    pub fn new(offset: f64, weight: f64) -> Self {
        Self {
            offset,
            weight,
            track_width: None,
        }
    }

    /// Split the axle into two wheels `track_width` apart
    pub fn with_track_width(mut self, track_width: f64) -> Self {
        self.track_width = Some(track_width);
        self
    }
}

/// Polyline a vehicle's lead axle follows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPath {
    pub waypoints: Vec<PlanPoint>,
}

impl LoadPath {
    pub fn new(waypoints: Vec<PlanPoint>) -> Self {
        Self { waypoints }
    }

    /// Straight path between two points
    pub fn straight(start: PlanPoint, end: PlanPoint) -> Self {
        Self::new(vec![start, end])
    }

    /// Cumulative distance at every waypoint
    fn cumulative(&self) -> Vec<f64> {
        let mut total = 0.0;
        let mut lengths = Vec::with_capacity(self.waypoints.len());
        lengths.push(0.0);
        for pair in self.waypoints.windows(2) {
            total += pair[0].distance_to(&pair[1]);
            lengths.push(total);
        }
        lengths
    }

    pub fn length(&self) -> f64 {
        self.cumulative().last().copied().unwrap_or(0.0)
    }

    /// Segment containing `distance` and the parameter along it; zero-length
    /// segments from repeated waypoints are skipped
    fn segment_at(&self, cumulative: &[f64], distance: f64) -> Option<(usize, f64)> {
        let segments = self.waypoints.len().checked_sub(1)?;
        let mut last = None;
        for k in 0..segments {
            let (s0, s1) = (cumulative[k], cumulative[k + 1]);
            let len = s1 - s0;
            if len <= 0.0 {
                continue;
            }
            let t = ((distance - s0) / len).clamp(0.0, 1.0);
            if distance <= s1 {
                return Some((k, t));
            }
            last = Some((k, t));
        }
        last
    }

    fn point_on(&self, cumulative: &[f64], distance: f64) -> Option<PlanPoint> {
        let (k, t) = self.segment_at(cumulative, distance)?;
        Some(self.waypoints[k].lerp(&self.waypoints[k + 1], t))
    }

    fn tangent_on(&self, cumulative: &[f64], distance: f64) -> Option<PlanPoint> {
        let (k, _) = self.segment_at(cumulative, distance)?;
        let (a, b) = (self.waypoints[k], self.waypoints[k + 1]);
        let len = a.distance_to(&b);
        (len > 0.0).then(|| PlanPoint::new((b.x - a.x) / len, (b.z - a.z) / len))
    }

    /// Plan position at `distance` along the path (clamped to the ends)
    pub fn point_at(&self, distance: f64) -> Option<PlanPoint> {
        self.point_on(&self.cumulative(), distance)
    }

    /// Unit direction of travel at `distance`
    pub fn tangent_at(&self, distance: f64) -> Option<PlanPoint> {
        self.tangent_on(&self.cumulative(), distance)
    }
}

/// A vehicle moved along a path in fixed increments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingLoadCase {
    pub name: String,
    pub axles: Vec<Axle>,
    pub path: LoadPath,
    /// Distance the lead axle advances between placements
    pub increment: f64,
    #[serde(default)]
    pub direction: LoadDirection,
}

impl MovingLoadCase {
    pub fn new(name: &str, path: LoadPath, increment: f64) -> Self {
        Self {
            name: name.to_string(),
            axles: Vec::new(),
            path,
            increment,
            direction: LoadDirection::FY,
        }
    }

    pub fn with_axle(mut self, axle: Axle) -> Self {
        self.axles.push(axle);
        self
    }

    pub fn with_direction(mut self, direction: LoadDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Check the vehicle and path before any placement is produced
    pub fn validate(&self) -> GrillageResult<()> {
        if self.axles.is_empty() {
            return Err(GrillageError::InvalidInput(format!(
                "moving load '{}' has no axles",
                self.name
            )));
        }
        for (k, axle) in self.axles.iter().enumerate() {
            if !(axle.offset.is_finite() && axle.weight.is_finite()) {
                return Err(GrillageError::InvalidInput(format!(
                    "axle {} of '{}' needs a finite offset and weight",
                    k, self.name
                )));
            }
            if let Some(track) = axle.track_width {
                if !(track.is_finite() && track >= 0.0) {
                    return Err(GrillageError::InvalidInput(format!(
                        "axle {} of '{}' has a negative track width",
                        k, self.name
                    )));
                }
            }
        }
        if self.path.waypoints.len() < 2 {
            return Err(GrillageError::InvalidInput(format!(
                "path of '{}' needs at least two waypoints",
                self.name
            )));
        }
        let length = self.path.length();
        if !(length.is_finite() && length > 0.0) {
            return Err(GrillageError::InvalidInput(format!(
                "path of '{}' has zero length",
                self.name
            )));
        }
        if !(self.increment.is_finite() && self.increment > 0.0) {
            return Err(GrillageError::InvalidInput(format!(
                "increment of '{}' must be positive, got {}",
                self.name, self.increment
            )));
        }
        Ok(())
    }
}

/// Load of one wheel or axle at a placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxleLoad {
    /// Index of the axle in the vehicle
    pub axle: usize,
    pub load: PointLoad,
}

/// Vehicle position at one step of a traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub step: usize,
    /// Distance of the lead axle along the path
    pub distance: f64,
    /// Plan position of the lead axle
    pub lead: PlanPoint,
    /// Loads of the axles currently on the deck
    pub loads: Vec<AxleLoad>,
}

impl Placement {
    /// All axle loads as one compound load
    pub fn to_descriptor(&self) -> LoadDescriptor {
        LoadDescriptor::Compound(
            self.loads
                .iter()
                .map(|axle| LoadDescriptor::Point(axle.load.clone()))
                .collect(),
        )
    }

    /// Indices of the axles on the deck, ascending
    pub fn axles_on_deck(&self) -> Vec<usize> {
        self.loads
            .iter()
            .map(|l| l.axle)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Walks a moving load case along its path
pub struct PathTraverser;

impl PathTraverser {
    /// Lazy sequence of placements, ordered by increasing distance along the path
    pub fn traverse<'a>(case: &'a MovingLoadCase, mesh: &'a Mesh) -> GrillageResult<Traversal<'a>> {
        case.validate()?;
        let cumulative = case.path.cumulative();
        let length = cumulative.last().copied().unwrap_or(0.0);

        let ratio = length / case.increment;
        if !ratio.is_finite() || ratio >= usize::MAX as f64 {
            return Err(GrillageError::InvalidInput(format!(
                "increment {} of '{}' gives too many placements over {} m",
                case.increment, case.name, length
            )));
        }
        let whole = ratio.round();
        let intervals = if (ratio - whole).abs() <= STEP_TOL * ratio.max(1.0) {
            whole as usize
        } else {
            ratio.ceil() as usize
        };
        let count = intervals.checked_add(1).ok_or_else(|| {
            GrillageError::InvalidInput(format!(
                "increment {} of '{}' gives too many placements",
                case.increment, case.name
            ))
        })?;

        Ok(Traversal {
            case,
            mesh,
            cumulative,
            length,
            count,
            next: 0,
        })
    }
}

/// Finite, restartable iterator of placements; clone it to iterate again
#[derive(Debug, Clone)]
pub struct Traversal<'a> {
    case: &'a MovingLoadCase,
    mesh: &'a Mesh,
    cumulative: Vec<f64>,
    length: f64,
    count: usize,
    next: usize,
}

impl<'a> Traversal<'a> {
    pub fn case(&self) -> &'a MovingLoadCase {
        self.case
    }

    /// Total number of placements, independent of iteration progress
    pub fn placement_count(&self) -> usize {
        self.count
    }

    /// Start over from the first placement
    pub fn restart(&mut self) {
        self.next = 0;
    }

    fn placement(&self, step: usize) -> Placement {
        let distance = if step + 1 == self.count {
            self.length
        } else {
            (step as f64 * self.case.increment).min(self.length)
        };
        let path = &self.case.path;
        let lead = path
            .point_on(&self.cumulative, distance)
            .unwrap_or_default();

        let mut loads = Vec::new();
        for (k, axle) in self.case.axles.iter().enumerate() {
            let s = distance - axle.offset;
            let tol = STEP_TOL * self.length;
            if s < -tol || s > self.length + tol {
                continue;
            }
            let s = s.clamp(0.0, self.length);
            let Some(at) = path.point_on(&self.cumulative, s) else {
                continue;
            };

            let wheels: Vec<(PlanPoint, f64)> = match axle.track_width {
                Some(track) if track > 0.0 => {
                    let Some(tangent) = path.tangent_on(&self.cumulative, s) else {
                        continue;
                    };
                    let normal = PlanPoint::new(-tangent.z, tangent.x);
                    let half = track / 2.0;
                    vec![
                        (PlanPoint::new(at.x - normal.x * half, at.z - normal.z * half), axle.weight / 2.0),
                        (PlanPoint::new(at.x + normal.x * half, at.z + normal.z * half), axle.weight / 2.0),
                    ]
                }
                _ => vec![(at, axle.weight)],
            };

            if wheels.iter().all(|(p, _)| self.mesh.contains_point(*p)) {
                loads.extend(wheels.into_iter().map(|(p, weight)| AxleLoad {
                    axle: k,
                    load: PointLoad::new(p.x, p.z, weight, self.case.direction),
                }));
            }
        }

        Placement {
            step,
            distance,
            lead,
            loads,
        }
    }
}

impl Iterator for Traversal<'_> {
    type Item = Placement;

    fn next(&mut self) -> Option<Placement> {
        if self.next >= self.count {
            return None;
        }
        let placement = self.placement(self.next);
        self.next += 1;
        Some(placement)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Traversal<'_> {}
