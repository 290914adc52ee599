//! Deck geometry description
//!
//! Coordinates follow the usual grillage convention: x runs along the span,
//! z across the deck width and y is vertical.

use serde::{Deserialize, Serialize};

use crate::elements::Restraint;
use crate::error::{GrillageError, GrillageResult};

/// Skew mesh warning threshold in degrees
const SKEW_MESH_WARN_ANGLE: f64 = 30.0;

/// A position in the deck plane (x along the span, z across the width)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanPoint {
    pub x: f64,
    pub z: f64,
}

impl PlanPoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance_to(&self, other: &PlanPoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.z - self.z).powi(2)).sqrt()
    }

    /// Linear interpolation towards `other`
    pub fn lerp(&self, other: &PlanPoint, t: f64) -> PlanPoint {
        PlanPoint::new(
            self.x + (other.x - self.x) * t,
            self.z + (other.z - self.z) * t,
        )
    }
}

impl From<[f64; 2]> for PlanPoint {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// How transverse grid lines are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshType {
    /// Interior transverse lines perpendicular to the span, end lines follow the skew edges
    Orthogonal,
    /// Every transverse line follows the skew, interpolated between the two edges
    Skew,
}

impl Default for MeshType {
    fn default() -> Self {
        Self::Orthogonal
    }
}

/// Support condition applied along a deck end edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSupport {
    /// Translations restrained, rotations free
    Pinned,
    /// Vertical and transverse translation restrained, free to slide along the span
    Roller,
    /// All DOFs restrained
    Fixed,
    /// No restraint
    Free,
}

impl EdgeSupport {
    /// Restraint applied to each support node, `None` for a free edge
    pub fn restraint(&self) -> Option<Restraint> {
        match self {
            EdgeSupport::Pinned => Some(Restraint::pinned()),
            EdgeSupport::Roller => Some(Restraint::roller_x()),
            EdgeSupport::Fixed => Some(Restraint::fixed()),
            EdgeSupport::Free => None,
        }
    }
}

/// Immutable description of a grillage deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryModel {
    /// Span length between the support edges (x direction)
    pub span: f64,
    /// Deck width measured perpendicular to the span (z direction)
    pub width: f64,
    /// Number of longitudinal grid lines, edge lines included
    pub num_long_grid: usize,
    /// Number of transverse grid lines along the span, support lines included
    pub num_trans_grid: usize,
    /// Skew angle of the start edge in degrees
    pub skew_start: f64,
    /// Skew angle of the end edge in degrees
    pub skew_end: f64,
    /// Mesh layout
    pub mesh_type: MeshType,
    /// Distance between the edge beam lines and the first/last girder line
    pub edge_beam_dist: Option<f64>,
    /// Custom positions of the transverse grid lines along the span
    pub stations: Option<Vec<f64>>,
    /// Elevation (y) of the deck plane
    pub elevation: f64,
    /// Support condition at the start edge (x = 0)
    pub start_support: EdgeSupport,
    /// Support condition at the end edge (x = span)
    pub end_support: EdgeSupport,
    /// Create transverse members along the two support lines
    pub connect_end_diaphragms: bool,
}

impl Default for GeometryModel {
    fn default() -> Self {
        Self {
            span: 20.0,
            width: 8.0,
            num_long_grid: 4,
            num_trans_grid: 5,
            skew_start: 0.0,
            skew_end: 0.0,
            mesh_type: MeshType::Orthogonal,
            edge_beam_dist: None,
            stations: None,
            elevation: 0.0,
            start_support: EdgeSupport::Pinned,
            end_support: EdgeSupport::Roller,
            connect_end_diaphragms: true,
        }
    }
}

impl GeometryModel {
    /// Create a rectangular deck with the given dimensions and grid counts
    pub fn new(span: f64, width: f64, num_long_grid: usize, num_trans_grid: usize) -> Self {
        Self {
            span,
            width,
            num_long_grid,
            num_trans_grid,
            ..Self::default()
        }
    }

    /// Same skew angle (degrees) at both edges
    pub fn with_skew(mut self, angle: f64) -> Self {
        self.skew_start = angle;
        self.skew_end = angle;
        self
    }

    /// Independent skew angles (degrees) for the start and end edges
    pub fn with_skews(mut self, start: f64, end: f64) -> Self {
        self.skew_start = start;
        self.skew_end = end;
        self
    }

    pub fn with_mesh_type(mut self, mesh_type: MeshType) -> Self {
        self.mesh_type = mesh_type;
        self
    }

    pub fn with_edge_beam_dist(mut self, dist: f64) -> Self {
        self.edge_beam_dist = Some(dist);
        self
    }

    /// Custom transverse line positions; also sets the transverse grid count
    pub fn with_stations(mut self, stations: Vec<f64>) -> Self {
        self.num_trans_grid = stations.len();
        self.stations = Some(stations);
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_supports(mut self, start: EdgeSupport, end: EdgeSupport) -> Self {
        self.start_support = start;
        self.end_support = end;
        self
    }

    pub fn without_end_diaphragms(mut self) -> Self {
        self.connect_end_diaphragms = false;
        self
    }

    /// Check every option before any node is created
    pub fn validate(&self) -> GrillageResult<()> {
        if !self.span.is_finite() || self.span <= 0.0 {
            return Err(GrillageError::InvalidGeometry(format!(
                "span must be positive, got {}",
                self.span
            )));
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(GrillageError::InvalidGeometry(format!(
                "width must be positive, got {}",
                self.width
            )));
        }
        if self.num_long_grid < 2 {
            return Err(GrillageError::InvalidGeometry(format!(
                "at least 2 longitudinal grid lines required, got {}",
                self.num_long_grid
            )));
        }
        if self.num_trans_grid < 2 {
            return Err(GrillageError::InvalidGeometry(format!(
                "at least 2 transverse grid lines required, got {}",
                self.num_trans_grid
            )));
        }
        for (edge, angle) in [("start", self.skew_start), ("end", self.skew_end)] {
            if !angle.is_finite() || angle.abs() >= 90.0 {
                return Err(GrillageError::InvalidGeometry(format!(
                    "{} skew angle must lie strictly between -90 and 90 degrees, got {}",
                    edge, angle
                )));
            }
        }
        if let Some(dist) = self.edge_beam_dist {
            if !(dist > 0.0 && dist < self.width / 2.0) {
                return Err(GrillageError::InvalidGeometry(format!(
                    "edge beam distance must lie in (0, {}), got {}",
                    self.width / 2.0,
                    dist
                )));
            }
            if self.num_long_grid < 4 {
                return Err(GrillageError::InvalidGeometry(
                    "an edge beam distance needs at least 4 longitudinal grid lines".to_string(),
                ));
            }
        }
        if let Some(stations) = &self.stations {
            if stations.len() != self.num_trans_grid {
                return Err(GrillageError::InvalidGeometry(format!(
                    "{} custom stations given for {} transverse grid lines",
                    stations.len(),
                    self.num_trans_grid
                )));
            }
            let tol = 1e-9 * self.span;
            let first = stations.first().copied().unwrap_or(f64::NAN);
            let last = stations.last().copied().unwrap_or(f64::NAN);
            if (first.abs() > tol) || ((last - self.span).abs() > tol) {
                return Err(GrillageError::InvalidGeometry(format!(
                    "custom stations must run from 0 to {}, got {} to {}",
                    self.span, first, last
                )));
            }
            if stations.windows(2).any(|w| !(w[1] - w[0] > tol)) {
                return Err(GrillageError::InvalidGeometry(
                    "custom stations must be strictly increasing".to_string(),
                ));
            }
        }
        if self.mesh_type == MeshType::Skew
            && (self.skew_start.abs() > SKEW_MESH_WARN_ANGLE
                || self.skew_end.abs() > SKEW_MESH_WARN_ANGLE)
        {
            log::warn!(
                "skew mesh used with skew angles {}/{} degrees; cells beyond {} degrees are strongly distorted, consider an orthogonal mesh",
                self.skew_start,
                self.skew_end,
                SKEW_MESH_WARN_ANGLE
            );
        }
        Ok(())
    }

    /// z coordinate of every longitudinal grid line
    pub fn longitudinal_offsets(&self) -> Vec<f64> {
        let n = self.num_long_grid;
        match self.edge_beam_dist {
            Some(dist) => {
                let mut offsets = Vec::with_capacity(n);
                offsets.push(0.0);
                offsets.extend(linspace(dist, self.width - dist, n - 2));
                offsets.push(self.width);
                offsets
            }
            None => linspace(0.0, self.width, n),
        }
    }

    /// Position along the span (at z = 0) of every transverse grid line
    pub fn stations(&self) -> Vec<f64> {
        match &self.stations {
            Some(stations) => stations.clone(),
            None => linspace(0.0, self.span, self.num_trans_grid),
        }
    }

    /// Skew angle (degrees) of the transverse grid line at `station`, row `row`
    pub fn row_skew(&self, row: usize, station: f64) -> f64 {
        let last = self.num_trans_grid - 1;
        match self.mesh_type {
            MeshType::Skew => {
                let t = station / self.span;
                self.skew_start + (self.skew_end - self.skew_start) * t
            }
            MeshType::Orthogonal => {
                if row == 0 {
                    self.skew_start
                } else if row == last {
                    self.skew_end
                } else {
                    0.0
                }
            }
        }
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive
pub(crate) fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![(start + stop) / 2.0],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|k| if k == n - 1 { stop } else { start + step * k as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_geometry_is_valid() {
        assert!(GeometryModel::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        let geometry = GeometryModel::new(0.0, 8.0, 4, 5);
        assert!(matches!(
            geometry.validate(),
            Err(GrillageError::InvalidGeometry(_))
        ));

        let geometry = GeometryModel::new(20.0, -1.0, 4, 5);
        assert!(matches!(
            geometry.validate(),
            Err(GrillageError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_rejects_coarse_grids() {
        assert!(GeometryModel::new(20.0, 8.0, 1, 5).validate().is_err());
        assert!(GeometryModel::new(20.0, 8.0, 4, 1).validate().is_err());
    }

    #[test]
    fn test_edge_beam_offsets() {
        let geometry = GeometryModel::new(20.0, 10.0, 5, 5).with_edge_beam_dist(1.0);
        let offsets = geometry.longitudinal_offsets();
        assert_eq!(offsets.len(), 5);
        assert_relative_eq!(offsets[0], 0.0);
        assert_relative_eq!(offsets[1], 1.0);
        assert_relative_eq!(offsets[2], 5.0);
        assert_relative_eq!(offsets[3], 9.0);
        assert_relative_eq!(offsets[4], 10.0);
    }

    #[test]
    fn test_custom_stations_must_span_the_deck() {
        let geometry = GeometryModel::new(20.0, 8.0, 4, 3).with_stations(vec![0.0, 5.0, 18.0]);
        assert!(geometry.validate().is_err());

        let geometry = GeometryModel::new(20.0, 8.0, 4, 3).with_stations(vec![0.0, 5.0, 20.0]);
        assert!(geometry.validate().is_ok());
        assert_eq!(geometry.stations(), vec![0.0, 5.0, 20.0]);
    }

    #[test]
    fn test_row_skew_by_mesh_type() {
        let geometry = GeometryModel::new(20.0, 8.0, 4, 5).with_skews(10.0, 30.0);
        assert_relative_eq!(geometry.row_skew(0, 0.0), 10.0);
        assert_relative_eq!(geometry.row_skew(2, 10.0), 0.0);
        assert_relative_eq!(geometry.row_skew(4, 20.0), 30.0);

        let skew = geometry.with_mesh_type(MeshType::Skew);
        assert_relative_eq!(skew.row_skew(2, 10.0), 20.0);
    }
}
