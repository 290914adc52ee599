//! Loads positioned on the deck plane

use serde::{Deserialize, Serialize};

use crate::geometry::PlanPoint;

/// Global direction of a load component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadDirection {
    /// Force in global X direction (along the span)
    FX,
    /// Force in global Y direction (vertical)
    FY,
    /// Force in global Z direction (across the deck)
    FZ,
    /// Moment about global X
    MX,
    /// Moment about global Y
    MY,
    /// Moment about global Z
    MZ,
}

impl LoadDirection {
    /// Position in a `[FX, FY, FZ, MX, MY, MZ]` array
    pub fn index(&self) -> usize {
        match self {
            LoadDirection::FX => 0,
            LoadDirection::FY => 1,
            LoadDirection::FZ => 2,
            LoadDirection::MX => 3,
            LoadDirection::MY => 4,
            LoadDirection::MZ => 5,
        }
    }
}

impl Default for LoadDirection {
    fn default() -> Self {
        Self::FY
    }
}

/// A concentrated load at a plan position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLoad {
    pub position: PlanPoint,
    /// Signed magnitude along `direction`
    pub magnitude: f64,
    #[serde(default)]
    pub direction: LoadDirection,
}

impl PointLoad {
    pub fn new(x: f64, z: f64, magnitude: f64, direction: LoadDirection) -> Self {
        Self {
            position: PlanPoint::new(x, z),
            magnitude,
            direction,
        }
    }

    /// Create a downward (negative Y) point load
    pub fn downward(x: f64, z: f64, magnitude: f64) -> Self {
        Self::new(x, z, -magnitude.abs(), LoadDirection::FY)
    }

    /// Scale the load by a factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            magnitude: self.magnitude * factor,
            ..self.clone()
        }
    }
}

/// A line load between two plan points with linearly varying intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLoad {
    pub start: PlanPoint,
    pub end: PlanPoint,
    /// Intensity (force per unit length) at `start`
    pub start_intensity: f64,
    /// Intensity at `end`
    pub end_intensity: f64,
    #[serde(default)]
    pub direction: LoadDirection,
}

impl LineLoad {
    pub fn new(
        start: PlanPoint,
        end: PlanPoint,
        start_intensity: f64,
        end_intensity: f64,
        direction: LoadDirection,
    ) -> Self {
        Self {
            start,
            end,
            start_intensity,
            end_intensity,
            direction,
        }
    }

    /// Constant intensity along the line
    pub fn uniform(start: PlanPoint, end: PlanPoint, intensity: f64, direction: LoadDirection) -> Self {
        Self::new(start, end, intensity, intensity, direction)
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Resultant of the line load
    pub fn total(&self) -> f64 {
        self.length() * (self.start_intensity + self.end_intensity) / 2.0
    }
}

/// A uniform pressure over a plan polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchLoad {
    /// Polygon vertices in order (either winding)
    pub vertices: Vec<PlanPoint>,
    /// Force per unit area
    pub intensity: f64,
    #[serde(default)]
    pub direction: LoadDirection,
}

impl PatchLoad {
    pub fn new(vertices: Vec<PlanPoint>, intensity: f64, direction: LoadDirection) -> Self {
        Self {
            vertices,
            intensity,
            direction,
        }
    }

    /// Axis-aligned rectangle from `(x0, z0)` to `(x1, z1)`
    pub fn rectangle(x0: f64, z0: f64, x1: f64, z1: f64, intensity: f64, direction: LoadDirection) -> Self {
        Self::new(
            vec![
                PlanPoint::new(x0, z0),
                PlanPoint::new(x1, z0),
                PlanPoint::new(x1, z1),
                PlanPoint::new(x0, z1),
            ],
            intensity,
            direction,
        )
    }
}

/// Any load that can be mapped onto the grillage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadDescriptor {
    Point(PointLoad),
    Line(LineLoad),
    Patch(PatchLoad),
    /// Several loads applied together
    Compound(Vec<LoadDescriptor>),
}

impl From<PointLoad> for LoadDescriptor {
    fn from(load: PointLoad) -> Self {
        Self::Point(load)
    }
}

impl From<LineLoad> for LoadDescriptor {
    fn from(load: LineLoad) -> Self {
        Self::Line(load)
    }
}

impl From<PatchLoad> for LoadDescriptor {
    fn from(load: PatchLoad) -> Self {
        Self::Patch(load)
    }
}

impl From<Vec<LoadDescriptor>> for LoadDescriptor {
    fn from(loads: Vec<LoadDescriptor>) -> Self {
        Self::Compound(loads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_index() {
        assert_eq!(LoadDirection::FX.index(), 0);
        assert_eq!(LoadDirection::FY.index(), 1);
        assert_eq!(LoadDirection::MZ.index(), 5);
    }

    #[test]
    fn test_line_load_total() {
        let line = LineLoad::new(
            PlanPoint::new(0.0, 0.0),
            PlanPoint::new(4.0, 0.0),
            1.0,
            3.0,
            LoadDirection::FY,
        );
        assert!((line.total() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_descriptor_deserializes_from_json() {
        let json = r#"{"Point": {"position": {"x": 1.0, "z": 2.0}, "magnitude": -5.0}}"#;
        let load: LoadDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(load, LoadDescriptor::Point(PointLoad::new(1.0, 2.0, -5.0, LoadDirection::FY)));
    }
}
