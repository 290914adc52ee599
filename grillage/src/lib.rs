//! Grillage - bridge deck modelling with beam grillages
//!
//! This library turns a deck description into a grid of longitudinal and
//! transverse beam members and analyses it through a pluggable solver:
//! - Orthogonal and skew meshes with member classification
//! - Point, line and patch loads mapped to statically equivalent nodal actions
//! - Moving vehicles stepped along a path
//! - Step-by-step analysis with a bundled linear frame solver
//! - Keyed results with envelopes, combinations and JSON export
//!
//! ## Example
//! ```rust
//! use grillage::prelude::*;
//!
//! // 20 m x 8 m deck, 4 girder lines, 5 transverse lines
//! let mut mesh = GridMesher::generate(&GeometryModel::new(20.0, 8.0, 4, 5)).unwrap();
//!
//! let properties = PropertyTable::new()
//!     .with_material("concrete", Material::concrete(40e6))
//!     .with_section("girder", Section::rectangular(0.5, 1.2))
//!     .with_section("slab", Section::slab(0.25))
//!     .with_group(MemberGroup::EdgeBeam, "concrete", "girder")
//!     .with_group(MemberGroup::InteriorBeam, "concrete", "girder")
//!     .with_group(MemberGroup::TransverseSlab, "concrete", "slab")
//!     .with_group(MemberGroup::EndTransverse, "concrete", "slab");
//! mesh.assign_properties(properties).unwrap();
//!
//! let dead = LoadCase::new("dead")
//!     .with_load(PatchLoad::rectangle(0.0, 0.0, 20.0, 8.0, -5.0, LoadDirection::FY));
//!
//! let mut orchestrator = AnalysisOrchestrator::new(&mesh, LinearSolver::default());
//! orchestrator.run_static(&dead).unwrap();
//!
//! let results = orchestrator.compile().unwrap();
//! let centre = mesh.node_at(2, 1).unwrap().tag;
//! let deflection = results.node_displacement("dead", None, centre).unwrap();
//! assert!(deflection.dy < 0.0);
//! ```

pub mod analysis;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod loads;
pub mod math;
pub mod mesh;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{
        AnalysisOptions, AnalysisOrchestrator, LinearBackend, LinearSolver, Solver, SolverError,
    };
    pub use crate::elements::{Material, Node, Restraint, Section};
    pub use crate::error::{GrillageError, GrillageResult};
    pub use crate::geometry::{EdgeSupport, GeometryModel, MeshType, PlanPoint};
    pub use crate::loads::{
        Axle, LineLoad, LoadCase, LoadCombination, LoadDescriptor, LoadDirection, LoadMapper,
        LoadPath, MovingLoadCase, PatchLoad, PathTraverser, PointLoad,
    };
    pub use crate::mesh::{GridMesher, MemberGroup, Mesh, PropertyTable};
    pub use crate::results::{
        Dof, Entity, Extremum, MemberEnd, MemberForces, NodeDisplacement, Quantity, ResultSet,
    };
}
