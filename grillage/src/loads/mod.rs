//! Load descriptors, nodal actions, load cases and combinations

mod descriptor;
mod load_case;
mod load_combo;
mod mapper;
mod moving;
mod node_load;

pub use descriptor::{LineLoad, LoadDescriptor, LoadDirection, PatchLoad, PointLoad};
pub use load_case::{LoadCase, LoadPattern};
pub use load_combo::LoadCombination;
pub use mapper::LoadMapper;
pub use moving::{Axle, AxleLoad, LoadPath, MovingLoadCase, PathTraverser, Placement, Traversal};
pub use node_load::{LoadAction, NodeLoad};
