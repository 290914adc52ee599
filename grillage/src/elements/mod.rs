//! Grillage elements: nodes, beam elements, restraints, materials and sections

mod material;
mod member;
mod node;
mod section;
mod support;

pub use material::Material;
pub use member::{Element, MemberDirection, Orientation, PropertyRef};
pub use node::Node;
pub use section::Section;
pub use support::Restraint;

/// Node identity, 1-based and unique within a mesh
pub type NodeTag = usize;

/// Element identity, 1-based and unique within a mesh
pub type ElementTag = usize;
