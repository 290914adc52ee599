//! Grillage beam element

use serde::{Deserialize, Serialize};

use super::{ElementTag, NodeTag};
use crate::math::member_local_axes;
use crate::mesh::MemberGroup;

/// Grid direction an element runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberDirection {
    /// Along the span, between rows i and i+1 of one grid column
    Longitudinal,
    /// Across the deck, between columns j and j+1 of one grid row
    Transverse,
}

/// Local axes of an element.
///
/// `local_z` is the vector that fixes the section orientation (horizontal and
/// perpendicular to the member for a flat deck); local y is `local_z x local_x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub local_x: [f64; 3],
    pub local_z: [f64; 3],
}

impl Orientation {
    /// Orientation of a member running from `i` to `j`, `None` for zero length
    pub fn between(i: &[f64; 3], j: &[f64; 3]) -> Option<Self> {
        let (x, _, z) = member_local_axes(i, j)?;
        Some(Self {
            local_x: x,
            local_z: z,
        })
    }

    pub fn local_y(&self) -> [f64; 3] {
        let z = self.local_z;
        let x = self.local_x;
        [
            z[1] * x[2] - z[2] * x[1],
            z[2] * x[0] - z[0] * x[2],
            z[0] * x[1] - z[1] * x[0],
        ]
    }
}

/// Material and section attached to an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRef {
    /// Name of the material
    pub material: String,
    /// Name of the section
    pub section: String,
    /// Width the section properties are scaled by (1 unless the section is per unit width)
    pub width: f64,
}

/// A two-node grillage beam element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique tag
    pub tag: ElementTag,
    /// i-node and j-node tags
    pub nodes: [NodeTag; 2],
    pub direction: MemberDirection,
    /// Member group, set by the classifier during mesh generation
    pub group: Option<MemberGroup>,
    pub orientation: Orientation,
    /// Section and material, attached after generation
    pub property: Option<PropertyRef>,
    /// Distance between the end nodes
    pub length: f64,
}

impl Element {
    pub fn new(
        tag: ElementTag,
        nodes: [NodeTag; 2],
        direction: MemberDirection,
        orientation: Orientation,
        length: f64,
    ) -> Self {
        Self {
            tag,
            nodes,
            direction,
            group: None,
            orientation,
            property: None,
            length,
        }
    }

    pub fn i_node(&self) -> NodeTag {
        self.nodes[0]
    }

    pub fn j_node(&self) -> NodeTag {
        self.nodes[1]
    }

    /// True when the element connects to `node`
    pub fn connects(&self, node: NodeTag) -> bool {
        self.nodes.contains(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_longitudinal_orientation() {
        let o = Orientation::between(&[0.0, 0.0, 0.0], &[5.0, 0.0, 0.0]).unwrap();
        assert_eq!(o.local_x, [1.0, 0.0, 0.0]);
        assert_relative_eq!(o.local_z[2], 1.0);
        let y = o.local_y();
        assert_relative_eq!(y[1], 1.0);
    }

    #[test]
    fn test_transverse_orientation_points_back_along_span() {
        let o = Orientation::between(&[0.0, 0.0, 0.0], &[0.0, 0.0, 2.0]).unwrap();
        assert_relative_eq!(o.local_z[0], -1.0);
        assert_relative_eq!(o.local_z[2], 0.0);
    }

    #[test]
    fn test_zero_length_has_no_orientation() {
        assert!(Orientation::between(&[1.0, 0.0, 1.0], &[1.0, 0.0, 1.0]).is_none());
    }

    #[test]
    fn test_element_creation() {
        let o = Orientation::between(&[0.0, 0.0, 0.0], &[5.0, 0.0, 0.0]).unwrap();
        let element = Element::new(1, [1, 5], MemberDirection::Longitudinal, o, 5.0);
        assert_eq!(element.i_node(), 1);
        assert_eq!(element.j_node(), 5);
        assert!(element.connects(5));
        assert!(element.group.is_none());
        assert!(element.property.is_none());
    }
}
