//! Member grouping by grid position and group-to-property mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::GridIndex;
use crate::elements::{Element, ElementTag, Material, MemberDirection, Section};
use crate::error::{GrillageError, GrillageResult};

/// Structural role of a grillage member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberGroup {
    /// Longitudinal member on one of the two free edges
    EdgeBeam,
    /// Longitudinal girder line between the edges
    InteriorBeam,
    /// Transverse slab strip between the support lines
    TransverseSlab,
    /// Transverse member on a support line (end diaphragm)
    EndTransverse,
}

impl MemberGroup {
    pub const ALL: [MemberGroup; 4] = [
        MemberGroup::EdgeBeam,
        MemberGroup::InteriorBeam,
        MemberGroup::TransverseSlab,
        MemberGroup::EndTransverse,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MemberGroup::EdgeBeam => "edge_beam",
            MemberGroup::InteriorBeam => "interior_beam",
            MemberGroup::TransverseSlab => "transverse_slab",
            MemberGroup::EndTransverse => "end_transverse",
        }
    }
}

impl fmt::Display for MemberGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Group of every element, keyed by element tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    groups: BTreeMap<ElementTag, MemberGroup>,
}

impl GroupAssignment {
    pub fn get(&self, element: ElementTag) -> Option<MemberGroup> {
        self.groups.get(&element).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementTag, MemberGroup)> + '_ {
        self.groups.iter().map(|(&tag, &group)| (tag, group))
    }

    /// Elements of one group, ascending tag
    pub fn members_of(&self, group: MemberGroup) -> Vec<ElementTag> {
        self.iter()
            .filter(|&(_, g)| g == group)
            .map(|(tag, _)| tag)
            .collect()
    }
}

/// Positional member classifier
pub struct MemberClassifier;

impl MemberClassifier {
    /// Assign exactly one group to every element from the grid position of its nodes
    pub fn classify(grid: &GridIndex, elements: &[Element]) -> GrillageResult<GroupAssignment> {
        let mut groups = BTreeMap::new();
        let last_row = grid.rows() - 1;
        let last_col = grid.cols() - 1;

        for element in elements {
            let [a, b] = element.nodes;
            let (pa, pb) = match (grid.position_of(a), grid.position_of(b)) {
                (Some(pa), Some(pb)) => (pa, pb),
                _ => {
                    return Err(GrillageError::InvariantViolation(format!(
                        "element {} references a node outside the grid",
                        element.tag
                    )))
                }
            };

            let group = if pa.1 == pb.1 && pa.0.abs_diff(pb.0) == 1 {
                if element.direction != MemberDirection::Longitudinal {
                    return Err(direction_mismatch(element));
                }
                if pa.1 == 0 || pa.1 == last_col {
                    MemberGroup::EdgeBeam
                } else {
                    MemberGroup::InteriorBeam
                }
            } else if pa.0 == pb.0 && pa.1.abs_diff(pb.1) == 1 {
                if element.direction != MemberDirection::Transverse {
                    return Err(direction_mismatch(element));
                }
                if pa.0 == 0 || pa.0 == last_row {
                    MemberGroup::EndTransverse
                } else {
                    MemberGroup::TransverseSlab
                }
            } else {
                return Err(GrillageError::InvariantViolation(format!(
                    "element {} connects non-adjacent grid positions {:?} and {:?}",
                    element.tag, pa, pb
                )));
            };

            if groups.insert(element.tag, group).is_some() {
                return Err(GrillageError::InvariantViolation(format!(
                    "element tag {} appears twice",
                    element.tag
                )));
            }
        }

        Ok(GroupAssignment { groups })
    }
}

fn direction_mismatch(element: &Element) -> GrillageError {
    GrillageError::InvariantViolation(format!(
        "element {} is marked {:?} but its nodes say otherwise",
        element.tag, element.direction
    ))
}

/// Material and section names assigned to a member group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupProperty {
    pub material: String,
    pub section: String,
}

/// Named materials and sections plus the member group mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyTable {
    pub materials: BTreeMap<String, Material>,
    pub sections: BTreeMap<String, Section>,
    pub groups: BTreeMap<MemberGroup, GroupProperty>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_material(mut self, name: &str, material: Material) -> Self {
        self.materials.insert(name.to_string(), material);
        self
    }

    pub fn with_section(mut self, name: &str, section: Section) -> Self {
        self.sections.insert(name.to_string(), section);
        self
    }

    /// Map a member group to a named material and section
    pub fn with_group(mut self, group: MemberGroup, material: &str, section: &str) -> Self {
        self.groups.insert(
            group,
            GroupProperty {
                material: material.to_string(),
                section: section.to_string(),
            },
        );
        self
    }

    pub fn material(&self, name: &str) -> GrillageResult<&Material> {
        self.materials
            .get(name)
            .ok_or_else(|| GrillageError::MaterialNotFound(name.to_string()))
    }

    pub fn section(&self, name: &str) -> GrillageResult<&Section> {
        self.sections
            .get(name)
            .ok_or_else(|| GrillageError::SectionNotFound(name.to_string()))
    }

    pub fn group(&self, group: MemberGroup) -> Option<&GroupProperty> {
        self.groups.get(&group)
    }

    /// Every group refers to an existing, physically valid material and section
    pub fn validate(&self) -> GrillageResult<()> {
        for (group, property) in &self.groups {
            let material = self.material(&property.material)?;
            if !material.is_valid() {
                return Err(GrillageError::InvalidInput(format!(
                    "material '{}' of group {} needs positive E and G",
                    property.material, group
                )));
            }
            let section = self.section(&property.section)?;
            if !section.is_valid() {
                return Err(GrillageError::InvalidInput(format!(
                    "section '{}' of group {} needs positive A, Iy, Iz and J",
                    property.section, group
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Orientation;

    fn element(tag: ElementTag, nodes: [usize; 2], direction: MemberDirection) -> Element {
        let orientation = Orientation {
            local_x: [1.0, 0.0, 0.0],
            local_z: [0.0, 0.0, 1.0],
        };
        Element::new(tag, nodes, direction, orientation, 1.0)
    }

    fn grid_3x3() -> GridIndex {
        GridIndex::new(3, 3, (1..=9).collect()).unwrap()
    }

    #[test]
    fn test_positional_groups() {
        let grid = grid_3x3();
        let elements = vec![
            element(1, [1, 4], MemberDirection::Longitudinal),
            element(2, [2, 5], MemberDirection::Longitudinal),
            element(3, [6, 9], MemberDirection::Longitudinal),
            element(4, [1, 2], MemberDirection::Transverse),
            element(5, [4, 5], MemberDirection::Transverse),
            element(6, [8, 9], MemberDirection::Transverse),
        ];
        let groups = MemberClassifier::classify(&grid, &elements).unwrap();
        assert_eq!(groups.get(1), Some(MemberGroup::EdgeBeam));
        assert_eq!(groups.get(2), Some(MemberGroup::InteriorBeam));
        assert_eq!(groups.get(3), Some(MemberGroup::EdgeBeam));
        assert_eq!(groups.get(4), Some(MemberGroup::EndTransverse));
        assert_eq!(groups.get(5), Some(MemberGroup::TransverseSlab));
        assert_eq!(groups.get(6), Some(MemberGroup::EndTransverse));
        assert_eq!(groups.members_of(MemberGroup::EdgeBeam), vec![1, 3]);
    }

    #[test]
    fn test_non_adjacent_element_is_rejected() {
        let grid = grid_3x3();
        let elements = vec![element(1, [1, 9], MemberDirection::Longitudinal)];
        assert!(matches!(
            MemberClassifier::classify(&grid, &elements),
            Err(GrillageError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_direction_must_match_grid() {
        let grid = grid_3x3();
        let elements = vec![element(1, [1, 2], MemberDirection::Longitudinal)];
        assert!(MemberClassifier::classify(&grid, &elements).is_err());
    }

    #[test]
    fn test_property_table_dangling_names() {
        let table = PropertyTable::new()
            .with_material("concrete", Material::concrete(40e6))
            .with_group(MemberGroup::InteriorBeam, "concrete", "girder");
        assert!(matches!(
            table.validate(),
            Err(GrillageError::SectionNotFound(name)) if name == "girder"
        ));

        let table = table.with_section("girder", Section::rectangular(0.5, 1.2));
        assert!(table.validate().is_ok());
    }
}
