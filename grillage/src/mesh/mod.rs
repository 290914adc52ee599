//! Grillage mesh: node arena, elements and the explicit grid index

mod classifier;
mod grid;
mod mesher;

pub use classifier::{GroupAssignment, GroupProperty, MemberClassifier, MemberGroup, PropertyTable};
pub use grid::GridIndex;
pub use mesher::GridMesher;

use crate::elements::{Element, ElementTag, MemberDirection, Node, NodeTag, PropertyRef, Restraint};
use crate::error::{GrillageError, GrillageResult};
use crate::geometry::{GeometryModel, PlanPoint};

/// Parametric snapping tolerance used when locating points in cells
pub(crate) const PARAM_TOL: f64 = 1e-9;

/// Result of locating a plan point in a grid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellHit {
    /// Row of the cell (between transverse lines i and i+1)
    pub i: usize,
    /// Column of the cell (between longitudinal lines j and j+1)
    pub j: usize,
    /// Corner nodes, counter-clockwise from (i, j)
    pub nodes: [NodeTag; 4],
    /// Bilinear shape function values at the point, same order as `nodes`
    pub weights: [f64; 4],
}

/// A generated grillage mesh.
///
/// Node positions, element connectivity and the grid index never change after
/// generation. Restraints and element properties can be attached later.
#[derive(Debug, Clone)]
pub struct Mesh {
    geometry: GeometryModel,
    nodes: Vec<Node>,
    elements: Vec<Element>,
    grid: GridIndex,
    stations: Vec<f64>,
    offsets: Vec<f64>,
    properties: Option<PropertyTable>,
}

impl Mesh {
    pub(crate) fn from_parts(
        geometry: GeometryModel,
        nodes: Vec<Node>,
        elements: Vec<Element>,
        grid: GridIndex,
        stations: Vec<f64>,
        offsets: Vec<f64>,
    ) -> Self {
        Self {
            geometry,
            nodes,
            elements,
            grid,
            stations,
            offsets,
            properties: None,
        }
    }

    pub fn geometry(&self) -> &GeometryModel {
        &self.geometry
    }

    /// Nodes in ascending tag order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Elements in ascending tag order
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    /// Positions of the transverse grid lines along the span at z = 0
    pub fn stations(&self) -> &[f64] {
        &self.stations
    }

    /// z coordinates of the longitudinal grid lines
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn properties(&self) -> Option<&PropertyTable> {
        self.properties.as_ref()
    }

    pub fn node(&self, tag: NodeTag) -> GrillageResult<&Node> {
        tag.checked_sub(1)
            .and_then(|idx| self.nodes.get(idx))
            .filter(|node| node.tag == tag)
            .ok_or(GrillageError::NodeNotFound(tag))
    }

    pub fn element(&self, tag: ElementTag) -> GrillageResult<&Element> {
        tag.checked_sub(1)
            .and_then(|idx| self.elements.get(idx))
            .filter(|element| element.tag == tag)
            .ok_or(GrillageError::ElementNotFound(tag))
    }

    /// Node at grid position (i, j)
    pub fn node_at(&self, i: usize, j: usize) -> Option<&Node> {
        self.grid.get(i, j).and_then(|tag| self.node(tag).ok())
    }

    /// Nodes carrying a restraint, ascending tag
    pub fn support_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|node| node.is_supported())
    }

    /// Number of grid cells
    pub fn cell_count(&self) -> usize {
        (self.grid.rows() - 1) * (self.grid.cols() - 1)
    }

    /// Corner tags of cell (i, j): (i,j), (i+1,j), (i+1,j+1), (i,j+1)
    pub fn cell_nodes(&self, i: usize, j: usize) -> Option<[NodeTag; 4]> {
        Some([
            self.grid.get(i, j)?,
            self.grid.get(i + 1, j)?,
            self.grid.get(i + 1, j + 1)?,
            self.grid.get(i, j + 1)?,
        ])
    }

    /// Plan polygon of cell (i, j), counter-clockwise in (x, z)
    pub fn cell_polygon(&self, i: usize, j: usize) -> Option<[PlanPoint; 4]> {
        let tags = self.cell_nodes(i, j)?;
        let mut polygon = [PlanPoint::default(); 4];
        for (corner, tag) in polygon.iter_mut().zip(tags) {
            *corner = self.node(tag).ok()?.plan();
        }
        Some(polygon)
    }

    /// Locate `p` in the first containing cell, scanning ascending (i, j)
    pub fn find_cell(&self, p: PlanPoint) -> Option<CellHit> {
        if !(p.x.is_finite() && p.z.is_finite()) {
            return None;
        }
        for i in 0..self.grid.rows() - 1 {
            for j in 0..self.grid.cols() - 1 {
                if let Some(hit) = self.locate_in_cell(p, i, j) {
                    return Some(hit);
                }
            }
        }
        None
    }

    /// Locate `p` in cell (i, j) only
    pub fn locate_in_cell(&self, p: PlanPoint, i: usize, j: usize) -> Option<CellHit> {
        let z0 = *self.offsets.get(j)?;
        let z1 = *self.offsets.get(j + 1)?;
        let eta = snap((p.z - z0) / (z1 - z0))?;

        let nodes = self.cell_nodes(i, j)?;
        let [c0, c1, c2, c3] = self.cell_polygon(i, j)?;
        let x_left = c0.x + eta * (c3.x - c0.x);
        let x_right = c1.x + eta * (c2.x - c1.x);
        let xi = snap((p.x - x_left) / (x_right - x_left))?;

        let weights = [
            (1.0 - xi) * (1.0 - eta),
            xi * (1.0 - eta),
            xi * eta,
            (1.0 - xi) * eta,
        ];
        Some(CellHit {
            i,
            j,
            nodes,
            weights,
        })
    }

    /// True when `p` lies on the meshed deck, boundary included
    pub fn contains_point(&self, p: PlanPoint) -> bool {
        self.find_cell(p).is_some()
    }

    /// Add restraints to a node, keeping the DOFs it already restrains
    pub fn set_restraint(&mut self, tag: NodeTag, restraint: Restraint) -> GrillageResult<()> {
        let node = self.node_mut(tag)?;
        let merged = node.restraint.unwrap_or_default().merge(&restraint);
        node.restraint = Some(merged);
        Ok(())
    }

    /// Release the DOFs `restraint` names; the node becomes free when nothing is left
    pub fn remove_restraint(&mut self, tag: NodeTag, restraint: Restraint) -> GrillageResult<()> {
        let node = self.node_mut(tag)?;
        node.restraint = node
            .restraint
            .map(|current| current.release(&restraint))
            .filter(Restraint::is_supported);
        Ok(())
    }

    fn node_mut(&mut self, tag: NodeTag) -> GrillageResult<&mut Node> {
        tag.checked_sub(1)
            .and_then(|idx| self.nodes.get_mut(idx))
            .filter(|node| node.tag == tag)
            .ok_or(GrillageError::NodeNotFound(tag))
    }

    /// Attach material and section to every element whose group is mapped
    pub fn assign_properties(&mut self, table: PropertyTable) -> GrillageResult<()> {
        table.validate()?;

        let mut unmapped = std::collections::BTreeSet::new();
        let mut assigned = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            let mapping = element.group.and_then(|group| {
                let mapping = table.group(group);
                if mapping.is_none() {
                    unmapped.insert(group);
                }
                mapping
            });
            let property = match mapping {
                Some(mapping) => {
                    let section = table.section(&mapping.section)?;
                    let width = if section.unit_width {
                        self.tributary_width(element)?
                    } else {
                        1.0
                    };
                    Some(PropertyRef {
                        material: mapping.material.clone(),
                        section: mapping.section.clone(),
                        width,
                    })
                }
                None => None,
            };
            assigned.push(property);
        }

        for group in &unmapped {
            log::warn!("member group {} has no property mapping; its elements stay unassigned", group);
        }
        for (element, property) in self.elements.iter_mut().zip(assigned) {
            element.property = property;
        }
        self.properties = Some(table);
        Ok(())
    }

    /// Width of deck tributary to an element, measured perpendicular to it
    pub fn tributary_width(&self, element: &Element) -> GrillageResult<f64> {
        let (pi, pj) = self.grid_positions(element)?;
        match element.direction {
            MemberDirection::Longitudinal => {
                let j = pi.1;
                let z = &self.offsets;
                let below = if j > 0 { (z[j] - z[j - 1]) / 2.0 } else { 0.0 };
                let above = if j + 1 < z.len() { (z[j + 1] - z[j]) / 2.0 } else { 0.0 };
                Ok(below + above)
            }
            MemberDirection::Transverse => {
                let i = pi.0;
                let (j0, j1) = (pi.1.min(pj.1), pi.1.max(pj.1));
                let mid_x = |row: usize| -> GrillageResult<f64> {
                    let a = self.node_by_position(row, j0)?;
                    let b = self.node_by_position(row, j1)?;
                    Ok((a.x + b.x) / 2.0)
                };
                let here = mid_x(i)?;
                let before = if i > 0 { (here - mid_x(i - 1)?) / 2.0 } else { 0.0 };
                let after = if i + 1 < self.grid.rows() {
                    (mid_x(i + 1)? - here) / 2.0
                } else {
                    0.0
                };
                let along_z = element.orientation.local_x[2].abs();
                Ok((before + after) * along_z)
            }
        }
    }

    fn grid_positions(&self, element: &Element) -> GrillageResult<((usize, usize), (usize, usize))> {
        let position = |tag: NodeTag| {
            self.grid
                .position_of(tag)
                .ok_or(GrillageError::NodeNotFound(tag))
        };
        Ok((position(element.nodes[0])?, position(element.nodes[1])?))
    }

    fn node_by_position(&self, i: usize, j: usize) -> GrillageResult<&Node> {
        self.node_at(i, j).ok_or_else(|| {
            GrillageError::InvariantViolation(format!("no node at grid position ({}, {})", i, j))
        })
    }
}

/// Clamp a parametric coordinate to [0, 1] within tolerance, `None` when outside
fn snap(t: f64) -> Option<f64> {
    if !t.is_finite() || t < -PARAM_TOL || t > 1.0 + PARAM_TOL {
        None
    } else if t.abs() <= PARAM_TOL {
        Some(0.0)
    } else if (t - 1.0).abs() <= PARAM_TOL {
        Some(1.0)
    } else {
        Some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Material, Section};
    use approx::assert_relative_eq;

    fn unit_mesh() -> Mesh {
        // 3 x 3 nodes at unit spacing
        GridMesher::generate(&GeometryModel::new(2.0, 2.0, 3, 3)).unwrap()
    }

    #[test]
    fn test_find_cell_weights() {
        let mesh = unit_mesh();
        assert_eq!(mesh.cell_count(), 4);
        let hit = mesh.find_cell(PlanPoint::new(1.25, 0.5)).unwrap();
        assert_eq!((hit.i, hit.j), (1, 0));
        assert_relative_eq!(hit.weights.iter().sum::<f64>(), 1.0);
        assert_relative_eq!(hit.weights[0], 0.375);
        assert_relative_eq!(hit.weights[1], 0.125);
    }

    #[test]
    fn test_grid_line_point_uses_lowest_cell() {
        let mesh = unit_mesh();
        // On the shared edge of cells (0, 0) and (1, 0)
        let hit = mesh.find_cell(PlanPoint::new(1.0, 0.5)).unwrap();
        assert_eq!((hit.i, hit.j), (0, 0));
        assert_eq!(hit.weights[0], 0.0);
        assert_eq!(hit.weights[3], 0.0);
        assert_relative_eq!(hit.weights[1], 0.5);
        assert_relative_eq!(hit.weights[2], 0.5);
    }

    #[test]
    fn test_outside_point() {
        let mesh = unit_mesh();
        assert!(!mesh.contains_point(PlanPoint::new(-0.1, 1.0)));
        assert!(!mesh.contains_point(PlanPoint::new(1.0, 2.0 + 1e-6)));
        assert!(mesh.contains_point(PlanPoint::new(2.0, 2.0)));
    }

    #[test]
    fn test_restraint_add_and_remove() {
        let mut mesh = unit_mesh();
        let centre = mesh.grid().get(1, 1).unwrap();
        assert!(!mesh.node(centre).unwrap().is_supported());

        mesh.set_restraint(centre, Restraint::from_vector([0, 1, 0, 0, 0, 0]))
            .unwrap();
        assert!(mesh.node(centre).unwrap().is_supported());

        mesh.remove_restraint(centre, Restraint::from_vector([0, 1, 0, 0, 0, 0]))
            .unwrap();
        assert_eq!(mesh.node(centre).unwrap().restraint, None);

        assert!(matches!(
            mesh.set_restraint(99, Restraint::fixed()),
            Err(GrillageError::NodeNotFound(99))
        ));
    }

    #[test]
    fn test_unit_width_property_assignment() {
        let mut mesh = GridMesher::generate(&GeometryModel::new(10.0, 6.0, 4, 3)).unwrap();
        let table = PropertyTable::new()
            .with_material("concrete", Material::concrete(40e6))
            .with_section("girder", Section::rectangular(0.5, 1.0))
            .with_section("slab", Section::slab(0.2))
            .with_group(MemberGroup::EdgeBeam, "concrete", "girder")
            .with_group(MemberGroup::InteriorBeam, "concrete", "girder")
            .with_group(MemberGroup::TransverseSlab, "concrete", "slab");
        mesh.assign_properties(table).unwrap();

        for element in mesh.elements() {
            match element.group {
                Some(MemberGroup::EndTransverse) => assert!(element.property.is_none()),
                Some(MemberGroup::TransverseSlab) => {
                    // interior row, stations 5 apart
                    let property = element.property.as_ref().unwrap();
                    assert_relative_eq!(property.width, 5.0);
                }
                _ => assert_relative_eq!(element.property.as_ref().unwrap().width, 1.0),
            }
        }
    }

    #[test]
    fn test_tributary_width_of_girder_lines() {
        let mesh = GridMesher::generate(&GeometryModel::new(10.0, 6.0, 4, 3)).unwrap();
        let edge = &mesh.elements()[0];
        assert_relative_eq!(mesh.tributary_width(edge).unwrap(), 1.0);
        let interior = mesh
            .elements()
            .iter()
            .find(|e| e.group == Some(MemberGroup::InteriorBeam))
            .unwrap();
        assert_relative_eq!(mesh.tributary_width(interior).unwrap(), 2.0);
    }
}
