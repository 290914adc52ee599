//! Structured grid generation

use super::{GridIndex, MemberClassifier, Mesh};
use crate::elements::{Element, MemberDirection, Node, NodeTag, Orientation};
use crate::error::{GrillageError, GrillageResult};
use crate::geometry::GeometryModel;

/// Builds a grillage mesh from a validated geometry
pub struct GridMesher;

impl GridMesher {
    /// Generate nodes, elements and the grid index for `geometry`.
    ///
    /// Node (i, j) sits at `x = s_i + z_j tan(theta_i)`, `z = z_j` where `s_i` is
    /// the station of transverse line i and `z_j` the offset of longitudinal line j.
    pub fn generate(geometry: &GeometryModel) -> GrillageResult<Mesh> {
        geometry.validate()?;

        let stations = geometry.stations();
        let offsets = geometry.longitudinal_offsets();
        let rows = stations.len();
        let cols = offsets.len();

        let mut nodes = Vec::with_capacity(rows * cols);
        for (i, &station) in stations.iter().enumerate() {
            let tan = geometry.row_skew(i, station).to_radians().tan();
            for (j, &z) in offsets.iter().enumerate() {
                let tag = i * cols + j + 1;
                let mut node = Node::new(tag, station + z * tan, geometry.elevation, z);
                node.restraint = Self::edge_restraint(geometry, i, j, rows, cols);
                nodes.push(node);
            }
        }

        for j in 0..cols {
            for i in 0..rows - 1 {
                let x0 = nodes[i * cols + j].x;
                let x1 = nodes[(i + 1) * cols + j].x;
                if x1 - x0 <= 1e-9 * geometry.span {
                    return Err(GrillageError::InvalidGeometry(format!(
                        "transverse grid lines {} and {} cross on longitudinal line {} (x = {:.4} and {:.4}); reduce the skew or use fewer transverse lines",
                        i,
                        i + 1,
                        j,
                        x0,
                        x1
                    )));
                }
            }
        }

        let grid = GridIndex::new(rows, cols, nodes.iter().map(|n| n.tag).collect())?;

        let mut connectivity: Vec<([NodeTag; 2], MemberDirection)> = Vec::new();
        for j in 0..cols {
            for i in 0..rows - 1 {
                connectivity.push((
                    [i * cols + j + 1, (i + 1) * cols + j + 1],
                    MemberDirection::Longitudinal,
                ));
            }
        }
        for i in 0..rows {
            let end_row = i == 0 || i == rows - 1;
            if end_row && !geometry.connect_end_diaphragms {
                continue;
            }
            for j in 0..cols - 1 {
                connectivity.push(([i * cols + j + 1, i * cols + j + 2], MemberDirection::Transverse));
            }
        }

        let mut elements = Vec::with_capacity(connectivity.len());
        for (k, (pair, direction)) in connectivity.into_iter().enumerate() {
            let a = &nodes[pair[0] - 1];
            let b = &nodes[pair[1] - 1];
            let orientation = Orientation::between(&a.coords(), &b.coords()).ok_or_else(|| {
                GrillageError::InvalidGeometry(format!(
                    "nodes {} and {} coincide",
                    pair[0], pair[1]
                ))
            })?;
            elements.push(Element::new(k + 1, pair, direction, orientation, a.distance_to(b)));
        }

        let groups = MemberClassifier::classify(&grid, &elements)?;
        for element in &mut elements {
            element.group = groups.get(element.tag);
        }

        log::info!(
            "generated grillage mesh: {} nodes, {} elements ({}x{} grid, {:?} mesh, skew {}/{} deg)",
            nodes.len(),
            elements.len(),
            rows,
            cols,
            geometry.mesh_type,
            geometry.skew_start,
            geometry.skew_end
        );

        Ok(Mesh::from_parts(
            geometry.clone(),
            nodes,
            elements,
            grid,
            stations,
            offsets,
        ))
    }

    fn edge_restraint(
        geometry: &GeometryModel,
        i: usize,
        j: usize,
        rows: usize,
        cols: usize,
    ) -> Option<crate::elements::Restraint> {
        let edge_beam_column = geometry.edge_beam_dist.is_some() && (j == 0 || j == cols - 1);
        if edge_beam_column {
            return None;
        }
        if i == 0 {
            geometry.start_support.restraint()
        } else if i == rows - 1 {
            geometry.end_support.restraint()
        } else {
            None
        }
    }
}
