//! Frame element math and linear solvers

pub mod sparse;

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector};

pub use sparse::{solve_pcg, SkylineCholesky, SparseMatrixBuilder};

pub type Mat = DMatrix<f64>;
pub type Vec = DVector<f64>;
pub type Mat3 = Matrix3<f64>;

/// 12x12 matrix for member stiffness
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 12-element vector for member forces/displacements
pub type Vec12 = SVector<f64, 12>;

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Local axes (x, y, z) of a frame member running from `i_node` to `j_node`
///
/// Horizontal members get local y = global Y and z = x cross y. Vertical
/// members get y = -X (pointing up) or +X (pointing down) and z = global Z.
/// Inclined members keep z horizontal. Returns `None` for a zero-length member.
pub fn member_local_axes(
    i_node: &[f64; 3],
    j_node: &[f64; 3],
) -> Option<([f64; 3], [f64; 3], [f64; 3])> {
    let d = [
        j_node[0] - i_node[0],
        j_node[1] - i_node[1],
        j_node[2] - i_node[2],
    ];
    let length = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
    if length < 1e-10 {
        return None;
    }
    let x = [d[0] / length, d[1] / length, d[2] / length];

    let (y, z) = if x[0].abs() < 1e-10 && x[2].abs() < 1e-10 {
        if x[1] > 0.0 {
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0])
        } else {
            ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0])
        }
    } else if d[1].abs() < 1e-10 {
        let y = [0.0, 1.0, 0.0];
        (y, normalize(cross(&x, &y)))
    } else {
        let proj = [d[0], 0.0, d[2]];
        let z = if x[1] > 0.0 {
            normalize(cross(&proj, &x))
        } else {
            normalize(cross(&x, &proj))
        };
        (normalize(cross(&z, &x)), z)
    };

    Some((x, y, z))
}

/// 12x12 transformation matrix from global to local coordinates
///
/// Rows of the 3x3 direction cosine block are the local x, y and z axes.
pub fn transformation_matrix(local_x: &[f64; 3], local_z: &[f64; 3]) -> Mat12 {
    let y = cross(local_z, local_x);
    let r = Mat3::new(
        local_x[0], local_x[1], local_x[2],
        y[0], y[1], y[2],
        local_z[0], local_z[1], local_z[2],
    );

    let mut t = Mat12::zeros();
    for block in 0..4 {
        t.fixed_view_mut::<3, 3>(block * 3, block * 3).copy_from(&r);
    }
    t
}

/// Compute the local stiffness matrix for a 3D frame element
///
/// # Arguments
/// * `e` - Modulus of elasticity
/// * `g` - Shear modulus
/// * `a` - Cross-sectional area
/// * `iy` - Moment of inertia about local y-axis
/// * `iz` - Moment of inertia about local z-axis
/// * `j` - Torsional constant
/// * `length` - Member length
pub fn member_local_stiffness(
    e: f64,
    g: f64,
    a: f64,
    iy: f64,
    iz: f64,
    j: f64,
    length: f64,
) -> Mat12 {
    let l = length;
    let l2 = l * l;
    let l3 = l2 * l;

    let ea_l = e * a / l;
    let gj_l = g * j / l;

    let eiy_l3 = e * iy / l3;
    let eiy_l2 = e * iy / l2;
    let eiy_l = e * iy / l;

    let eiz_l3 = e * iz / l3;
    let eiz_l2 = e * iz / l2;
    let eiz_l = e * iz / l;

    #[rustfmt::skip]
    let data = [
        // axial at i
        ea_l,      0.0,          0.0,           0.0,    0.0,           0.0,          -ea_l,     0.0,          0.0,           0.0,    0.0,           0.0,
        // shear Fy at i
        0.0,       12.0*eiz_l3,  0.0,           0.0,    0.0,           6.0*eiz_l2,   0.0,       -12.0*eiz_l3, 0.0,           0.0,    0.0,           6.0*eiz_l2,
        // shear Fz at i
        0.0,       0.0,          12.0*eiy_l3,   0.0,    -6.0*eiy_l2,   0.0,          0.0,       0.0,          -12.0*eiy_l3,  0.0,    -6.0*eiy_l2,   0.0,
        // torsion at i
        0.0,       0.0,          0.0,           gj_l,   0.0,           0.0,          0.0,       0.0,          0.0,           -gj_l,  0.0,           0.0,
        // My at i
        0.0,       0.0,          -6.0*eiy_l2,   0.0,    4.0*eiy_l,     0.0,          0.0,       0.0,          6.0*eiy_l2,    0.0,    2.0*eiy_l,     0.0,
        // Mz at i
        0.0,       6.0*eiz_l2,   0.0,           0.0,    0.0,           4.0*eiz_l,    0.0,       -6.0*eiz_l2,  0.0,           0.0,    0.0,           2.0*eiz_l,
        // axial at j
        -ea_l,     0.0,          0.0,           0.0,    0.0,           0.0,          ea_l,      0.0,          0.0,           0.0,    0.0,           0.0,
        // shear Fy at j
        0.0,       -12.0*eiz_l3, 0.0,           0.0,    0.0,           -6.0*eiz_l2,  0.0,       12.0*eiz_l3,  0.0,           0.0,    0.0,           -6.0*eiz_l2,
        // shear Fz at j
        0.0,       0.0,          -12.0*eiy_l3,  0.0,    6.0*eiy_l2,    0.0,          0.0,       0.0,          12.0*eiy_l3,   0.0,    6.0*eiy_l2,    0.0,
        // torsion at j
        0.0,       0.0,          0.0,           -gj_l,  0.0,           0.0,          0.0,       0.0,          0.0,           gj_l,   0.0,           0.0,
        // My at j
        0.0,       0.0,          -6.0*eiy_l2,   0.0,    2.0*eiy_l,     0.0,          0.0,       0.0,          6.0*eiy_l2,    0.0,    4.0*eiy_l,     0.0,
        // Mz at j
        0.0,       6.0*eiz_l2,   0.0,           0.0,    0.0,           2.0*eiz_l,    0.0,       -6.0*eiz_l2,  0.0,           0.0,    0.0,           4.0*eiz_l,
    ];

    Mat12::from_row_slice(&data)
}

/// Solve a linear system using LU decomposition
pub fn solve_linear_system(a: &Mat, b: &Vec) -> Option<Vec> {
    a.clone().lu().solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_local_axes_longitudinal() {
        let (x, y, z) = member_local_axes(&[0.0, 0.0, 0.0], &[10.0, 0.0, 0.0]).unwrap();
        assert_eq!(x, [1.0, 0.0, 0.0]);
        assert_eq!(y, [0.0, 1.0, 0.0]);
        assert_relative_eq!(z[2], 1.0);
    }

    #[test]
    fn test_local_axes_vertical() {
        let (_, y, z) = member_local_axes(&[0.0, 0.0, 0.0], &[0.0, 10.0, 0.0]).unwrap();
        assert_eq!(y, [-1.0, 0.0, 0.0]);
        assert_eq!(z, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_transformation_matrix_skewed_member() {
        let (x, _, z) = member_local_axes(&[0.0, 0.0, 0.0], &[3.0, 0.0, 4.0]).unwrap();
        let t = transformation_matrix(&x, &z);

        // Rotation block is orthonormal
        let r = t.fixed_view::<3, 3>(0, 0).into_owned();
        let identity = r * r.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(identity[(i, j)], expected, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(t[(9, 9)], 0.6, epsilon = 1e-12);
        assert_relative_eq!(t[(4, 4)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_local_stiffness_symmetry() {
        let k = member_local_stiffness(200e9, 77e9, 0.01, 1e-4, 2e-4, 1e-5, 10.0);
        for i in 0..12 {
            for j in 0..12 {
                assert_relative_eq!(k[(i, j)], k[(j, i)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_dense_solve() {
        let a = Mat::from_row_slice(3, 3, &[4.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 4.0]);
        let b = Vec::from_vec(vec![1.0, 2.0, 3.0]);
        let x = solve_linear_system(&a, &b).unwrap();
        let residual = &a * &x - &b;
        assert_relative_eq!(residual.norm(), 0.0, epsilon = 1e-12);

        let singular = Mat::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(solve_linear_system(&singular, &Vec::from_vec(vec![1.0, 1.0])).is_none());
    }
}
