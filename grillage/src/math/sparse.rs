//! Sparse stiffness assembly and solvers
//!
//! Grillage stiffness matrices are banded once DOFs are numbered row by row,
//! so a skyline Cholesky factorisation is the default direct solver.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use super::Mat12;

/// Sparse matrix builder using COO format
pub struct SparseMatrixBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrixBuilder {
    pub fn new(size: usize) -> Self {
        // 6 DOFs per node, up to 5 coupled nodes per node in a grid
        Self {
            size,
            entries: Vec::with_capacity(size * 30),
        }
    }

    /// Add a value to the matrix (accumulates if already exists)
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value.abs() > 1e-15 {
            self.entries.push((row, col, value));
        }
    }

    /// Scatter a 12x12 element matrix; `None` entries are skipped
    pub fn add_element_matrix(&mut self, dofs: &[Option<usize>; 12], k: &Mat12) {
        for (a, da) in dofs.iter().enumerate() {
            let Some(row) = *da else { continue };
            for (b, db) in dofs.iter().enumerate() {
                if let Some(col) = *db {
                    self.add(row, col, k[(a, b)]);
                }
            }
        }
    }

    /// Convert to CSR format; duplicate entries are summed
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CsrMatrix::from(&coo)
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.size, self.size);
        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }
        mat
    }

    /// Number of stored (unsummed) entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// Skyline Cholesky solver for symmetric positive definite matrices
pub struct SkylineCholesky {
    size: usize,
    // Row i holds columns (i - heights[i])..=i of the lower triangle
    skyline: Vec<Vec<f64>>,
    heights: Vec<usize>,
}

impl SkylineCholesky {
    /// Copy the lower triangle of `csr` into skyline storage
    pub fn new(csr: &CsrMatrix<f64>) -> Self {
        let size = csr.nrows();

        let mut heights = vec![0usize; size];
        for (row, col, _) in csr.triplet_iter() {
            if col < row {
                heights[row] = heights[row].max(row - col);
            }
        }

        let mut skyline: Vec<Vec<f64>> = heights.iter().map(|&h| vec![0.0; h + 1]).collect();
        for (row, col, &val) in csr.triplet_iter() {
            if col <= row {
                let start = row - heights[row];
                skyline[row][col - start] += val;
            }
        }

        Self {
            size,
            skyline,
            heights,
        }
    }

    /// Factorize in place into L with A = L L^T
    pub fn factorize(&mut self) -> Result<(), &'static str> {
        for i in 0..self.size {
            let hi = self.heights[i];
            let start_i = i - hi;

            for j in start_i..i {
                let hj = self.heights[j];
                let start = start_i.max(j - hj);

                let mut sum = 0.0;
                for k in start..j {
                    sum += self.get(i, k) * self.get(j, k);
                }

                let diag_j = self.skyline[j][hj];
                if diag_j.abs() < 1e-15 {
                    return Err("zero pivot in Cholesky factorization");
                }

                let idx = j - start_i;
                self.skyline[i][idx] = (self.skyline[i][idx] - sum) / diag_j;
            }

            let sum: f64 = (start_i..i).map(|j| self.get(i, j).powi(2)).sum();
            let diag = self.skyline[i][hi] - sum;
            if !(diag > 0.0) {
                return Err("matrix not positive definite");
            }
            self.skyline[i][hi] = diag.sqrt();
        }

        Ok(())
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        let start = row - self.heights[row];
        if col < start {
            return 0.0;
        }
        self.skyline[row][col - start]
    }

    /// Solve L L^T x = b with a factorized matrix
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut x = b.clone();

        for i in 0..self.size {
            let start = i - self.heights[i];
            let sum: f64 = (start..i).map(|j| self.get(i, j) * x[j]).sum();
            x[i] = (x[i] - sum) / self.get(i, i);
        }

        for i in (0..self.size).rev() {
            x[i] /= self.get(i, i);
            let start = i - self.heights[i];
            for j in start..i {
                x[j] -= self.get(i, j) * x[i];
            }
        }

        x
    }
}

/// Jacobi-preconditioned conjugate gradient
///
/// Converged when `|r| <= tol * |b|`. Returns `None` on breakdown or when
/// `max_iter` iterations do not reach the tolerance.
pub fn solve_pcg(
    csr: &CsrMatrix<f64>,
    b: &DVector<f64>,
    tol: f64,
    max_iter: usize,
) -> Option<DVector<f64>> {
    let n = csr.nrows();
    let b_norm = b.norm();
    let mut x = DVector::zeros(n);
    if b_norm == 0.0 {
        return Some(x);
    }

    let mut diag = DVector::from_element(n, 1.0);
    for (row, col, &val) in csr.triplet_iter() {
        if row == col && val.abs() > 1e-15 {
            diag[row] = val;
        }
    }

    let mut r = b.clone();
    let mut z = r.component_div(&diag);
    let mut p = z.clone();
    let mut r_dot_z = r.dot(&z);

    for _ in 0..max_iter {
        let ap = sparse_matvec(csr, &p);
        let p_dot_ap = p.dot(&ap);
        if p_dot_ap.abs() < 1e-300 {
            return None;
        }

        let alpha = r_dot_z / p_dot_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        if r.norm() <= tol * b_norm {
            return Some(x);
        }

        z = r.component_div(&diag);
        let r_dot_z_new = r.dot(&z);
        let beta = r_dot_z_new / r_dot_z;
        r_dot_z = r_dot_z_new;
        p = &z + beta * &p;
    }

    None
}

/// Sparse matrix-vector multiplication
pub fn sparse_matvec(csr: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let n = csr.nrows();
    let mut y = DVector::zeros(n);

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    for row in 0..n {
        y[row] = (row_offsets[row]..row_offsets[row + 1])
            .map(|idx| values[idx] * x[col_indices[idx]])
            .sum();
    }

    y
}
