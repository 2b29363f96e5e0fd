//! Row-major `f32` matrices.
//!
//! This is the numeric backend of the crate: just the primitives the pretraining
//! loop needs (products, broadcasting, reductions, random initialisation). Batches
//! are `(batch_size, features)` matrices; weights are `(in_dim, out_dim)`.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::matmul::{View, gemm_f32};
use crate::{Error, Result};

/// Samples beyond this many standard deviations are redrawn.
const TRUNCATION: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from a flat row-major buffer with shape `(rows, cols)`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::InvalidShape("matrix shape overflow".to_owned()))?;
        if data.len() != expected {
            return Err(Error::InvalidShape(format!(
                "buffer length {} does not match rows * cols ({rows} * {cols})",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from per-row vectors (copies into contiguous storage).
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidData(format!(
                    "row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Standard normal samples, redrawn until they fall within two standard deviations.
    pub fn truncated_normal<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let data = (0..rows * cols)
            .map(|_| loop {
                let v: f32 = StandardNormal.sample(rng);
                if v.abs() <= TRUNCATION {
                    break v;
                }
            })
            .collect();
        Self { rows, cols, data }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns the `idx`-th row. Panics if `idx >= rows`.
    #[inline]
    pub fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn rows_iter(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// `self . rhs`, shapes `(m, k) . (k, n) -> (m, n)`.
    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        check_inner("matmul", self.cols, rhs.rows)?;
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        gemm_f32(
            self.rows,
            rhs.cols,
            self.cols,
            View::row_major(&self.data, self.cols),
            View::row_major(&rhs.data, rhs.cols),
            &mut out.data,
        );
        Ok(out)
    }

    /// `self^T . rhs`, shapes `(k, m)^T . (k, n) -> (m, n)`.
    pub fn t_matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        check_inner("t_matmul", self.rows, rhs.rows)?;
        let mut out = Matrix::zeros(self.cols, rhs.cols);
        gemm_f32(
            self.cols,
            rhs.cols,
            self.rows,
            View::transposed(&self.data, self.cols),
            View::row_major(&rhs.data, rhs.cols),
            &mut out.data,
        );
        Ok(out)
    }

    /// `self . rhs^T`, shapes `(m, k) . (n, k)^T -> (m, n)`.
    pub fn matmul_t(&self, rhs: &Matrix) -> Result<Matrix> {
        check_inner("matmul_t", self.cols, rhs.cols)?;
        let mut out = Matrix::zeros(self.rows, rhs.rows);
        gemm_f32(
            self.rows,
            rhs.rows,
            self.cols,
            View::row_major(&self.data, self.cols),
            View::transposed(&rhs.data, rhs.cols),
            &mut out.data,
        );
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Adds `bias` to every row in place.
    pub fn add_row(&mut self, bias: &[f32]) -> Result<()> {
        if bias.len() != self.cols {
            return Err(Error::InvalidShape(format!(
                "bias len {} does not match cols {}",
                bias.len(),
                self.cols
            )));
        }
        for row in self.data.chunks_exact_mut(self.cols.max(1)) {
            for (v, &b) in row.iter_mut().zip(bias) {
                *v += b;
            }
        }
        Ok(())
    }

    /// Elementwise `self - rhs`.
    pub fn sub(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "sub", |a, b| a - b)
    }

    /// Elementwise `self * rhs`.
    pub fn hadamard(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "hadamard", |a, b| a * b)
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Column sums, i.e. a reduction over the batch axis. Length `cols`.
    pub fn sum_rows(&self) -> Vec<f32> {
        let mut out = vec![0.0_f32; self.cols];
        for row in self.data.chunks_exact(self.cols.max(1)) {
            for (acc, &v) in out.iter_mut().zip(row) {
                *acc += v;
            }
        }
        out
    }

    fn zip_with(&self, rhs: &Matrix, op: &str, f: impl Fn(f32, f32) -> f32) -> Result<Matrix> {
        if self.shape() != rhs.shape() {
            return Err(Error::InvalidShape(format!(
                "{op}: shape {:?} does not match {:?}",
                self.shape(),
                rhs.shape()
            )));
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&rhs.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}

#[inline]
fn check_inner(op: &str, lhs: usize, rhs: usize) -> Result<()> {
    if lhs != rhs {
        return Err(Error::InvalidShape(format!(
            "{op}: inner dims differ ({lhs} vs {rhs})"
        )));
    }
    Ok(())
}
