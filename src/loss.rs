//! Reconstruction losses.
//!
//! Both losses compare a `target` batch (the uncorrupted input of the layer being
//! trained) with its `reconstruction`. Shapes must match; the batch is a flat
//! row-major buffer with `cols` features per row.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Matrix, Result};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Supported reconstruction losses.
pub enum Loss {
    /// Root mean squared error over every element of the batch.
    #[cfg_attr(feature = "serde", serde(rename = "rmse"))]
    Rmse,
    /// Bernoulli cross-entropy, summed over features and averaged over rows.
    ///
    /// Reconstructions must lie strictly inside `(0, 1)`; anything else yields
    /// `inf`/`NaN`, which is left to propagate.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "cross-entropy"))]
    CrossEntropy,
}

impl Loss {
    pub fn name(self) -> &'static str {
        match self {
            Loss::Rmse => "rmse",
            Loss::CrossEntropy => "cross-entropy",
        }
    }

    /// Compute the loss value.
    pub fn forward(self, target: &Matrix, reconstruction: &Matrix) -> Result<f32> {
        check_shapes(target, reconstruction)?;
        Ok(match self {
            Loss::Rmse => rmse(target.as_slice(), reconstruction.as_slice()),
            Loss::CrossEntropy => cross_entropy(
                target.as_slice(),
                reconstruction.as_slice(),
                target.cols(),
            ),
        })
    }

    /// Compute the loss and its gradient w.r.t. `reconstruction`.
    ///
    /// Returns `(loss, dL/d(reconstruction))`.
    pub fn backward(self, target: &Matrix, reconstruction: &Matrix) -> Result<(f32, Matrix)> {
        check_shapes(target, reconstruction)?;
        match self {
            Loss::Rmse => {
                // With L = sqrt(mean(d^2)) and d = recon - target, dL/d(recon) = d / (N * L).
                // At L == 0 the gradient is taken as zero.
                let diff = reconstruction.sub(target)?;
                let loss = rmse(target.as_slice(), reconstruction.as_slice());
                let scale = if loss == 0.0 {
                    0.0
                } else {
                    1.0 / (diff.as_slice().len() as f32 * loss)
                };
                Ok((loss, diff.map(|d| d * scale)))
            }
            Loss::CrossEntropy => {
                let mut grad = Matrix::zeros(target.rows(), target.cols());
                let loss = cross_entropy_backward(
                    target.as_slice(),
                    reconstruction.as_slice(),
                    target.cols(),
                    grad.as_mut_slice(),
                );
                Ok((loss, grad))
            }
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rmse" => Ok(Loss::Rmse),
            "cross-entropy" => Ok(Loss::CrossEntropy),
            other => Err(Error::InvalidConfig(format!(
                "unknown loss {other:?}; expected one of rmse, cross-entropy"
            ))),
        }
    }
}

fn check_shapes(target: &Matrix, reconstruction: &Matrix) -> Result<()> {
    if target.shape() != reconstruction.shape() {
        return Err(Error::InvalidShape(format!(
            "target shape {:?} does not match reconstruction shape {:?}",
            target.shape(),
            reconstruction.shape()
        )));
    }
    Ok(())
}

/// Root mean squared error: `sqrt(mean((target - recon)^2))`.
#[inline]
pub fn rmse(target: &[f32], recon: &[f32]) -> f32 {
    assert_eq!(
        target.len(),
        recon.len(),
        "target len {} does not match reconstruction len {}",
        target.len(),
        recon.len()
    );
    if target.is_empty() {
        return 0.0;
    }

    let mut sum_sq = 0.0_f32;
    for (&t, &r) in target.iter().zip(recon) {
        let diff = t - r;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    (sum_sq / target.len() as f32).sqrt()
}

/// Cross-entropy: mean over rows of `-sum_j [t ln r + (1 - t) ln(1 - r)]`.
///
/// `cols` is the number of features per row.
#[inline]
pub fn cross_entropy(target: &[f32], recon: &[f32], cols: usize) -> f32 {
    assert_eq!(
        target.len(),
        recon.len(),
        "target len {} does not match reconstruction len {}",
        target.len(),
        recon.len()
    );
    if target.is_empty() || cols == 0 {
        return 0.0;
    }

    let rows = target.len() / cols;
    let mut sum = 0.0_f32;
    for (&t, &r) in target.iter().zip(recon) {
        sum -= t * r.ln() + (1.0 - t) * (1.0 - r).ln();
    }
    sum / rows as f32
}

/// Cross-entropy + gradient w.r.t. `recon`.
///
/// `dL/d(recon_i) = ((1 - t) / (1 - r) - t / r) / rows`.
#[inline]
pub fn cross_entropy_backward(target: &[f32], recon: &[f32], cols: usize, d_recon: &mut [f32]) -> f32 {
    assert_eq!(target.len(), recon.len());
    assert_eq!(target.len(), d_recon.len());
    if target.is_empty() || cols == 0 {
        return 0.0;
    }

    let inv_rows = cols as f32 / target.len() as f32;
    for ((g, &t), &r) in d_recon.iter_mut().zip(target).zip(recon) {
        *g = ((1.0 - t) / (1.0 - r) - t / r) * inv_rows;
    }
    cross_entropy(target, recon, cols)
}
