//! Masking noise.
//!
//! Each element of the batch is independently kept with probability
//! `1 - fraction` and zeroed otherwise: the batch is multiplied elementwise by a
//! Bernoulli 0/1 mask.

use rand::Rng;

use crate::{Error, Matrix, Result};

/// Checks that `fraction` is a finite value in `[0, 1]`.
pub fn validate_fraction(fraction: f32) -> Result<()> {
    if !(fraction.is_finite() && (0.0..=1.0).contains(&fraction)) {
        return Err(Error::InvalidConfig(format!(
            "corruption fraction must be finite and in [0,1], got {fraction}"
        )));
    }
    Ok(())
}

/// Returns a copy of `batch` with about `fraction` of its elements set to zero.
pub fn corrupt<R: Rng + ?Sized>(batch: &Matrix, fraction: f32, rng: &mut R) -> Result<Matrix> {
    validate_fraction(fraction)?;

    if fraction == 0.0 {
        return Ok(batch.clone());
    }
    if fraction == 1.0 {
        return Ok(Matrix::zeros(batch.rows(), batch.cols()));
    }

    let keep = f64::from(1.0 - fraction);
    let mut mask = Matrix::zeros(batch.rows(), batch.cols());
    for m in mask.as_mut_slice() {
        if rng.random_bool(keep) {
            *m = 1.0;
        }
    }
    batch.hadamard(&mask)
}
