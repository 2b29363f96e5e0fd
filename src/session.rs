//! One layer's denoising training session.
//!
//! A session owns the parameters being learned at a single depth:
//!
//! - encode weights `W`, shape `(in_dim, out_dim)`
//! - encode bias `b`, length `out_dim`
//! - decode bias `c`, length `in_dim`
//!
//! The decoder is tied: it reuses `W^T` instead of owning separate weights.
//!
//! ```text
//! encoded = act(corrupted . W + b)
//! decoded = encoded . W^T + c
//! loss    = loss(latent, decoded)
//! ```
//!
//! The Adam moments live in the session too, so dropping it after the encode
//! parameters are copied out leaves nothing behind for the next depth.

use rand::Rng;

use crate::layer::activate;
use crate::optim::{Adam, AdamState};
use crate::{Activation, Error, Loss, Matrix, Result};

/// Gradients of the loss w.r.t. the session parameters.
#[derive(Debug, Clone)]
pub(crate) struct Gradients {
    pub d_weights: Matrix,
    pub d_enc_bias: Vec<f32>,
    pub d_dec_bias: Vec<f32>,
}

#[derive(Debug, Clone)]
pub(crate) struct Session {
    activation: Activation,
    loss: Loss,
    weights: Matrix,
    enc_bias: Vec<f32>,
    dec_bias: Vec<f32>,
    opt: AdamState,
}

impl Session {
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        loss: Loss,
        adam: Adam,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = Matrix::truncated_normal(in_dim, out_dim, rng);
        let enc_bias = Matrix::truncated_normal(1, out_dim, rng).into_vec();
        let dec_bias = Matrix::truncated_normal(1, in_dim, rng).into_vec();
        let opt = adam.state(&[in_dim * out_dim, out_dim, in_dim])?;

        Ok(Self {
            activation,
            loss,
            weights,
            enc_bias,
            dec_bias,
            opt,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.weights.rows()
    }

    /// Minimizer steps applied so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.opt.steps()
    }

    /// Returns `(encoded, decoded)` for an already-corrupted batch.
    pub fn forward(&self, corrupted: &Matrix) -> Result<(Matrix, Matrix)> {
        let mut encoded = corrupted.matmul(&self.weights)?;
        encoded.add_row(&self.enc_bias)?;
        activate(self.activation, &mut encoded);

        let mut decoded = encoded.matmul_t(&self.weights)?;
        decoded.add_row(&self.dec_bias)?;
        Ok((encoded, decoded))
    }

    /// Reconstruction loss of `latent` from `corrupted`.
    pub fn loss(&self, latent: &Matrix, corrupted: &Matrix) -> Result<f32> {
        let (_, decoded) = self.forward(corrupted)?;
        self.loss.forward(latent, &decoded)
    }

    /// Loss and parameter gradients for one batch.
    ///
    /// `latent` is the clean target; `corrupted` is what the encoder sees.
    pub fn gradients(&self, latent: &Matrix, corrupted: &Matrix) -> Result<(f32, Gradients)> {
        let (encoded, decoded) = self.forward(corrupted)?;
        let (loss, d_decoded) = self.loss.backward(latent, &decoded)?;

        // Decoder side: decoded = encoded . W^T + c.
        let d_dec_bias = d_decoded.sum_rows();
        let d_w_decode = d_decoded.t_matmul(&encoded)?;
        let mut d_encoded = d_decoded.matmul(&self.weights)?;

        // Encoder side: encoded = act(corrupted . W + b).
        let cols = d_encoded.cols();
        for (d, y) in d_encoded
            .as_mut_slice()
            .chunks_exact_mut(cols)
            .zip(encoded.as_slice().chunks_exact(cols))
        {
            self.activation.backward_row(y, d);
        }
        let d_enc_bias = d_encoded.sum_rows();
        let mut d_weights = corrupted.t_matmul(&d_encoded)?;

        // Tied weights: both uses of W contribute.
        for (g, &extra) in d_weights.as_mut_slice().iter_mut().zip(d_w_decode.as_slice()) {
            *g += extra;
        }

        Ok((
            loss,
            Gradients {
                d_weights,
                d_enc_bias,
                d_dec_bias,
            },
        ))
    }

    /// Apply one Adam step on the reconstruction of `latent` from `corrupted`.
    ///
    /// Returns the loss measured before the update.
    pub fn step(&mut self, latent: &Matrix, corrupted: &Matrix) -> Result<f32> {
        if latent.cols() != self.in_dim() {
            return Err(Error::InvalidShape(format!(
                "latent width {} does not match session in_dim {}",
                latent.cols(),
                self.in_dim()
            )));
        }
        if corrupted.shape() != latent.shape() {
            return Err(Error::InvalidShape(format!(
                "corrupted shape {:?} does not match latent shape {:?}",
                corrupted.shape(),
                latent.shape()
            )));
        }
        let (loss, grads) = self.gradients(latent, corrupted)?;

        self.opt.step(
            &mut [
                self.weights.as_mut_slice(),
                &mut self.enc_bias[..],
                &mut self.dec_bias[..],
            ],
            &[
                grads.d_weights.as_slice(),
                &grads.d_enc_bias[..],
                &grads.d_dec_bias[..],
            ],
        );
        log::trace!("step {}: loss={loss}", self.opt.steps());
        Ok(loss)
    }

    /// Consume the session, keeping only the encode weights and bias.
    pub fn into_encoder(self) -> (Matrix, Vec<f32>) {
        (self.weights, self.enc_bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session(activation: Activation, loss: Loss, seed: u64) -> Session {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut s = Session::new(3, 2, activation, loss, Adam::new(1e-2), &mut rng).unwrap();
        // Keep initial values small so sigmoid/cross-entropy stay well inside (0, 1).
        for v in s.weights.as_mut_slice() {
            *v *= 0.1;
        }
        s
    }

    fn assert_close(analytic: f32, numeric: f32) {
        let diff = (analytic - numeric).abs();
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            diff <= 2e-3 || diff / scale <= 2e-2,
            "analytic={analytic} numeric={numeric} diff={diff}"
        );
    }

    #[test]
    fn tied_gradients_match_finite_differences() {
        let latent = Matrix::from_vec(2, 3, vec![0.2, 0.7, 0.4, 0.9, 0.1, 0.5]).unwrap();
        let eps = 1e-3_f32;

        for (activation, loss) in [
            (Activation::Sigmoid, Loss::Rmse),
            (Activation::Tanh, Loss::Rmse),
            (Activation::Softmax, Loss::Rmse),
        ] {
            let mut s = session(activation, loss, 1);
            let (_, grads) = s.gradients(&latent, &latent).unwrap();

            for p in 0..s.weights.as_slice().len() {
                let orig = s.weights.as_slice()[p];
                s.weights.as_mut_slice()[p] = orig + eps;
                let plus = s.loss(&latent, &latent).unwrap();
                s.weights.as_mut_slice()[p] = orig - eps;
                let minus = s.loss(&latent, &latent).unwrap();
                s.weights.as_mut_slice()[p] = orig;
                assert_close(grads.d_weights.as_slice()[p], (plus - minus) / (2.0 * eps));
            }

            for p in 0..s.enc_bias.len() {
                let orig = s.enc_bias[p];
                s.enc_bias[p] = orig + eps;
                let plus = s.loss(&latent, &latent).unwrap();
                s.enc_bias[p] = orig - eps;
                let minus = s.loss(&latent, &latent).unwrap();
                s.enc_bias[p] = orig;
                assert_close(grads.d_enc_bias[p], (plus - minus) / (2.0 * eps));
            }

            for p in 0..s.dec_bias.len() {
                let orig = s.dec_bias[p];
                s.dec_bias[p] = orig + eps;
                let plus = s.loss(&latent, &latent).unwrap();
                s.dec_bias[p] = orig - eps;
                let minus = s.loss(&latent, &latent).unwrap();
                s.dec_bias[p] = orig;
                assert_close(grads.d_dec_bias[p], (plus - minus) / (2.0 * eps));
            }
        }
    }

    #[test]
    fn loss_targets_the_clean_input() {
        let s = session(Activation::Sigmoid, Loss::Rmse, 2);
        let latent = Matrix::from_vec(1, 3, vec![0.5, 0.5, 0.5]).unwrap();
        let corrupted = Matrix::zeros(1, 3);

        let (_, decoded) = s.forward(&corrupted).unwrap();
        let expected = Loss::Rmse.forward(&latent, &decoded).unwrap();
        assert_eq!(s.loss(&latent, &corrupted).unwrap(), expected);
    }

    #[test]
    fn training_reduces_reconstruction_error() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut s =
            Session::new(3, 2, Activation::Tanh, Loss::Rmse, Adam::new(1e-2), &mut rng).unwrap();
        let latent = Matrix::from_vec(
            4,
            3,
            vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.2, 0.4, 0.6],
        )
        .unwrap();

        let first = s.step(&latent, &latent).unwrap();
        let mut last = first;
        for _ in 0..500 {
            last = s.step(&latent, &latent).unwrap();
        }
        assert!(last < first, "first={first} last={last}");
        assert_eq!(s.steps(), 501);
    }

    #[test]
    fn step_rejects_wrong_width() {
        let mut s = session(Activation::ReLU, Loss::Rmse, 0);
        let wide = Matrix::zeros(2, 4);
        assert!(s.step(&wide, &wide).is_err());
        assert!(s.step(&Matrix::zeros(2, 3), &Matrix::zeros(1, 3)).is_err());
        assert_eq!(s.steps(), 0);
    }

    #[test]
    fn loss_after_a_step_reflects_the_update() {
        let mut s = session(Activation::Sigmoid, Loss::Rmse, 4);
        let latent = Matrix::from_vec(2, 3, vec![0.9, 0.1, 0.8, 0.2, 0.7, 0.3]).unwrap();
        let corrupted = Matrix::from_vec(2, 3, vec![0.9, 0.0, 0.8, 0.0, 0.7, 0.3]).unwrap();

        let before = s.loss(&latent, &corrupted).unwrap();
        let returned = s.step(&latent, &corrupted).unwrap();
        let after = s.loss(&latent, &corrupted).unwrap();

        assert_eq!(returned, before);
        assert!(after < before, "before={before} after={after}");
    }

    #[test]
    fn into_encoder_keeps_encode_parameters_only() {
        let s = session(Activation::ReLU, Loss::CrossEntropy, 5);
        let expected = s.weights.clone();
        let (w, b) = s.into_encoder();
        assert_eq!(w, expected);
        assert_eq!(w.shape(), (3, 2));
        assert_eq!(b.len(), 2);
    }
}
