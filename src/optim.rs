//! Adam.
//!
//! The only optimizer the pretraining loop uses. Hyperparameters live in [`Adam`];
//! the moment estimates live in [`AdamState`], which is allocated per training
//! session and dropped with it.

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Adam hyperparameters (bias-corrected).
pub struct Adam {
    pub lr: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub eps: f32,
}

impl Adam {
    /// Adam with the usual moment decay rates and the given learning rate.
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {}",
                self.lr
            )));
        }
        if !(self.beta1.is_finite() && (0.0..1.0).contains(&self.beta1)) {
            return Err(Error::InvalidConfig(format!(
                "adam beta1 must be finite and in [0,1), got {}",
                self.beta1
            )));
        }
        if !(self.beta2.is_finite() && (0.0..1.0).contains(&self.beta2)) {
            return Err(Error::InvalidConfig(format!(
                "adam beta2 must be finite and in [0,1), got {}",
                self.beta2
            )));
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "adam eps must be finite and > 0, got {}",
                self.eps
            )));
        }
        Ok(())
    }

    /// Allocate zeroed moments for parameter buffers of the given lengths.
    pub fn state(self, param_lens: &[usize]) -> Result<AdamState> {
        self.validate()?;
        Ok(AdamState {
            cfg: self,
            t: 0,
            beta1_pow: 1.0,
            beta2_pow: 1.0,
            m: param_lens.iter().map(|&n| vec![0.0; n]).collect(),
            v: param_lens.iter().map(|&n| vec![0.0; n]).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AdamState {
    cfg: Adam,
    t: u64,
    beta1_pow: f32,
    beta2_pow: f32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl AdamState {
    /// Number of steps applied so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Apply one step to `params` given matching `grads`.
    ///
    /// `params[i]` and `grads[i]` must have the lengths the state was built with.
    pub fn step(&mut self, params: &mut [&mut [f32]], grads: &[&[f32]]) {
        assert_eq!(params.len(), self.m.len(), "param buffer count changed");
        assert_eq!(grads.len(), self.m.len(), "grad buffer count changed");

        let Adam {
            lr,
            beta1,
            beta2,
            eps,
        } = self.cfg;

        self.t += 1;
        self.beta1_pow *= beta1;
        self.beta2_pow *= beta2;
        let corr1 = 1.0 - self.beta1_pow;
        let corr2 = 1.0 - self.beta2_pow;

        for (idx, (p, g)) in params.iter_mut().zip(grads).enumerate() {
            let m = &mut self.m[idx];
            let v = &mut self.v[idx];
            assert_eq!(p.len(), m.len(), "param buffer {idx} changed length");
            assert_eq!(g.len(), m.len(), "grad buffer {idx} has wrong length");

            for i in 0..p.len() {
                let g = g[i];
                m[i] = beta1 * m[i] + (1.0 - beta1) * g;
                v[i] = beta2 * v[i] + (1.0 - beta2) * (g * g);

                let m_hat = m[i] / corr1;
                let v_hat = v[i] / corr2;
                p[i] -= lr * m_hat / (v_hat.sqrt() + eps);
            }
        }
    }
}
