//! JSON run configuration (feature: `serde`).
//!
//! An [`SdaConfig`] mirrors the flat options list used to describe a pretraining
//! run: layer dims, activation names, epochs per layer and the shared
//! hyperparameters. Omitted hyperparameters fall back to [`TrainConfig`]'s
//! defaults.
//!
//! ```json
//! {
//!   "dims": [784, 400, 200, 100],
//!   "activations": ["relu", "relu", "relu"],
//!   "epochs": [200, 200, 200],
//!   "noise": 0.3,
//!   "loss": "rmse",
//!   "lr": 0.001,
//!   "batch_size": 100,
//!   "print_step": 50
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Loss, Result, StackedAutoencoder, TrainConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdaConfig {
    /// Input dim followed by each hidden layer's width.
    pub dims: Vec<usize>,
    pub activations: Vec<String>,
    pub epochs: Vec<usize>,
    /// Masking-noise fraction.
    #[serde(default)]
    pub noise: f32,
    #[serde(default)]
    pub loss: Loss,
    #[serde(default = "default_lr")]
    pub lr: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_print_step")]
    pub print_step: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_lr() -> f32 {
    TrainConfig::default().lr
}

fn default_batch_size() -> usize {
    TrainConfig::default().batch_size
}

fn default_print_step() -> usize {
    TrainConfig::default().print_step
}

impl SdaConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config json: {e}")))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            corruption: self.noise,
            loss: self.loss,
            lr: self.lr,
            batch_size: self.batch_size,
            print_step: self.print_step,
            seed: self.seed,
        }
    }

    /// Validate and build an untrained stack.
    pub fn build(&self) -> Result<StackedAutoencoder> {
        StackedAutoencoder::from_options(
            &self.dims,
            &self.activations,
            &self.epochs,
            self.train_config(),
        )
    }
}
