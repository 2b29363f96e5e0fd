//! Stack serialization/deserialization (feature: `serde`).
//!
//! This module defines a versioned on-disk format for `StackedAutoencoder`.
//!
//! Design notes:
//! - Internal `StackedAutoencoder`/`Layer` structs are not serialized directly;
//!   the file format only changes when `STACK_FORMAT_VERSION` does.
//! - Untrained layers are stored without parameters, so a stack can be saved
//!   between pretraining phases and resumed later.
//! - Deserialization validates dims, parameter lengths, finiteness and that
//!   trained layers form a prefix of the stack.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Layer, Matrix, Result, StackedAutoencoder, TrainConfig};

pub const STACK_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedStack {
    pub format_version: u32,
    pub config: TrainConfig,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    pub activation: Activation,
    pub epochs: usize,
    /// Row-major `(in_dim, out_dim)`, present once the layer is trained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biases: Option<Vec<f32>>,
}

impl SerializedStack {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != STACK_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported stack format_version {}; expected {}",
                self.format_version, STACK_FORMAT_VERSION
            )));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidData(
                "serialized stack must have at least one layer".to_owned(),
            ));
        }

        let mut seen_untrained = false;
        for (i, layer) in self.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;

            if i > 0 {
                let prev_out = self.layers[i - 1].out_dim;
                if layer.in_dim != prev_out {
                    return Err(Error::InvalidData(format!(
                        "layer {i} in_dim {} does not match previous out_dim {prev_out}",
                        layer.in_dim
                    )));
                }
            }

            let trained = layer.weights.is_some();
            if trained && seen_untrained {
                return Err(Error::InvalidData(format!(
                    "layer {i} is trained but an earlier layer is not"
                )));
            }
            seen_untrained |= !trained;
        }

        Ok(())
    }
}

impl SerializedLayer {
    fn validate(&self) -> Result<()> {
        if self.in_dim == 0 || self.out_dim == 0 {
            return Err(Error::InvalidData(format!(
                "layer dims must be > 0, got in_dim={} out_dim={}",
                self.in_dim, self.out_dim
            )));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidData("epochs must be > 0".to_owned()));
        }

        let (weights, biases) = match (&self.weights, &self.biases) {
            (None, None) => return Ok(()),
            (Some(w), Some(b)) => (w, b),
            _ => {
                return Err(Error::InvalidData(
                    "weights and biases must be both present or both absent".to_owned(),
                ));
            }
        };

        let expected_w = self
            .in_dim
            .checked_mul(self.out_dim)
            .ok_or_else(|| Error::InvalidData("layer weight shape overflow".to_owned()))?;
        if weights.len() != expected_w {
            return Err(Error::InvalidData(format!(
                "weights length {} does not match in_dim * out_dim ({} * {})",
                weights.len(),
                self.in_dim,
                self.out_dim
            )));
        }
        if biases.len() != self.out_dim {
            return Err(Error::InvalidData(format!(
                "biases length {} does not match out_dim {}",
                biases.len(),
                self.out_dim
            )));
        }
        if weights.iter().chain(biases).any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "parameters must contain only finite values".to_owned(),
            ));
        }

        Ok(())
    }

    fn into_layer(self) -> Result<Layer> {
        let mut layer = Layer::new(self.in_dim, self.out_dim, self.activation)?;
        if let (Some(w), Some(b)) = (self.weights, self.biases) {
            layer.set_parameters(Matrix::from_vec(self.in_dim, self.out_dim, w)?, b)?;
        }
        Ok(layer)
    }
}

impl From<&StackedAutoencoder> for SerializedStack {
    fn from(sda: &StackedAutoencoder) -> Self {
        let layers = sda
            .layers()
            .iter()
            .zip(sda.epochs())
            .map(|(layer, &epochs)| SerializedLayer {
                in_dim: layer.in_dim(),
                out_dim: layer.out_dim(),
                activation: layer.activation(),
                epochs,
                weights: layer.weights().map(|w| w.as_slice().to_vec()),
                biases: layer.biases().map(<[f32]>::to_vec),
            })
            .collect();
        Self {
            format_version: STACK_FORMAT_VERSION,
            config: *sda.config(),
            layers,
        }
    }
}

impl TryFrom<SerializedStack> for StackedAutoencoder {
    type Error = Error;

    fn try_from(value: SerializedStack) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let config = value.config;
        let mut layers = Vec::with_capacity(value.layers.len());
        let mut epochs = Vec::with_capacity(value.layers.len());
        for layer in value.layers {
            epochs.push(layer.epochs);
            layers.push(layer.into_layer()?);
        }

        StackedAutoencoder::new(layers, epochs, config)
    }
}

impl StackedAutoencoder {
    /// Serialize the stack to a pretty-printed JSON string.
    ///
    /// Fails if any trained layer holds non-finite parameters, since those could
    /// not be loaded back.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedStack::from(self);
        ser.validate()?;
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize stack: {e}")))
    }

    /// Parse a stack from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedStack = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse stack json: {e}")))?;
        ser.try_into()
    }

    /// Save the stack to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        std::fs::write(path, s)?;
        Ok(())
    }

    /// Load a stack from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_trained() -> StackedAutoencoder {
        let mut sda = StackedAutoencoder::from_options(
            &[2, 3, 1],
            &["tanh", "sigmoid"],
            &[4, 5],
            TrainConfig {
                seed: Some(3),
                ..TrainConfig::default()
            },
        )
        .unwrap();
        sda.layer_mut(0)
            .unwrap()
            .set_parameters(
                Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
                vec![0.1, 0.2, 0.3],
            )
            .unwrap();
        sda
    }

    #[test]
    fn partially_trained_stack_roundtrips() {
        let sda = half_trained();
        let json = sda.to_json_string_pretty().unwrap();
        let loaded = StackedAutoencoder::from_json_str(&json).unwrap();

        assert_eq!(loaded.layers(), sda.layers());
        assert_eq!(loaded.epochs(), &[4, 5]);
        assert_eq!(loaded.config(), sda.config());
        assert_eq!(loaded.trained_depth(), 1);
        assert_eq!(loaded.to_json_string_pretty().unwrap(), json);
    }

    #[test]
    fn untrained_layers_carry_no_parameters() {
        let json = half_trained().to_json_string_pretty().unwrap();
        let ser: SerializedStack = serde_json::from_str(&json).unwrap();
        assert!(ser.layers[0].weights.is_some());
        assert!(ser.layers[1].weights.is_none());
        assert!(ser.layers[1].biases.is_none());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut ser = SerializedStack::from(&half_trained());
        ser.format_version = 999;
        let json = serde_json::to_string(&ser).unwrap();
        let err = StackedAutoencoder::from_json_str(&json).unwrap_err();
        assert!(format!("{err}").contains("format_version"));
    }

    #[test]
    fn rejects_gaps_and_bad_shapes() {
        let base = SerializedStack::from(&half_trained());

        let mut gap = base.clone();
        gap.layers[0].weights = None;
        gap.layers[0].biases = None;
        gap.layers[1].weights = Some(vec![0.0; 3]);
        gap.layers[1].biases = Some(vec![0.0]);
        assert!(StackedAutoencoder::try_from(gap).is_err());

        let mut short = base.clone();
        short.layers[0].weights = Some(vec![0.0; 5]);
        assert!(StackedAutoencoder::try_from(short).is_err());

        let mut half = base.clone();
        half.layers[0].biases = None;
        assert!(StackedAutoencoder::try_from(half).is_err());

        let mut nan = base.clone();
        nan.layers[0].biases = Some(vec![0.0, f32::NAN, 0.0]);
        assert!(StackedAutoencoder::try_from(nan).is_err());

        let mut chain = base;
        chain.layers[1].in_dim = 2;
        assert!(StackedAutoencoder::try_from(chain).is_err());
    }

    #[test]
    fn non_finite_parameters_are_not_saved() {
        let mut sda = StackedAutoencoder::from_options(
            &[2, 1],
            &["sigmoid"],
            &[1],
            TrainConfig::default(),
        )
        .unwrap();
        sda.layer_mut(0)
            .unwrap()
            .set_parameters(Matrix::from_vec(2, 1, vec![f32::NAN, 1.0]).unwrap(), vec![0.0])
            .unwrap();

        assert!(matches!(
            sda.to_json_string_pretty(),
            Err(Error::InvalidData(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diverged.json");
        assert!(sda.save_json(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.json");
        let sda = half_trained();
        sda.save_json(&path).unwrap();
        let loaded = StackedAutoencoder::load_json(&path).unwrap();
        assert_eq!(loaded.layers(), sda.layers());
    }
}
