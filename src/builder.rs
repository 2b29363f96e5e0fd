//! Stack builder.
//!
//! `SdaBuilder` is the recommended way to define a stack. It makes the layer
//! structure explicit (output width, activation and pretraining epochs per layer)
//! and collects the shared pretraining hyperparameters in one place.

use crate::{Activation, Error, Layer, Loss, Result, StackedAutoencoder, TrainConfig};

#[derive(Debug, Clone, Copy)]
struct LayerSpec {
    out_dim: usize,
    activation: Activation,
    epochs: usize,
}

#[derive(Debug, Clone)]
/// Builder for a `StackedAutoencoder`.
///
/// Example:
///
/// ```rust
/// use rust_sda::{Activation, Loss, SdaBuilder};
///
/// # fn main() -> rust_sda::Result<()> {
/// let sda = SdaBuilder::new(784)?
///     .add_layer(400, Activation::ReLU, 200)?
///     .add_layer(100, Activation::Sigmoid, 200)?
///     .corruption(0.3)?
///     .loss(Loss::Rmse)
///     .seed(0)
///     .build()?;
/// assert_eq!(sda.output_dim(), 100);
/// # Ok(())
/// # }
/// ```
pub struct SdaBuilder {
    input_dim: usize,
    layers: Vec<LayerSpec>,
    config: TrainConfig,
}

impl SdaBuilder {
    /// Start building a stack that accepts rows of width `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            layers: Vec::new(),
            config: TrainConfig::default(),
        })
    }

    /// Convenience constructor from a dims list, activations and epochs.
    ///
    /// `dims` includes the input dimension, so its length must be at least 2.
    pub fn from_dims(dims: &[usize], activations: &[Activation], epochs: &[usize]) -> Result<Self> {
        if dims.len() < 2 {
            return Err(Error::InvalidConfig(
                "dims must include the input dim and at least one hidden dim".to_owned(),
            ));
        }
        if activations.len() != dims.len() - 1 || epochs.len() != dims.len() - 1 {
            return Err(Error::InvalidConfig(format!(
                "activations ({}) and epochs ({}) must both have length dims.len() - 1 ({})",
                activations.len(),
                epochs.len(),
                dims.len() - 1
            )));
        }

        let mut b = Self::new(dims[0])?;
        for ((&out_dim, &act), &ep) in dims[1..].iter().zip(activations).zip(epochs) {
            b = b.add_layer(out_dim, act, ep)?;
        }
        Ok(b)
    }

    /// Add a hidden layer pretrained for `epochs` passes over the data.
    pub fn add_layer(mut self, out_dim: usize, activation: Activation, epochs: usize) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        if epochs == 0 {
            return Err(Error::InvalidConfig("layer epochs must be > 0".to_owned()));
        }
        self.layers.push(LayerSpec {
            out_dim,
            activation,
            epochs,
        });
        Ok(self)
    }

    /// Fraction of inputs masked to zero during pretraining.
    pub fn corruption(mut self, fraction: f32) -> Result<Self> {
        crate::corrupt::validate_fraction(fraction)?;
        self.config.corruption = fraction;
        Ok(self)
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.config.loss = loss;
        self
    }

    pub fn learning_rate(mut self, lr: f32) -> Self {
        self.config.lr = lr;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn print_step(mut self, print_step: usize) -> Self {
        self.config.print_step = print_step;
        self
    }

    /// Make weight init and corruption masks deterministic.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Replace every hyperparameter at once.
    pub fn config(mut self, config: TrainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<StackedAutoencoder> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "stack must have at least one layer".to_owned(),
            ));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut epochs = Vec::with_capacity(self.layers.len());
        let mut in_dim = self.input_dim;
        for spec in self.layers {
            layers.push(Layer::new(in_dim, spec.out_dim, spec.activation)?);
            epochs.push(spec.epochs);
            in_dim = spec.out_dim;
        }

        StackedAutoencoder::new(layers, epochs, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains_layer_dims() {
        let sda = SdaBuilder::new(6)
            .unwrap()
            .add_layer(4, Activation::Tanh, 3)
            .unwrap()
            .add_layer(2, Activation::ReLU, 5)
            .unwrap()
            .learning_rate(1e-3)
            .batch_size(10)
            .build()
            .unwrap();

        assert_eq!(sda.input_dim(), 6);
        assert_eq!(sda.output_dim(), 2);
        assert_eq!(sda.layer(1).unwrap().in_dim(), 4);
        assert_eq!(sda.epochs(), &[3, 5]);
        assert_eq!(sda.config().lr, 1e-3);
        assert_eq!(sda.config().batch_size, 10);
        assert_eq!(sda.trained_depth(), 0);
    }

    #[test]
    fn builder_rejects_invalid_input() {
        assert!(SdaBuilder::new(0).is_err());
        assert!(SdaBuilder::new(3).unwrap().build().is_err());
        assert!(
            SdaBuilder::new(3)
                .unwrap()
                .add_layer(0, Activation::ReLU, 1)
                .is_err()
        );
        assert!(
            SdaBuilder::new(3)
                .unwrap()
                .add_layer(2, Activation::ReLU, 0)
                .is_err()
        );
        assert!(SdaBuilder::new(3).unwrap().corruption(1.01).is_err());
        assert!(
            SdaBuilder::new(3)
                .unwrap()
                .add_layer(2, Activation::ReLU, 1)
                .unwrap()
                .learning_rate(-1.0)
                .build()
                .is_err()
        );
    }

    #[test]
    fn from_dims_matches_manual_building() {
        let a = SdaBuilder::from_dims(
            &[5, 3, 2],
            &[Activation::Sigmoid, Activation::Tanh],
            &[1, 2],
        )
        .unwrap()
        .build()
        .unwrap();
        assert_eq!(a.layers().len(), 2);
        assert_eq!(a.layer(1).unwrap().activation(), Activation::Tanh);
        assert_eq!(a.epochs(), &[1, 2]);

        assert!(SdaBuilder::from_dims(&[5], &[], &[]).is_err());
        assert!(SdaBuilder::from_dims(&[5, 3], &[Activation::Tanh], &[]).is_err());
    }
}
