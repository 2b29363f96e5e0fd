use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{Activation, Error, Layer, Matrix, Result, TrainConfig, persist};

/// A stacked denoising autoencoder.
///
/// Holds the hidden layers in order plus the hyperparameters of their greedy,
/// layer-by-layer pretraining (see [`StackedAutoencoder::pretrain`]). Layers
/// become trained strictly in index order; once every layer is trained the
/// stack is only used to encode data.
#[derive(Debug, Clone)]
pub struct StackedAutoencoder {
    layers: Vec<Layer>,
    epochs: Vec<usize>,
    config: TrainConfig,
    pub(crate) rng: StdRng,
}

/// Build the hidden layers from a dims list and activation names.
///
/// `dims` includes the input dimension, so its length must be at least 2 and
/// `activations` must have length `dims.len() - 1`. Layer `i` maps
/// `dims[i] -> dims[i + 1]`.
pub fn create_layers<S: AsRef<str>>(dims: &[usize], activations: &[S]) -> Result<Vec<Layer>> {
    if dims.len() < 2 {
        return Err(Error::InvalidConfig(
            "dims must include the input dim and at least one hidden dim".to_owned(),
        ));
    }
    if activations.len() != dims.len() - 1 {
        return Err(Error::InvalidConfig(format!(
            "activations length {} does not match dims.len() - 1 ({})",
            activations.len(),
            dims.len() - 1
        )));
    }

    // Parse every name before building anything.
    let activations = activations
        .iter()
        .map(|a| a.as_ref().parse::<Activation>())
        .collect::<Result<Vec<_>>>()?;

    dims.windows(2)
        .zip(activations)
        .map(|(w, act)| Layer::new(w[0], w[1], act))
        .collect()
}

impl StackedAutoencoder {
    /// Assemble a stack from untrained (or already trained) layers.
    ///
    /// `epochs[i]` is the number of passes over the batch source used to pretrain
    /// `layers[i]`.
    pub fn new(layers: Vec<Layer>, epochs: Vec<usize>, config: TrainConfig) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig(
                "stack must have at least one layer".to_owned(),
            ));
        }
        if epochs.len() != layers.len() {
            return Err(Error::InvalidConfig(format!(
                "epochs length {} does not match number of layers {}",
                epochs.len(),
                layers.len()
            )));
        }
        if let Some(i) = epochs.iter().position(|&e| e == 0) {
            return Err(Error::InvalidConfig(format!(
                "epochs must be > 0, got 0 for layer {i}"
            )));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(Error::InvalidConfig(format!(
                    "layer {} in_dim {} does not match layer {i} out_dim {}",
                    i + 1,
                    pair[1].in_dim(),
                    pair[0].out_dim()
                )));
            }
        }
        if let Some(i) = first_untrained(&layers) {
            if let Some(j) = layers[i..].iter().position(Layer::is_trained) {
                return Err(Error::InvalidConfig(format!(
                    "layer {} is trained but layer {i} before it is not",
                    i + j
                )));
            }
        }
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            layers,
            epochs,
            config,
            rng,
        })
    }

    /// Convenience constructor mirroring the classic options list.
    ///
    /// ```rust
    /// use rust_sda::{StackedAutoencoder, TrainConfig};
    ///
    /// # fn main() -> rust_sda::Result<()> {
    /// let sda = StackedAutoencoder::from_options(
    ///     &[784, 400, 200, 100],
    ///     &["relu", "relu", "relu"],
    ///     &[200, 200, 200],
    ///     TrainConfig::default(),
    /// )?;
    /// assert_eq!(sda.output_dim(), 100);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_options<S: AsRef<str>>(
        dims: &[usize],
        activations: &[S],
        epochs: &[usize],
        config: TrainConfig,
    ) -> Result<Self> {
        let layers = create_layers(dims, activations)?;
        Self::new(layers, epochs.to_vec(), config)
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub(crate) fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    #[inline]
    pub fn epochs(&self) -> &[usize] {
        &self.epochs
    }

    #[inline]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Number of leading layers that are trained.
    #[inline]
    pub fn trained_depth(&self) -> usize {
        first_untrained(&self.layers).unwrap_or(self.layers.len())
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        self.trained_depth() == self.layers.len()
    }

    /// Pass `input` through layers `0..through_depth`.
    ///
    /// `through_depth == 0` returns the input unchanged. Fails if
    /// `through_depth` exceeds the number of layers or if any of those layers is
    /// still untrained.
    pub fn encode_dataset(&self, input: &Matrix, through_depth: usize) -> Result<Matrix> {
        if through_depth > self.layers.len() {
            return Err(Error::InvalidShape(format!(
                "through_depth {through_depth} exceeds number of layers {}",
                self.layers.len()
            )));
        }
        if input.cols() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "input width {} does not match stack input_dim {}",
                input.cols(),
                self.input_dim()
            )));
        }
        let trained = self.trained_depth();
        if trained < through_depth {
            return Err(Error::NotTrained(format!(
                "layer {trained} is untrained; cannot encode through depth {through_depth}"
            )));
        }

        let mut out = input.clone();
        for layer in &self.layers[..through_depth] {
            out = layer.encode(&out)?;
        }
        Ok(out)
    }

    /// Encode `input` through the whole stack.
    pub fn encode(&self, input: &Matrix) -> Result<Matrix> {
        self.encode_dataset(input, self.layers.len())
    }

    /// Append `batch` to `path` as comma-separated rows.
    pub fn persist<P: AsRef<Path>>(&self, batch: &Matrix, path: P) -> Result<()> {
        persist::append_rows(batch, path)
    }
}

fn first_untrained(layers: &[Layer]) -> Option<usize> {
    layers.iter().position(|l| !l.is_trained())
}
