use std::path::Path;
use std::time::Duration;

use crate::data::{BatchSource, CsvBatchSource};
use crate::optim::Adam;
use crate::session::Session;
use crate::timing::Stopwatch;
use crate::{Error, Loss, Result, StackedAutoencoder, corrupt};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Hyperparameters shared by every pretraining phase of a stack.
pub struct TrainConfig {
    /// Fraction of latent elements zeroed before encoding, in `[0, 1]`.
    pub corruption: f32,
    pub loss: Loss,
    /// Adam learning rate.
    pub lr: f32,
    /// Rows per batch for sources opened by the stack itself
    /// ([`StackedAutoencoder::csv_source`], [`StackedAutoencoder::pretrain_csv`]).
    pub batch_size: usize,
    /// Log the batch loss every `print_step` minimizer steps.
    pub print_step: usize,
    /// Seed for weight init and corruption masks. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corruption: 0.0,
            loss: Loss::CrossEntropy,
            lr: 1e-4,
            batch_size: 100,
            print_step: 50,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        corrupt::validate_fraction(self.corruption)?;
        Adam::new(self.lr).validate()?;
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if self.print_step == 0 {
            return Err(Error::InvalidConfig("print_step must be > 0".to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Outcome of pretraining one layer.
pub struct LayerReport {
    pub depth: usize,
    /// Minimizer steps run (one per batch).
    pub steps: u64,
    /// Loss of the last batch.
    pub final_loss: f32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct PretrainReport {
    pub layers: Vec<LayerReport>,
}

impl PretrainReport {
    /// Total minimizer steps across all layers.
    pub fn steps(&self) -> u64 {
        self.layers.iter().map(|l| l.steps).sum()
    }
}

impl StackedAutoencoder {
    /// Open `path` as a lazy CSV source of `config().batch_size` rows per batch.
    pub fn csv_source<P: AsRef<Path>>(&self, path: P) -> Result<CsvBatchSource> {
        CsvBatchSource::new(path, self.config().batch_size)
    }

    /// [`pretrain`](Self::pretrain) on the CSV file at `path`, batched by
    /// `config().batch_size`.
    pub fn pretrain_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<PretrainReport> {
        let source = self.csv_source(path)?;
        self.pretrain(&source)
    }

    /// Greedy layer-wise pretraining of every untrained layer, in order.
    ///
    /// Layer `k` is trained on the output of the already-frozen layers `0..k` and
    /// frozen before layer `k + 1` starts.
    pub fn pretrain<S: BatchSource + ?Sized>(&mut self, source: &S) -> Result<PretrainReport> {
        let _watch = Stopwatch::start("pretraining");
        let mut report = PretrainReport::default();
        for depth in self.trained_depth()..self.num_layers() {
            report.layers.push(self.pretrain_layer(depth, source)?);
        }
        Ok(report)
    }

    /// Pretrain the layer at `depth`.
    ///
    /// For each batch: encode through the frozen layers `0..depth`, corrupt, and
    /// take one Adam step on the reconstruction loss against the clean latent.
    /// Every `print_step` steps the loss on that batch is re-evaluated with the
    /// updated parameters and logged.
    ///
    /// The source is restarted `epochs[depth]` times. The layer's parameters are
    /// only committed after the last batch, so an error leaves it untrained.
    pub fn pretrain_layer<S: BatchSource + ?Sized>(
        &mut self,
        depth: usize,
        source: &S,
    ) -> Result<LayerReport> {
        let layer = self.layer(depth).ok_or_else(|| {
            Error::InvalidShape(format!(
                "depth {depth} out of range for {} layers",
                self.num_layers()
            ))
        })?;
        if layer.is_trained() {
            return Err(Error::AlreadyTrained(format!(
                "layer {depth} is already pretrained"
            )));
        }
        if self.trained_depth() < depth {
            return Err(Error::NotTrained(format!(
                "layers before depth {depth} must be pretrained first"
            )));
        }

        let (in_dim, out_dim, activation) = (layer.in_dim(), layer.out_dim(), layer.activation());
        let epochs = self.epochs()[depth];
        let cfg = *self.config();
        let watch = Stopwatch::start(format!("layer {depth} ({in_dim} -> {out_dim})"));
        log::info!(
            "pretraining layer {depth}: {in_dim} -> {out_dim}, {activation}, {epochs} epoch(s)"
        );

        let mut session = Session::new(
            in_dim,
            out_dim,
            activation,
            cfg.loss,
            Adam::new(cfg.lr),
            &mut self.rng,
        )?;

        let mut final_loss = f32::NAN;
        for epoch in 0..epochs {
            let mut batches_this_epoch = 0_usize;
            for batch in source.batches()? {
                let batch = batch?;
                let latent = self.encode_dataset(&batch, depth)?;
                let corrupted = corrupt::corrupt(&latent, cfg.corruption, &mut self.rng)?;
                final_loss = session.step(&latent, &corrupted)?;
                batches_this_epoch += 1;

                let step = session.steps();
                if step % cfg.print_step as u64 == 0 {
                    let loss = session.loss(&latent, &corrupted)?;
                    log::info!("layer {depth} step {step}: batch loss = {loss}");
                }
            }
            if batches_this_epoch == 0 {
                return Err(Error::InvalidData(format!(
                    "batch source produced no batches (layer {depth}, epoch {epoch})"
                )));
            }
            log::debug!("layer {depth} epoch {epoch}: {batches_this_epoch} batches");
        }

        let steps = session.steps();
        let (weights, biases) = session.into_encoder();
        self.layer_mut(depth)
            .ok_or_else(|| Error::InvalidShape(format!("depth {depth} out of range")))?
            .set_parameters(weights, biases)?;

        Ok(LayerReport {
            depth,
            steps,
            final_loss,
            elapsed: watch.elapsed(),
        })
    }
}
