//! Stacked denoising autoencoders with greedy layer-wise pretraining.
//!
//! `rust-sda` learns a stack of encoder layers, one at a time. Layer `k` is trained
//! as a denoising autoencoder on the output of the already-frozen layers `0..k`:
//! its input is corrupted with masking noise, encoded, decoded through the tied
//! weights `W^T`, and compared with the clean input. Once the phase ends, the
//! encode weights are frozen and the next layer starts.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - Batches are row-major [`Matrix`] values of shape `(batch_size, features)`.
//! - Layer weights have shape `(in_dim, out_dim)`, so encoding is
//!   `activation(x . W + b)`.
//! - `dims` lists include the input dimension: `[784, 400, 100]` is a two-layer
//!   stack mapping 784 -> 400 -> 100.
//!
//! # Errors vs panics
//!
//! Everything reachable from the public API validates shapes and state and
//! returns [`Result`]. Layers are write-once: encoding with an untrained layer is
//! [`Error::NotTrained`], and overwriting a frozen one is [`Error::AlreadyTrained`].
//!
//! # Logging
//!
//! The crate logs through the [`log`] facade: one `info` line per pretraining
//! phase, the batch loss every `print_step` steps, and elapsed time per phase.
//! Install any logger (e.g. `env_logger`) to see them.
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

//! # Quick start
//!
//! ```rust
//! use rust_sda::{Activation, Loss, Matrix, MemoryBatchSource, SdaBuilder};
//!
//! # fn main() -> rust_sda::Result<()> {
//! let rows: Vec<Vec<f32>> = (0..40)
//!     .map(|i| (0..8).map(|j| ((i + j) % 2) as f32).collect())
//!     .collect();
//! let data = Matrix::from_rows(&rows)?;
//!
//! let mut sda = SdaBuilder::new(8)?
//!     .add_layer(4, Activation::Sigmoid, 2)?
//!     .add_layer(2, Activation::Sigmoid, 2)?
//!     .corruption(0.2)?
//!     .loss(Loss::Rmse)
//!     .learning_rate(1e-2)
//!     .seed(0)
//!     .build()?;
//!
//! let source = MemoryBatchSource::new(data.clone(), 10)?;
//! let report = sda.pretrain(&source)?;
//! assert_eq!(report.layers.len(), 2);
//!
//! let encoded = sda.encode(&data)?;
//! assert_eq!(encoded.shape(), (40, 2));
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod corrupt;
pub mod data;
pub mod error;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod optim;
pub mod persist;
pub mod sda;
mod session;
pub mod tensor;
pub mod timing;
pub mod train;

#[cfg(feature = "serde")]
pub mod config;
#[cfg(feature = "serde")]
pub mod serde_model;

pub use activation::Activation;
pub use builder::SdaBuilder;
pub use data::{BatchSource, Batches, CsvBatchSource, MemoryBatchSource};
pub use error::{Error, Result};
pub use layer::Layer;
pub use loss::Loss;
pub use optim::{Adam, AdamState};
pub use sda::{StackedAutoencoder, create_layers};
pub use tensor::Matrix;
pub use timing::{Stopwatch, timed};
pub use train::{LayerReport, PretrainReport, TrainConfig};

#[cfg(feature = "serde")]
pub use config::SdaConfig;
