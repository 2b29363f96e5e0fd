use crate::{Activation, Error, Matrix, Result};

/// Frozen parameters of a pretrained layer.
#[derive(Debug, Clone, PartialEq)]
struct Params {
    /// Shape `(in_dim, out_dim)`.
    weights: Matrix,
    biases: Vec<f32>,
}

/// One hidden layer of the stack.
///
/// A layer starts untrained and becomes trained exactly once, when its
/// pretraining phase commits the learned encode weights via
/// [`Layer::set_parameters`]. After that it is only used through [`Layer::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
    params: Option<Params>,
}

impl Layer {
    pub fn new(in_dim: usize, out_dim: usize, activation: Activation) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        Ok(Self {
            in_dim,
            out_dim,
            activation,
            params: None,
        })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        self.params.is_some()
    }

    /// Encode weights, shape `(in_dim, out_dim)`. `None` until trained.
    #[inline]
    pub fn weights(&self) -> Option<&Matrix> {
        self.params.as_ref().map(|p| &p.weights)
    }

    /// Encode biases, length `out_dim`. `None` until trained.
    #[inline]
    pub fn biases(&self) -> Option<&[f32]> {
        self.params.as_ref().map(|p| p.biases.as_slice())
    }

    /// Freeze the layer with its learned parameters.
    ///
    /// Fails if the layer is already trained or if the shapes do not match the
    /// layer dims. Values are taken as-is: a diverged run freezes its NaNs.
    pub fn set_parameters(&mut self, weights: Matrix, biases: Vec<f32>) -> Result<()> {
        if self.is_trained() {
            return Err(Error::AlreadyTrained(format!(
                "layer {}x{} already has parameters",
                self.in_dim, self.out_dim
            )));
        }
        if weights.shape() != (self.in_dim, self.out_dim) {
            return Err(Error::InvalidShape(format!(
                "weights shape {:?} does not match layer ({}, {})",
                weights.shape(),
                self.in_dim,
                self.out_dim
            )));
        }
        if biases.len() != self.out_dim {
            return Err(Error::InvalidShape(format!(
                "biases length {} does not match out_dim {}",
                biases.len(),
                self.out_dim
            )));
        }
        self.params = Some(Params { weights, biases });
        Ok(())
    }

    /// `activation(input . W + b)` for a `(batch, in_dim)` input.
    pub fn encode(&self, input: &Matrix) -> Result<Matrix> {
        let params = self.params.as_ref().ok_or_else(|| {
            Error::NotTrained(format!(
                "cannot encode with untrained layer {}x{}",
                self.in_dim, self.out_dim
            ))
        })?;
        if input.cols() != self.in_dim {
            return Err(Error::InvalidShape(format!(
                "input width {} does not match layer in_dim {}",
                input.cols(),
                self.in_dim
            )));
        }

        let mut out = input.matmul(&params.weights)?;
        out.add_row(&params.biases)?;
        activate(self.activation, &mut out);
        Ok(out)
    }
}

/// Apply `activation` to every row of `z` in place.
#[inline]
pub(crate) fn activate(activation: Activation, z: &mut Matrix) {
    let cols = z.cols();
    if cols == 0 {
        return;
    }
    for row in z.as_mut_slice().chunks_exact_mut(cols) {
        activation.forward_row(row);
    }
}
