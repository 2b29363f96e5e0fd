//! Activation functions.
//!
//! A layer computes a pre-activation batch `z = x . W + b` and applies its activation
//! row by row: `y = activation(z)`. Sigmoid, tanh and ReLU act element-wise; softmax
//! normalises each row.
//!
//! Gradients are expressed in terms of the post-activation output `y`, so the
//! training session only has to keep `y` around for the backward pass.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Activation of a hidden layer.
pub enum Activation {
    Sigmoid,
    Tanh,
    #[cfg_attr(feature = "serde", serde(rename = "relu"))]
    ReLU,
    Softmax,
}

impl Activation {
    /// Every accepted activation, in the order their names are listed in errors.
    pub const ALL: [Activation; 4] = [
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::ReLU,
        Activation::Softmax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::ReLU => "relu",
            Activation::Softmax => "softmax",
        }
    }

    /// Apply the activation to one row of pre-activations, in place.
    #[inline]
    pub(crate) fn forward_row(self, row: &mut [f32]) {
        match self {
            Activation::Sigmoid => row.iter_mut().for_each(|v| *v = sigmoid(*v)),
            Activation::Tanh => row.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::ReLU => row.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Softmax => softmax_in_place(row),
        }
    }

    /// Turn `dL/dy` into `dL/dz` for one row, given the cached output `y`.
    ///
    /// `d` holds `dL/dy` on entry and `dL/dz` on return.
    #[inline]
    pub(crate) fn backward_row(self, y: &[f32], d: &mut [f32]) {
        debug_assert_eq!(y.len(), d.len());
        match self {
            Activation::Sigmoid => {
                for (g, &y) in d.iter_mut().zip(y) {
                    *g *= y * (1.0 - y);
                }
            }
            Activation::Tanh => {
                for (g, &y) in d.iter_mut().zip(y) {
                    *g *= 1.0 - y * y;
                }
            }
            Activation::ReLU => {
                for (g, &y) in d.iter_mut().zip(y) {
                    if y <= 0.0 {
                        *g = 0.0;
                    }
                }
            }
            Activation::Softmax => {
                // Jacobian-vector product: dz_i = y_i * (dy_i - sum_j y_j dy_j).
                let dot: f32 = y.iter().zip(d.iter()).map(|(&y, &g)| y * g).sum();
                for (g, &y) in d.iter_mut().zip(y) {
                    *g = y * (*g - dot);
                }
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Activation::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Activation::ALL.iter().map(|a| a.name()).collect();
                Error::InvalidConfig(format!(
                    "unknown activation {s:?}; expected one of {}",
                    allowed.join(", ")
                ))
            })
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[inline]
fn softmax_in_place(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0_f32;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    let inv = 1.0 / sum;
    for v in row.iter_mut() {
        *v *= inv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_allowed_names_only() {
        assert_eq!("sigmoid".parse::<Activation>().unwrap(), Activation::Sigmoid);
        assert_eq!("tanh".parse::<Activation>().unwrap(), Activation::Tanh);
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::ReLU);
        assert_eq!("softmax".parse::<Activation>().unwrap(), Activation::Softmax);

        for bad in ["elu", "ReLU", "", "identity"] {
            let err = bad.parse::<Activation>().unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn sigmoid_basic_values() {
        let mut row = [0.0_f32, 10.0, -10.0];
        Activation::Sigmoid.forward_row(&mut row);
        assert!((row[0] - 0.5).abs() < 1e-6);
        assert!(row[1] > 0.999);
        assert!(row[2] < 0.001);
    }

    #[test]
    fn softmax_rows_sum_to_one_even_for_large_inputs() {
        let mut row = [1000.0_f32, 1001.0, 999.0];
        Activation::Softmax.forward_row(&mut row);
        let sum: f32 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(row[1] > row[0] && row[0] > row[2]);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let z = [0.3_f32, -1.2, 0.8];
        let upstream = [0.5_f32, -1.0, 2.0];
        let eps = 1e-3_f32;

        for act in Activation::ALL {
            let mut y = z;
            act.forward_row(&mut y);
            let mut d = upstream;
            act.backward_row(&y, &mut d);

            for i in 0..z.len() {
                let mut plus = z;
                plus[i] += eps;
                act.forward_row(&mut plus);
                let mut minus = z;
                minus[i] -= eps;
                act.forward_row(&mut minus);

                let numeric: f32 = (0..z.len())
                    .map(|j| upstream[j] * (plus[j] - minus[j]) / (2.0 * eps))
                    .sum();
                assert!(
                    (numeric - d[i]).abs() < 1e-2,
                    "{act}: i={i} analytic={} numeric={numeric}",
                    d[i]
                );
            }
        }
    }
}
