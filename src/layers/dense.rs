use rand::Rng;

use crate::math::matrix::Matrix;

/// Fully connected layer: `y = x · W + b`.
///
/// Weights are stored as (input_size, size) so a batch of row vectors can be
/// multiplied directly. The layer keeps no per-call state; the caller owns the
/// inputs it needs for the backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    pub weights: Matrix,
    pub biases: Matrix,
}

/// Gradients of the loss w.r.t. one layer's parameters.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Dense {
    /// He-initialized weights, zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, size: usize, rng: &mut R) -> Dense {
        Dense {
            weights: Matrix::he(input_size, size, rng),
            biases: Matrix::zeros(1, size),
        }
    }

    /// Rebuilds a layer from persisted tensors.
    ///
    /// # Panics
    /// Panics if `biases` is not a (1, weights.cols) row vector.
    pub fn from_parts(weights: Matrix, biases: Matrix) -> Dense {
        assert_eq!(biases.rows, 1, "biases must be a row vector");
        assert_eq!(biases.cols, weights.cols, "biases must match the layer width");
        Dense { weights, biases }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn size(&self) -> usize {
        self.weights.cols
    }

    /// Linear transform of a (batch, input_size) matrix.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        input.matmul(&self.weights).add_row(&self.biases)
    }

    /// Given `delta = ∂L/∂y` for a batch, returns the parameter gradients and
    /// `∂L/∂x` for the previous layer.
    pub fn backward(&self, input: &Matrix, delta: &Matrix) -> (DenseGrads, Matrix) {
        let grads = DenseGrads {
            weights: input.transpose().matmul(delta),
            biases: delta.sum_rows(),
        };
        let input_delta = delta.matmul(&self.weights.transpose());
        (grads, input_delta)
    }
}
