use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::layers::dense::{Dense, DenseGrads};
use crate::layers::dropout::Dropout;
use crate::math::matrix::Matrix;
use crate::network::spec::MlpSpec;
use crate::optim::adam::Adam;

/// Whether stochastic regularization is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// Two-layer perceptron: linear → activation → dropout → linear.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    pub fc1: Dense,
    pub fc2: Dense,
    pub activation: ActivationFunction,
    pub dropout: Dropout,
}

/// Intermediate values of a training-mode forward pass, kept for backprop.
pub struct ForwardPass {
    pub input: Matrix,
    /// fc1 output before the activation.
    pub pre_hidden: Matrix,
    /// Activated hidden values after dropout; the input of fc2.
    pub hidden: Matrix,
    pub mask: Option<Matrix>,
    pub logits: Matrix,
}

pub struct Gradients {
    pub fc1: DenseGrads,
    pub fc2: DenseGrads,
}

impl Mlp {
    pub fn new<R: Rng + ?Sized>(spec: &MlpSpec, rng: &mut R) -> Mlp {
        Mlp {
            fc1: Dense::new(spec.input_size, spec.hidden_size, rng),
            fc2: Dense::new(spec.hidden_size, spec.output_size, rng),
            activation: spec.activation,
            dropout: Dropout::new(spec.dropout),
        }
    }

    pub fn spec(&self) -> MlpSpec {
        MlpSpec {
            input_size: self.fc1.input_size(),
            hidden_size: self.fc1.size(),
            output_size: self.fc2.size(),
            activation: self.activation,
            dropout: self.dropout.probability(),
        }
    }

    /// Evaluation-mode forward pass; dropout is the identity.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        let hidden = self.fc1.forward(input).map(|x| self.activation.function(x));
        self.fc2.forward(&hidden)
    }

    /// Forward pass in the given mode, keeping everything backprop needs.
    pub fn forward_pass<R: Rng + ?Sized>(&self, input: &Matrix, mode: Mode, rng: &mut R) -> ForwardPass {
        let pre_hidden = self.fc1.forward(input);
        let activated = pre_hidden.map(|x| self.activation.function(x));

        let (hidden, mask) = match mode {
            Mode::Train if self.dropout.probability() > 0.0 => {
                let mask = self.dropout.mask(activated.rows, activated.cols, rng);
                (activated.hadamard(&mask), Some(mask))
            }
            _ => (activated, None),
        };

        let logits = self.fc2.forward(&hidden);
        ForwardPass { input: input.clone(), pre_hidden, hidden, mask, logits }
    }

    /// Backpropagates `d_logits = ∂L/∂logits` through the network.
    pub fn backward(&self, pass: &ForwardPass, d_logits: &Matrix) -> Gradients {
        let (fc2, d_hidden) = self.fc2.backward(&pass.hidden, d_logits);

        let d_hidden = match &pass.mask {
            Some(mask) => d_hidden.hadamard(mask),
            None => d_hidden,
        };
        let act_derivative = pass.pre_hidden.map(|x| self.activation.derivative(x));
        let d_pre_hidden = d_hidden.hadamard(&act_derivative);

        let (fc1, _) = self.fc1.backward(&pass.input, &d_pre_hidden);
        Gradients { fc1, fc2 }
    }

    /// Applies one optimizer step with the given gradients.
    pub fn apply_gradients(&mut self, grads: &Gradients, optimizer: &mut Adam) {
        optimizer.step(
            &mut [
                &mut self.fc1.weights,
                &mut self.fc1.biases,
                &mut self.fc2.weights,
                &mut self.fc2.biases,
            ],
            &[
                &grads.fc1.weights,
                &grads.fc1.biases,
                &grads.fc2.weights,
                &grads.fc2.biases,
            ],
        );
    }
}
