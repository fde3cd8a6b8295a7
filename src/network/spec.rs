use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::data::{IMAGE_PIXELS, NUM_CLASSES};

/// Architecture of the two-layer perceptron.
///
/// Stored in the metadata sidecar so a persisted model can be rebuilt with
/// the shape it was trained with. Every field has a default, so sidecars
/// written without an architecture block load as the default network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpSpec {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub activation: ActivationFunction,
    /// Dropout probability applied to the hidden activations while training.
    pub dropout: f64,
}

impl Default for MlpSpec {
    fn default() -> Self {
        MlpSpec {
            input_size: IMAGE_PIXELS,
            hidden_size: 256,
            output_size: NUM_CLASSES,
            activation: ActivationFunction::ReLU,
            dropout: 0.1,
        }
    }
}
