use serde::{Serialize, Deserialize};
use std::f64::consts::E;
use std::str::FromStr;

/// Hidden-layer activation of the perceptron.
///
/// The output layer has no activation of its own: the logits go straight
/// into `CrossEntropyLoss`, which applies the softmax.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    Identity,
    Tanh,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    /// Element-wise activation.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation value.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        ActivationFunction::ReLU
    }
}

impl FromStr for ActivationFunction {
    type Err = String;

    /// Parses `relu`, `sigmoid`, `tanh`, `identity` or `leaky_relu[:alpha]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "relu" => Ok(ActivationFunction::ReLU),
            "sigmoid" => Ok(ActivationFunction::Sigmoid),
            "tanh" => Ok(ActivationFunction::Tanh),
            "identity" => Ok(ActivationFunction::Identity),
            "leaky_relu" => Ok(ActivationFunction::LeakyReLU { alpha: 0.01 }),
            other => match other.strip_prefix("leaky_relu:") {
                Some(alpha) => alpha
                    .parse::<f64>()
                    .map(|alpha| ActivationFunction::LeakyReLU { alpha })
                    .map_err(|e| format!("invalid leaky_relu alpha '{alpha}': {e}")),
                None => Err(format!("unknown activation '{s}'")),
            },
        }
    }
}
