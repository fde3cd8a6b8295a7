use serde::{Deserialize, Serialize};

use crate::network::spec::MlpSpec;

/// Human-readable sidecar persisted next to the parameter blob.
///
/// Field names match the progress message so the file can be inspected (or
/// plotted) with the same tooling that consumes the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub total_epochs: usize,
    pub current_epoch: usize,
    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
    #[serde(default)]
    pub architecture: MlpSpec,
}
