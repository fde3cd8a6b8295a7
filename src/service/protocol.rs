//! JSON messages exchanged on the two WebSocket channels.

use serde::{Deserialize, Serialize};

use crate::train::progress::TrainingProgress;

/// One server push on the progress channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub is_model_trained: bool,
    pub current_epoch: usize,
    pub total_epochs: usize,
    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
}

impl From<&TrainingProgress> for ProgressMessage {
    fn from(p: &TrainingProgress) -> Self {
        ProgressMessage {
            is_model_trained: p.is_trained,
            current_epoch: p.current_epoch,
            total_epochs: p.total_epochs,
            train_loss: p.train_loss_history.clone(),
            val_loss: p.val_loss_history.clone(),
        }
    }
}

/// Name of the pixel array field in an inference request.
pub const IMAGE_DATA_FIELD: &str = "imageData";

/// Reply on the inference channel: exactly one of the two keys is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InferenceResponse {
    Prediction { prediction: String },
    Error { error: String },
}

impl InferenceResponse {
    pub fn prediction(class: u8) -> Self {
        InferenceResponse::Prediction { prediction: class.to_string() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        InferenceResponse::Error { error: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_message_uses_wire_names() {
        let p = TrainingProgress::started(3).after_epoch(0.5, 0.25);
        let json = serde_json::to_value(ProgressMessage::from(&p)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "is_model_trained": false,
                "current_epoch": 1,
                "total_epochs": 3,
                "train_loss": [0.5],
                "val_loss": [0.25],
            })
        );
    }

    #[test]
    fn responses_have_a_single_key() {
        assert_eq!(
            serde_json::to_string(&InferenceResponse::prediction(7)).unwrap(),
            r#"{"prediction":"7"}"#
        );
        assert_eq!(
            serde_json::to_string(&InferenceResponse::error("Invalid input data")).unwrap(),
            r#"{"error":"Invalid input data"}"#
        );
    }
}
