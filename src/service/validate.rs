use std::fmt;

use serde_json::Value;

use crate::data::IMAGE_PIXELS;
use crate::service::protocol::{InferenceResponse, IMAGE_DATA_FIELD};

/// Why an inference request was not answered with a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    NotReady,
    MissingField,
    InvalidLength,
    Unexpected,
}

/// A tagged request failure, turned into a wire error exactly once at the
/// connection boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub message: &'static str,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind) -> Self {
        let message = match kind {
            RequestErrorKind::NotReady => "Model is not trained",
            RequestErrorKind::MissingField => "Invalid input data",
            RequestErrorKind::InvalidLength => "Invalid input data length",
            RequestErrorKind::Unexpected => "Unexpected error",
        };
        RequestError { kind, message }
    }

    pub fn to_response(&self) -> InferenceResponse {
        InferenceResponse::error(self.message)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RequestError {}

/// Extracts the pixel array, if the field is present and numeric.
fn image_data(request: &Value) -> Option<Vec<f64>> {
    request
        .get(IMAGE_DATA_FIELD)?
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect()
}

/// Runs the checks in order and stops at the first failure:
/// readiness, field presence, length.
///
/// A field that is present but is not an array of numbers counts as missing.
pub fn validate_request(is_trained: bool, request: &Value) -> Result<Vec<f64>, RequestError> {
    if !is_trained {
        return Err(RequestError::new(RequestErrorKind::NotReady));
    }
    let pixels = image_data(request).ok_or(RequestError::new(RequestErrorKind::MissingField))?;
    if pixels.len() != IMAGE_PIXELS {
        return Err(RequestError::new(RequestErrorKind::InvalidLength));
    }
    Ok(pixels)
}
