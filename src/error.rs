use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// Partial or unreadable saved-model pair. Fatal at startup.
    #[error("persisted model state is corrupt: {0}")]
    PersistedStateCorrupt(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unexpected failure: {0}")]
    Unexpected(String),

    #[error("model is already trained")]
    AlreadyTrained,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
