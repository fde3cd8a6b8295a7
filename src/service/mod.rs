//! The two WebSocket endpoints: a periodic progress push and a
//! request/response inference channel.

pub mod inference;
pub mod progress;
pub mod protocol;
pub mod validate;

pub use inference::serve_inference;
pub use progress::serve_progress;
pub use protocol::{InferenceResponse, ProgressMessage};
pub use validate::{validate_request, RequestError, RequestErrorKind};

use tokio_tungstenite::tungstenite;

/// Ends a single connection. Never crosses into another connection's task.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ConnectionError {
    /// The peer went away; not worth more than a debug line.
    pub fn is_peer_gone(&self) -> bool {
        use tungstenite::error::ProtocolError;

        matches!(
            self,
            ConnectionError::Transport(
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
            )
        ) || matches!(self, ConnectionError::Transport(tungstenite::Error::Io(e))
            if matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ))
    }
}

/// Logs how a connection ended.
fn log_connection_end(service: &str, peer: std::net::SocketAddr, result: Result<(), ConnectionError>) {
    match result {
        Ok(()) => log::debug!("{service}: {peer} disconnected"),
        Err(e) if e.is_peer_gone() => log::debug!("{service}: {peer} went away: {e}"),
        Err(e) => log::warn!("{service}: connection with {peer} ended: {e}"),
    }
}
