use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::model::classifier::Classifier;
use crate::service::protocol::InferenceResponse;
use crate::service::validate::{validate_request, RequestError, RequestErrorKind};
use crate::service::{log_connection_end, ConnectionError};

/// Accepts inference clients forever, one task per connection.
pub async fn serve_inference(listener: TcpListener, classifier: Arc<Classifier>) {
    if let Ok(addr) = listener.local_addr() {
        info!("Inference channel listening on ws://{addr}");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("inference: accept failed: {e}");
                continue;
            }
        };

        let classifier = classifier.clone();
        tokio::spawn(async move {
            let result = answer_requests(stream, peer, &classifier).await;
            log_connection_end("inference", peer, result);
        });
    }
}

async fn answer_requests(stream: TcpStream, peer: SocketAddr, classifier: &Classifier) -> Result<(), ConnectionError> {
    let mut ws = accept_async(stream).await?;
    debug!("inference: {peer} connected");

    while let Some(frame) = ws.next().await {
        let reply = match frame? {
            Message::Text(text) => respond(classifier, text.as_str()),
            Message::Close(_) => break,
            // binary frames are not part of the protocol; ping/pong is handled by the transport
            _ => continue,
        };
        ws.send(Message::text(serde_json::to_string(&reply)?)).await?;
    }
    Ok(())
}

/// Turns one request frame into exactly one reply.
///
/// A frame that is not JSON is treated like a request without `imageData`.
pub fn respond(classifier: &Classifier, frame: &str) -> InferenceResponse {
    let request: Value = serde_json::from_str(frame).unwrap_or(Value::Null);

    let pixels = match validate_request(classifier.is_trained(), &request) {
        Ok(pixels) => pixels,
        Err(rejected) => {
            debug!("inference: rejected request: {rejected}");
            return rejected.to_response();
        }
    };

    match classifier.predict(&pixels) {
        Ok(digit) => InferenceResponse::prediction(digit),
        Err(e) => {
            error!("Prediction failed: {e}");
            RequestError::new(RequestErrorKind::Unexpected).to_response()
        }
    }
}
