use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::model::classifier::Classifier;
use crate::service::protocol::ProgressMessage;
use crate::service::{log_connection_end, ConnectionError};

/// Accepts progress subscribers forever, one task per connection.
///
/// Every subscriber gets the current snapshot immediately and then once per
/// `interval`, whether or not training is running.
pub async fn serve_progress(listener: TcpListener, classifier: Arc<Classifier>, interval: Duration) {
    if let Ok(addr) = listener.local_addr() {
        info!("Progress stream listening on ws://{addr}");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("progress: accept failed: {e}");
                continue;
            }
        };

        let classifier = classifier.clone();
        tokio::spawn(async move {
            let result = stream_progress(stream, peer, &classifier, interval).await;
            log_connection_end("progress", peer, result);
        });
    }
}

async fn stream_progress(
    stream: TcpStream,
    peer: SocketAddr,
    classifier: &Classifier,
    interval: Duration,
) -> Result<(), ConnectionError> {
    let ws = accept_async(stream).await?;
    log::debug!("progress: {peer} subscribed");
    let (mut outgoing, mut incoming) = ws.split();

    loop {
        let snapshot = classifier.progress_snapshot();
        let json = serde_json::to_string(&ProgressMessage::from(snapshot.as_ref()))?;
        outgoing.send(Message::text(json)).await?;

        // Keep reading while we wait so close frames and pings are seen.
        let pause = sleep(interval);
        tokio::pin!(pause);
        loop {
            tokio::select! {
                _ = &mut pause => break,
                frame = incoming.next() => match frame {
                    None | Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }
}
