#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ferrite_live::data::{normalize_pixel, Sample, IMAGE_PIXELS};
use ferrite_live::{serve_inference, serve_progress, Classifier, MlpSpec, Split, TrainConfig};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn small_spec() -> MlpSpec {
    MlpSpec { hidden_size: 16, ..Default::default() }
}

/// Raw 0..=255 image where class `k` lights up the k-th horizontal band.
pub fn band_image(k: usize) -> Vec<f64> {
    let band = IMAGE_PIXELS / 10;
    let mut raw = vec![0.0; IMAGE_PIXELS];
    for px in raw.iter_mut().skip(k * band).take(band) {
        *px = 230.0;
    }
    raw
}

pub fn band_split(per_class: usize) -> Split {
    let samples = (0..10usize)
        .flat_map(|k| {
            (0..per_class).map(move |_| Sample {
                pixels: band_image(k).into_iter().map(normalize_pixel).collect(),
                label: k as u8,
            })
        })
        .collect();
    Split::new(samples)
}

pub fn trained_classifier() -> Arc<Classifier> {
    let classifier = Arc::new(Classifier::new(&small_spec()));
    classifier
        .fit(&band_split(4), &band_split(1), &TrainConfig::new(3, 8, 0.01).with_seed(7))
        .unwrap();
    classifier
}

pub async fn start_progress(classifier: Arc<Classifier>, interval: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_progress(listener, classifier, interval));
    addr
}

pub async fn start_inference(classifier: Arc<Classifier>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_inference(listener, classifier));
    addr
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    client
}

/// Next text frame as JSON, skipping control frames.
pub async fn next_json(client: &mut Client) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(30), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .expect("transport error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

pub async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_owned())).await.unwrap();
}
