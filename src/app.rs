use std::net::SocketAddr;
use std::sync::Arc;

use log::info;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::classifier::Classifier;
use crate::service::{serve_inference, serve_progress};
use crate::supervisor::{Supervisor, SupervisorHandle};

/// A running service: both endpoints accepting, load-or-train under way.
pub struct App {
    pub classifier: Arc<Classifier>,
    pub progress_addr: SocketAddr,
    pub inference_addr: SocketAddr,
    pub training: SupervisorHandle,
}

impl App {
    /// Binds and spawns both endpoints first, then hands the classifier to the
    /// supervisor. Clients can connect while a saved model is still loading;
    /// until it is ready they see an untrained snapshot.
    pub async fn launch(config: &Config) -> Result<App> {
        let classifier = Arc::new(Classifier::from_config(config));

        let progress_listener = TcpListener::bind(config.progress_addr()).await?;
        let inference_listener = TcpListener::bind(config.inference_addr()).await?;
        let progress_addr = progress_listener.local_addr()?;
        let inference_addr = inference_listener.local_addr()?;

        tokio::spawn(serve_progress(progress_listener, classifier.clone(), config.progress_interval));
        tokio::spawn(serve_inference(inference_listener, classifier.clone()));

        // A persisted pair is loaded synchronously; keep it off the runtime workers.
        let training = {
            let config = config.clone();
            let classifier = classifier.clone();
            tokio::task::spawn_blocking(move || Supervisor::start(&config, classifier))
                .await
                .map_err(|e| Error::Unexpected(format!("model restore task failed: {e}")))??
        };
        info!("Endpoints up on ws://{progress_addr} (progress) and ws://{inference_addr} (inference)");

        Ok(App { classifier, progress_addr, inference_addr, training })
    }
}
