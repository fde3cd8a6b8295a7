use std::fs;
use std::sync::Arc;
use std::thread;

use log::{error, info};
use tokio::sync::oneshot;

use crate::config::Config;
use crate::data::mnist::MnistProvider;
use crate::error::{Error, Result};
use crate::model::classifier::Classifier;

/// How the classifier got its parameters at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// A persisted pair was restored; the model is ready immediately.
    Loaded,
    /// No persisted pair; a `trainer` thread is training from scratch.
    Training,
}

/// Handle returned by [`Supervisor::start`].
#[derive(Debug)]
pub struct SupervisorHandle {
    startup: Startup,
    done: oneshot::Receiver<Result<()>>,
}

impl SupervisorHandle {
    pub fn startup(&self) -> Startup {
        self.startup
    }

    /// Resolves once the model is trained and saved (or right away if it was
    /// loaded). Errors from the training thread are reported here.
    pub async fn wait(self) -> Result<()> {
        match self.done.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Unexpected("training thread exited without reporting".into())),
        }
    }
}

/// Decides between loading a persisted model and training a new one.
pub struct Supervisor;

impl Supervisor {
    /// Loads `<data_dir>/model.{safetensors,json}` when both exist, otherwise
    /// starts training on a dedicated thread and returns without waiting.
    ///
    /// Exactly one of the two files being present is an error: the pair is
    /// written together, so a lone file means something went wrong earlier.
    pub fn start(config: &Config, classifier: Arc<Classifier>) -> Result<SupervisorHandle> {
        let params_path = config.params_path();
        let meta_path = config.meta_path();

        match (params_path.exists(), meta_path.exists()) {
            (true, true) => {
                info!("Loading model from {}", params_path.display());
                classifier.load(&params_path, &meta_path)?;
                let progress = classifier.progress_snapshot();
                info!(
                    "Model loaded ({} of {} epochs recorded)",
                    progress.current_epoch, progress.total_epochs
                );

                let (tx, done) = oneshot::channel();
                let _ = tx.send(Ok(()));
                Ok(SupervisorHandle { startup: Startup::Loaded, done })
            }
            (false, false) => {
                info!("No saved model in {}; training from scratch", config.data_dir.display());
                let (tx, done) = oneshot::channel();
                let config = config.clone();

                thread::Builder::new().name("trainer".into()).spawn(move || {
                    let outcome = train_and_save(&config, &classifier);
                    if let Err(e) = &outcome {
                        error!("Training failed: {e}");
                    }
                    // The receiver may be gone if nobody waits; that is fine.
                    let _ = tx.send(outcome);
                })?;

                Ok(SupervisorHandle { startup: Startup::Training, done })
            }
            (has_params, _) => {
                let (present, missing) = if has_params {
                    (&params_path, &meta_path)
                } else {
                    (&meta_path, &params_path)
                };
                Err(Error::PersistedStateCorrupt(format!(
                    "{} exists but {} is missing",
                    present.display(),
                    missing.display()
                )))
            }
        }
    }
}

fn train_and_save(config: &Config, classifier: &Classifier) -> Result<()> {
    let provider = MnistProvider::new(config.dataset_dir()).with_base_url(config.mnist_base_url.as_str());
    let (train, test) = provider.load()?;

    classifier.fit(&train, &test, &config.train)?;

    fs::create_dir_all(&config.data_dir)?;
    classifier.save(&config.params_path(), &config.meta_path())
}
