pub mod activation;
pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod logging;
pub mod loss;
pub mod math;
pub mod model;
pub mod network;
pub mod optim;
pub mod service;
pub mod supervisor;
pub mod train;

// Convenience re-exports
pub use activation::ActivationFunction;
pub use app::App;
pub use config::Config;
pub use data::{MnistProvider, Split};
pub use error::{Error, Result};
pub use math::Matrix;
pub use model::{Classifier, ModelState};
pub use network::{Mlp, MlpSpec, ModelMetadata};
pub use service::{serve_inference, serve_progress, InferenceResponse, ProgressMessage};
pub use supervisor::{Startup, Supervisor, SupervisorHandle};
pub use train::{TrainConfig, TrainingProgress};
