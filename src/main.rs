use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{error, info};

use ferrite_live::data::load_raw_pixels;
use ferrite_live::{logging, App, Classifier, Config, Startup, Supervisor};

/// MNIST perceptron trainer with live progress and inference over WebSockets.
#[derive(Parser, Debug)]
#[command(name = "ferrite-live", version)]
struct Cli {
    /// Directory holding the saved model pair and the dataset cache
    #[arg(long, global = true, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start both WebSocket services, loading or training the model (default)
    Serve {
        /// Number of training epochs if no saved model exists
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Train (unless a saved model exists), save, and exit
    Train {
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Classify an image file with the saved model
    Predict {
        /// PNG/JPEG/BMP/GIF; resized to 28x28 grayscale
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command.unwrap_or(Command::Serve { epochs: None }) {
        Command::Serve { epochs } => {
            if let Some(epochs) = epochs {
                config.train.epochs = epochs;
            }
            serve(config).await
        }
        Command::Train { epochs } => {
            if let Some(epochs) = epochs {
                config.train.epochs = epochs;
            }
            train(config).await
        }
        Command::Predict { image } => predict(&config, image),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let app = App::launch(&config).await.context("failed to start services")?;

    let training = app.training.wait();
    tokio::pin!(training);
    let mut training_pending = true;

    loop {
        tokio::select! {
            outcome = &mut training, if training_pending => {
                training_pending = false;
                match outcome {
                    Ok(()) => info!("Model ready for inference"),
                    // keep serving: progress reports untrained, inference answers NotReady
                    Err(e) => error!("Model unavailable: {e}"),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

async fn train(config: Config) -> anyhow::Result<()> {
    let classifier = Arc::new(Classifier::from_config(&config));
    let handle = Supervisor::start(&config, classifier.clone())?;
    if handle.startup() == Startup::Loaded {
        info!(
            "A saved model already exists in {}; remove it to retrain",
            config.data_dir.display()
        );
        return Ok(());
    }
    handle.wait().await?;
    info!("Model written to {}", config.params_path().display());
    Ok(())
}

fn predict(config: &Config, image: PathBuf) -> anyhow::Result<()> {
    let (params_path, meta_path) = (config.params_path(), config.meta_path());
    if !params_path.exists() && !meta_path.exists() {
        bail!("no saved model in {}; run `ferrite-live train` first", config.data_dir.display());
    }

    let classifier = Classifier::from_config(config);
    classifier.load(&params_path, &meta_path)?;
    let pixels = load_raw_pixels(&image)?;
    let digit = classifier.predict(&pixels)?;
    println!("{digit}");
    Ok(())
}
