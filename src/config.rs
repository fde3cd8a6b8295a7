use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::activation::activation::ActivationFunction;
use crate::data::mnist::DEFAULT_BASE_URL;
use crate::error::{Error, Result};
use crate::network::spec::MlpSpec;
use crate::train::train_config::TrainConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PROGRESS_PORT: u16 = 5001;
pub const DEFAULT_INFERENCE_PORT: u16 = 5002;

/// Process configuration, read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub progress_port: u16,
    pub inference_port: u16,
    /// Holds the persisted model pair and the dataset cache.
    pub data_dir: PathBuf,
    pub mnist_base_url: String,
    pub progress_interval: Duration,
    pub train: TrainConfig,
    pub architecture: MlpSpec,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_owned(),
            progress_port: DEFAULT_PROGRESS_PORT,
            inference_port: DEFAULT_INFERENCE_PORT,
            data_dir: PathBuf::from("data"),
            mnist_base_url: DEFAULT_BASE_URL.to_owned(),
            progress_interval: Duration::from_millis(1000),
            train: TrainConfig::default(),
            architecture: MlpSpec::default(),
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Config::default();

        let train = TrainConfig {
            epochs: parse(&lookup, "EPOCHS", d.train.epochs)?,
            batch_size: parse(&lookup, "BATCH_SIZE", d.train.batch_size)?,
            learning_rate: parse(&lookup, "LEARNING_RATE", d.train.learning_rate)?,
            seed: match lookup("SEED") {
                Some(_) => Some(parse(&lookup, "SEED", 0u64)?),
                None => None,
            },
        };
        let architecture = MlpSpec {
            hidden_size: parse(&lookup, "HIDDEN_SIZE", d.architecture.hidden_size)?,
            activation: parse::<ActivationFunction>(&lookup, "ACTIVATION", d.architecture.activation)?,
            dropout: parse(&lookup, "DROPOUT", d.architecture.dropout)?,
            ..d.architecture
        };

        let config = Config {
            host: lookup("HOST").unwrap_or(d.host),
            progress_port: parse(&lookup, "PROGRESS_PORT", d.progress_port)?,
            inference_port: parse(&lookup, "INFERENCE_PORT", d.inference_port)?,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            mnist_base_url: lookup("MNIST_BASE_URL").unwrap_or(d.mnist_base_url),
            progress_interval: Duration::from_millis(parse(&lookup, "PROGRESS_INTERVAL_MS", 1000u64)?),
            train,
            architecture,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.train.batch_size == 0 {
            return Err(Error::Config("BATCH_SIZE must be at least 1".into()));
        }
        if self.architecture.hidden_size == 0 {
            return Err(Error::Config("HIDDEN_SIZE must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.architecture.dropout) {
            return Err(Error::Config("DROPOUT must be in [0, 1)".into()));
        }
        if !(self.train.learning_rate > 0.0) {
            return Err(Error::Config("LEARNING_RATE must be positive".into()));
        }
        Ok(())
    }

    pub fn progress_addr(&self) -> String {
        format!("{}:{}", self.host, self.progress_port)
    }

    pub fn inference_addr(&self) -> String {
        format!("{}:{}", self.host, self.inference_port)
    }

    pub fn params_path(&self) -> PathBuf {
        self.data_dir.join("model.safetensors")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.data_dir.join("model.json")
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.data_dir.join("datasets")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.progress_addr(), "0.0.0.0:5001");
        assert_eq!(config.inference_addr(), "0.0.0.0:5002");
        assert_eq!(config.params_path(), PathBuf::from("data/model.safetensors"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PROGRESS_PORT", "6001"),
            ("EPOCHS", "3"),
            ("ACTIVATION", "tanh"),
            ("PROGRESS_INTERVAL_MS", "250"),
            ("SEED", "17"),
        ]))
        .unwrap();
        assert_eq!(config.progress_addr(), "127.0.0.1:6001");
        assert_eq!(config.train.epochs, 3);
        assert_eq!(config.train.seed, Some(17));
        assert_eq!(config.architecture.activation, ActivationFunction::Tanh);
        assert_eq!(config.progress_interval, Duration::from_millis(250));
    }

    #[test]
    fn unparsable_values_are_config_errors() {
        let err = Config::from_lookup(lookup_from(&[("INFERENCE_PORT", "http")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("INFERENCE_PORT"));
    }

    #[test]
    fn out_of_range_dropout_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[("DROPOUT", "1.0")])).is_err());
    }
}
