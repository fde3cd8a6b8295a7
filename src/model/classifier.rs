use std::path::Path;
use std::sync::Arc;

use log::info;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::data::split::Split;
use crate::data::{normalize_pixel, IMAGE_PIXELS, NUM_CLASSES};
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::model::persist::{load_pair, save_pair};
use crate::network::metadata::ModelMetadata;
use crate::network::network::Mlp;
use crate::network::spec::MlpSpec;
use crate::train::loop_fn::train_loop;
use crate::train::progress::{ProgressCell, TrainingProgress};
use crate::train::train_config::TrainConfig;

/// Lifecycle of a classifier. There is no way back out of `Trained` or
/// `Loaded` within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Untrained,
    Training,
    Trained,
    Loaded,
}

/// The digit classifier shared by the trainer thread and every connection.
///
/// Training works on a private copy of the network and only publishes the
/// parameters once the last epoch is done, so `predict` never sees
/// half-trained weights. Progress is exposed as immutable snapshots.
#[derive(Debug)]
pub struct Classifier {
    network: RwLock<Mlp>,
    progress: ProgressCell,
    state: Mutex<ModelState>,
}

impl Classifier {
    /// Fresh, untrained classifier with randomly initialized parameters.
    pub fn new(spec: &MlpSpec) -> Self {
        Classifier::with_rng(spec, &mut StdRng::from_entropy())
    }

    /// Classifier for the configured architecture. With `SEED` set the initial
    /// weights are reproducible, like shuffling and dropout.
    pub fn from_config(config: &Config) -> Self {
        match config.train.seed {
            Some(seed) => Classifier::with_rng(&config.architecture, &mut StdRng::seed_from_u64(seed)),
            None => Classifier::new(&config.architecture),
        }
    }

    pub fn with_rng<R: rand::Rng + ?Sized>(spec: &MlpSpec, rng: &mut R) -> Self {
        Classifier {
            network: RwLock::new(Mlp::new(spec, rng)),
            progress: ProgressCell::default(),
            state: Mutex::new(ModelState::Untrained),
        }
    }

    pub fn state(&self) -> ModelState {
        *self.state.lock()
    }

    /// Readiness gate for inference.
    pub fn is_trained(&self) -> bool {
        self.progress.snapshot().is_trained
    }

    /// Current progress; never a partially applied epoch.
    pub fn progress_snapshot(&self) -> Arc<TrainingProgress> {
        self.progress.snapshot()
    }

    /// Evaluation-mode logits for a (batch, 784) matrix of normalized pixels.
    pub fn forward(&self, batch: &Matrix) -> Result<Matrix> {
        let network = self.network.read();
        if batch.cols != network.fc1.input_size() {
            return Err(Error::InvalidInput(format!(
                "expected {} features per row, got {}",
                network.fc1.input_size(),
                batch.cols
            )));
        }
        Ok(network.forward(batch))
    }

    /// Trains to completion on the calling thread. Long-running: call it from
    /// a dedicated worker, never from the async runtime.
    pub fn fit(&self, train: &Split, test: &Split, config: &TrainConfig) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ModelState::Untrained {
                return Err(Error::AlreadyTrained);
            }
            *state = ModelState::Training;
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut working = self.network.read().clone();
        self.progress.publish(TrainingProgress::started(config.epochs));

        let result = train_loop(&mut working, train, test, config, &mut rng, |stats| {
            info!(
                "Epoch {}/{}, Train Loss: {:.4}, Val Loss: {:.4}, Val Acc: {:.2}% ({} ms)",
                stats.epoch,
                stats.total_epochs,
                stats.train_loss,
                stats.val_loss,
                stats.val_accuracy * 100.0,
                stats.elapsed_ms
            );
            self.progress.update(|p| p.after_epoch(stats.train_loss, stats.val_loss));
        });

        if let Err(e) = result {
            *self.state.lock() = ModelState::Untrained;
            return Err(e);
        }

        *self.network.write() = working;
        self.progress.update(TrainingProgress::finished);
        *self.state.lock() = ModelState::Trained;
        Ok(())
    }

    /// Predicts the digit for one image of 784 raw 0..=255 intensities.
    ///
    /// Only meaningful once `is_trained()`; callers gate on it.
    pub fn predict(&self, raw_pixels: &[f64]) -> Result<u8> {
        if raw_pixels.len() != IMAGE_PIXELS {
            return Err(Error::InvalidInput(format!(
                "expected {IMAGE_PIXELS} pixels, got {}",
                raw_pixels.len()
            )));
        }
        if raw_pixels.iter().any(|p| !p.is_finite()) {
            return Err(Error::Unexpected("input contains non-finite values".into()));
        }

        let input = Matrix::from_vec(1, IMAGE_PIXELS, raw_pixels.iter().map(|&p| normalize_pixel(p)).collect());
        let logits = self.forward(&input)?;
        if logits.data.iter().any(|x| !x.is_finite()) {
            return Err(Error::Unexpected("model produced non-finite logits".into()));
        }

        let class = logits
            .argmax_rows()
            .first()
            .copied()
            .ok_or_else(|| Error::Unexpected("empty model output".into()))?;
        if class >= NUM_CLASSES {
            return Err(Error::Unexpected(format!("class index {class} is not a digit")));
        }
        Ok(class as u8)
    }

    /// Writes the parameter blob and metadata sidecar as a pair.
    pub fn save(&self, params_path: &Path, meta_path: &Path) -> Result<()> {
        let network = self.network.read();
        let progress = self.progress.snapshot();
        let metadata = ModelMetadata {
            total_epochs: progress.total_epochs,
            current_epoch: progress.current_epoch,
            train_loss: progress.train_loss_history.clone(),
            val_loss: progress.val_loss_history.clone(),
            architecture: network.spec(),
        };
        save_pair(&network, &metadata, params_path, meta_path)
    }

    /// Restores a persisted pair and marks the classifier trained.
    pub fn load(&self, params_path: &Path, meta_path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        if *state != ModelState::Untrained {
            return Err(Error::AlreadyTrained);
        }

        let (network, metadata) = load_pair(params_path, meta_path)?;
        *self.network.write() = network;
        self.progress.publish(TrainingProgress {
            is_trained: true,
            current_epoch: metadata.current_epoch,
            total_epochs: metadata.total_epochs,
            train_loss_history: metadata.train_loss,
            val_loss_history: metadata.val_loss,
        });
        *state = ModelState::Loaded;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::split::Sample;

    /// Ten synthetic "digits": class `k` lights up the k-th horizontal band.
    pub(crate) fn banded_split(per_class: usize) -> Split {
        let band = IMAGE_PIXELS / 10;
        let mut samples = Vec::new();
        for k in 0..10u8 {
            for j in 0..per_class {
                let mut raw = vec![0.0; IMAGE_PIXELS];
                for (i, px) in raw.iter_mut().enumerate().skip(k as usize * band).take(band) {
                    *px = 200.0 + ((i + j) % 50) as f64;
                }
                samples.push(Sample { pixels: raw.iter().map(|&p| normalize_pixel(p)).collect(), label: k });
            }
        }
        Split::new(samples)
    }

    pub(crate) fn banded_image(k: usize) -> Vec<f64> {
        let band = IMAGE_PIXELS / 10;
        let mut raw = vec![0.0; IMAGE_PIXELS];
        for px in raw.iter_mut().skip(k * band).take(band) {
            *px = 230.0;
        }
        raw
    }

    fn small_spec() -> MlpSpec {
        MlpSpec { hidden_size: 32, ..Default::default() }
    }

    fn trained(epochs: usize) -> Classifier {
        let clf = Classifier::with_rng(&small_spec(), &mut StdRng::seed_from_u64(1));
        clf.fit(&banded_split(8), &banded_split(2), &TrainConfig::new(epochs, 16, 0.01).with_seed(2))
            .unwrap();
        clf
    }

    #[test]
    fn starts_untrained() {
        let clf = Classifier::new(&small_spec());
        assert_eq!(clf.state(), ModelState::Untrained);
        assert!(!clf.is_trained());
        assert_eq!(*clf.progress_snapshot(), TrainingProgress::default());
    }

    #[test]
    fn seeded_config_gives_identical_initial_weights() {
        let config = Config::from_lookup(|key| (key == "SEED").then(|| "17".to_owned())).unwrap();
        let a = Classifier::from_config(&config);
        let b = Classifier::from_config(&config);
        assert_eq!(*a.network.read(), *b.network.read());

        let unseeded = Config::default();
        let c = Classifier::from_config(&unseeded);
        let d = Classifier::from_config(&unseeded);
        assert_ne!(*c.network.read(), *d.network.read());
    }

    #[test]
    fn fit_marks_trained_with_full_history() {
        let clf = trained(4);
        let snap = clf.progress_snapshot();
        assert!(snap.is_trained);
        assert_eq!(snap.current_epoch, 4);
        assert_eq!(snap.total_epochs, 4);
        assert_eq!(snap.train_loss_history.len(), 4);
        assert_eq!(snap.val_loss_history.len(), 4);
        assert_eq!(clf.state(), ModelState::Trained);
    }

    #[test]
    fn predictions_are_digits_and_learn_the_bands() {
        let clf = trained(15);
        let correct = (0..10).filter(|&k| clf.predict(&banded_image(k)).unwrap() as usize == k).count();
        assert!(correct >= 9, "only {correct}/10 bands recognised");
        assert!(clf.predict(&[0.0; IMAGE_PIXELS]).unwrap() <= 9);
    }

    #[test]
    fn predict_rejects_wrong_length() {
        let clf = trained(1);
        assert!(matches!(clf.predict(&[0.0; 100]), Err(Error::InvalidInput(_))));
        assert!(matches!(clf.predict(&[f64::NAN; IMAGE_PIXELS]), Err(Error::Unexpected(_))));
    }

    #[test]
    fn diverging_fit_publishes_no_non_finite_loss() {
        let clf = Classifier::with_rng(&small_spec(), &mut StdRng::seed_from_u64(1));
        let mut pixels = vec![0.0; IMAGE_PIXELS];
        pixels[0] = f64::NAN;
        let poisoned = Split::new(vec![Sample { pixels, label: 3 }]);

        let res = clf.fit(&poisoned, &banded_split(1), &TrainConfig::new(2, 4, 0.01).with_seed(1));
        assert!(matches!(res, Err(Error::Unexpected(_))));
        assert_eq!(clf.state(), ModelState::Untrained);
        let snap = clf.progress_snapshot();
        assert!(!snap.is_trained);
        assert!(snap.train_loss_history.iter().chain(&snap.val_loss_history).all(|l| l.is_finite()));
    }

    #[test]
    fn cannot_train_twice() {
        let clf = trained(1);
        let res = clf.fit(&banded_split(1), &banded_split(1), &TrainConfig::new(1, 4, 0.01));
        assert!(matches!(res, Err(Error::AlreadyTrained)));
    }

    #[test]
    fn save_then_load_reproduces_snapshot_and_predictions() {
        let tmp = tempfile::tempdir().unwrap();
        let (p, m) = (tmp.path().join("model.safetensors"), tmp.path().join("model.json"));
        let clf = trained(3);
        clf.save(&p, &m).unwrap();

        let fresh = Classifier::new(&small_spec());
        fresh.load(&p, &m).unwrap();
        assert_eq!(fresh.state(), ModelState::Loaded);
        assert_eq!(*fresh.progress_snapshot(), *clf.progress_snapshot());
        for k in 0..10 {
            let img = banded_image(k);
            assert_eq!(fresh.predict(&img).unwrap(), clf.predict(&img).unwrap());
        }
    }

    #[test]
    fn load_of_missing_pair_leaves_model_untrained() {
        let tmp = tempfile::tempdir().unwrap();
        let clf = Classifier::new(&small_spec());
        let res = clf.load(&tmp.path().join("model.safetensors"), &tmp.path().join("model.json"));
        assert!(matches!(res, Err(Error::PersistedStateCorrupt(_))));
        assert!(!clf.is_trained());
        assert_eq!(clf.state(), ModelState::Untrained);
    }
}
