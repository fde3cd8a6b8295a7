use std::time::Instant;

use rand::Rng;

use crate::data::split::Split;
use crate::error::{Error, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::network::network::{Mlp, Mode};
use crate::optim::adam::Adam;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs.
///
/// Each epoch is one shuffled pass over `train` with an Adam step per batch,
/// followed by an evaluation-mode pass over `test`. `on_epoch` is called once
/// per completed epoch with both mean losses; it runs on the caller's thread
/// between epochs, never while a batch is in flight.
///
/// Returns the stats of the last epoch.
pub fn train_loop<R, F>(
    network: &mut Mlp,
    train: &Split,
    test: &Split,
    config: &TrainConfig,
    rng: &mut R,
    mut on_epoch: F,
) -> Result<Option<EpochStats>>
where
    R: Rng + ?Sized,
    F: FnMut(&EpochStats),
{
    if train.is_empty() {
        return Err(Error::InvalidInput("training split is empty".into()));
    }
    if config.batch_size == 0 {
        return Err(Error::InvalidInput("batch_size must be at least 1".into()));
    }

    let mut optimizer = Adam::new(config.learning_rate);
    let mut last = None;

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let train_loss = run_one_epoch(network, train, &mut optimizer, config.batch_size, rng);
        let (val_loss, val_accuracy) = evaluate(network, test, config.batch_size, rng);
        if !train_loss.is_finite() || !val_loss.is_finite() {
            return Err(Error::Unexpected(format!(
                "epoch {epoch} diverged (train loss {train_loss}, val loss {val_loss}); lower the learning rate"
            )));
        }

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            val_loss,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        on_epoch(&stats);
        last = Some(stats);
    }

    Ok(last)
}

/// Mean loss and accuracy over a split in evaluation mode.
pub fn evaluate<R: Rng + ?Sized>(network: &Mlp, split: &Split, batch_size: usize, rng: &mut R) -> (f64, f64) {
    if split.is_empty() {
        return (0.0, 0.0);
    }

    let mut total_loss = 0.0;
    let mut batches = 0usize;
    let mut correct = 0usize;

    for batch in split.batches(batch_size.max(1), rng) {
        let logits = network.forward(&batch.inputs);
        total_loss += CrossEntropyLoss::loss(&logits, &batch.labels);
        batches += 1;
        correct += logits
            .argmax_rows()
            .iter()
            .zip(&batch.labels)
            .filter(|(p, l)| **p == **l as usize)
            .count();
    }

    (total_loss / batches as f64, correct as f64 / split.len() as f64)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// One pass of mini-batch Adam over the training split.
/// Returns the mean of the per-batch losses.
fn run_one_epoch<R: Rng + ?Sized>(
    network: &mut Mlp,
    train: &Split,
    optimizer: &mut Adam,
    batch_size: usize,
    rng: &mut R,
) -> f64 {
    let mut total_loss = 0.0;
    let mut batches = 0usize;

    for batch in train.batches(batch_size, rng) {
        let pass = network.forward_pass(&batch.inputs, Mode::Train, rng);
        let (loss, d_logits) = CrossEntropyLoss::loss_and_gradient(&pass.logits, &batch.labels);
        let grads = network.backward(&pass, &d_logits);
        network.apply_gradients(&grads, optimizer);

        total_loss += loss;
        batches += 1;
    }

    total_loss / batches.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::split::Sample;
    use crate::network::spec::MlpSpec;
    use rand::{rngs::StdRng, SeedableRng};

    /// Two linearly separable blobs in 4 dimensions.
    fn blobs(n: usize) -> Split {
        Split::new(
            (0..n)
                .map(|i| {
                    let label = (i % 2) as u8;
                    let sign = if label == 0 { -1.0 } else { 1.0 };
                    let jitter = (i as f64 * 0.37).sin() * 0.2;
                    Sample { pixels: vec![sign + jitter, sign - jitter, sign, -sign], label }
                })
                .collect(),
        )
    }

    fn tiny_network(rng: &mut StdRng) -> Mlp {
        let spec = MlpSpec { input_size: 4, hidden_size: 8, output_size: 2, dropout: 0.0, ..Default::default() };
        Mlp::new(&spec, rng)
    }

    #[test]
    fn loss_decreases_on_separable_data() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut network = tiny_network(&mut rng);
        let train = blobs(64);
        let test = blobs(16);

        let mut history = Vec::new();
        let config = TrainConfig::new(10, 8, 0.01);
        train_loop(&mut network, &train, &test, &config, &mut rng, |s| history.push(s.clone())).unwrap();

        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().map(|s| s.epoch).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
        assert!(history.last().unwrap().train_loss < history[0].train_loss);
        assert!(history.last().unwrap().val_accuracy > 0.9);
    }

    #[test]
    fn empty_training_split_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut network = tiny_network(&mut rng);
        let res = train_loop(&mut network, &Split::default(), &blobs(4), &TrainConfig::new(1, 4, 0.01), &mut rng, |_| {});
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn non_finite_loss_stops_before_reporting_the_epoch() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut network = tiny_network(&mut rng);
        let poisoned = Split::new(vec![Sample { pixels: vec![f64::NAN, 0.0, 1.0, -1.0], label: 1 }]);

        let mut reported = 0;
        let res = train_loop(&mut network, &poisoned, &blobs(4), &TrainConfig::new(3, 4, 0.01), &mut rng, |_| {
            reported += 1
        });
        assert!(matches!(res, Err(Error::Unexpected(msg)) if msg.contains("diverged")));
        assert_eq!(reported, 0);
    }

    #[test]
    fn zero_epochs_leaves_network_untouched() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut network = tiny_network(&mut rng);
        let before = network.clone();
        let last = train_loop(&mut network, &blobs(8), &blobs(4), &TrainConfig::new(0, 4, 0.01), &mut rng, |_| {}).unwrap();
        assert!(last.is_none());
        assert_eq!(network, before);
    }
}
