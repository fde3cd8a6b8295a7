/// Per-epoch statistics produced by `train_loop`.
///
/// The classifier turns each value into a progress snapshot; the validation
/// accuracy only goes to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over the batches of this epoch.
    pub train_loss: f64,
    /// Mean validation loss over the test batches.
    pub val_loss: f64,
    /// Validation accuracy as a fraction in [0, 1].
    pub val_accuracy: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
