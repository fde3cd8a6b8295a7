use std::sync::Arc;

use parking_lot::RwLock;

/// Immutable view of the training state at one point in time.
///
/// A new value is built for every change and swapped in whole, so a reader
/// never observes an epoch counter that disagrees with the loss histories.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingProgress {
    pub is_trained: bool,
    pub current_epoch: usize,
    pub total_epochs: usize,
    pub train_loss_history: Vec<f64>,
    pub val_loss_history: Vec<f64>,
}

impl TrainingProgress {
    /// State published when a training run begins.
    pub fn started(total_epochs: usize) -> Self {
        TrainingProgress { total_epochs, ..Default::default() }
    }

    /// The snapshot after one more completed epoch.
    pub fn after_epoch(&self, train_loss: f64, val_loss: f64) -> Self {
        let mut next = self.clone();
        next.train_loss_history.push(train_loss);
        next.val_loss_history.push(val_loss);
        next.current_epoch = next.train_loss_history.len();
        next
    }

    /// The same snapshot marked as trained.
    pub fn finished(&self) -> Self {
        TrainingProgress { is_trained: true, ..self.clone() }
    }
}

/// Single-writer, many-reader holder of the current snapshot.
#[derive(Debug, Default)]
pub struct ProgressCell {
    current: RwLock<Arc<TrainingProgress>>,
}

impl ProgressCell {
    pub fn new(initial: TrainingProgress) -> Self {
        ProgressCell { current: RwLock::new(Arc::new(initial)) }
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<TrainingProgress> {
        Arc::clone(&*self.current.read())
    }

    /// Replaces the snapshot in one step.
    pub fn publish(&self, next: TrainingProgress) {
        *self.current.write() = Arc::new(next);
    }

    /// Builds the next snapshot from the current one and publishes it while
    /// holding the write lock, so concurrent updates cannot interleave.
    pub fn update<F>(&self, f: F) -> Arc<TrainingProgress>
    where
        F: FnOnce(&TrainingProgress) -> TrainingProgress,
    {
        let mut guard = self.current.write();
        let next = Arc::new(f(&guard));
        *guard = Arc::clone(&next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_progress_is_untrained_and_empty() {
        let cell = ProgressCell::default();
        let snap = cell.snapshot();
        assert!(!snap.is_trained);
        assert_eq!(snap.current_epoch, 0);
        assert!(snap.train_loss_history.is_empty());
    }

    #[test]
    fn snapshots_are_idempotent_without_updates() {
        let cell = ProgressCell::new(TrainingProgress::started(5).after_epoch(1.0, 1.1));
        assert_eq!(cell.snapshot(), cell.snapshot());
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_publishes() {
        let cell = ProgressCell::new(TrainingProgress::started(3));
        let before = cell.snapshot();
        cell.update(|p| p.after_epoch(0.5, 0.6));
        assert_eq!(before.current_epoch, 0);
        assert_eq!(cell.snapshot().current_epoch, 1);
    }

    #[test]
    fn finished_keeps_history() {
        let p = TrainingProgress::started(2).after_epoch(0.9, 1.0).after_epoch(0.4, 0.5).finished();
        assert!(p.is_trained);
        assert_eq!(p.current_epoch, 2);
        assert_eq!(p.val_loss_history, vec![1.0, 0.5]);
    }

    #[test]
    fn concurrent_readers_never_see_torn_state() {
        let cell = Arc::new(ProgressCell::new(TrainingProgress::started(500)));

        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                for i in 0..500 {
                    cell.update(|p| p.after_epoch(i as f64, i as f64 + 0.5));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..2000 {
                        let snap = cell.snapshot();
                        assert_eq!(snap.train_loss_history.len(), snap.current_epoch);
                        assert_eq!(snap.val_loss_history.len(), snap.current_epoch);
                        assert!(snap.current_epoch >= last);
                        last = snap.current_epoch;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(cell.snapshot().current_epoch, 500);
    }
}
