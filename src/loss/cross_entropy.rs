use crate::math::matrix::Matrix;

/// Categorical cross-entropy over raw logits (softmax applied internally).
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Row-wise softmax, shifted by the row max for numerical stability.
    pub fn softmax(logits: &Matrix) -> Matrix {
        let mut probs = logits.clone();
        for row in probs.data.chunks_mut(logits.cols.max(1)) {
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for x in row.iter_mut() {
                *x = (*x - max).exp();
                sum += *x;
            }
            for x in row.iter_mut() {
                *x /= sum;
            }
        }
        probs
    }

    /// Mean loss over the batch: `-mean(log softmax(z)[label])`.
    pub fn loss(logits: &Matrix, labels: &[u8]) -> f64 {
        let probs = CrossEntropyLoss::softmax(logits);
        CrossEntropyLoss::loss_from_probs(&probs, labels)
    }

    /// Mean loss and the gradient w.r.t. the logits.
    ///
    /// For softmax composed with cross-entropy the gradient simplifies to
    /// `(softmax(z) - onehot(label)) / batch`.
    pub fn loss_and_gradient(logits: &Matrix, labels: &[u8]) -> (f64, Matrix) {
        assert_eq!(logits.rows, labels.len(), "one label per logits row");
        let probs = CrossEntropyLoss::softmax(logits);
        let loss = CrossEntropyLoss::loss_from_probs(&probs, labels);

        let inv_batch = 1.0 / logits.rows.max(1) as f64;
        let mut grad = probs;
        for (i, &label) in labels.iter().enumerate() {
            grad.data[i * grad.cols + label as usize] -= 1.0;
        }
        (loss, grad.map(|g| g * inv_batch))
    }

    fn loss_from_probs(probs: &Matrix, labels: &[u8]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let total: f64 = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| -(probs.get(i, label as usize) + EPS).ln())
            .sum();
        total / labels.len() as f64
    }
}
