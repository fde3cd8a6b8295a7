use crate::math::matrix::Matrix;

/// Adam: per-parameter adaptive learning rates from running first and second
/// moment estimates of the gradient.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    beta1_t: f64,
    beta2_t: f64,
    epsilon: f64,
    /// (first moment, second moment) per parameter tensor, created on the
    /// first step.
    moments: Vec<(Vec<f64>, Vec<f64>)>,
}

impl Adam {
    /// Creates an optimizer with the usual defaults (β1 0.9, β2 0.999, ε 1e-8).
    pub fn new(learning_rate: f64) -> Self {
        Adam::with_hyperparams(learning_rate, 0.9, 0.999, 1e-8)
    }

    pub fn with_hyperparams(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.0,
            beta2_t: 1.0,
            epsilon,
            moments: Vec::new(),
        }
    }

    /// Applies one update to every parameter tensor.
    ///
    /// `params` and `grads` must list the same tensors in the same order on
    /// every call.
    ///
    /// # Panics
    /// Panics if a gradient's shape does not match its parameter.
    pub fn step(&mut self, params: &mut [&mut Matrix], grads: &[&Matrix]) {
        assert_eq!(params.len(), grads.len(), "one gradient per parameter tensor");

        if self.moments.is_empty() {
            self.moments = params
                .iter()
                .map(|p| (vec![0.0; p.data.len()], vec![0.0; p.data.len()]))
                .collect();
        }

        let Self { learning_rate: lr, beta1: b1, beta2: b2, epsilon: eps, .. } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1.0 - self.beta1_t;
        let bc2 = 1.0 - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        for ((param, grad), (v, s)) in params.iter_mut().zip(grads).zip(self.moments.iter_mut()) {
            assert_eq!(param.data.len(), grad.data.len(), "gradient shape mismatch");
            param
                .data
                .iter_mut()
                .zip(&grad.data)
                .zip(v.iter_mut())
                .zip(s.iter_mut())
                .for_each(|(((p, g), v), s)| {
                    *v = b1 * *v + (1.0 - b1) * g;
                    *s = b2 * *s + (1.0 - b2) * g * g;
                    *p -= step_size * *v / (s.sqrt() + eps);
                });
        }
    }
}
