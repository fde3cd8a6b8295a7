use rand::Rng;

use crate::math::matrix::Matrix;

/// Inverted dropout.
///
/// In training mode each activation is kept with probability `1 - p` and the
/// survivors are scaled by `1 / (1 - p)`, so evaluation mode is the identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    p: f64,
}

impl Dropout {
    /// # Panics
    /// Panics unless `0.0 <= p < 1.0`.
    pub fn new(p: f64) -> Dropout {
        assert!((0.0..1.0).contains(&p), "dropout probability must be in [0, 1), got {p}");
        Dropout { p }
    }

    pub fn probability(&self) -> f64 {
        self.p
    }

    /// Samples a (rows, cols) mask of `0` and `1 / (1 - p)`.
    pub fn mask<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let keep = 1.0 / (1.0 - self.p);
        let data = (0..rows * cols)
            .map(|_| if rng.gen::<f64>() < self.p { 0.0 } else { keep })
            .collect();
        Matrix::from_vec(rows, cols, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn zero_probability_keeps_everything() {
        let mask = Dropout::new(0.0).mask(3, 4, &mut StdRng::seed_from_u64(1));
        assert!(mask.data.iter().all(|&m| m == 1.0));
    }

    #[test]
    fn mask_entries_are_dropped_or_rescaled() {
        let dropout = Dropout::new(0.5);
        let mask = dropout.mask(50, 50, &mut StdRng::seed_from_u64(3));
        assert!(mask.data.iter().all(|&m| m == 0.0 || m == 2.0));
        let dropped = mask.data.iter().filter(|&&m| m == 0.0).count();
        assert!(dropped > 1000 && dropped < 1500, "dropped {dropped} of 2500");
    }

    #[test]
    #[should_panic]
    fn rejects_probability_one() {
        Dropout::new(1.0);
    }
}
