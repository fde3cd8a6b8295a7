use rand::seq::SliceRandom;
use rand::Rng;

use crate::math::matrix::Matrix;

/// One normalized image and its class label.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub pixels: Vec<f64>,
    pub label: u8,
}

/// A batch of samples as a (len, pixels) matrix plus labels.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<u8>,
}

/// One dataset partition (train or test).
#[derive(Debug, Clone, Default)]
pub struct Split {
    samples: Vec<Sample>,
}

impl Split {
    pub fn new(samples: Vec<Sample>) -> Split {
        Split { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Shuffled batches over the whole split. The order is redrawn on every
    /// call; the last batch may be short.
    ///
    /// # Panics
    /// Panics if `batch_size == 0`.
    pub fn batches<'a, R: Rng + ?Sized>(&'a self, batch_size: usize, rng: &mut R) -> Batches<'a> {
        assert!(batch_size > 0, "batch_size must be at least 1");
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        order.shuffle(rng);
        Batches { split: self, order, batch_size, cursor: 0 }
    }
}

pub struct Batches<'a> {
    split: &'a Split,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let picked = &self.order[self.cursor..end];
        self.cursor = end;

        let rows: Vec<&[f64]> = picked
            .iter()
            .map(|&i| self.split.samples[i].pixels.as_slice())
            .collect();
        let labels = picked.iter().map(|&i| self.split.samples[i].label).collect();

        Some(Batch { inputs: Matrix::from_rows(&rows), labels })
    }
}
