pub mod idx;
pub mod image_input;
pub mod mnist;
pub mod split;

pub use image_input::load_raw_pixels;
pub use mnist::MnistProvider;
pub use split::{Batch, Sample, Split};

/// Side length of a square MNIST image.
pub const IMAGE_SIDE: usize = 28;
/// Flattened image length, the only length the inference channel accepts.
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

/// Maps a raw 0..=255 intensity into [-1, 1].
///
/// Both the dataset loader and `Classifier::predict` go through this
/// function; training and inference must normalize identically.
pub fn normalize_pixel(raw: f64) -> f64 {
    (raw / 255.0 - 0.5) / 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_spans_minus_one_to_one() {
        assert_eq!(normalize_pixel(0.0), -1.0);
        assert_eq!(normalize_pixel(255.0), 1.0);
        assert!(normalize_pixel(127.5).abs() < 1e-12);
    }
}
