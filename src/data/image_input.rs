use std::path::Path;

use image::imageops::FilterType;

use crate::data::IMAGE_SIDE;
use crate::error::{Error, Result};

/// Decodes an image file (PNG/JPEG/BMP/GIF), resizes it to 28×28, converts
/// it to grayscale and returns the raw 0..=255 intensities in row-major order.
///
/// The result has the same shape and scale as the `imageData` field of an
/// inference request, so it can go straight into `Classifier::predict`.
pub fn load_raw_pixels(path: &Path) -> Result<Vec<f64>> {
    let img = image::open(path)
        .map_err(|e| Error::InvalidInput(format!("cannot read image {}: {e}", path.display())))?;
    let side = IMAGE_SIDE as u32;
    let gray = img.resize_exact(side, side, FilterType::Lanczos3).to_luma8();
    Ok(gray.pixels().map(|p| p.0[0] as f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::IMAGE_PIXELS;
    use image::{GrayImage, Luma};

    #[test]
    fn grayscale_image_keeps_raw_intensities() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("digit.png");
        GrayImage::from_pixel(28, 28, Luma([200u8])).save(&path).unwrap();

        let pixels = load_raw_pixels(&path).unwrap();
        assert_eq!(pixels.len(), IMAGE_PIXELS);
        assert!(pixels.iter().all(|&p| p == 200.0));
    }

    #[test]
    fn other_sizes_are_resized() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big.png");
        GrayImage::from_pixel(56, 40, Luma([0u8])).save(&path).unwrap();
        assert_eq!(load_raw_pixels(&path).unwrap().len(), IMAGE_PIXELS);
    }

    #[test]
    fn unreadable_file_is_invalid_input() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nope.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(load_raw_pixels(&path), Err(Error::InvalidInput(_))));
    }
}
