//! Parser for the IDX binary format used by MNIST.
//!
//! # IDX3 image file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x03        (number of dimensions = 3)
//! bytes  4-7:   N           (number of images, big-endian u32)
//! bytes  8-11:  rows        (image height in pixels, big-endian u32)
//! bytes 12-15:  cols        (image width in pixels, big-endian u32)
//! bytes 16..:   N * rows * cols bytes, row-major, uint8
//! ```
//!
//! # IDX1 label file layout
//! ```text
//! bytes  0-1:   0x00 0x00   (reserved, must be zero)
//! byte   2:     0x08        (dtype = uint8)
//! byte   3:     0x01        (number of dimensions = 1)
//! bytes  4-7:   N           (number of labels, big-endian u32)
//! bytes  8..:   N bytes, each a class index
//! ```

use crate::data::split::Sample;
use crate::data::{normalize_pixel, IMAGE_SIDE, NUM_CLASSES};
use crate::error::{Error, Result};

fn be_u32(bytes: &[u8], at: usize) -> usize {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
}

fn check_header(bytes: &[u8], what: &str, header_len: usize, dims: u8) -> Result<()> {
    if bytes.len() < header_len {
        return Err(Error::Dataset(format!(
            "IDX {what} file too short: expected at least {header_len} header bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(Error::Dataset(format!(
            "IDX {what} file: bytes 0-1 must be 0x00 0x00, got 0x{:02X} 0x{:02X}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(Error::Dataset(format!(
            "IDX {what} file: dtype must be 0x08 (uint8), got 0x{:02X}",
            bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(Error::Dataset(format!(
            "IDX {what} file: expected {dims} dimensions, got {}",
            bytes[3]
        )));
    }
    Ok(())
}

/// Parses an IDX3 image file into raw 28×28 pixel buffers.
pub fn parse_images(bytes: &[u8]) -> Result<Vec<&[u8]>> {
    check_header(bytes, "image", 16, 0x03)?;

    let n_items = be_u32(bytes, 4);
    let rows = be_u32(bytes, 8);
    let cols = be_u32(bytes, 12);
    if rows != IMAGE_SIDE || cols != IMAGE_SIDE {
        return Err(Error::Dataset(format!(
            "IDX image file: expected {IMAGE_SIDE}x{IMAGE_SIDE} images, got {rows}x{cols}"
        )));
    }

    let n_pixels = rows * cols;
    let needed = n_items
        .checked_mul(n_pixels)
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| Error::Dataset("IDX image file: data length overflows usize".into()))?;
    if bytes.len() < needed {
        return Err(Error::Dataset(format!(
            "IDX image file too short: header declares {n_items} images ({needed} bytes), file has {}",
            bytes.len()
        )));
    }

    Ok(bytes[16..needed].chunks_exact(n_pixels).collect())
}

/// Parses an IDX1 label file.
pub fn parse_labels(bytes: &[u8]) -> Result<&[u8]> {
    check_header(bytes, "label", 8, 0x01)?;

    let n_items = be_u32(bytes, 4);
    let needed = 8 + n_items;
    if bytes.len() < needed {
        return Err(Error::Dataset(format!(
            "IDX label file too short: header declares {n_items} labels, file has {} bytes",
            bytes.len()
        )));
    }

    let labels = &bytes[8..needed];
    if let Some((i, bad)) = labels.iter().enumerate().find(|(_, l)| **l as usize >= NUM_CLASSES) {
        return Err(Error::Dataset(format!(
            "IDX label at index {i}: class {bad} is out of range for {NUM_CLASSES} classes"
        )));
    }
    Ok(labels)
}

/// Parses an image/label file pair into normalized samples.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8]) -> Result<Vec<Sample>> {
    let images = parse_images(image_bytes)?;
    let labels = parse_labels(label_bytes)?;

    if images.len() != labels.len() {
        return Err(Error::Dataset(format!(
            "IDX file mismatch: {} images but {} labels",
            images.len(),
            labels.len()
        )));
    }

    Ok(images
        .into_iter()
        .zip(labels)
        .map(|(pixels, &label)| Sample {
            pixels: pixels.iter().map(|&p| normalize_pixel(p as f64)).collect(),
            label,
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::IMAGE_PIXELS;

    /// Encodes images/labels as an in-memory IDX pair.
    pub(crate) fn encode_pair(images: &[Vec<u8>], labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut img = vec![0x00, 0x00, 0x08, 0x03];
        img.extend_from_slice(&(images.len() as u32).to_be_bytes());
        img.extend_from_slice(&(IMAGE_SIDE as u32).to_be_bytes());
        img.extend_from_slice(&(IMAGE_SIDE as u32).to_be_bytes());
        for image in images {
            img.extend_from_slice(image);
        }

        let mut lbl = vec![0x00, 0x00, 0x08, 0x01];
        lbl.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        lbl.extend_from_slice(labels);
        (img, lbl)
    }

    #[test]
    fn parses_and_normalizes() {
        let (img, lbl) = encode_pair(&[vec![0; IMAGE_PIXELS], vec![255; IMAGE_PIXELS]], &[3, 7]);
        let samples = parse_idx_pair(&img, &lbl).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, 3);
        assert!(samples[0].pixels.iter().all(|&p| p == -1.0));
        assert!(samples[1].pixels.iter().all(|&p| p == 1.0));
        assert_eq!(samples[1].pixels.len(), IMAGE_PIXELS);
    }

    #[test]
    fn rejects_truncated_images() {
        let (mut img, lbl) = encode_pair(&[vec![0; IMAGE_PIXELS]], &[1]);
        img.truncate(100);
        assert!(matches!(parse_idx_pair(&img, &lbl), Err(Error::Dataset(_))));
    }

    #[test]
    fn rejects_count_mismatch() {
        let (img, _) = encode_pair(&[vec![0; IMAGE_PIXELS]], &[1]);
        let (_, lbl) = encode_pair(&[], &[1, 2]);
        let err = parse_idx_pair(&img, &lbl).unwrap_err();
        assert!(err.to_string().contains("1 images but 2 labels"));
    }

    #[test]
    fn rejects_wrong_magic() {
        let (mut img, lbl) = encode_pair(&[vec![0; IMAGE_PIXELS]], &[1]);
        img[3] = 0x01;
        assert!(parse_idx_pair(&img, &lbl).is_err());
    }

    #[test]
    fn rejects_out_of_range_label() {
        let (img, lbl) = encode_pair(&[vec![0; IMAGE_PIXELS]], &[10]);
        assert!(parse_idx_pair(&img, &lbl).is_err());
    }
}
