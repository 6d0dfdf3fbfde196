use crate::cnn::conv::Image;

/// Parse failures of an IDX image/label file pair.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdxError {
    #[error("IDX {file} file too short: expected at least {expected} bytes, got {actual}")]
    TooShort { file: &'static str, expected: usize, actual: usize },

    #[error("IDX {file} file: bad header byte {index}: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadHeader { file: &'static str, index: usize, expected: u8, actual: u8 },

    #[error("IDX file mismatch: image file declares {images} items but label file declares {labels}")]
    CountMismatch { images: usize, labels: usize },

    #[error("IDX label at index {index}: class {class} is out of range for {classes} classes")]
    ClassOutOfRange { index: usize, class: usize, classes: usize },

    #[error("IDX image file: {0}")]
    Overflow(String),
}

/// A decoded IDX3 image file paired with its IDX1 labels.
///
/// # IDX3 image file layout
/// ```text
/// bytes  0-1:   0x00 0x00   (reserved)
/// byte   2:     0x08        (dtype = uint8)
/// byte   3:     0x03        (number of dimensions)
/// bytes  4-7:   N           (number of images, big-endian u32)
/// bytes  8-11:  rows        (big-endian u32)
/// bytes 12-15:  cols        (big-endian u32)
/// bytes 16..:   N * rows * cols bytes, row-major
/// ```
///
/// # IDX1 label file layout
/// ```text
/// bytes  0-3:   0x00 0x00 0x08 0x01
/// bytes  4-7:   N           (big-endian u32)
/// bytes  8..:   N class indices
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IdxSet {
    pub rows: usize,
    pub cols: usize,
    pub images: Vec<Image<u8>>,
    /// One-hot, `n_classes` wide.
    pub labels: Vec<Vec<f64>>,
}

impl IdxSet {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Flattened pixels scaled into `[0, 1]`.
    pub fn scaled_inputs(&self) -> Vec<Vec<f64>> {
        self.images.iter()
            .map(|image| image.iter().flatten().map(|&px| px as f64 / 255.0).collect())
            .collect()
    }

    /// Keeps only the first `limit` samples.
    pub fn truncate(&mut self, limit: usize) {
        self.images.truncate(limit);
        self.labels.truncate(limit);
    }
}

fn check_header(bytes: &[u8], file: &'static str, dims: u8, min_len: usize) -> Result<(), IdxError> {
    if bytes.len() < min_len {
        return Err(IdxError::TooShort { file, expected: min_len, actual: bytes.len() });
    }
    for (index, expected) in [0x00, 0x00, 0x08, dims].into_iter().enumerate() {
        if bytes[index] != expected {
            return Err(IdxError::BadHeader { file, index, expected, actual: bytes[index] });
        }
    }
    Ok(())
}

fn read_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]) as usize
}

/// Parses an IDX image file and its label file into images and one-hot labels.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8], n_classes: usize) -> Result<IdxSet, IdxError> {
    check_header(image_bytes, "image", 0x03, 16)?;
    let n_items = read_u32(image_bytes, 4);
    let rows = read_u32(image_bytes, 8);
    let cols = read_u32(image_bytes, 12);

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        IdxError::Overflow(format!("rows * cols overflows usize (rows={}, cols={})", rows, cols))
    })?;
    let required_image_len = n_items.checked_mul(n_pixels)
        .and_then(|data| data.checked_add(16))
        .ok_or_else(|| IdxError::Overflow(format!("{} items of {} pixels overflow usize", n_items, n_pixels)))?;
    if image_bytes.len() < required_image_len {
        return Err(IdxError::TooShort { file: "image", expected: required_image_len, actual: image_bytes.len() });
    }

    check_header(label_bytes, "label", 0x01, 8)?;
    let label_count = read_u32(label_bytes, 4);
    if label_count != n_items {
        return Err(IdxError::CountMismatch { images: n_items, labels: label_count });
    }
    if label_bytes.len() < 8 + n_items {
        return Err(IdxError::TooShort { file: "label", expected: 8 + n_items, actual: label_bytes.len() });
    }

    let images: Vec<Image<u8>> = if n_pixels == 0 {
        vec![Vec::new(); n_items]
    } else {
        image_bytes[16..required_image_len]
            .chunks_exact(n_pixels)
            .map(|chunk| chunk.chunks_exact(cols).map(|row| row.to_vec()).collect())
            .collect()
    };

    let mut labels = Vec::with_capacity(n_items);
    for (index, &class) in label_bytes[8..8 + n_items].iter().enumerate() {
        let class = class as usize;
        if class >= n_classes {
            return Err(IdxError::ClassOutOfRange { index, class, classes: n_classes });
        }
        let mut one_hot = vec![0.0; n_classes];
        one_hot[class] = 1.0;
        labels.push(one_hot);
    }

    log::debug!("parsed {} IDX samples of {}x{} pixels", n_items, rows, cols);
    Ok(IdxSet { rows, cols, images, labels })
}
