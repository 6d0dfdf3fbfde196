use num_traits::PrimInt;

use crate::error::{Error, Result};

/// A 2-D image, row-major.
pub type Image<T> = Vec<Vec<T>>;

/// Convolution/pooling working buffer. Wide enough that integer kernels with
/// coefficients outside ±1 cannot overflow.
pub type FeatureMap = Vec<Vec<i64>>;

/// Rows and columns of a non-empty rectangular matrix.
pub(crate) fn dimensions<T>(matrix: &[Vec<T>], what: &'static str) -> Result<(usize, usize)> {
    let width = matrix.first().map_or(0, Vec::len);
    if matrix.is_empty() || width == 0 {
        return Err(Error::InvalidConfig(format!("{} must not be empty", what)));
    }
    if let Some(row) = matrix.iter().find(|row| row.len() != width) {
        return Err(Error::dimension(what, width, row.len()));
    }
    Ok((matrix.len(), width))
}

/// Widens an image into a feature map.
pub fn widen<T: PrimInt + Into<i64>>(image: &[Vec<T>]) -> FeatureMap {
    image.iter()
        .map(|row| row.iter().map(|&px| px.into()).collect())
        .collect()
}

fn average(a: i64, b: i64) -> i64 {
    ((a + b) as f64 / 2.0).round() as i64
}

/// Edge-replicating padding by `ph` rows and `pw` columns on each side,
/// followed by the corner smoothing pass.
///
/// Smoothing replaces a pixel with the rounded mean of its horizontal
/// neighbour towards the image and its vertical neighbour towards the image.
/// The top-left block covers the true padded corner. The other three blocks
/// use columns `width - pw..width` and rows `height - ph..height` in padded
/// coordinates, which lie inside the replicated border and, for the
/// bottom-right block, inside the image itself. Existing feature vectors
/// depend on these exact offsets.
pub fn pad_edges(map: &FeatureMap, ph: usize, pw: usize) -> FeatureMap {
    let height = map.len();
    let width = map.first().map_or(0, Vec::len);
    if height == 0 || width == 0 {
        return map.clone();
    }

    let mut padded: FeatureMap = Vec::with_capacity(height + 2 * ph);
    for _ in 0..ph {
        padded.push(map[0].clone());
    }
    padded.extend(map.iter().cloned());
    for _ in 0..ph {
        padded.push(map[height - 1].clone());
    }
    for row in padded.iter_mut() {
        let first = row[0];
        let last = row[width - 1];
        let mut widened = Vec::with_capacity(width + 2 * pw);
        widened.extend(std::iter::repeat(first).take(pw));
        widened.extend_from_slice(row);
        widened.extend(std::iter::repeat(last).take(pw));
        *row = widened;
    }

    let left: Vec<usize> = (0..pw).rev().collect();
    let top: Vec<usize> = (0..ph).rev().collect();
    let right: Vec<usize> = (width.saturating_sub(pw).max(1)..width).collect();
    let bottom: Vec<usize> = (height.saturating_sub(ph).max(1)..height).collect();

    for &r in &top {
        for &c in &left {
            padded[r][c] = average(padded[r][c + 1], padded[r + 1][c]);
        }
    }
    for &r in &bottom {
        for &c in &left {
            padded[r][c] = average(padded[r][c + 1], padded[r - 1][c]);
        }
    }
    for &r in &top {
        for &c in &right {
            padded[r][c] = average(padded[r][c - 1], padded[r + 1][c]);
        }
    }
    for &r in &bottom {
        for &c in &right {
            padded[r][c] = average(padded[r][c - 1], padded[r - 1][c]);
        }
    }
    padded
}

/// Stride-1 convolution of `map` with an integer kernel, same output size
/// as the input. Padding is `floor(kh / 2)` × `floor(kw / 2)`.
///
/// The kernel is applied without flipping.
pub fn convolve(map: &FeatureMap, kernel: &[Vec<i64>]) -> Result<FeatureMap> {
    let (kh, kw) = dimensions(kernel, "kernel")?;
    let (height, width) = dimensions(map, "image")?;
    let padded = pad_edges(map, kh / 2, kw / 2);

    let output = (0..height)
        .map(|i| {
            (0..width)
                .map(|j| {
                    let mut acc = 0i64;
                    for (k, kernel_row) in kernel.iter().enumerate() {
                        for (l, &coefficient) in kernel_row.iter().enumerate() {
                            acc += coefficient * padded[i + k][j + l];
                        }
                    }
                    acc
                })
                .collect()
        })
        .collect();
    Ok(output)
}

/// Brings a raw convolution output back into `[0, type_max]`.
///
/// When `max |v| <= type_max` every value passes through unchanged.
/// Otherwise each value becomes `round(v / max|v| * type_max)` clipped to
/// `[0, type_max]`.
pub fn rescale(map: FeatureMap, type_max: i64) -> FeatureMap {
    let max_abs = map.iter().flatten().map(|v| v.abs()).max().unwrap_or(0);
    if max_abs <= type_max {
        return map;
    }
    let scale = type_max as f64 / max_abs as f64;
    map.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| ((v as f64 * scale).round() as i64).clamp(0, type_max))
                .collect()
        })
        .collect()
}

/// Largest value of the pixel type, as the rescaling bound.
pub fn type_max<T: PrimInt + Into<i64>>() -> i64 {
    T::max_value().into()
}
