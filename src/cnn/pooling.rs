use serde::{Serialize, Deserialize};

use crate::cnn::conv::FeatureMap;
use crate::error::{Error, Result};

/// How one pooling window collapses into a single pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolingMethod {
    /// Largest value in the window.
    Max,
    /// Integer mean, truncated toward zero.
    Average,
    /// `sqrt(Σ v²)`, truncated.
    L2,
}

impl PoolingMethod {
    fn reduce(&self, window: &[i64]) -> i64 {
        match self {
            PoolingMethod::Max => window.iter().copied().max().unwrap_or(0),
            PoolingMethod::Average => {
                let sum: i64 = window.iter().sum();
                sum / window.len().max(1) as i64
            }
            PoolingMethod::L2 => {
                let squares: i128 = window.iter().map(|&v| (v as i128) * (v as i128)).sum();
                (squares as f64).sqrt() as i64
            }
        }
    }
}

/// One non-overlapping pooling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolingStage {
    pub method: PoolingMethod,
    pub window_height: usize,
    pub window_width: usize,
}

impl PoolingStage {
    pub fn new(method: PoolingMethod, window_height: usize, window_width: usize) -> PoolingStage {
        PoolingStage { method, window_height, window_width }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_height == 0 || self.window_width == 0 {
            return Err(Error::InvalidConfig(format!(
                "pooling window must be at least 1×1, got {}×{}",
                self.window_height, self.window_width
            )));
        }
        Ok(())
    }

    /// Tiles `map` with windows from (0, 0) and reduces each to one pixel.
    ///
    /// Trailing rows/columns that do not fill a whole window are dropped.
    pub fn apply(&self, map: &FeatureMap) -> Result<FeatureMap> {
        self.validate()?;
        let (wh, ww) = (self.window_height, self.window_width);
        let out_rows = map.len() / wh;
        let out_cols = map.first().map_or(0, Vec::len) / ww;

        let mut window = Vec::with_capacity(wh * ww);
        let mut output = vec![vec![0i64; out_cols]; out_rows];
        for (r, out_row) in output.iter_mut().enumerate() {
            for (c, out) in out_row.iter_mut().enumerate() {
                window.clear();
                for row in &map[r * wh..(r + 1) * wh] {
                    window.extend_from_slice(&row[c * ww..(c + 1) * ww]);
                }
                *out = self.method.reduce(&window);
            }
        }
        Ok(output)
    }
}
