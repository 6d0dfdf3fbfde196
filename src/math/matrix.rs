use serde::{Serialize, Deserialize};

/// Weight matrix of one layer, stored one row per node.
///
/// `data[n]` holds the incoming weights of node `n`, one per node of the
/// previous layer (or per raw input for the first layer), so `cols` is the
/// fan-in and `rows` the node count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Builds a matrix from row data. An empty `data` gives a 0×0 matrix.
    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        Matrix {
            rows: data.len(),
            cols: data.first().map_or(0, |row| row.len()),
            data
        }
    }

    /// `Σ_k data[row][k] * values[k]`.
    pub fn dot_row(&self, row: usize, values: &[f64]) -> f64 {
        self.data[row].iter().zip(values.iter())
            .map(|(w, v)| w * v)
            .sum()
    }

    /// `Σ_n data[n][col] * values[n]`: the transpose-vector product for one column.
    pub fn dot_col(&self, col: usize, values: &[f64]) -> f64 {
        self.data.iter().zip(values.iter())
            .map(|(row, v)| row[col] * v)
            .sum()
    }

    /// Outer product `column ⊗ row`, giving a `column.len() × row.len()` matrix.
    pub fn outer(column: &[f64], row: &[f64]) -> Matrix {
        Matrix {
            rows: column.len(),
            cols: row.len(),
            data: column.iter()
                .map(|&c| row.iter().map(|&r| c * r).collect())
                .collect(),
        }
    }

    /// Sum of squares of every element.
    pub fn squared_sum(&self) -> f64 {
        self.data.iter().flatten().map(|x| x * x).sum()
    }

    pub fn same_shape(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// `self += rhs` element-wise.
    ///
    /// # Panics
    /// If the shapes differ.
    pub fn add_assign(&mut self, rhs: &Matrix) {
        assert!(self.same_shape(rhs), "Matrices are of incorrect sizes");
        for (row, rhs_row) in self.data.iter_mut().zip(rhs.data.iter()) {
            for (x, y) in row.iter_mut().zip(rhs_row.iter()) {
                *x += y;
            }
        }
    }

    /// `self -= scale * rhs` element-wise.
    ///
    /// # Panics
    /// If the shapes differ.
    pub fn sub_scaled(&mut self, rhs: &Matrix, scale: f64) {
        assert!(self.same_shape(rhs), "Matrices are of incorrect sizes");
        for (row, rhs_row) in self.data.iter_mut().zip(rhs.data.iter()) {
            for (x, y) in row.iter_mut().zip(rhs_row.iter()) {
                *x -= scale * y;
            }
        }
    }
}
