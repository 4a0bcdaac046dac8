//! Quantized matrices and layers
//!
//! A [`Matrix`] holds signed 8-bit values in row-major order. Values arrive
//! already quantized by the training pipeline; nothing here re-clips them.

use crate::error::{CompileError, CompileResult};

/// A dense row-major matrix of `i8` values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<i8>,
}

impl Matrix {
    /// Build a matrix from nested rows.
    ///
    /// Fails with `InvalidShape` when empty and `MalformedMatrix` when rows
    /// differ in length.
    pub fn from_rows(rows: Vec<Vec<i8>>) -> CompileResult<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(CompileError::invalid_shape(format!(
                "matrix must be non-empty, got {}x{}",
                rows.len(),
                cols
            )));
        }

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(CompileError::MalformedMatrix {
                    row: i,
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Build a matrix from flat row-major data.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<i8>) -> CompileResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(CompileError::invalid_shape(format!(
                "matrix must be non-empty, got {}x{}",
                rows, cols
            )));
        }
        if data.len() != rows * cols {
            return Err(CompileError::invalid_shape(format!(
                "{} values cannot fill a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Parse comma-delimited integer rows, one matrix row per line.
    ///
    /// Surrounding spaces are ignored, so the fixed-width `%4d` output of the
    /// export tooling reads back unchanged. Blank lines are skipped.
    pub fn from_csv(source: &str) -> CompileResult<Self> {
        let mut rows = Vec::new();
        let mut offset = 0;

        for line in source.lines() {
            let line_start = offset;
            offset += line.len() + 1;
            if line.trim().is_empty() {
                continue;
            }

            let mut row = Vec::new();
            for field in line.split(',') {
                let text = field.trim();
                let value: i64 = text.parse().map_err(|_| {
                    CompileError::parse_error(line_start, format!("not an integer: '{}'", text))
                })?;
                let value = i8::try_from(value).map_err(|_| CompileError::ValueOutOfRange {
                    value,
                    min: i8::MIN as i64,
                    max: i8::MAX as i64,
                })?;
                row.push(value);
            }
            rows.push(row);
        }

        Self::from_rows(rows)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Value at `(row, col)`, or `None` outside the matrix.
    pub fn get(&self, row: usize, col: usize) -> Option<i8> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// All values, row-major.
    pub fn cells(&self) -> &[i8] {
        &self.data
    }

    pub fn row(&self, row: usize) -> Option<&[i8]> {
        if row < self.rows {
            Some(&self.data[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }
}

/// One network layer: its position in the stack and its weight kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub index: usize,
    pub matrix: Matrix,
}

impl Layer {
    pub fn new(index: usize, matrix: Matrix) -> Self {
        Self { index, matrix }
    }
}

/// Sort layers by index, rejecting duplicates.
pub fn ordered_layers(layers: &[Layer]) -> CompileResult<Vec<&Layer>> {
    let mut ordered: Vec<&Layer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.index);
    for pair in ordered.windows(2) {
        if pair[0].index == pair[1].index {
            return Err(CompileError::invalid_shape(format!(
                "duplicate layer index {}",
                pair[0].index
            )));
        }
    }
    Ok(ordered)
}
