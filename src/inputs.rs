//! Input block encoding
//!
//! The accelerator always reads fixed-size windows of input rows. A window
//! is cut from the sample matrix, zero padded at the bottom when the supply
//! runs short, and then tiled across its columns exactly like a weight
//! kernel.

use crate::artifact::{Block, BlockKind};
use crate::error::{CompileError, CompileResult};
use crate::hardware::SystolicConfig;
use crate::matrix::Matrix;
use crate::tiling::pad_and_tile;

/// Serializes windows of input samples
pub struct InputEncoder {
    config: SystolicConfig,
    tile_width: usize,
    strict_windows: bool,
}

impl InputEncoder {
    pub fn new(config: &SystolicConfig) -> Self {
        Self {
            config: config.clone(),
            tile_width: config.tile_width,
            strict_windows: config.strict_windows,
        }
    }

    /// Encode rows `[window_start, window_start + window_width)` of `input`.
    pub fn encode(
        &self,
        input: &Matrix,
        window_start: usize,
        window_width: usize,
    ) -> CompileResult<Block> {
        let window = self.window(input, window_start, window_width)?;
        self.config.check_values(&window)?;
        let grid = pad_and_tile(&window, self.tile_width)?;

        let mut block = Block::new(BlockKind::Inputs);
        for row in grid.rows() {
            block.push_row(row);
        }
        Ok(block)
    }

    /// Cut a window of exactly `window_width` rows out of `input`.
    pub fn window(
        &self,
        input: &Matrix,
        window_start: usize,
        window_width: usize,
    ) -> CompileResult<Matrix> {
        if self.tile_width == 0 || window_width == 0 || window_width % self.tile_width != 0 {
            return Err(CompileError::invalid_shape(format!(
                "window width {} is not a positive multiple of tile width {}",
                window_width, self.tile_width
            )));
        }

        let available = input.rows().saturating_sub(window_start).min(window_width);
        if available < window_width {
            if self.strict_windows {
                return Err(CompileError::IncompleteWindow {
                    start: window_start,
                    required: window_width,
                    available,
                });
            }
            tracing::warn!(
                "input window at row {} padded with {} zero rows",
                window_start,
                window_width - available
            );
        }

        let mut data = Vec::with_capacity(window_width * input.cols());
        for row in window_start..window_start + available {
            if let Some(cells) = input.row(row) {
                data.extend_from_slice(cells);
            }
        }
        data.resize(window_width * input.cols(), 0);

        Matrix::from_flat(window_width, input.cols(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn samples(rows: usize, cols: usize) -> Matrix {
        let data = (0..rows * cols).map(|v| (v + 1) as i8).collect();
        Matrix::from_flat(rows, cols, data).unwrap()
    }

    #[test]
    fn test_full_window() {
        let encoder = InputEncoder::new(&SystolicConfig::new(2));
        let input = samples(2, 3);
        let block = encoder.encode(&input, 0, 2).unwrap();
        assert_eq!(block.to_string(), "inputs:[\n[1,2]\n[4,5]\n[3,0]\n[6,0]\n]\n");
    }

    #[test]
    fn test_short_window_is_zero_padded() {
        let encoder = InputEncoder::new(&SystolicConfig::new(4));
        let input = samples(6, 2);

        let first = encoder.window(&input, 0, 4).unwrap();
        let second = encoder.window(&input, 4, 4).unwrap();

        for r in 0..4 {
            assert_eq!(first.row(r), input.row(r));
        }
        assert_eq!(second.row(0), input.row(4));
        assert_eq!(second.row(1), input.row(5));
        assert_eq!(second.row(2), Some(&[0, 0][..]));
        assert_eq!(second.row(3), Some(&[0, 0][..]));
    }

    #[test]
    fn test_strict_window_rejects_short_supply() {
        let config = SystolicConfig::new(4).with_strict_windows(true);
        let encoder = InputEncoder::new(&config);
        let err = encoder.encode(&samples(6, 2), 4, 4).unwrap_err();
        assert!(matches!(
            err,
            CompileError::IncompleteWindow { start: 4, required: 4, available: 2 }
        ));
    }

    #[test]
    fn test_window_width_must_align() {
        let encoder = InputEncoder::new(&SystolicConfig::new(4));
        assert!(matches!(
            encoder.encode(&samples(8, 2), 0, 3),
            Err(CompileError::InvalidShape { .. })
        ));
        assert!(encoder.encode(&samples(8, 2), 0, 0).is_err());
        assert!(encoder.encode(&samples(8, 2), 0, 8).is_ok());
    }

    #[test]
    fn test_values_checked_against_data_width() {
        let mut config = SystolicConfig::new(2);
        config.data_width = 4;
        let encoder = InputEncoder::new(&config);
        let input = Matrix::from_rows(vec![vec![1, 2], vec![3, -9]]).unwrap();

        assert!(matches!(
            encoder.encode(&input, 0, 2),
            Err(CompileError::ValueOutOfRange { value: -9, min: -8, max: 7 })
        ));
    }
}
