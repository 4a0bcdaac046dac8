//! Matrix tiling for systolic array execution
//!
//! The accelerator only ingests square `W x W` tiles. Matrices are zero
//! padded up to a multiple of `W` in both dimensions and then cut into tiles
//! in a fixed order, which is also the order they appear on the wire:
//!
//! - outer loop over column blocks, left to right
//! - inner loop over row blocks, top to bottom
//! - within a tile, row-major

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::matrix::Matrix;

/// Number of zero cells needed to round `len` up to a multiple of `width`.
pub(crate) fn padding(len: usize, width: usize) -> usize {
    (width - len % width) % width
}

/// Dimensions of a matrix after padding to the tile width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddedShape {
    pub rows: usize,
    pub cols: usize,
}

impl PaddedShape {
    pub fn new(rows: usize, cols: usize, width: usize) -> CompileResult<Self> {
        if width == 0 {
            return Err(CompileError::invalid_shape("tile width must be positive"));
        }
        if rows == 0 || cols == 0 {
            return Err(CompileError::invalid_shape(format!(
                "cannot tile a {}x{} matrix",
                rows, cols
            )));
        }
        Ok(Self {
            rows: rows + padding(rows, width),
            cols: cols + padding(cols, width),
        })
    }

    pub fn of(matrix: &Matrix, width: usize) -> CompileResult<Self> {
        Self::new(matrix.rows(), matrix.cols(), width)
    }

    pub fn row_blocks(&self, width: usize) -> usize {
        self.rows / width
    }

    pub fn column_blocks(&self, width: usize) -> usize {
        self.cols / width
    }
}

/// A single `W x W` block of a padded matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Row block index
    pub row_block: usize,
    /// Column block index
    pub col_block: usize,
    width: usize,
    /// Tile cells, row-major
    data: Vec<i8>,
}

impl Tile {
    pub fn width(&self) -> usize {
        self.width
    }

    /// Tile rows in order, each `width` cells long.
    pub fn rows(&self) -> impl Iterator<Item = &[i8]> {
        self.data.chunks(self.width)
    }

    pub fn cells(&self) -> &[i8] {
        &self.data
    }
}

/// A matrix cut into tiles in wire order
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: usize,
    shape: PaddedShape,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn shape(&self) -> PaddedShape {
        self.shape
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All tile rows in wire order.
    pub fn rows(&self) -> impl Iterator<Item = &[i8]> {
        self.tiles.iter().flat_map(Tile::rows)
    }

    /// Place every tile back at its block position, yielding the padded matrix.
    pub fn reassemble(&self) -> Vec<Vec<i8>> {
        let mut out = vec![vec![0i8; self.shape.cols]; self.shape.rows];
        for tile in &self.tiles {
            for (sub_row, cells) in tile.rows().enumerate() {
                let row = tile.row_block * self.width + sub_row;
                let col = tile.col_block * self.width;
                out[row][col..col + self.width].copy_from_slice(cells);
            }
        }
        out
    }
}

/// Zero pad `matrix` to a multiple of `width` and cut it into tiles.
pub fn pad_and_tile(matrix: &Matrix, width: usize) -> CompileResult<TileGrid> {
    let shape = PaddedShape::of(matrix, width)?;
    let mut tiles = Vec::with_capacity(shape.row_blocks(width) * shape.column_blocks(width));

    for col_block in 0..shape.column_blocks(width) {
        for row_block in 0..shape.row_blocks(width) {
            let mut data = Vec::with_capacity(width * width);
            for sub_row in 0..width {
                for sub_col in 0..width {
                    let value = matrix
                        .get(row_block * width + sub_row, col_block * width + sub_col)
                        .unwrap_or(0);
                    data.push(value);
                }
            }
            tiles.push(Tile {
                row_block,
                col_block,
                width,
                data,
            });
        }
    }

    Ok(TileGrid {
        width,
        shape,
        tiles,
    })
}
