//! Weight block encoding
//!
//! Every layer kernel is padded and tiled by [`pad_and_tile`] and written
//! tile row by tile row into the `weights` block. Layers follow each other
//! in index order, so weight memory is laid out as one contiguous run of
//! tile rows per layer.

use crate::artifact::{Block, BlockKind};
use crate::error::CompileResult;
use crate::hardware::SystolicConfig;
use crate::matrix::{ordered_layers, Layer};
use crate::tiling::{pad_and_tile, PaddedShape};

/// Output of [`WeightEncoder::encode`]
#[derive(Debug, Clone)]
pub struct EncodedWeights {
    pub block: Block,
    /// Padded shape of every layer, in index order
    pub layer_shapes: Vec<PaddedShape>,
}

/// Serializes layer kernels into weight memory order
pub struct WeightEncoder {
    config: SystolicConfig,
    tile_width: usize,
}

impl WeightEncoder {
    pub fn new(config: &SystolicConfig) -> Self {
        Self {
            config: config.clone(),
            tile_width: config.tile_width,
        }
    }

    pub fn encode(&self, layers: &[Layer]) -> CompileResult<EncodedWeights> {
        let mut block = Block::new(BlockKind::Weights);
        let mut layer_shapes = Vec::with_capacity(layers.len());
        let mut weight_offset = 0;

        for layer in ordered_layers(layers)? {
            self.config.check_values(&layer.matrix)?;
            let grid = pad_and_tile(&layer.matrix, self.tile_width)?;
            let shape = grid.shape();
            tracing::debug!(
                "layer {}: {:?} padded to {}x{}, {} tiles at weight row {}",
                layer.index,
                layer.matrix.shape(),
                shape.rows,
                shape.cols,
                grid.len(),
                weight_offset
            );

            for row in grid.rows() {
                block.push_row(row);
            }
            weight_offset += shape.column_blocks(self.tile_width) * shape.rows;
            layer_shapes.push(shape);
        }

        Ok(EncodedWeights {
            block,
            layer_shapes,
        })
    }

    /// Padded shapes only, without serializing any values.
    pub fn shapes(&self, layers: &[Layer]) -> CompileResult<Vec<PaddedShape>> {
        ordered_layers(layers)?
            .into_iter()
            .map(|layer| PaddedShape::of(&layer.matrix, self.tile_width))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::matrix::Matrix;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_layer() {
        let m = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let encoded = WeightEncoder::new(&SystolicConfig::new(2)).encode(&[Layer::new(0, m)]).unwrap();

        assert_eq!(
            encoded.block.to_string(),
            "weights:[\n[1,2]\n[4,5]\n[3,0]\n[6,0]\n]\n"
        );
        assert_eq!(encoded.layer_shapes, vec![PaddedShape { rows: 2, cols: 4 }]);
    }

    #[test]
    fn test_layers_written_in_index_order() {
        let first = Matrix::from_rows(vec![vec![1]]).unwrap();
        let second = Matrix::from_rows(vec![vec![2, 3, 4]]).unwrap();
        let layers = vec![Layer::new(1, second), Layer::new(0, first)];

        let encoded = WeightEncoder::new(&SystolicConfig::new(2)).encode(&layers).unwrap();
        assert_eq!(
            encoded.block.entries(),
            &["[1,0]", "[0,0]", "[2,3]", "[0,0]", "[4,0]", "[0,0]"]
        );
        assert_eq!(
            encoded.layer_shapes,
            vec![PaddedShape { rows: 2, cols: 2 }, PaddedShape { rows: 2, cols: 4 }]
        );
    }

    #[test]
    fn test_shapes_match_encode() {
        let m = Matrix::from_flat(5, 3, vec![1; 15]).unwrap();
        let layers = vec![Layer::new(0, m)];
        let encoder = WeightEncoder::new(&SystolicConfig::new(4));
        assert_eq!(
            encoder.shapes(&layers).unwrap(),
            encoder.encode(&layers).unwrap().layer_shapes
        );
    }

    #[test]
    fn test_values_checked_against_data_width() {
        let mut config = SystolicConfig::new(2);
        config.data_width = 4;
        let m = Matrix::from_rows(vec![vec![100, -100], vec![1, 2]]).unwrap();

        let err = WeightEncoder::new(&config).encode(&[Layer::new(0, m)]).unwrap_err();
        assert!(matches!(err, CompileError::ValueOutOfRange { value: 100, .. }));
    }
}
