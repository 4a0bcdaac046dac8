//! Multi-window transfer assembly
//!
//! An inference batch larger than the array is pushed through in windows of
//! `W` input rows. The instruction stream depends only on layer shapes, so
//! it is compiled once and shared by every window. The first window
//! overwrites the accelerator's output buffer; later windows append to it.

use std::rc::Rc;

use crate::artifact::{Block, ResultsDescriptor, TransferArtifact, TransferWindow};
use crate::compiler::InstructionCompiler;
use crate::error::{CompileError, CompileResult};
use crate::hardware::SystolicConfig;
use crate::inputs::InputEncoder;
use crate::matrix::{Layer, Matrix};
use crate::tiling::PaddedShape;
use crate::weights::WeightEncoder;

/// Builds complete transfer artifacts for one layer stack
pub struct TransferAssembler {
    config: SystolicConfig,
    layer_shapes: Vec<PaddedShape>,
    weights: Option<Block>,
}

impl TransferAssembler {
    /// Prepare a layer stack. The weights block is only encoded when the
    /// configuration embeds weights in the transfer.
    pub fn new(config: SystolicConfig, layers: &[Layer]) -> CompileResult<Self> {
        config.validate()?;
        let encoder = WeightEncoder::new(&config);

        let (layer_shapes, weights) = if config.embed_weights {
            let encoded = encoder.encode(layers)?;
            (encoded.layer_shapes, Some(encoded.block))
        } else {
            (encoder.shapes(layers)?, None)
        };

        Ok(Self {
            config,
            layer_shapes,
            weights,
        })
    }

    /// Assemble from precomputed shapes, for weights already resident on
    /// the device.
    pub fn from_shapes(config: SystolicConfig, layer_shapes: Vec<PaddedShape>) -> CompileResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            layer_shapes,
            weights: None,
        })
    }

    pub fn layer_shapes(&self) -> &[PaddedShape] {
        &self.layer_shapes
    }

    /// Window the first `input_count` rows of `input` into a transfer.
    pub fn assemble(
        &self,
        input: &Matrix,
        input_count: usize,
        output_offset: usize,
        output_count: usize,
    ) -> CompileResult<TransferArtifact> {
        if input_count == 0 || input_count > input.rows() {
            return Err(CompileError::invalid_shape(format!(
                "input count {} outside 1..={} available rows",
                input_count,
                input.rows()
            )));
        }

        let width = self.config.tile_width;
        if let Some(first) = self.layer_shapes.first() {
            let padded = PaddedShape::new(input.rows(), input.cols(), width)?;
            if padded.cols != first.rows {
                return Err(CompileError::invalid_shape(format!(
                    "input has {} columns ({} padded), first layer reads {} rows",
                    input.cols(),
                    padded.cols,
                    first.rows
                )));
            }
        }

        let instructions = InstructionCompiler::new(width).compile(&self.layer_shapes)?;
        let instructions = Rc::new(Block::from_instructions(&instructions));
        let encoder = InputEncoder::new(&self.config);

        let mut windows = Vec::with_capacity(input_count.div_ceil(width));
        for (batch, window_start) in (0..input_count).step_by(width).enumerate() {
            windows.push(TransferWindow {
                inputs: encoder.encode(input, window_start, width)?,
                instructions: Rc::clone(&instructions),
                results: ResultsDescriptor {
                    output_offset,
                    output_count,
                    append: batch > 0,
                },
            });
        }

        tracing::info!(
            "assembled {} window(s) of {} rows, {} instructions each{}",
            windows.len(),
            width,
            instructions.entries().len(),
            if self.weights.is_some() { ", weights embedded" } else { "" }
        );

        Ok(TransferArtifact {
            weights: self.weights.clone(),
            windows,
        })
    }
}
