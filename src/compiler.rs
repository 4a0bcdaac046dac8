//! Instruction compiler for the systolic array
//!
//! Turns the padded shapes of a layer stack into the accelerator's op-code
//! stream. Only shapes matter here; weight and input values never reach
//! this module.
//!
//! For each layer and each `W`-wide column block of its kernel:
//!
//! 1. load the first `W` rows of the column's weight stack and multiply
//!    without accumulation (overwrites the partial sum)
//! 2. if the stack is taller than `W`, load the remaining rows and multiply
//!    with accumulation
//! 3. apply the signed sigmoid, writing the column's outputs into this
//!    layer's slot of the activation buffer
//!
//! A layer reads its input from where the previous layer wrote its output,
//! so the activation buffer threads the whole stack together. The stream
//! ends with a single `SYNC`.

use serde::Serialize;

use crate::error::{CompileError, CompileResult};
use crate::hardware::Instruction;
use crate::tiling::PaddedShape;

/// Running addresses threaded through the layer stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddressSpace {
    /// Next free row in weight memory
    pub weight_offset: usize,
    /// Activation buffer row holding the current layer's input
    pub activation_base: usize,
}

/// Reduction phase of one column's weight stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// The first `W` rows; overwrites the accumulator
    FirstBlock,
    /// Every row after the first `W`; adds into the partial sum
    RemainingBlocks,
}

impl Phase {
    pub fn accumulates(self) -> bool {
        matches!(self, Phase::RemainingBlocks)
    }
}

/// One load-and-multiply step for a column block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnStep {
    pub phase: Phase,
    /// Rows loaded and multiplied
    pub length: usize,
    pub weight_address: usize,
    /// Accumulator slot for this column
    pub acc_base: usize,
    /// Activation buffer row the multiply reads from
    pub input_row: usize,
}

/// Addressing for a single layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerPlan {
    /// Padded kernel height
    pub row_length: usize,
    /// Number of `W`-wide column groups
    pub column_blocks: usize,
    pub before: AddressSpace,
    pub after: AddressSpace,
}

impl LayerPlan {
    fn new(shape: PaddedShape, tile_width: usize, before: AddressSpace) -> CompileResult<Self> {
        if shape.rows == 0 || shape.rows % tile_width != 0 {
            return Err(CompileError::addressing(format!(
                "padded rows {} not a positive multiple of {}",
                shape.rows, tile_width
            )));
        }
        if shape.cols == 0 || shape.cols % tile_width != 0 {
            return Err(CompileError::addressing(format!(
                "padded columns {} not a positive multiple of {}",
                shape.cols, tile_width
            )));
        }

        let row_length = shape.rows;
        let column_blocks = shape.cols / tile_width;
        let after = AddressSpace {
            weight_offset: before.weight_offset + column_blocks * row_length,
            activation_base: before.activation_base + row_length,
        };

        Ok(Self {
            row_length,
            column_blocks,
            before,
            after,
        })
    }

    /// Steps reducing column `col`: always the first block, then the
    /// remainder only when the kernel is taller than one tile.
    pub fn column_steps(&self, col: usize, tile_width: usize) -> Vec<ColumnStep> {
        let column_start = col * self.row_length + self.before.weight_offset;
        let acc_base = col * tile_width;

        let mut steps = vec![ColumnStep {
            phase: Phase::FirstBlock,
            length: tile_width,
            weight_address: column_start,
            acc_base,
            input_row: self.before.activation_base,
        }];
        if self.row_length > tile_width {
            steps.push(ColumnStep {
                phase: Phase::RemainingBlocks,
                length: self.row_length - tile_width,
                weight_address: column_start + tile_width,
                acc_base,
                input_row: self.before.activation_base + tile_width,
            });
        }
        steps
    }

    /// Activation buffer row receiving column `col`'s outputs.
    pub fn output_row(&self, col: usize, tile_width: usize) -> usize {
        self.after.activation_base + col * tile_width
    }
}

/// Compiles layer shapes into an instruction stream
pub struct InstructionCompiler {
    tile_width: usize,
}

impl InstructionCompiler {
    pub fn new(tile_width: usize) -> Self {
        Self { tile_width }
    }

    /// Address every layer in order. Each plan starts where the previous
    /// one ended.
    pub fn plan(&self, layer_shapes: &[PaddedShape]) -> CompileResult<Vec<LayerPlan>> {
        if self.tile_width == 0 {
            return Err(CompileError::invalid_shape("tile width must be positive"));
        }

        let mut space = AddressSpace::default();
        let mut plans = Vec::with_capacity(layer_shapes.len());
        for shape in layer_shapes {
            let plan = LayerPlan::new(*shape, self.tile_width, space)?;
            space = plan.after;
            plans.push(plan);
        }
        Ok(plans)
    }

    pub fn compile(&self, layer_shapes: &[PaddedShape]) -> CompileResult<Vec<Instruction>> {
        let w = self.tile_width;
        let mut instructions = Vec::new();

        for (index, plan) in self.plan(layer_shapes)?.iter().enumerate() {
            tracing::debug!(
                "layer {}: rows {} column blocks {} input row {} weight row {}",
                index,
                plan.row_length,
                plan.column_blocks,
                plan.before.activation_base,
                plan.before.weight_offset
            );

            for col in 0..plan.column_blocks {
                for step in plan.column_steps(col, w) {
                    instructions.push(Instruction::load_weight(step.length, step.weight_address));
                    instructions.push(Instruction::matmul(
                        step.phase.accumulates(),
                        step.length,
                        step.acc_base,
                        step.input_row,
                    ));
                }
                instructions.push(Instruction::activate(w, col * w, plan.output_row(col, w)));
            }
        }
        instructions.push(Instruction::sync());

        for instruction in &instructions {
            instruction.validate()?;
        }
        Ok(instructions)
    }
}
