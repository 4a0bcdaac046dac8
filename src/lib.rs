//! Quantized Layers to Systolic Array Compiler
//!
//! This library turns a stack of quantized 8-bit layer kernels into the
//! text transfer script consumed by a `W x W` systolic array accelerator:
//! tiled weights, windowed inputs, the op-code stream that drives them, and
//! a results descriptor per window.
//!
//! # Example
//!
//! ```rust
//! use layers_to_systolic::{assemble_transfer, Layer, Matrix, SystolicConfig};
//!
//! let config = SystolicConfig::new(2).with_embedded_weights(true);
//! let kernel = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
//! let input = Matrix::from_rows(vec![vec![10, 20], vec![30, 40], vec![50, 60]]).unwrap();
//!
//! let artifact = assemble_transfer(&[Layer::new(0, kernel)], &input, 3, 0, 4, &config).unwrap();
//! println!("{}", artifact);
//! ```

pub mod artifact;
pub mod assembler;
pub mod compiler;
pub mod error;
pub mod hardware;
pub mod inputs;
pub mod lexer;
pub mod loader;
pub mod matrix;
pub mod parser;
pub mod tiling;
pub mod weights;

pub use artifact::{Block, BlockKind, ResultsDescriptor, TransferArtifact, TransferWindow};
pub use assembler::TransferAssembler;
pub use compiler::{AddressSpace, InstructionCompiler, LayerPlan, Phase};
pub use error::{CompileError, CompileResult};
pub use hardware::{Instruction, OpCode, SystolicConfig};
pub use inputs::InputEncoder;
pub use matrix::{Layer, Matrix};
pub use parser::{parse_artifact, Section};
pub use tiling::{pad_and_tile, PaddedShape, Tile, TileGrid};
pub use weights::{EncodedWeights, WeightEncoder};

/// Encode every layer kernel into a `weights` block
pub fn encode_weights(layers: &[Layer], config: &SystolicConfig) -> CompileResult<EncodedWeights> {
    config.validate()?;
    WeightEncoder::new(config).encode(layers)
}

/// Encode one `W`-row input window starting at `window_start`
pub fn encode_input(
    input: &Matrix,
    window_start: usize,
    config: &SystolicConfig,
) -> CompileResult<Block> {
    config.validate()?;
    InputEncoder::new(config).encode(input, window_start, config.tile_width)
}

/// Compile the instruction stream for a layer stack
pub fn compile_instructions(
    layers: &[Layer],
    config: &SystolicConfig,
) -> CompileResult<Vec<Instruction>> {
    config.validate()?;
    let shapes = WeightEncoder::new(config).shapes(layers)?;
    InstructionCompiler::new(config.tile_width).compile(&shapes)
}

/// Build a complete multi-window transfer
pub fn assemble_transfer(
    layers: &[Layer],
    input: &Matrix,
    input_count: usize,
    output_offset: usize,
    output_count: usize,
    config: &SystolicConfig,
) -> CompileResult<TransferArtifact> {
    TransferAssembler::new(config.clone(), layers)?.assemble(
        input,
        input_count,
        output_offset,
        output_count,
    )
}
