//! Example: Single Layer on a 2x2 Array
//!
//! Tiles a 2x3 kernel for a 2x2 systolic array and prints the weights block
//! and the instruction stream that drives it.
//!
//! Run with: cargo run --example single_layer

use layers_to_systolic::{
    compile_instructions, encode_weights, pad_and_tile, Block, Layer, Matrix, SystolicConfig,
};

fn main() {
    println!("=== Single Layer Example ===\n");

    let config = SystolicConfig::new(2);
    let kernel = Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();

    // Example 1: Tiling
    println!("Kernel {:?} padded and tiled for a 2x2 array:", kernel.shape());
    let grid = pad_and_tile(&kernel, config.tile_width).unwrap();
    for tile in grid.tiles() {
        println!(
            "  tile (col {}, row {}): {:?}",
            tile.col_block,
            tile.row_block,
            tile.rows().collect::<Vec<_>>()
        );
    }
    println!();

    // Example 2: Weights block
    let layers = vec![Layer::new(0, kernel)];
    let encoded = encode_weights(&layers, &config).unwrap();
    println!("{}", encoded.block);

    // Example 3: Instructions
    let instructions = compile_instructions(&layers, &config).unwrap();
    println!("{}", Block::from_instructions(&instructions));

    println!("JSON output:");
    println!("{}", serde_json::to_string_pretty(&instructions).unwrap());
}
