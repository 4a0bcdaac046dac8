//! Example: Multi-Window Transfer
//!
//! Pushes six samples through a two-layer stack on a 4x4 array. The batch
//! needs two windows; the second one is zero padded and appends to the
//! results of the first.
//!
//! Run with: cargo run --example multi_window

use layers_to_systolic::{assemble_transfer, parse_artifact, Layer, Matrix, SystolicConfig};

fn main() {
    println!("=== Multi-Window Transfer Example ===\n");

    let config = SystolicConfig::new(4).with_embedded_weights(true);

    // 6 features -> 5 hidden -> 3 outputs
    let hidden = Matrix::from_flat(6, 5, (0..30).map(|v| (v % 7 - 3) as i8).collect()).unwrap();
    let output = Matrix::from_flat(5, 3, (0..15).map(|v| (v % 5 - 2) as i8).collect()).unwrap();
    let layers = vec![Layer::new(0, hidden), Layer::new(1, output)];

    let samples = Matrix::from_flat(6, 6, (0..36).map(|v| (v * 3 % 127) as i8).collect()).unwrap();

    let artifact = assemble_transfer(&layers, &samples, 6, 0, 3, &config).unwrap();
    let text = artifact.render();
    println!("{}", text);

    println!("Sections:");
    for section in parse_artifact(&text).unwrap() {
        println!("  {:<12} {} entries", section.kind.name(), section.rows.len());
    }
}
