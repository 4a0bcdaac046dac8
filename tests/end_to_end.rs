//! End-to-end tests: kernel files on disk -> transfer artifact -> parsed
//! back, checking that every stage agrees on layout and addressing.

use std::fs;
use std::path::Path;

use layers_to_systolic::loader::{discover, load_layers, load_matrix};
use layers_to_systolic::{
    compile_instructions, parse_artifact, BlockKind, CompileError, Instruction, Matrix,
    SystolicConfig, TransferAssembler,
};
use pretty_assertions::assert_eq;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn test_discovery_orders_numerically() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "kernel10.csv", "1\n");
    write(dir.path(), "kernel2.csv", "1\n");
    write(dir.path(), "kernel0.csv", "1\n");
    write(dir.path(), "bias0.csv", "1\n");

    let indices: Vec<usize> = discover(dir.path())
        .unwrap()
        .into_iter()
        .map(|(index, _)| index)
        .collect();
    assert_eq!(indices, vec![0, 2, 10]);
}

#[test]
fn test_empty_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_layers(dir.path()),
        Err(CompileError::InvalidShape { .. })
    ));
}

#[test]
fn test_transfer_round_trips_through_text() {
    let dir = tempfile::tempdir().unwrap();
    // 3 inputs -> 3 hidden -> 2 outputs on a 2x2 array
    write(dir.path(), "kernel0.csv", "   1,   2,   3\n  -4,   5,  -6\n   7,  -8,   9\n");
    write(dir.path(), "kernel1.csv", "  10, -10\n  20, -20\n  30, -30\n");
    write(dir.path(), "samples.csv", "1,2,3\n4,5,6\n7,8,9\n");

    let config = SystolicConfig::new(2).with_embedded_weights(true);
    let layers = load_layers(dir.path()).unwrap();
    let samples = load_matrix(&dir.path().join("samples.csv")).unwrap();

    let artifact = TransferAssembler::new(config.clone(), &layers)
        .unwrap()
        .assemble(&samples, 3, 5, 2)
        .unwrap();

    let out = dir.path().join("complete.txt");
    artifact.write_atomic(&out).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text, artifact.render());

    let sections = parse_artifact(&text).unwrap();
    let kinds: Vec<BlockKind> = sections.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            BlockKind::Weights,
            BlockKind::Inputs,
            BlockKind::Instructions,
            BlockKind::Results,
            BlockKind::Inputs,
            BlockKind::Instructions,
            BlockKind::Results,
        ]
    );

    // Layer 0 pads to 4x4 (8 tile rows), layer 1 to 4x2 (4 tile rows).
    assert_eq!(sections[0].rows.len(), 8 + 4);

    let expected = compile_instructions(&layers, &config).unwrap();
    assert_eq!(sections[2].instructions().unwrap(), expected);
    assert_eq!(sections[5].instructions().unwrap(), expected);
    assert_eq!(expected.last(), Some(&Instruction::sync()));

    assert_eq!(sections[3].rows, vec![vec![5, 2, 0]]);
    assert_eq!(sections[6].rows, vec![vec![5, 2, 1]]);

    // Second window: sample 2 then a zero row, tiled over 2 column blocks.
    assert_eq!(
        sections[4].rows,
        vec![vec![7, 8], vec![0, 0], vec![9, 0], vec![0, 0]]
    );
}

#[test]
fn test_second_layer_reads_first_layer_output() {
    let first = Matrix::from_flat(4, 4, vec![1; 16]).unwrap();
    let second = Matrix::from_flat(4, 2, vec![1; 8]).unwrap();
    let layers = vec![
        layers_to_systolic::Layer::new(0, first),
        layers_to_systolic::Layer::new(1, second),
    ];
    let program = compile_instructions(&layers, &SystolicConfig::new(2)).unwrap();

    // Layer 0: 2 columns x (load, matmul, load, matmul-acc, activate).
    let first_layer = &program[..10];
    let second_layer = &program[10..15];

    assert_eq!(first_layer[4], Instruction::activate(2, 0, 4));
    assert_eq!(first_layer[9], Instruction::activate(2, 2, 6));
    assert_eq!(
        second_layer,
        &[
            Instruction::load_weight(2, 8),
            Instruction::matmul(false, 2, 0, 4),
            Instruction::load_weight(2, 10),
            Instruction::matmul(true, 2, 0, 6),
            Instruction::activate(2, 0, 8),
        ]
    );
    assert_eq!(program.len(), 16);
}
