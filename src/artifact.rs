//! Transfer artifact text
//!
//! An artifact is a sequence of named blocks:
//!
//! ```text
//! weights:[
//! [1,2]
//! [4,5]
//! ]
//! inputs:[
//! [7,8]
//! ...
//! ]
//! instructions:[
//! [9,2,0]
//! ...
//! [255,0,0]
//! ]
//! results:[
//! [0,10,0]
//! ]
//! ```
//!
//! The text is handed to the transport layer verbatim, so the format is
//! exact: no spaces, one entry per line, every line `\n` terminated.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::CompileResult;
use crate::hardware::Instruction;

/// The four block kinds an artifact can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Inputs,
    Instructions,
    Weights,
    Results,
}

impl BlockKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Inputs => "inputs",
            BlockKind::Instructions => "instructions",
            BlockKind::Weights => "weights",
            BlockKind::Results => "results",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "inputs" => Some(BlockKind::Inputs),
            "instructions" => Some(BlockKind::Instructions),
            "weights" => Some(BlockKind::Weights),
            "results" => Some(BlockKind::Results),
            _ => None,
        }
    }
}

/// Render a row of scalars as `[a,b,c]`.
pub fn format_row(cells: &[i8]) -> String {
    let mut out = String::with_capacity(cells.len() * 4 + 2);
    out.push('[');
    for (i, value) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}

/// A named, bracketed block of entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    kind: BlockKind,
    entries: Vec<String>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn push_row(&mut self, cells: &[i8]) {
        self.entries.push(format_row(cells));
    }

    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        Self {
            kind: BlockKind::Instructions,
            entries: instructions.iter().map(Instruction::to_string).collect(),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:[", self.kind.name())?;
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        writeln!(f, "]")
    }
}

/// Where the accelerator should put the results of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsDescriptor {
    pub output_offset: usize,
    pub output_count: usize,
    /// `false` overwrites the output buffer, `true` appends to it
    pub append: bool,
}

impl ResultsDescriptor {
    pub fn to_block(&self) -> Block {
        let mut block = Block::new(BlockKind::Results);
        block.push(self.to_string());
        block
    }
}

impl fmt::Display for ResultsDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},{}]",
            self.output_offset,
            self.output_count,
            u8::from(self.append)
        )
    }
}

/// One input window of a transfer
#[derive(Debug, Clone)]
pub struct TransferWindow {
    pub inputs: Block,
    /// Shared by every window of the transfer
    pub instructions: Rc<Block>,
    pub results: ResultsDescriptor,
}

impl fmt::Display for TransferWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.inputs, self.instructions, self.results.to_block())
    }
}

/// A complete transfer, ready for the transport layer
#[derive(Debug, Clone, Default)]
pub struct TransferArtifact {
    /// Present only in combined-transfer mode; always written first
    pub weights: Option<Block>,
    pub windows: Vec<TransferWindow>,
}

impl TransferArtifact {
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write the rendered artifact to `path` without ever exposing a
    /// partially written file there.
    pub fn write_atomic(&self, path: &Path) -> CompileResult<()> {
        write_atomic(path, &self.render())
    }
}

impl fmt::Display for TransferArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(weights) = &self.weights {
            write!(f, "{}", weights)?;
        }
        for window in &self.windows {
            write!(f, "{}", window)?;
        }
        Ok(())
    }
}

/// Write `text` to a temporary file beside `path`, then rename it into place.
pub fn write_atomic(path: &Path, text: &str) -> CompileResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    tracing::debug!("wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_row() {
        assert_eq!(format_row(&[1, -2, 0, 127, -128]), "[1,-2,0,127,-128]");
        assert_eq!(format_row(&[]), "[]");
    }

    #[test]
    fn test_block_display() {
        let mut block = Block::new(BlockKind::Weights);
        block.push_row(&[1, 2]);
        block.push_row(&[4, 5]);
        assert_eq!(block.to_string(), "weights:[\n[1,2]\n[4,5]\n]\n");
    }

    #[test]
    fn test_results_descriptor() {
        let first = ResultsDescriptor {
            output_offset: 100,
            output_count: 10,
            append: false,
        };
        let next = ResultsDescriptor { append: true, ..first };
        assert_eq!(first.to_block().to_string(), "results:[\n[100,10,0]\n]\n");
        assert_eq!(next.to_string(), "[100,10,1]");
    }

    #[test]
    fn test_artifact_weights_first() {
        let mut weights = Block::new(BlockKind::Weights);
        weights.push_row(&[3]);
        let mut inputs = Block::new(BlockKind::Inputs);
        inputs.push_row(&[7]);
        let instructions = Rc::new(Block::from_instructions(&[Instruction::sync()]));

        let artifact = TransferArtifact {
            weights: Some(weights),
            windows: vec![TransferWindow {
                inputs,
                instructions,
                results: ResultsDescriptor {
                    output_offset: 0,
                    output_count: 1,
                    append: false,
                },
            }],
        };

        assert_eq!(
            artifact.render(),
            "weights:[\n[3]\n]\n\
             inputs:[\n[7]\n]\n\
             instructions:[\n[255,0,0]\n]\n\
             results:[\n[0,1,0]\n]\n"
        );
    }
}
