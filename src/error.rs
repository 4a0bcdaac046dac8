//! Error types for the layer-to-systolic compiler

use thiserror::Error;

/// Result type for compilation operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Invalid shape: {message}")]
    InvalidShape { message: String },

    #[error("Malformed matrix: row {row} has {got} columns, expected {expected}")]
    MalformedMatrix { row: usize, expected: usize, got: usize },

    #[error("Addressing invariant violated: {message}")]
    AddressingInvariantViolation { message: String },

    #[error("Incomplete window at row {start}: {available} of {required} rows available")]
    IncompleteWindow {
        start: usize,
        required: usize,
        available: usize,
    },

    #[error("Value {value} out of range [{min}, {max}]")]
    ValueOutOfRange { value: i64, min: i64, max: i64 },

    #[error("Operand overflow: {field} = {value} does not fit in {bits} bits")]
    OperandOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[error("Parse error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn invalid_shape(msg: impl Into<String>) -> Self {
        CompileError::InvalidShape { message: msg.into() }
    }

    pub fn addressing(msg: impl Into<String>) -> Self {
        CompileError::AddressingInvariantViolation { message: msg.into() }
    }

    pub fn parse_error(position: usize, msg: impl Into<String>) -> Self {
        CompileError::ParseError {
            position,
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CompileError::ConfigError { message: msg.into() }
    }
}
