//! Hardware interface definitions for the systolic array
//!
//! These types mirror the accelerator's instruction word:
//!
//! ```text
//! op_code - calc_length - weight_addr              [u8, u32, u40]
//! op_code - calc_length - acc_addr - buffer_addr   [u8, u32, u16, u24]
//! ```
//!
//! On the wire every instruction is a bracketed decimal list, e.g. `[9,14,0]`.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::matrix::Matrix;

const LENGTH_BITS: u32 = 32;
const WEIGHT_ADDR_BITS: u32 = 40;
const ACC_ADDR_BITS: u32 = 16;
const BUFFER_ADDR_BITS: u32 = 24;

/// Configuration for the systolic array hardware
///
/// # TOML Format
/// ```toml
/// tile_width = 14
/// data_width = 8
/// strict_windows = false
/// embed_weights = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystolicConfig {
    /// Physical width `W` of the WxW array
    pub tile_width: usize,
    /// Bit width of input and weight elements
    #[serde(default = "default_data_width")]
    pub data_width: usize,
    /// Fail on short input windows instead of zero padding them
    #[serde(default)]
    pub strict_windows: bool,
    /// Carry the weights block inside the transfer artifact
    #[serde(default)]
    pub embed_weights: bool,
}

fn default_data_width() -> usize {
    8
}

impl SystolicConfig {
    pub fn new(tile_width: usize) -> Self {
        Self {
            tile_width,
            data_width: default_data_width(),
            strict_windows: false,
            embed_weights: false,
        }
    }

    /// Default configuration matching the 14x14 accelerator build
    pub fn default_14x14() -> Self {
        Self::new(14)
    }

    pub fn with_strict_windows(mut self, strict: bool) -> Self {
        self.strict_windows = strict;
        self
    }

    pub fn with_embedded_weights(mut self, embed: bool) -> Self {
        self.embed_weights = embed;
        self
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file(path: &Path) -> CompileResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml(source: &str) -> CompileResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| CompileError::config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> CompileResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CompileError::config(format!("TOML serialise error: {e}")))
    }

    pub fn validate(&self) -> CompileResult<()> {
        if self.tile_width == 0 {
            return Err(CompileError::config("tile_width must be positive"));
        }
        if !(2..=8).contains(&self.data_width) {
            return Err(CompileError::config(format!(
                "data_width must be between 2 and 8 bits, got {}",
                self.data_width
            )));
        }
        Ok(())
    }

    /// Get the maximum value that can be represented
    pub fn max_value(&self) -> i64 {
        (1i64 << (self.data_width - 1)) - 1
    }

    /// Get the minimum value that can be represented
    pub fn min_value(&self) -> i64 {
        -(1i64 << (self.data_width - 1))
    }

    /// Reject any value the configured data width cannot carry.
    pub fn check_values(&self, matrix: &Matrix) -> CompileResult<()> {
        let (min, max) = (self.min_value(), self.max_value());
        match matrix
            .cells()
            .iter()
            .map(|&v| i64::from(v))
            .find(|v| !(min..=max).contains(v))
        {
            Some(value) => Err(CompileError::ValueOutOfRange { value, min, max }),
            None => Ok(()),
        }
    }
}

impl Default for SystolicConfig {
    fn default() -> Self {
        Self::default_14x14()
    }
}

/// Accelerator op-codes. The discriminants are the protocol values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    LoadWeight = 9,
    MatMulNoAcc = 33,
    MatMulAcc = 35,
    ActivateSignedSigmoid = 153,
    Sync = 255,
}

impl OpCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            9 => Some(OpCode::LoadWeight),
            33 => Some(OpCode::MatMulNoAcc),
            35 => Some(OpCode::MatMulAcc),
            153 => Some(OpCode::ActivateSignedSigmoid),
            255 => Some(OpCode::Sync),
            _ => None,
        }
    }

    /// Whether this op-code uses the `(length, address)` operand form.
    pub fn is_weight_form(self) -> bool {
        matches!(self, OpCode::LoadWeight | OpCode::Sync)
    }
}

/// A single accelerator instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Instruction {
    /// `[op_code, length, address]`
    Weight {
        op: OpCode,
        length: u64,
        address: u64,
    },
    /// `[op_code, length, base_address, target_address]`
    Compute {
        op: OpCode,
        length: u64,
        base: u64,
        target: u64,
    },
}

impl Instruction {
    pub fn load_weight(length: usize, address: usize) -> Self {
        Instruction::Weight {
            op: OpCode::LoadWeight,
            length: length as u64,
            address: address as u64,
        }
    }

    pub fn matmul(accumulate: bool, length: usize, base: usize, target: usize) -> Self {
        let op = if accumulate {
            OpCode::MatMulAcc
        } else {
            OpCode::MatMulNoAcc
        };
        Instruction::Compute {
            op,
            length: length as u64,
            base: base as u64,
            target: target as u64,
        }
    }

    pub fn activate(length: usize, base: usize, target: usize) -> Self {
        Instruction::Compute {
            op: OpCode::ActivateSignedSigmoid,
            length: length as u64,
            base: base as u64,
            target: target as u64,
        }
    }

    pub fn sync() -> Self {
        Instruction::Weight {
            op: OpCode::Sync,
            length: 0,
            address: 0,
        }
    }

    pub fn op(&self) -> OpCode {
        match self {
            Instruction::Weight { op, .. } | Instruction::Compute { op, .. } => *op,
        }
    }

    pub fn length(&self) -> u64 {
        match self {
            Instruction::Weight { length, .. } | Instruction::Compute { length, .. } => *length,
        }
    }

    /// Check every operand against its field width in the instruction word.
    pub fn validate(&self) -> CompileResult<()> {
        match *self {
            Instruction::Weight { length, address, .. } => {
                check_width("length", length, LENGTH_BITS)?;
                check_width("weight address", address, WEIGHT_ADDR_BITS)
            }
            Instruction::Compute {
                length,
                base,
                target,
                ..
            } => {
                check_width("length", length, LENGTH_BITS)?;
                check_width("accumulator address", base, ACC_ADDR_BITS)?;
                check_width("buffer address", target, BUFFER_ADDR_BITS)
            }
        }
    }

    /// Decode an instruction from its wire operands.
    pub fn from_operands(operands: &[i64]) -> CompileResult<Self> {
        let (&code, rest) = operands
            .split_first()
            .ok_or_else(|| CompileError::parse_error(0, "empty instruction"))?;

        let op = u8::try_from(code)
            .ok()
            .and_then(OpCode::from_code)
            .ok_or_else(|| CompileError::parse_error(0, format!("unknown op-code {}", code)))?;

        let mut fields = Vec::with_capacity(rest.len());
        for &value in rest {
            let field = u64::try_from(value).map_err(|_| {
                CompileError::parse_error(0, format!("negative operand {} in {:?}", value, op))
            })?;
            fields.push(field);
        }

        let instruction = match (op.is_weight_form(), fields.as_slice()) {
            (true, &[length, address]) if op == OpCode::Sync && (length, address) != (0, 0) => {
                return Err(CompileError::parse_error(
                    0,
                    format!("Sync takes zero operands, got [{},{}]", length, address),
                ))
            }
            (true, &[length, address]) => Instruction::Weight { op, length, address },
            (false, &[length, base, target]) => Instruction::Compute {
                op,
                length,
                base,
                target,
            },
            _ => {
                return Err(CompileError::parse_error(
                    0,
                    format!("{:?} does not take {} operands", op, fields.len()),
                ))
            }
        };
        instruction.validate()?;
        Ok(instruction)
    }
}

fn check_width(field: &'static str, value: u64, bits: u32) -> CompileResult<()> {
    if value >> bits != 0 {
        return Err(CompileError::OperandOverflow { field, value, bits });
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Weight {
                op,
                length,
                address,
            } => write!(f, "[{},{},{}]", op.code(), length, address),
            Instruction::Compute {
                op,
                length,
                base,
                target,
            } => write!(f, "[{},{},{},{}]", op.code(), length, base, target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config = SystolicConfig::new(14);
        assert_eq!(config.max_value(), 127);
        assert_eq!(config.min_value(), -128);
        assert!(config.validate().is_ok());
        assert!(SystolicConfig::new(0).validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config = SystolicConfig::from_toml(
            r#"
tile_width = 4
embed_weights = true
"#,
        )
        .unwrap();
        assert_eq!(config.tile_width, 4);
        assert_eq!(config.data_width, 8);
        assert!(config.embed_weights);
        assert!(!config.strict_windows);

        let back = SystolicConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_rejects_zero_width() {
        let err = SystolicConfig::from_toml("tile_width = 0").unwrap_err();
        assert!(matches!(err, CompileError::ConfigError { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::load_weight(14, 28).to_string(), "[9,14,28]");
        assert_eq!(Instruction::matmul(false, 14, 0, 3).to_string(), "[33,14,0,3]");
        assert_eq!(Instruction::matmul(true, 2, 0, 5).to_string(), "[35,2,0,5]");
        assert_eq!(Instruction::activate(14, 14, 42).to_string(), "[153,14,14,42]");
        assert_eq!(Instruction::sync().to_string(), "[255,0,0]");
    }

    #[test]
    fn test_from_operands() {
        assert_eq!(
            Instruction::from_operands(&[35, 2, 0, 5]).unwrap(),
            Instruction::matmul(true, 2, 0, 5)
        );
        assert_eq!(Instruction::from_operands(&[255, 0, 0]).unwrap(), Instruction::sync());
        assert!(Instruction::from_operands(&[9, 1, 2, 3]).is_err());
        assert!(Instruction::from_operands(&[7, 1, 2]).is_err());
        assert!(Instruction::from_operands(&[9, -1, 2]).is_err());
    }

    #[test]
    fn test_sync_operands_must_be_zero() {
        assert!(matches!(
            Instruction::from_operands(&[255, 7, 9]),
            Err(CompileError::ParseError { .. })
        ));
        assert!(Instruction::from_operands(&[255, 0, 1]).is_err());
    }

    #[test]
    fn test_check_values_against_data_width() {
        let mut config = SystolicConfig::new(2);
        config.data_width = 4;
        let narrow = Matrix::from_rows(vec![vec![7, -8], vec![0, 1]]).unwrap();
        let wide = Matrix::from_rows(vec![vec![100, -100], vec![1, 2]]).unwrap();

        assert!(config.check_values(&narrow).is_ok());
        assert!(matches!(
            config.check_values(&wide),
            Err(CompileError::ValueOutOfRange { value: 100, min: -8, max: 7 })
        ));
        assert!(SystolicConfig::new(2).check_values(&wide).is_ok());
    }

    #[test]
    fn test_operand_overflow() {
        let err = Instruction::activate(14, 1 << 16, 0).validate().unwrap_err();
        assert!(matches!(
            err,
            CompileError::OperandOverflow { bits: 16, .. }
        ));
        assert!(Instruction::load_weight(14, (1 << 40) - 1).validate().is_ok());
        assert!(Instruction::load_weight(14, 1 << 40).validate().is_err());
    }
}
