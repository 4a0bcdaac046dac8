//! Parser for transfer artifact text
//!
//! Reads rendered artifacts back into named sections:
//! - `weights:[ [1,2] [4,5] ]`
//! - `instructions:[ [9,14,0] [255,0,0] ]`
//!
//! Line breaks carry no meaning to the parser; entries are delimited by
//! their brackets.

use crate::artifact::BlockKind;
use crate::error::{CompileError, CompileResult};
use crate::hardware::Instruction;
use crate::lexer::{Lexer, Token};

/// One named block of integer rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: BlockKind,
    pub rows: Vec<Vec<i64>>,
}

impl Section {
    /// Decode every row as an instruction.
    pub fn instructions(&self) -> CompileResult<Vec<Instruction>> {
        self.rows
            .iter()
            .map(|row| Instruction::from_operands(row))
            .collect()
    }
}

/// Parser for artifact text
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    current: Option<Token>,
    position: usize,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> CompileResult<Self> {
        let mut parser = Self {
            lexer: Lexer::new(source),
            current: None,
            position: 0,
        };
        parser.advance()?;
        Ok(parser)
    }

    /// Advance to the next token, returning the previous one
    fn advance(&mut self) -> CompileResult<Option<Token>> {
        let next = match self.lexer.next() {
            Some(Ok(token)) => Some(token),
            Some(Err(())) => {
                let span = self.lexer.span();
                return Err(CompileError::parse_error(span.start, "unexpected character"));
            }
            None => None,
        };
        self.position = self.lexer.span().start;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Check if current token matches expected
    fn check(&self, expected: &Token) -> bool {
        match &self.current {
            Some(tok) => std::mem::discriminant(tok) == std::mem::discriminant(expected),
            None => false,
        }
    }

    /// Consume token if it matches, otherwise error
    fn expect(&mut self, expected: Token) -> CompileResult<()> {
        if self.check(&expected) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let got = match &self.current {
            Some(token) => format!("'{}'", token),
            None => "end of input".to_string(),
        };
        CompileError::parse_error(self.position, format!("expected {}, got {}", expected, got))
    }

    /// Parse every section in the artifact
    pub fn parse_artifact(&mut self) -> CompileResult<Vec<Section>> {
        let mut sections = Vec::new();
        while self.current.is_some() {
            sections.push(self.parse_section()?);
        }
        Ok(sections)
    }

    /// Parse `name:[ entry* ]`
    fn parse_section(&mut self) -> CompileResult<Section> {
        let kind = match &self.current {
            Some(Token::Ident(name)) => BlockKind::from_name(name).ok_or_else(|| {
                CompileError::parse_error(self.position, format!("unknown block '{}'", name))
            })?,
            _ => return Err(self.unexpected("block name")),
        };
        self.advance()?;
        self.expect(Token::Colon)?;
        self.expect(Token::LBracket)?;

        let mut rows = Vec::new();
        while self.check(&Token::LBracket) {
            rows.push(self.parse_entry()?);
        }
        self.expect(Token::RBracket)?;

        Ok(Section { kind, rows })
    }

    /// Parse `[n, n, ...]`
    fn parse_entry(&mut self) -> CompileResult<Vec<i64>> {
        self.expect(Token::LBracket)?;
        let mut values = Vec::new();

        if self.check(&Token::RBracket) {
            self.advance()?;
            return Ok(values);
        }

        loop {
            match self.current {
                Some(Token::Number(n)) => {
                    values.push(n);
                    self.advance()?;
                }
                _ => return Err(self.unexpected("number")),
            }

            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                break;
            }
        }

        self.expect(Token::RBracket)?;
        Ok(values)
    }
}

/// Parse artifact text into its sections.
pub fn parse_artifact(source: &str) -> CompileResult<Vec<Section>> {
    Parser::new(source)?.parse_artifact()
}
