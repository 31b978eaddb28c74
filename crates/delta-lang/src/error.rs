//! Parse errors with source positions

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based line/column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Line number, starting at 1
    pub line: u32,
    /// Column number, starting at 1
    pub column: u32,
}

impl Span {
    /// Create span
    #[inline]
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors produced while tokenizing or parsing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Character that starts no token
    #[error("{span}: unexpected character {found:?}")]
    UnexpectedChar { found: char, span: Span },

    /// String literal without closing quote
    #[error("{span}: unterminated string literal")]
    UnterminatedString { span: Span },

    /// Numeric literal that does not fit its type
    #[error("{span}: invalid number literal `{literal}`")]
    InvalidNumber { literal: String, span: Span },

    /// Token that the grammar does not allow here
    #[error("{span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    /// Input ended in the middle of a construct
    #[error("{span}: unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    /// Same parameter declared twice in one function
    #[error("{span}: duplicate parameter `{name}`")]
    DuplicateParameter { name: String, span: Span },
}

impl ParseError {
    /// Position of the error
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedChar { span, .. }
            | Self::UnterminatedString { span }
            | Self::InvalidNumber { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEof { span, .. }
            | Self::DuplicateParameter { span, .. } => *span,
        }
    }
}
