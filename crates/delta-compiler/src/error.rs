//! Compile errors and diagnostics
//!
//! Compilation never returns `Err`: every problem becomes a [`Diagnostic`]
//! and the outcome's success flag says whether any of them was an error.

use delta_diff::SubtreeId;
use delta_image::ImageError;
use delta_lang::{ParseError, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Problems found while compiling one unit
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Image(#[from] ImageError),

    /// Assignment to a name that is a function
    #[error("cannot assign to `{0}`: it names a function")]
    AssignToFunction(String),

    /// Function definition over a variable that is assigned elsewhere
    #[error("cannot define function `{0}`: it is already a variable")]
    FunctionShadowsVariable(String),
}

impl CompileError {
    fn span(&self) -> Option<Span> {
        match self {
            Self::Parse(err) => Some(err.span()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Message attached to a compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Subtree whose code produced the message
    pub subtree: Option<SubtreeId>,
    pub span: Option<Span>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(error: &CompileError, subtree: Option<SubtreeId>) -> Self {
        Self {
            severity: Severity::Error,
            message: error.to_string(),
            subtree,
            span: error.span(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, subtree: Option<SubtreeId>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            subtree,
            span: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}")?;
        if let Some(subtree) = self.subtree {
            write!(f, " [{subtree}]")?;
        }
        write!(f, ": {}", self.message)
    }
}
