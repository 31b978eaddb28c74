//! Diff model errors

use crate::subtree::SubtreeId;
use delta_lang::ParseError;

/// Errors raised while building subtrees
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiffError {
    /// Subtree code does not parse
    #[error("subtree {id}: {source}")]
    InvalidCode {
        id: SubtreeId,
        #[source]
        source: ParseError,
    },
}

impl DiffError {
    /// Subtree the error belongs to
    #[inline]
    #[must_use]
    pub fn subtree(&self) -> SubtreeId {
        match self {
            Self::InvalidCode { id, .. } => *id,
        }
    }
}
