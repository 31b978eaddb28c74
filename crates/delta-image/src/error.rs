//! Image errors

use crate::code_block::CodeBlockId;

/// Structural errors of an image
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Block id not present in the arena
    #[error("code block {0} does not exist")]
    UnknownBlock(CodeBlockId),

    /// Per-block arrays of an executable disagree on length
    #[error(
        "executable tables are misaligned: {procedures} procedure tables, \
         {symbols} symbol tables, {streams} instruction streams, {blocks} code blocks"
    )]
    Misaligned {
        procedures: usize,
        symbols: usize,
        streams: usize,
        blocks: usize,
    },

    /// Procedure index outside the procedure table
    #[error("procedure {0} does not exist")]
    UnknownProcedure(usize),
}

impl ImageError {
    /// Structural corruption, as opposed to a bad lookup
    #[inline]
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Misaligned { .. })
    }
}
