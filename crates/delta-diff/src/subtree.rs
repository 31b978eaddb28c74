//! Subtrees: named units of user code

use crate::error::DiffError;
use delta_lang::{parse_program, AstNode};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a subtree across edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubtreeId(pub Uuid);

impl SubtreeId {
    /// Fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id, mostly for tests and the CLI
    #[inline]
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for SubtreeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubtreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of user-authored code
///
/// Immutable once built; a later edit supersedes it with a new `Subtree`
/// carrying the same [`SubtreeId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtree {
    id: SubtreeId,
    ast_nodes: Vec<AstNode>,
}

impl Subtree {
    /// Subtree from already parsed statements
    #[must_use]
    pub fn new(id: SubtreeId, ast_nodes: Vec<AstNode>) -> Self {
        Self { id, ast_nodes }
    }

    /// Subtree with no statements, as used to name a deletion
    #[must_use]
    pub fn empty(id: SubtreeId) -> Self {
        Self::new(id, Vec::new())
    }

    /// Parse source text into a subtree
    ///
    /// # Errors
    /// Returns [`DiffError::InvalidCode`] if the code does not parse.
    pub fn parse(id: SubtreeId, code: &str) -> Result<Self, DiffError> {
        let ast_nodes = parse_program(code).map_err(|source| DiffError::InvalidCode { id, source })?;
        Ok(Self::new(id, ast_nodes))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> SubtreeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn ast_nodes(&self) -> &[AstNode] {
        &self.ast_nodes
    }

    /// Names bound by the statements of this subtree, in order
    pub fn bound_names(&self) -> impl Iterator<Item = &str> {
        self.ast_nodes.iter().map(AstNode::bound_name)
    }

    /// Source text of the subtree, one statement per line
    #[must_use]
    pub fn code(&self) -> String {
        self.ast_nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subtree() {
        let id = SubtreeId::from_u128(1);
        let subtree = Subtree::parse(id, "a = 2;\nb = a * 3;").unwrap();
        assert_eq!(subtree.id(), id);
        assert_eq!(subtree.ast_nodes().len(), 2);
        assert_eq!(subtree.bound_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(subtree.code(), "a = 2;\nb = a * 3;");
    }

    #[test]
    fn test_parse_error_names_subtree() {
        let id = SubtreeId::from_u128(7);
        let err = Subtree::parse(id, "a = ;").unwrap_err();
        assert_eq!(err.subtree(), id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_ids_are_distinct() {
        assert_ne!(SubtreeId::new(), SubtreeId::new());
        assert_eq!(SubtreeId::from_u128(3), SubtreeId::from_u128(3));
    }
}
