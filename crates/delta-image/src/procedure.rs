//! Procedure tables
//!
//! Procedures keep their index for the life of a session. Redefining a
//! function replaces its entry in place, and a call to a function that does
//! not exist yet reserves an inactive entry that a later definition fills.

use crate::code_block::CodeBlockId;
use delta_diff::SubtreeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureNode {
    pub name: String,
    pub index: usize,
    pub params: Vec<String>,
    /// Block holding the body instructions; `None` while only reserved
    pub body_block: Option<CodeBlockId>,
    pub pc_start: usize,
    pub pc_end: usize,
    /// Subtree that defined the procedure
    pub owner: Option<SubtreeId>,
    /// Defined and not retired
    pub is_active: bool,
}

impl ProcedureNode {
    #[inline]
    #[must_use]
    pub fn argc(&self) -> usize {
        self.params.len()
    }
}

/// Procedures declared in one code block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureTable {
    block: CodeBlockId,
    procedures: IndexMap<String, ProcedureNode>,
}

impl ProcedureTable {
    #[must_use]
    pub fn new(block: CodeBlockId) -> Self {
        Self {
            block,
            procedures: IndexMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn block(&self) -> CodeBlockId {
        self.block
    }

    /// Index for `name`, adding an inactive entry if it is unknown
    pub fn reserve(&mut self, name: &str) -> usize {
        if let Some(index) = self.procedures.get_index_of(name) {
            return index;
        }
        let index = self.procedures.len();
        self.procedures.insert(
            name.to_string(),
            ProcedureNode {
                name: name.to_string(),
                index,
                params: Vec::new(),
                body_block: None,
                pc_start: 0,
                pc_end: 0,
                owner: None,
                is_active: false,
            },
        );
        index
    }

    /// Fill (or replace) the entry for `name` and mark it active
    pub fn define(
        &mut self,
        name: &str,
        params: Vec<String>,
        body_block: CodeBlockId,
        pc_range: (usize, usize),
        owner: Option<SubtreeId>,
    ) -> usize {
        let index = self.reserve(name);
        if let Some((_, node)) = self.procedures.get_index_mut(index) {
            node.params = params;
            node.body_block = Some(body_block);
            node.pc_start = pc_range.0;
            node.pc_end = pc_range.1;
            node.owner = owner;
            node.is_active = true;
        }
        index
    }

    /// Deactivate a procedure; its index stays reserved
    ///
    /// Returns `true` if the procedure was active.
    pub fn retire(&mut self, index: usize) -> bool {
        match self.procedures.get_index_mut(index) {
            Some((_, node)) if node.is_active => {
                node.is_active = false;
                true
            }
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ProcedureNode> {
        self.procedures.get_index(index).map(|(_, node)| node)
    }

    #[inline]
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ProcedureNode> {
        self.procedures.get(name)
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.procedures.get_index_of(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcedureNode> {
        self.procedures.values()
    }
}
