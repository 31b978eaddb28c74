//! Code block tree
//!
//! Blocks live in an arena and refer to each other by [`CodeBlockId`]. A
//! child records its parent's id; only the arena owns blocks. Blocks are
//! created either as roots or as children of an existing block, so a parent
//! id is always smaller than its child's and every ancestor walk terminates.

use crate::error::ImageError;
use crate::instruction::InstructionStream;
use crate::procedure::ProcedureTable;
use crate::symbol::SymbolTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a block in its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeBlockId(pub usize);

impl CodeBlockId {
    /// Top-level language block
    pub const ROOT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CodeBlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution dialect of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// Dataflow: statements re-run when what they read changes
    #[default]
    Associative,
    /// Statements run once, in order
    Imperative,
}

/// Kind of scope a block represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeBlockType {
    /// Language-level block
    Language,
    /// Nested construct inside a language block
    Construct,
    /// Function body
    Function,
}

/// One compilation scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    id: CodeBlockId,
    block_type: CodeBlockType,
    language: Language,
    parent: Option<CodeBlockId>,
    children: Vec<CodeBlockId>,
    /// Number of global slots this block owns
    pub global_size: usize,
    pub symbol_table: SymbolTable,
    pub procedure_table: ProcedureTable,
    pub instr_stream: InstructionStream,
    /// Whether execution may suspend inside this block
    pub is_breakable: bool,
}

impl CodeBlock {
    fn new(id: CodeBlockId, block_type: CodeBlockType, language: Language, parent: Option<CodeBlockId>) -> Self {
        Self {
            id,
            block_type,
            language,
            parent,
            children: Vec::new(),
            global_size: 0,
            symbol_table: SymbolTable::new(id),
            procedure_table: ProcedureTable::new(id),
            instr_stream: InstructionStream::new(language),
            is_breakable: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> CodeBlockId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn block_type(&self) -> CodeBlockType {
        self.block_type
    }

    #[inline]
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<CodeBlockId> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[CodeBlockId] {
        &self.children
    }
}

/// Owner of every code block of a program
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeBlockArena {
    blocks: Vec<CodeBlock>,
}

impl CodeBlockArena {
    /// Empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena holding a single top-level language block, [`CodeBlockId::ROOT`]
    #[must_use]
    pub fn with_root(language: Language) -> Self {
        let mut arena = Self::new();
        arena.add_root(language);
        arena
    }

    /// Add a parentless language block
    pub fn add_root(&mut self, language: Language) -> CodeBlockId {
        let id = CodeBlockId(self.blocks.len());
        self.blocks.push(CodeBlock::new(id, CodeBlockType::Language, language, None));
        id
    }

    /// Add a block under an existing one
    ///
    /// # Errors
    /// Returns [`ImageError::UnknownBlock`] if `parent` is not in the arena.
    pub fn add_child(
        &mut self,
        parent: CodeBlockId,
        block_type: CodeBlockType,
        language: Language,
    ) -> Result<CodeBlockId, ImageError> {
        let id = CodeBlockId(self.blocks.len());
        let parent_block = self
            .blocks
            .get_mut(parent.index())
            .ok_or(ImageError::UnknownBlock(parent))?;
        parent_block.children.push(id);
        self.blocks.push(CodeBlock::new(id, block_type, language, Some(parent)));
        Ok(id)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: CodeBlockId) -> Option<&CodeBlock> {
        self.blocks.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: CodeBlockId) -> Option<&mut CodeBlock> {
        self.blocks.get_mut(id.index())
    }

    /// Number of blocks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks in id order
    pub fn iter(&self) -> impl Iterator<Item = &CodeBlock> {
        self.blocks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CodeBlock> {
        self.blocks.iter_mut()
    }

    /// Strict ancestors of `block`, nearest first
    pub fn ancestors(&self, block: CodeBlockId) -> impl Iterator<Item = CodeBlockId> + '_ {
        let mut next = self.get(block).and_then(CodeBlock::parent);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.get(current).and_then(CodeBlock::parent);
            Some(current)
        })
    }

    /// Whether `ancestor` lies strictly above `block` in the tree
    #[must_use]
    pub fn is_ancestor(&self, block: CodeBlockId, ancestor: CodeBlockId) -> bool {
        self.ancestors(block).any(|id| id == ancestor)
    }
}
