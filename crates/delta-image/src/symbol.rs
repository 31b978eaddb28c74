//! Symbol tables

use crate::code_block::CodeBlockId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Block-qualified symbol index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey {
    pub block: CodeBlockId,
    pub index: usize,
}

impl SymbolKey {
    /// Key of a top-level global slot
    #[inline]
    #[must_use]
    pub const fn global(index: usize) -> Self {
        Self {
            block: CodeBlockId::ROOT,
            index,
        }
    }
}

/// One declared name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolNode {
    pub name: String,
    /// Slot index; for top-level symbols this is the global slot
    pub index: usize,
    pub block: CodeBlockId,
    /// Procedure the symbol is local to, if any
    pub function_index: Option<usize>,
    /// Class the symbol is a member of, if any
    pub class_scope: Option<usize>,
    pub is_static: bool,
    pub is_argument: bool,
    /// Compiler generated
    pub is_temp: bool,
}

impl SymbolNode {
    /// Plain global variable
    #[must_use]
    pub fn global(name: impl Into<String>, block: CodeBlockId) -> Self {
        Self {
            name: name.into(),
            index: 0,
            block,
            function_index: None,
            class_scope: None,
            is_static: false,
            is_argument: false,
            is_temp: false,
        }
    }

    /// Function argument
    #[must_use]
    pub fn argument(name: impl Into<String>, block: CodeBlockId, function_index: usize) -> Self {
        Self {
            function_index: Some(function_index),
            is_argument: true,
            ..Self::global(name, block)
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> SymbolKey {
        SymbolKey {
            block: self.block,
            index: self.index,
        }
    }

    /// Whether the symbol lives in a call frame rather than global memory
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.function_index.is_some()
    }

    /// Whether a global dump should list this symbol
    #[inline]
    #[must_use]
    pub fn is_user_global(&self) -> bool {
        !(self.is_argument || self.is_local() || self.is_static || self.is_temp)
    }
}

/// Symbols of one code block, indexed by name and by slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolTable {
    block: CodeBlockId,
    symbols: IndexMap<String, SymbolNode>,
}

impl SymbolTable {
    #[must_use]
    pub fn new(block: CodeBlockId) -> Self {
        Self {
            block,
            symbols: IndexMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn block(&self) -> CodeBlockId {
        self.block
    }

    /// Insert a symbol, assigning the next slot
    ///
    /// A name that is already declared keeps its slot and returns it.
    pub fn insert(&mut self, mut symbol: SymbolNode) -> usize {
        if let Some(index) = self.symbols.get_index_of(&symbol.name) {
            return index;
        }
        let index = self.symbols.len();
        symbol.index = index;
        symbol.block = self.block;
        self.symbols.insert(symbol.name.clone(), symbol);
        index
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SymbolNode> {
        self.symbols.get(name)
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.symbols.get_index_of(name)
    }

    #[inline]
    #[must_use]
    pub fn by_index(&self, index: usize) -> Option<&SymbolNode> {
        self.symbols.get_index(index).map(|(_, symbol)| symbol)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in slot order
    pub fn iter(&self) -> impl Iterator<Item = &SymbolNode> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_slots() {
        let mut table = SymbolTable::new(CodeBlockId::ROOT);
        assert_eq!(table.insert(SymbolNode::global("a", CodeBlockId::ROOT)), 0);
        assert_eq!(table.insert(SymbolNode::global("b", CodeBlockId::ROOT)), 1);
        assert_eq!(table.insert(SymbolNode::global("a", CodeBlockId::ROOT)), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_index(1).unwrap().name, "b");
        assert_eq!(table.get("b").unwrap().key(), SymbolKey::global(1));
    }

    #[test]
    fn test_user_global_filter() {
        let block = CodeBlockId(2);
        let mut table = SymbolTable::new(block);
        table.insert(SymbolNode::argument("x", block, 0));
        table.insert(SymbolNode {
            is_temp: true,
            ..SymbolNode::global("%t0", block)
        });
        table.insert(SymbolNode::global("y", block));
        let listed: Vec<_> = table.iter().filter(|s| s.is_user_global()).map(|s| s.name.as_str()).collect();
        assert_eq!(listed, vec!["y"]);
        assert_eq!(table.get("y").unwrap().block, block);
    }
}
