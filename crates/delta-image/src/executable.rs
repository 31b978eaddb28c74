//! Executable snapshot
//!
//! Built from the compiler's block arena after a successful compilation and
//! never modified afterwards. The runner shares it behind an `Arc` and swaps
//! the whole reference when a newer snapshot is ready.

use crate::class_table::ClassTable;
use crate::code_block::{CodeBlockArena, CodeBlockId, CodeBlockType, Language};
use crate::dependency::DependencyGraph;
use crate::dynamic::{DynamicFunctionTable, DynamicVariableTable, FunctionPointerTable};
use crate::error::ImageError;
use crate::instruction::InstructionStream;
use crate::procedure::{ProcedureNode, ProcedureTable};
use crate::symbol::{SymbolNode, SymbolTable};
use serde::{Deserialize, Serialize};
use std::mem;

/// Runnable program
///
/// `procedure_tables`, `runtime_symbols` and `instr_streams` are indexed by
/// [`CodeBlockId`] and have one entry per block of `code_blocks`; the blocks
/// themselves keep only the tree structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Executable {
    pub class_table: ClassTable,
    pub procedure_tables: Vec<ProcedureTable>,
    pub runtime_symbols: Vec<SymbolTable>,
    pub instr_streams: Vec<InstructionStream>,
    pub code_blocks: CodeBlockArena,
    pub dynamic_variables: DynamicVariableTable,
    pub dynamic_functions: DynamicFunctionTable,
    pub function_pointers: FunctionPointerTable,
    /// The program is one associative block with no nested language blocks
    pub is_single_assoc_block: bool,
}

impl Executable {
    /// Program with an empty top-level block
    #[must_use]
    pub fn empty() -> Self {
        Self::from_blocks(
            CodeBlockArena::with_root(Language::Associative),
            ClassTable::with_primitives(),
            DynamicVariableTable::default(),
            DynamicFunctionTable::default(),
            FunctionPointerTable::default(),
        )
    }

    /// Move the per-block tables out of `code_blocks` into aligned arrays
    #[must_use]
    pub fn from_blocks(
        mut code_blocks: CodeBlockArena,
        class_table: ClassTable,
        dynamic_variables: DynamicVariableTable,
        dynamic_functions: DynamicFunctionTable,
        function_pointers: FunctionPointerTable,
    ) -> Self {
        let count = code_blocks.len();
        let mut procedure_tables = Vec::with_capacity(count);
        let mut runtime_symbols = Vec::with_capacity(count);
        let mut instr_streams = Vec::with_capacity(count);

        for block in code_blocks.iter_mut() {
            let id = block.id();
            let language = block.language();
            procedure_tables.push(mem::replace(&mut block.procedure_table, ProcedureTable::new(id)));
            runtime_symbols.push(mem::replace(&mut block.symbol_table, SymbolTable::new(id)));
            instr_streams.push(mem::replace(&mut block.instr_stream, InstructionStream::new(language)));
        }

        let language_blocks = code_blocks
            .iter()
            .filter(|b| b.block_type() == CodeBlockType::Language)
            .count();
        let is_single_assoc_block = language_blocks == 1
            && code_blocks
                .get(CodeBlockId::ROOT)
                .is_some_and(|root| root.language() == Language::Associative);

        Self {
            class_table,
            procedure_tables,
            runtime_symbols,
            instr_streams,
            code_blocks,
            dynamic_variables,
            dynamic_functions,
            function_pointers,
            is_single_assoc_block,
        }
    }

    /// Check that the per-block arrays line up
    ///
    /// # Errors
    /// Returns [`ImageError::Misaligned`] when any array length differs.
    pub fn validate(&self) -> Result<(), ImageError> {
        let blocks = self.code_blocks.len();
        let (procedures, symbols, streams) = (
            self.procedure_tables.len(),
            self.runtime_symbols.len(),
            self.instr_streams.len(),
        );
        if procedures == blocks && symbols == blocks && streams == blocks {
            Ok(())
        } else {
            Err(ImageError::Misaligned {
                procedures,
                symbols,
                streams,
                blocks,
            })
        }
    }

    /// Global slots the program needs
    #[must_use]
    pub fn global_count(&self) -> usize {
        self.code_blocks
            .iter()
            .filter(|b| b.parent().is_none())
            .map(|b| b.global_size)
            .sum()
    }

    #[inline]
    #[must_use]
    pub fn stream(&self, block: CodeBlockId) -> Option<&InstructionStream> {
        self.instr_streams.get(block.index())
    }

    #[inline]
    #[must_use]
    pub fn symbols(&self, block: CodeBlockId) -> Option<&SymbolTable> {
        self.runtime_symbols.get(block.index())
    }

    /// Top-level symbol by name
    #[must_use]
    pub fn global_symbol(&self, name: &str) -> Option<&SymbolNode> {
        self.symbols(CodeBlockId::ROOT)?.get(name)
    }

    /// Top-level symbol by global slot
    #[must_use]
    pub fn global_symbol_at(&self, slot: usize) -> Option<&SymbolNode> {
        self.symbols(CodeBlockId::ROOT)?.by_index(slot)
    }

    /// Top-level procedure by index
    #[must_use]
    pub fn procedure(&self, index: usize) -> Option<&ProcedureNode> {
        self.procedure_tables.get(CodeBlockId::ROOT.index())?.get(index)
    }

    /// Dependency graph of the top-level stream
    #[must_use]
    pub fn dependency_graph(&self) -> Option<&DependencyGraph> {
        self.stream(CodeBlockId::ROOT).map(|s| &s.dependency_graph)
    }
}

impl Default for Executable {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction;

    fn sample_arena() -> CodeBlockArena {
        let mut arena = CodeBlockArena::with_root(Language::Associative);
        let root = arena.get_mut(CodeBlockId::ROOT).unwrap();
        root.symbol_table.insert(SymbolNode::global("a", CodeBlockId::ROOT));
        root.global_size = 1;
        root.instr_stream.push(Instruction::PushInt(2));
        root.instr_stream.push(Instruction::StoreGlobal(0));
        let f = arena
            .add_child(CodeBlockId::ROOT, CodeBlockType::Function, Language::Associative)
            .unwrap();
        arena.get_mut(f).unwrap().instr_stream.push(Instruction::Return);
        arena
            .get_mut(CodeBlockId::ROOT)
            .unwrap()
            .procedure_table
            .define("f", vec![], f, (0, 1), None);
        arena
    }

    #[test]
    fn test_tables_are_aligned() {
        let exe = Executable::from_blocks(
            sample_arena(),
            ClassTable::with_primitives(),
            DynamicVariableTable::default(),
            DynamicFunctionTable::default(),
            FunctionPointerTable::default(),
        );
        exe.validate().unwrap();
        assert_eq!(exe.instr_streams.len(), 2);
        assert_eq!(exe.stream(CodeBlockId(1)).unwrap().len(), 1);
        assert_eq!(exe.global_symbol("a").unwrap().index, 0);
        assert_eq!(exe.global_symbol_at(0).unwrap().name, "a");
        assert_eq!(exe.procedure(0).unwrap().name, "f");
        assert_eq!(exe.global_count(), 1);
        assert!(exe.is_single_assoc_block);
        // tables moved out of the tree
        assert!(exe.code_blocks.get(CodeBlockId::ROOT).unwrap().symbol_table.is_empty());
    }

    #[test]
    fn test_misalignment_detected() {
        let mut exe = Executable::empty();
        exe.instr_streams.push(InstructionStream::new(Language::Imperative));
        let err = exe.validate().unwrap_err();
        assert!(err.is_corruption());
    }
}
