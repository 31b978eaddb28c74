//! Compile state carried from one compilation to the next

use delta_image::{
    ClassTable, CodeBlock, CodeBlockArena, CodeBlockId, DynamicFunctionTable, DynamicVariableTable, Executable,
    FunctionPointerTable, Language,
};

/// Everything the compiler has built so far in a session
///
/// A compilation clones the prior state and extends the clone, so the
/// prior state stays valid whatever happens to the new one.
#[derive(Debug, Clone)]
pub struct CompileState {
    pub(crate) code_blocks: CodeBlockArena,
    pub(crate) class_table: ClassTable,
    pub(crate) dynamic_variables: DynamicVariableTable,
    pub(crate) dynamic_functions: DynamicFunctionTable,
    pub(crate) function_pointers: FunctionPointerTable,
    next_expr_id: u64,
    full_execution: bool,
}

impl CompileState {
    /// State holding an empty associative top-level block
    #[must_use]
    pub fn new() -> Self {
        Self {
            code_blocks: CodeBlockArena::with_root(Language::Associative),
            class_table: ClassTable::with_primitives(),
            dynamic_variables: DynamicVariableTable::default(),
            dynamic_functions: DynamicFunctionTable::default(),
            function_pointers: FunctionPointerTable::default(),
            next_expr_id: 0,
            full_execution: false,
        }
    }

    /// Number of top-level global slots declared so far
    #[inline]
    #[must_use]
    pub fn glob_offset(&self) -> usize {
        self.code_blocks.get(CodeBlockId::ROOT).map_or(0, |root| root.global_size)
    }

    /// Drop the per-delta bookkeeping of the previous compilation
    pub fn reset_for_new_delta(&mut self) {
        if let Some(root) = self.root_mut() {
            root.instr_stream.update_list.clear();
        }
        self.full_execution = false;
    }

    /// Make the next compilation re-run every active statement
    pub fn reset_for_full_execution(&mut self) {
        if let Some(root) = self.root_mut() {
            root.instr_stream.update_list.clear();
        }
        self.full_execution = true;
    }

    /// Snapshot the current blocks as a runnable program
    #[must_use]
    pub fn generate_executable(&self) -> Executable {
        Executable::from_blocks(
            self.code_blocks.clone(),
            self.class_table.clone(),
            self.dynamic_variables.clone(),
            self.dynamic_functions.clone(),
            self.function_pointers.clone(),
        )
    }

    #[inline]
    #[must_use]
    pub fn code_blocks(&self) -> &CodeBlockArena {
        &self.code_blocks
    }

    #[inline]
    #[must_use]
    pub fn dynamic_variables(&self) -> &DynamicVariableTable {
        &self.dynamic_variables
    }

    #[inline]
    #[must_use]
    pub fn dynamic_functions(&self) -> &DynamicFunctionTable {
        &self.dynamic_functions
    }

    /// Mark the start of a compilation: statements emitted from here on are
    /// the pending part of the stream
    pub(crate) fn begin_compile(&mut self) {
        let full = std::mem::take(&mut self.full_execution);
        if let Some(root) = self.root_mut() {
            let entry = if full { 0 } else { root.instr_stream.len() };
            root.instr_stream.entrypoint = Some(entry);
            root.instr_stream.update_list.clear();
        }
    }

    pub(crate) fn next_expr_id(&mut self) -> delta_image::ExprId {
        let id = delta_image::ExprId(self.next_expr_id);
        self.next_expr_id += 1;
        id
    }

    pub(crate) fn root(&self) -> Option<&CodeBlock> {
        self.code_blocks.get(CodeBlockId::ROOT)
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut CodeBlock> {
        self.code_blocks.get_mut(CodeBlockId::ROOT)
    }
}

impl Default for CompileState {
    fn default() -> Self {
        Self::new()
    }
}
