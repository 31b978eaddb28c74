//! Instruction streams

use crate::code_block::Language;
use crate::dependency::DependencyGraph;
use crate::symbol::SymbolKey;
use delta_lang::{BinaryOp, UnaryOp};
use serde::{Deserialize, Serialize};

/// Stack machine instruction
///
/// Jump targets are absolute indices into the owning stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    PushNull,
    PushBool(bool),
    PushInt(i64),
    PushDouble(f64),
    PushString(String),
    /// Push an entry of the function pointer table
    PushFunctionPointer(usize),
    LoadGlobal(usize),
    /// Pop into a global slot
    StoreGlobal(usize),
    /// Push a slot of the current call frame
    LoadLocal(usize),
    /// Pop `n` values into a new array
    MakeArray(usize),
    /// Pop index then target, push element
    Index,
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Call a top-level procedure with `argc` popped arguments
    Call { procedure: usize, argc: usize },
    /// Pop `argc` arguments and then a function pointer, and call it
    CallPointer { argc: usize },
    Jump(usize),
    /// Pop a value and jump when it is not truthy
    JumpIfFalse(usize),
    /// Leave the current procedure with the top of stack
    Return,
}

/// Entity whose dependents must re-run on the next execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpdateNodeRef {
    /// The active definitions of a symbol
    Symbol(SymbolKey),
    /// Every expression that calls the procedure
    Procedure(usize),
}

/// Bytecode of one code block plus its dependency bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionStream {
    pub language: Language,
    /// First instruction of the latest compilation; `None` before any
    pub entrypoint: Option<usize>,
    pub instructions: Vec<Instruction>,
    pub dependency_graph: DependencyGraph,
    /// Roots to re-evaluate on the next execution
    pub update_list: Vec<UpdateNodeRef>,
}

impl InstructionStream {
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self {
            language,
            entrypoint: None,
            instructions: Vec::new(),
            dependency_graph: DependencyGraph::new(),
            update_list: Vec::new(),
        }
    }

    /// Append an instruction, returning its index
    pub fn push(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Index the next pushed instruction will get
    #[inline]
    #[must_use]
    pub fn next_pc(&self) -> usize {
        self.instructions.len()
    }

    /// Point the jump at `at` to `target`
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        match self.instructions.get_mut(at) {
            Some(Instruction::Jump(dest) | Instruction::JumpIfFalse(dest)) => *dest = target,
            other => tracing::warn!(pc = at, instruction = ?other, "patch target is not a jump"),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
