//! Runtime faults
//!
//! A fault aborts the current execution. Memory keeps whatever the last
//! completed store left in it.

use delta_image::{CodeBlockId, ExprId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteFault {
    /// A statement kept re-triggering itself through its dependents
    #[error("update cycle: statement {node} re-evaluated more than {limit} times")]
    UpdateCycle { node: ExprId, limit: usize },

    /// Recursion deeper than the configured limit
    #[error("call depth exceeded {limit}")]
    CallDepthExceeded { limit: usize },

    /// Global slot beyond allocated memory
    #[error("global slot {slot} is not allocated ({allocated} slots)")]
    UnallocatedGlobal { slot: usize, allocated: usize },

    /// Instruction stream of a block is missing
    #[error("no instruction stream for code block {0}")]
    MissingBlock(CodeBlockId),

    /// Program counter left its instruction range
    #[error("invalid program counter {pc} in code block {block}")]
    InvalidProgramCounter { block: CodeBlockId, pc: usize },

    /// Instruction needed more operands than the stack held
    #[error("operand stack underflow in code block {block} at {pc}")]
    StackUnderflow { block: CodeBlockId, pc: usize },
}

impl ExecuteFault {
    /// Faults caused by the running program rather than a broken image
    #[inline]
    #[must_use]
    pub fn is_program_fault(&self) -> bool {
        matches!(self, Self::UpdateCycle { .. } | Self::CallDepthExceeded { .. })
    }

    /// Faults that point at an inconsistent executable or memory layout
    #[inline]
    #[must_use]
    pub fn is_internal(&self) -> bool {
        !self.is_program_fault()
    }
}
