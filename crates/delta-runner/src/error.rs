//! Runner errors
//!
//! A failed batch is an error for the caller that submitted it, never for the
//! worker: the worker keeps draining the queue whatever a task returns.

use crate::state_machine::SessionState;
use delta_compiler::Diagnostic;
use delta_vm::ExecuteFault;

/// Main runner error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunnerError {
    /// The fragment failed to compile; nothing was executed
    #[error("compilation failed: {}", summarize(.diagnostics))]
    Compile {
        /// Errors and warnings the compiler reported
        diagnostics: Vec<Diagnostic>,
    },

    /// The interpreter faulted; the batch was aborted
    #[error("execution failed: {0}")]
    Execute(#[from] ExecuteFault),

    /// Programming error inside the runner
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Session state machine refused a step
    #[error("illegal session transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: SessionState,
        /// Requested state
        to: SessionState,
    },

    /// Graph API used in interpreter mode or the other way round
    #[error("{operation} is not available when interpreter mode is {}", on_off(*.interpreter_mode))]
    ModeMismatch {
        /// Operation that was refused
        operation: &'static str,
        /// Mode the session is in
        interpreter_mode: bool,
    },

    /// The queue no longer accepts tasks
    #[error("worker stopped")]
    WorkerStopped,

    /// A task ended without reporting back
    #[error("task `{0}` was dropped before completing")]
    TaskDropped(&'static str),
}

impl RunnerError {
    /// Whether the session is still usable after this error
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Compile { .. } | Self::ModeMismatch { .. } => true,
            Self::Execute(fault) => fault.is_program_fault(),
            Self::InvariantViolation(_) | Self::IllegalTransition { .. } | Self::WorkerStopped | Self::TaskDropped(_) => {
                false
            }
        }
    }

    /// Whether the runner itself is broken
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation(_) | Self::IllegalTransition { .. } | Self::TaskDropped(_)
        ) || matches!(self, Self::Execute(fault) if fault.is_internal())
    }

    /// Error diagnostics of a failed compilation
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Compile { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(ToString::to_string)
        .collect();
    if errors.is_empty() {
        "no diagnostics".to_string()
    } else {
        errors.join("; ")
    }
}
