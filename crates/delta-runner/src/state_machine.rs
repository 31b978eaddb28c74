//! Per-batch session state machine
//!
//! Every batch starts and ends in [`SessionState::Idle`]:
//! `Idle -> Compiling -> (CompileFailed -> Idle) | (CompileSucceeded ->
//! Executing -> (ExecuteFailed | ExecuteSucceeded) -> Idle)`.

use crate::error::RunnerError;
use serde::{Deserialize, Serialize};

/// Phase of one live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Waiting for the next batch
    Idle,
    /// Compiling a fragment
    Compiling,
    /// Compilation rejected the fragment
    CompileFailed,
    /// Compilation produced a new executable
    CompileSucceeded,
    /// Running the new executable
    Executing,
    /// Execution faulted
    ExecuteFailed,
    /// Execution finished
    ExecuteSucceeded,
}

/// Validates a state transition
///
/// # Errors
/// Returns [`RunnerError::IllegalTransition`] if `to` cannot follow `from`.
pub fn validate_transition(from: SessionState, to: SessionState) -> Result<(), RunnerError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(RunnerError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: SessionState) -> Vec<SessionState> {
    use SessionState::*;
    match from {
        Idle => vec![Compiling],
        Compiling => vec![CompileFailed, CompileSucceeded],
        CompileSucceeded => vec![Executing],
        Executing => vec![ExecuteFailed, ExecuteSucceeded],
        CompileFailed | ExecuteFailed | ExecuteSucceeded => vec![Idle],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn test_successful_batch_path() {
        let path = [Idle, Compiling, CompileSucceeded, Executing, ExecuteSucceeded, Idle];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn test_failure_paths_return_to_idle() {
        assert!(validate_transition(Compiling, CompileFailed).is_ok());
        assert!(validate_transition(CompileFailed, Idle).is_ok());
        assert!(validate_transition(ExecuteFailed, Idle).is_ok());
    }

    #[test]
    fn test_illegal_transitions() {
        assert_eq!(
            validate_transition(Idle, Executing),
            Err(RunnerError::IllegalTransition {
                from: Idle,
                to: Executing
            })
        );
        assert!(validate_transition(CompileFailed, Executing).is_err());
        assert!(validate_transition(Idle, Idle).is_err());
    }
}
