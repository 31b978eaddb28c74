//! Delta execution coordinator
//!
//! Owns everything that persists between batches: compile state, the
//! current executable, runtime memory and the slot baseline. One batch is
//! one synchronous compile-then-execute pass:
//!
//! 1. An empty batch only resets per-run tracking.
//! 2. The graph compiler turns the batch into a source fragment.
//! 3. Per-run state is reset and pending options are applied.
//! 4. The fragment is compiled on top of the current compile state. A
//!    failure changes nothing.
//! 5. Memory grows by the number of globals the compilation added; slots are
//!    never reclaimed.
//! 6. The new executable is swapped in and run. A fault restores the prior
//!    compile state and executable; stores already made stay (best effort),
//!    except slots of symbols that no longer exist, which are nulled.
//! 7. The graph compiler's pending mapping is committed.

use crate::config::{CoreConfiguration, RunnerOptions};
use crate::error::RunnerError;
use crate::query::{NodeRef, QueryResolver};
use crate::state_machine::{validate_transition, SessionState};
use delta_compiler::{
    AssociativeCompiler, CompileState, Compiler, GraphCompiler, NodeUid, SourceFragment, SubtreeGraphCompiler,
};
use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use delta_image::{Executable, ExprId};
use delta_vm::{AssociativeInterpreter, Interpreter, MirrorData, RuntimeMemory, RuntimeMirror};
use serde::{Deserialize, Serialize};
use std::mem;
use std::sync::Arc;

/// Node whose variable changed value in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedNode {
    /// Variable that changed
    pub variable: String,
    /// Subtree assigning the variable; `None` for unowned code
    pub subtree: Option<SubtreeId>,
    /// Canonical node of that subtree
    pub uid: Option<NodeUid>,
}

/// What one batch did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Variables whose stored value changed, in slot order
    pub modified_symbols: Vec<String>,
    /// Owning node of each modified symbol, same order
    pub modified_nodes: Vec<ModifiedNode>,
    /// Compiler and runtime warnings
    pub warnings: Vec<String>,
    /// Statement evaluations, repeats included
    pub executed: usize,
    /// Global slots allocated after the batch
    pub global_count: usize,
}

/// Orchestrates compile and execute passes over one live session
pub struct DeltaCoordinator {
    compiler: Box<dyn Compiler>,
    interpreter: Box<dyn Interpreter>,
    graph_compiler: Box<dyn GraphCompiler>,
    compile_state: CompileState,
    executable: Arc<Executable>,
    memory: RuntimeMemory,
    /// Slots allocated as of the last batch
    delta_symbols: usize,
    options: RunnerOptions,
    options_pending: bool,
    config: CoreConfiguration,
    state: SessionState,
}

impl DeltaCoordinator {
    /// Coordinator over the given collaborators, starting from an empty
    /// program
    #[must_use]
    pub fn new(
        compiler: Box<dyn Compiler>,
        interpreter: Box<dyn Interpreter>,
        graph_compiler: Box<dyn GraphCompiler>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            compiler,
            interpreter,
            graph_compiler,
            compile_state: CompileState::new(),
            executable: Arc::new(Executable::empty()),
            memory: RuntimeMemory::new(),
            delta_symbols: 0,
            options,
            options_pending: true,
            config: CoreConfiguration::default(),
            state: SessionState::Idle,
        }
    }

    /// Coordinator over the associative compiler, interpreter and subtree
    /// graph compiler
    #[must_use]
    pub fn with_reference_collaborators(options: RunnerOptions) -> Self {
        Self::new(
            Box::new(AssociativeCompiler::new()),
            Box::new(AssociativeInterpreter::new()),
            Box::new(SubtreeGraphCompiler::new()),
            options,
        )
    }

    /// Apply one graph edit batch
    ///
    /// # Errors
    /// Compile failures, execution faults and mode mismatches; none of them
    /// leave the session unusable unless [`RunnerError::is_fatal`] says so.
    pub fn update_graph(&mut self, batch: &GraphSyncData) -> Result<BatchReport, RunnerError> {
        self.require_mode("update_graph", false)?;
        if batch.is_empty() {
            return Ok(self.skip_batch());
        }
        tracing::info!(
            added = batch.added().len(),
            modified = batch.modified().len(),
            deleted = batch.deleted().len(),
            "applying graph batch"
        );
        let fragment = self.graph_compiler.build_fragment(batch);
        self.run_batch(&fragment, Vec::new(), false)
    }

    /// Compile and run raw statements (interpreter mode)
    ///
    /// # Errors
    /// As [`Self::update_graph`].
    pub fn update_code(&mut self, code: &str) -> Result<BatchReport, RunnerError> {
        self.require_mode("update_code", true)?;
        if code.trim().is_empty() {
            return Ok(self.skip_batch());
        }
        self.run_batch(&SourceFragment::from_code(code), Vec::new(), false)
    }

    /// Re-run the statements of one subtree and everything depending on them
    ///
    /// Used when a host reports that a node's external input changed.
    ///
    /// # Errors
    /// As [`Self::update_graph`].
    pub fn reexecute_subtree(&mut self, subtree: SubtreeId) -> Result<BatchReport, RunnerError> {
        let forced: Vec<ExprId> = self
            .executable
            .dependency_graph()
            .map(|graph| graph.nodes_owned_by(subtree).filter(|n| n.is_active).map(|n| n.id).collect())
            .unwrap_or_default();
        if forced.is_empty() {
            tracing::debug!(%subtree, "nothing to re-execute");
            return Ok(self.skip_batch());
        }
        self.run_batch(&SourceFragment::default(), forced, false)
    }

    /// Re-run every active statement
    ///
    /// # Errors
    /// As [`Self::update_graph`].
    pub fn reexecute_all(&mut self) -> Result<BatchReport, RunnerError> {
        self.run_batch(&SourceFragment::default(), Vec::new(), true)
    }

    fn require_mode(&self, operation: &'static str, interpreter_mode: bool) -> Result<(), RunnerError> {
        if self.options.interpreter_mode == interpreter_mode {
            Ok(())
        } else {
            Err(RunnerError::ModeMismatch {
                operation,
                interpreter_mode: self.options.interpreter_mode,
            })
        }
    }

    fn skip_batch(&mut self) -> BatchReport {
        self.memory.reset_modified_symbols();
        self.compile_state.reset_for_new_delta();
        tracing::debug!("empty batch skipped");
        BatchReport {
            global_count: self.memory.global_count(),
            ..BatchReport::default()
        }
    }

    fn transition(&mut self, to: SessionState) -> Result<(), RunnerError> {
        validate_transition(self.state, to)?;
        tracing::trace!(from = ?self.state, ?to, "session transition");
        self.state = to;
        Ok(())
    }

    fn sync_configuration(&mut self) {
        if mem::take(&mut self.options_pending) {
            self.config.apply(&self.options);
            tracing::debug!(
                include_directories = self.config.include_directories.len(),
                pass_through = self.config.pass_through.len(),
                "configuration synchronized"
            );
        }
    }

    fn run_batch(
        &mut self,
        fragment: &SourceFragment,
        forced: Vec<ExprId>,
        full: bool,
    ) -> Result<BatchReport, RunnerError> {
        if self.state != SessionState::Idle {
            self.graph_compiler.abandon_pending();
            return Err(RunnerError::InvariantViolation(format!(
                "batch started in state {:?}",
                self.state
            )));
        }
        self.transition(SessionState::Compiling)?;
        self.memory.reset_modified_symbols();
        self.compile_state.reset_for_new_delta();
        if full {
            self.compile_state.reset_for_full_execution();
        }
        self.sync_configuration();

        let outcome = self.compiler.compile(fragment, &self.compile_state);
        let mut warnings: Vec<String> = outcome
            .diagnostics
            .iter()
            .filter(|d| !d.is_error())
            .map(ToString::to_string)
            .collect();
        let image = match outcome.compiled {
            Some(image) if outcome.succeeded => image,
            _ => {
                self.transition(SessionState::CompileFailed)?;
                self.graph_compiler.abandon_pending();
                self.transition(SessionState::Idle)?;
                tracing::warn!(diagnostics = outcome.diagnostics.len(), "batch failed to compile");
                return Err(RunnerError::Compile {
                    diagnostics: outcome.diagnostics,
                });
            }
        };

        if let Some(new_symbols) = image.global_count.checked_sub(self.delta_symbols) {
            self.memory.reallocate(new_symbols);
        }
        self.delta_symbols = self.memory.global_count();
        if self.memory.global_count() < image.global_count {
            self.transition(SessionState::CompileFailed)?;
            self.graph_compiler.abandon_pending();
            self.transition(SessionState::Idle)?;
            return Err(RunnerError::InvariantViolation(format!(
                "{} global slots allocated, executable needs {}",
                self.memory.global_count(),
                image.global_count
            )));
        }
        self.transition(SessionState::CompileSucceeded)?;

        let prior_globals = self.compile_state.glob_offset();
        let prior_state = mem::replace(&mut self.compile_state, image.state);
        let prior_executable = mem::replace(&mut self.executable, Arc::new(image.executable));

        self.transition(SessionState::Executing)?;
        let mut context = self.config.runtime.clone().with_forced_nodes(forced);
        context.running_block = image.running_block;

        match self.interpreter.execute(&self.executable, &mut self.memory, &context) {
            Ok(outcome) => {
                self.transition(SessionState::ExecuteSucceeded)?;
                self.graph_compiler.reset_for_next_execution();
                self.transition(SessionState::Idle)?;

                warnings.extend(outcome.warnings.iter().map(ToString::to_string));
                let freed = self.memory.collect_garbage();
                let report = self.report(warnings, outcome.executed.len());
                tracing::info!(
                    modified = report.modified_symbols.len(),
                    executed = report.executed,
                    freed,
                    global_count = report.global_count,
                    "batch executed"
                );
                Ok(report)
            }
            Err(fault) => {
                self.transition(SessionState::ExecuteFailed)?;
                self.compile_state = prior_state;
                self.executable = prior_executable;
                self.memory.clear_globals_from(prior_globals);
                self.graph_compiler.abandon_pending();
                self.transition(SessionState::Idle)?;
                tracing::warn!(%fault, "batch aborted by runtime fault");
                Err(RunnerError::Execute(fault))
            }
        }
    }

    fn report(&self, warnings: Vec<String>, executed: usize) -> BatchReport {
        let mut report = BatchReport {
            warnings,
            executed,
            global_count: self.memory.global_count(),
            ..BatchReport::default()
        };
        for slot in self.memory.modified_symbols() {
            let Some(symbol) = self.executable.global_symbol_at(*slot) else {
                continue;
            };
            let mapped = self.graph_compiler.node_for_variable(&symbol.name);
            report.modified_nodes.push(ModifiedNode {
                variable: symbol.name.clone(),
                subtree: mapped.map(|(subtree, _)| subtree),
                uid: mapped.map(|(_, uid)| uid),
            });
            report.modified_symbols.push(symbol.name.clone());
        }
        report
    }

    /// Store new options; they take effect at the next batch
    pub fn set_options(&mut self, options: RunnerOptions) {
        self.options = options;
        self.options_pending = true;
    }

    /// Options as last set, applied or not
    #[inline]
    #[must_use]
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Configuration as last synchronized
    #[inline]
    #[must_use]
    pub fn configuration(&self) -> &CoreConfiguration {
        &self.config
    }

    /// Current value of a node, `None` if it maps to nothing
    #[must_use]
    pub fn query(&self, node: &NodeRef) -> Option<MirrorData> {
        QueryResolver::new(&self.executable, &self.memory, self.graph_compiler.as_ref()).resolve(node)
    }

    /// Every user-visible top-level symbol as `name = value` lines
    #[must_use]
    pub fn dump_globals(&self) -> String {
        RuntimeMirror::new(&self.memory, &self.executable).dump_globals()
    }

    /// Top-level symbols and their values, in slot order
    #[must_use]
    pub fn globals(&self) -> Vec<(String, MirrorData)> {
        RuntimeMirror::new(&self.memory, &self.executable).globals()
    }

    /// Source text equivalent to `subtrees`
    #[must_use]
    pub fn nodes_to_code(&self, subtrees: &[Subtree]) -> String {
        self.graph_compiler.nodes_to_code(subtrees)
    }

    /// The executable currently installed
    #[must_use]
    pub fn executable(&self) -> Arc<Executable> {
        Arc::clone(&self.executable)
    }

    /// Runtime memory as left by the last batch
    #[inline]
    #[must_use]
    pub fn memory(&self) -> &RuntimeMemory {
        &self.memory
    }

    /// Global slots allocated so far
    #[inline]
    #[must_use]
    pub fn global_count(&self) -> usize {
        self.memory.global_count()
    }

    /// Where the session is in its compile and execute cycle
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn subtree(id: u128, code: &str) -> Subtree {
        Subtree::parse(SubtreeId::from_u128(id), code).unwrap()
    }

    fn coordinator() -> DeltaCoordinator {
        DeltaCoordinator::with_reference_collaborators(RunnerOptions::default())
    }

    #[test]
    fn test_add_modify_delete() {
        let mut c = coordinator();
        c.update_graph(&GraphSyncData::builder().add(subtree(1, "a = 2;")).build())
            .unwrap();
        assert_eq!(c.query(&"a".into()), Some(MirrorData::Int(2)));
        let slots = c.global_count();

        let report = c
            .update_graph(&GraphSyncData::builder().modify(subtree(1, "a = 3;")).build())
            .unwrap();
        assert_eq!(c.query(&"a".into()), Some(MirrorData::Int(3)));
        assert_eq!(c.global_count(), slots);
        assert_eq!(report.modified_symbols, vec!["a".to_string()]);
        assert_eq!(report.modified_nodes[0].subtree, Some(SubtreeId::from_u128(1)));

        c.update_graph(&GraphSyncData::builder().delete(SubtreeId::from_u128(1)).build())
            .unwrap();
        assert_eq!(c.query(&"a".into()), Some(MirrorData::Null));
        assert_eq!(c.query(&SubtreeId::from_u128(1).into()), None);
        assert_eq!(c.global_count(), slots);
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn test_compile_failure_changes_nothing() {
        let mut c = coordinator();
        c.update_graph(
            &GraphSyncData::builder()
                .add(subtree(1, "a = 1;"))
                .add(subtree(3, "def f() = 1;"))
                .build(),
        )
        .unwrap();
        let before = c.executable();
        let slots = c.global_count();

        // assigning to a function name is rejected, so `b` never lands either
        let err = c
            .update_graph(
                &GraphSyncData::builder()
                    .add(subtree(2, "b = 5;"))
                    .add(subtree(4, "f = 2;"))
                    .build(),
            )
            .unwrap_err();
        assert!(matches!(err, RunnerError::Compile { .. }));
        assert!(err.is_recoverable());
        assert!(!err.diagnostics().is_empty());
        assert!(Arc::ptr_eq(&before, &c.executable()));
        assert_eq!(c.global_count(), slots);
        assert_eq!(c.query(&"a".into()), Some(MirrorData::Int(1)));
        assert_eq!(c.query(&"b".into()), None);
        assert_eq!(c.query(&SubtreeId::from_u128(2).into()), None);
        assert_eq!(c.state(), SessionState::Idle);

        c.update_graph(&GraphSyncData::builder().add(subtree(2, "b = 5;")).build())
            .unwrap();
        assert_eq!(c.query(&SubtreeId::from_u128(2).into()), Some(MirrorData::Int(5)));
    }

    #[test]
    fn test_execute_fault_restores_prior_program() {
        let options = RunnerOptions::default().with_max_update_passes(4);
        let mut c = DeltaCoordinator::with_reference_collaborators(options);
        c.update_graph(&GraphSyncData::builder().add(subtree(1, "a = 1;\nb = a + 1;")).build())
            .unwrap();
        let before = c.executable();

        let err = c
            .update_graph(&GraphSyncData::builder().add(subtree(2, "c = 5;\na = b + 1;")).build())
            .unwrap_err();
        assert!(matches!(err, RunnerError::Execute(delta_vm::ExecuteFault::UpdateCycle { .. })));
        assert!(Arc::ptr_eq(&before, &c.executable()));
        // the slot of `c` survives but is nulled
        assert!(c.global_count() >= 3);
        assert_eq!(c.query(&"c".into()), None);
        assert_eq!(c.memory().global(2), Some(delta_vm::StackValue::Null));

        let report = c
            .update_graph(&GraphSyncData::builder().add(subtree(3, "d = 4;")).build())
            .unwrap();
        assert_eq!(c.query(&"d".into()), Some(MirrorData::Int(4)));
        assert_eq!(report.modified_symbols, vec!["d".to_string()]);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let mut c = coordinator();
        c.update_graph(&GraphSyncData::builder().add(subtree(1, "a = 1;")).build())
            .unwrap();
        let globals = c.memory().globals().to_vec();

        let report = c.update_graph(&GraphSyncData::default()).unwrap();
        assert!(report.modified_symbols.is_empty());
        assert_eq!(report.executed, 0);
        assert_eq!(c.memory().globals(), globals.as_slice());
        assert!(c.memory().modified_symbols().is_empty());
    }

    #[test]
    fn test_reexecute_subtree_runs_dependents() {
        let mut c = coordinator();
        c.update_graph(
            &GraphSyncData::builder()
                .add(subtree(1, "a = 1;"))
                .add(subtree(2, "b = a + 1;"))
                .build(),
        )
        .unwrap();
        let report = c.reexecute_subtree(SubtreeId::from_u128(1)).unwrap();
        // same value, so nothing downstream changes
        assert_eq!(report.executed, 1);
        assert!(report.modified_symbols.is_empty());

        let report = c.reexecute_subtree(SubtreeId::from_u128(42)).unwrap();
        assert_eq!(report.executed, 0);
    }

    #[test]
    fn test_reexecute_all() {
        let mut c = coordinator();
        c.update_graph(&GraphSyncData::builder().add(subtree(1, "a = 1;\nb = a;")).build())
            .unwrap();
        let report = c.reexecute_all().unwrap();
        assert_eq!(report.executed, 2);
    }

    #[test]
    fn test_mode_mismatch() {
        let mut c = coordinator();
        let err = c.update_code("a = 1;").unwrap_err();
        assert_eq!(
            err,
            RunnerError::ModeMismatch {
                operation: "update_code",
                interpreter_mode: false
            }
        );

        c.set_options(RunnerOptions::default().with_interpreter_mode(true));
        c.update_code("a = 1;\nb = a * 2;").unwrap();
        assert_eq!(c.query(&"b".into()), Some(MirrorData::Int(2)));
        assert!(c.update_graph(&GraphSyncData::default()).is_err());
    }

    #[test]
    fn test_options_sync_once_per_batch() {
        let mut c = coordinator();
        c.set_options(RunnerOptions::default().with_search_directory("/lib"));
        assert!(c.configuration().include_directories.is_empty());
        c.update_graph(&GraphSyncData::builder().add(subtree(1, "a = 1;")).build())
            .unwrap();
        assert_eq!(c.configuration().include_directories.len(), 1);
    }

    #[test]
    fn test_dump_globals() {
        let mut c = coordinator();
        c.update_graph(&GraphSyncData::builder().add(subtree(1, "x = {1, 2};\ny = x[1];")).build())
            .unwrap();
        assert_eq!(c.dump_globals(), "x = {1, 2}\ny = 2\n");
    }
}
