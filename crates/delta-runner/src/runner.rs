//! Live runner facade
//!
//! Every operation comes in two flavours. The synchronous one waits for the
//! queue to drain and runs on the caller's thread; the `begin_` one queues a
//! task and hands back a [`Completion`]. Both emit the same events.

use crate::config::RunnerOptions;
use crate::coordinator::{BatchReport, DeltaCoordinator};
use crate::error::RunnerError;
use crate::events::{EventSink, RunnerEvent};
use crate::query::NodeRef;
use crate::queue::TaskQueue;
use crate::tasks::{
    Completion, NodesToCodeTask, PropertyChangeNotifier, QueryTask, TaskContext, UpdateCodeTask, UpdateGraphTask,
};
use delta_diff::{GraphSyncData, Subtree};
use delta_vm::MirrorData;
use parking_lot::Mutex;
use std::sync::Arc;

/// Live execution session with a background worker
pub struct LiveRunner {
    queue: Arc<TaskQueue>,
    context: TaskContext,
}

impl LiveRunner {
    /// Runner over the reference compiler and interpreter
    ///
    /// # Errors
    /// Fails if the worker thread cannot be spawned.
    pub fn new(options: RunnerOptions, sink: Arc<dyn EventSink>) -> Result<Self, RunnerError> {
        Self::with_coordinator(DeltaCoordinator::with_reference_collaborators(options), sink)
    }

    /// Runner over a custom coordinator
    ///
    /// # Errors
    /// As [`Self::new`].
    pub fn with_coordinator(coordinator: DeltaCoordinator, sink: Arc<dyn EventSink>) -> Result<Self, RunnerError> {
        let queue = TaskQueue::start()
            .map_err(|err| RunnerError::InvariantViolation(format!("cannot start worker: {err}")))?;
        tracing::info!(
            interpreter_mode = coordinator.options().interpreter_mode,
            "live runner started"
        );
        Ok(Self {
            queue: Arc::new(queue),
            context: TaskContext {
                runtime: Arc::new(Mutex::new(coordinator)),
                sink,
            },
        })
    }

    /// Apply a graph batch once everything queued before it has run
    ///
    /// # Errors
    /// The batch's own failure, or a queue error.
    pub fn update_graph(&self, batch: &GraphSyncData) -> Result<BatchReport, RunnerError> {
        self.queue.run_exclusive(|| self.context.apply_graph(batch))?
    }

    /// Queue a graph batch
    ///
    /// # Errors
    /// [`RunnerError::WorkerStopped`] after shutdown.
    pub fn begin_update_graph(&self, batch: GraphSyncData) -> Result<Completion<BatchReport>, RunnerError> {
        let (task, completion) = UpdateGraphTask::new(self.context.clone(), batch);
        self.queue.push(task)?;
        Ok(completion)
    }

    /// Run raw statements (interpreter mode)
    ///
    /// # Errors
    /// As [`Self::update_graph`].
    pub fn update_code(&self, code: &str) -> Result<BatchReport, RunnerError> {
        self.queue.run_exclusive(|| self.context.apply_code(code))?
    }

    /// # Errors
    /// [`RunnerError::WorkerStopped`] after shutdown.
    pub fn begin_update_code(&self, code: impl Into<String>) -> Result<Completion<BatchReport>, RunnerError> {
        let (task, completion) = UpdateCodeTask::new(self.context.clone(), code.into());
        self.queue.push(task)?;
        Ok(completion)
    }

    /// Current value of a node
    ///
    /// # Errors
    /// Queue errors only; an unknown node is `Ok(None)`.
    pub fn query_node_value(&self, node: impl Into<NodeRef>) -> Result<Option<MirrorData>, RunnerError> {
        let node = node.into();
        self.queue.run_exclusive(|| self.context.query(node))
    }

    /// # Errors
    /// [`RunnerError::WorkerStopped`] after shutdown.
    pub fn begin_query_node_value(
        &self,
        node: impl Into<NodeRef>,
    ) -> Result<Completion<Option<MirrorData>>, RunnerError> {
        let (task, completion) = QueryTask::new(self.context.clone(), node.into());
        self.queue.push(task)?;
        Ok(completion)
    }

    /// One queued query per node, answered in order
    ///
    /// # Errors
    /// [`RunnerError::WorkerStopped`] after shutdown.
    pub fn begin_query_node_values(
        &self,
        nodes: Vec<NodeRef>,
    ) -> Result<Vec<Completion<Option<MirrorData>>>, RunnerError> {
        nodes
            .into_iter()
            .map(|node| self.begin_query_node_value(node))
            .collect()
    }

    /// # Errors
    /// Queue errors only.
    pub fn convert_nodes_to_code(&self, subtrees: &[Subtree]) -> Result<String, RunnerError> {
        self.queue.run_exclusive(|| self.context.nodes_to_code(subtrees))
    }

    /// Queue a conversion; an empty list queues nothing
    ///
    /// # Errors
    /// [`RunnerError::WorkerStopped`] after shutdown.
    pub fn begin_convert_nodes_to_code(
        &self,
        subtrees: Vec<Subtree>,
    ) -> Result<Option<Completion<String>>, RunnerError> {
        if subtrees.is_empty() {
            return Ok(None);
        }
        let (task, completion) = NodesToCodeTask::new(self.context.clone(), subtrees);
        self.queue.push(task)?;
        Ok(Some(completion))
    }

    /// Re-run everything currently active
    ///
    /// # Errors
    /// As [`Self::update_graph`].
    pub fn reexecute_all(&self) -> Result<BatchReport, RunnerError> {
        self.queue.run_exclusive(|| {
            let result = self.context.runtime.lock().reexecute_all();
            self.context.sink.emit(RunnerEvent::graph_update(&result));
            result
        })?
    }

    /// Every user-visible top-level symbol as `name = value` lines
    ///
    /// # Errors
    /// Queue errors only.
    pub fn get_core_dump(&self) -> Result<String, RunnerError> {
        self.queue.run_exclusive(|| self.context.runtime.lock().dump_globals())
    }

    /// Top-level symbols and their values, in slot order
    ///
    /// # Errors
    /// Queue errors only.
    pub fn globals(&self) -> Result<Vec<(String, MirrorData)>, RunnerError> {
        self.queue.run_exclusive(|| self.context.runtime.lock().globals())
    }

    /// # Errors
    /// Queue errors only.
    pub fn global_count(&self) -> Result<usize, RunnerError> {
        self.queue.run_exclusive(|| self.context.runtime.lock().global_count())
    }

    /// Replace the options; they apply from the next batch on
    ///
    /// # Errors
    /// Queue errors only.
    pub fn set_options(&self, options: RunnerOptions) -> Result<(), RunnerError> {
        self.queue.run_exclusive(|| self.context.runtime.lock().set_options(options))
    }

    /// # Errors
    /// Queue errors only.
    pub fn options(&self) -> Result<RunnerOptions, RunnerError> {
        self.queue.run_exclusive(|| self.context.runtime.lock().options().clone())
    }

    /// Handle for reporting changed node properties
    #[must_use]
    pub fn property_change_notifier(&self) -> PropertyChangeNotifier {
        PropertyChangeNotifier::new(Arc::clone(&self.queue), self.context.clone())
    }

    /// Block until every queued task has run
    ///
    /// # Errors
    /// Queue errors only.
    pub fn wait_until_idle(&self) -> Result<(), RunnerError> {
        self.queue.wait_until_idle()
    }

    /// Tasks that panicked on the worker
    #[must_use]
    pub fn worker_failures(&self) -> Vec<String> {
        self.queue.failures()
    }
}

impl Drop for LiveRunner {
    fn drop(&mut self) {
        self.queue.shutdown();
        tracing::info!("live runner stopped");
    }
}
