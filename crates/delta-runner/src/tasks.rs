//! Tasks the runner queues for its worker

use crate::coordinator::{BatchReport, DeltaCoordinator};
use crate::error::RunnerError;
use crate::events::{EventSink, EventStatus, RunnerEvent};
use crate::query::NodeRef;
use crate::queue::{Task, TaskQueue};
use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use delta_vm::MirrorData;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// What every task needs: the session and where to report
#[derive(Clone)]
pub struct TaskContext {
    /// Session shared by every task
    pub runtime: Arc<Mutex<DeltaCoordinator>>,
    /// Receives one event per finished task
    pub sink: Arc<dyn EventSink>,
}

impl TaskContext {
    /// Apply a batch and report it
    pub(crate) fn apply_graph(&self, batch: &GraphSyncData) -> Result<BatchReport, RunnerError> {
        let result = self.runtime.lock().update_graph(batch);
        self.sink.emit(RunnerEvent::graph_update(&result));
        result
    }

    pub(crate) fn apply_code(&self, code: &str) -> Result<BatchReport, RunnerError> {
        let result = self.runtime.lock().update_code(code);
        self.sink.emit(RunnerEvent::graph_update(&result));
        result
    }

    pub(crate) fn query(&self, node: NodeRef) -> Option<MirrorData> {
        let value = self.runtime.lock().query(&node);
        let (status, message) = match value {
            Some(_) => (EventStatus::Ok, None),
            None => (EventStatus::Warning, Some(format!("`{node}` has no value"))),
        };
        self.sink.emit(RunnerEvent::NodeValueReady {
            node,
            value: value.clone(),
            status,
            message,
        });
        value
    }

    pub(crate) fn nodes_to_code(&self, subtrees: &[Subtree]) -> String {
        let code = self.runtime.lock().nodes_to_code(subtrees);
        self.sink.emit(RunnerEvent::NodesToCodeCompleted {
            subtrees: subtrees.iter().map(Subtree::id).collect(),
            code: code.clone(),
            status: EventStatus::Ok,
        });
        code
    }

    pub(crate) fn property_changed(&self, subtree: SubtreeId) -> Result<BatchReport, RunnerError> {
        let result = self.runtime.lock().reexecute_subtree(subtree);
        self.sink.emit(RunnerEvent::graph_update(&result));
        result
    }
}

/// Result of a queued task
///
/// Dropping the completion does not cancel the task; it still runs and still
/// emits its event.
#[derive(Debug)]
pub struct Completion<T> {
    name: &'static str,
    receiver: oneshot::Receiver<Result<T, RunnerError>>,
}

impl<T> Completion<T> {
    fn channel(name: &'static str) -> (oneshot::Sender<Result<T, RunnerError>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { name, receiver })
    }

    /// Wait for the task from async code
    ///
    /// # Errors
    /// The task's own error, or [`RunnerError::TaskDropped`] if it never ran
    /// to completion.
    pub async fn wait(self) -> Result<T, RunnerError> {
        let Self { name, receiver } = self;
        receiver.await.map_err(|_| RunnerError::TaskDropped(name))?
    }

    /// Wait for the task from a plain thread
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    /// As [`Self::wait`].
    pub fn blocking_wait(self) -> Result<T, RunnerError> {
        let Self { name, receiver } = self;
        receiver.blocking_recv().map_err(|_| RunnerError::TaskDropped(name))?
    }
}

fn reply<T>(name: &'static str, sender: oneshot::Sender<Result<T, RunnerError>>, value: Result<T, RunnerError>) {
    if sender.send(value).is_err() {
        tracing::trace!(task = name, "completion dropped before reply");
    }
}

pub(crate) struct UpdateGraphTask {
    context: TaskContext,
    batch: GraphSyncData,
    sender: oneshot::Sender<Result<BatchReport, RunnerError>>,
}

impl UpdateGraphTask {
    pub(crate) fn new(context: TaskContext, batch: GraphSyncData) -> (Box<dyn Task>, Completion<BatchReport>) {
        let (sender, completion) = Completion::channel("update_graph");
        (Box::new(Self { context, batch, sender }), completion)
    }
}

impl Task for UpdateGraphTask {
    fn name(&self) -> &'static str {
        "update_graph"
    }

    fn execute(self: Box<Self>) {
        let result = self.context.apply_graph(&self.batch);
        reply(self.name(), self.sender, result);
    }
}

pub(crate) struct UpdateCodeTask {
    context: TaskContext,
    code: String,
    sender: oneshot::Sender<Result<BatchReport, RunnerError>>,
}

impl UpdateCodeTask {
    pub(crate) fn new(context: TaskContext, code: String) -> (Box<dyn Task>, Completion<BatchReport>) {
        let (sender, completion) = Completion::channel("update_code");
        (Box::new(Self { context, code, sender }), completion)
    }
}

impl Task for UpdateCodeTask {
    fn name(&self) -> &'static str {
        "update_code"
    }

    fn execute(self: Box<Self>) {
        let result = self.context.apply_code(&self.code);
        reply(self.name(), self.sender, result);
    }
}

pub(crate) struct QueryTask {
    context: TaskContext,
    node: NodeRef,
    sender: oneshot::Sender<Result<Option<MirrorData>, RunnerError>>,
}

impl QueryTask {
    pub(crate) fn new(context: TaskContext, node: NodeRef) -> (Box<dyn Task>, Completion<Option<MirrorData>>) {
        let (sender, completion) = Completion::channel("query_node_value");
        (Box::new(Self { context, node, sender }), completion)
    }
}

impl Task for QueryTask {
    fn name(&self) -> &'static str {
        "query_node_value"
    }

    fn execute(self: Box<Self>) {
        let Self { context, node, sender } = *self;
        reply("query_node_value", sender, Ok(context.query(node)));
    }
}

pub(crate) struct NodesToCodeTask {
    context: TaskContext,
    subtrees: Vec<Subtree>,
    sender: oneshot::Sender<Result<String, RunnerError>>,
}

impl NodesToCodeTask {
    pub(crate) fn new(context: TaskContext, subtrees: Vec<Subtree>) -> (Box<dyn Task>, Completion<String>) {
        let (sender, completion) = Completion::channel("nodes_to_code");
        (Box::new(Self { context, subtrees, sender }), completion)
    }
}

impl Task for NodesToCodeTask {
    fn name(&self) -> &'static str {
        "nodes_to_code"
    }

    fn execute(self: Box<Self>) {
        let code = self.context.nodes_to_code(&self.subtrees);
        reply(self.name(), self.sender, Ok(code));
    }
}

/// Re-runs a subtree whose external input changed; reports through events only
pub(crate) struct PropertyChangedTask {
    context: TaskContext,
    subtree: SubtreeId,
}

impl Task for PropertyChangedTask {
    fn name(&self) -> &'static str {
        "property_changed"
    }

    fn execute(self: Box<Self>) {
        if let Err(err) = self.context.property_changed(self.subtree) {
            tracing::warn!(subtree = %self.subtree, %err, "property change re-execution failed");
        }
    }
}

/// Handle hosts give to whatever watches node properties
///
/// Cheap to clone and usable from any thread.
#[derive(Clone)]
pub struct PropertyChangeNotifier {
    queue: Arc<TaskQueue>,
    context: TaskContext,
}

impl PropertyChangeNotifier {
    pub(crate) fn new(queue: Arc<TaskQueue>, context: TaskContext) -> Self {
        Self { queue, context }
    }

    /// Queue a re-execution of `subtree`
    ///
    /// # Errors
    /// [`RunnerError::WorkerStopped`] once the runner is gone.
    pub fn notify(&self, subtree: SubtreeId) -> Result<(), RunnerError> {
        tracing::debug!(%subtree, "property changed");
        self.queue.push(Box::new(PropertyChangedTask {
            context: self.context.clone(),
            subtree,
        }))
    }
}

impl std::fmt::Debug for PropertyChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyChangeNotifier")
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}
