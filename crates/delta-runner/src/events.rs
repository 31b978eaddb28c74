//! Change notifications
//!
//! Events go to an [`EventSink`] handed to the runner at construction.

use crate::coordinator::BatchReport;
use crate::error::RunnerError;
use crate::query::NodeRef;
use delta_diff::SubtreeId;
use delta_vm::MirrorData;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Outcome carried by every event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    /// Completed cleanly
    Ok,
    /// Completed with warnings
    Warning,
    /// Failed
    Error,
}

/// Notification emitted when a task finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunnerEvent {
    /// A queued value query finished
    NodeValueReady {
        /// Node that was asked for
        node: NodeRef,
        /// Its value, `None` if it maps to nothing
        value: Option<MirrorData>,
        /// Outcome
        status: EventStatus,
        /// Error text when the query failed
        message: Option<String>,
    },
    /// A batch finished
    GraphUpdateReady {
        /// Batch outcome; `None` on failure
        report: Option<BatchReport>,
        /// Outcome
        status: EventStatus,
        /// Warnings, or diagnostics on failure
        messages: Vec<String>,
    },
    /// A nodes-to-code conversion finished
    NodesToCodeCompleted {
        /// Subtrees that were converted
        subtrees: Vec<SubtreeId>,
        /// Generated source
        code: String,
        /// Outcome
        status: EventStatus,
    },
}

impl RunnerEvent {
    /// Event for a finished batch
    #[must_use]
    pub fn graph_update(result: &Result<BatchReport, RunnerError>) -> Self {
        match result {
            Ok(report) => Self::GraphUpdateReady {
                status: if report.warnings.is_empty() {
                    EventStatus::Ok
                } else {
                    EventStatus::Warning
                },
                messages: report.warnings.clone(),
                report: Some(report.clone()),
            },
            Err(err) => {
                let mut messages = vec![err.to_string()];
                messages.extend(err.diagnostics().iter().map(ToString::to_string));
                Self::GraphUpdateReady {
                    report: None,
                    status: EventStatus::Error,
                    messages,
                }
            }
        }
    }

    /// Status of whichever event this is
    #[must_use]
    pub fn status(&self) -> EventStatus {
        match self {
            Self::NodeValueReady { status, .. }
            | Self::GraphUpdateReady { status, .. }
            | Self::NodesToCodeCompleted { status, .. } => *status,
        }
    }
}

/// Receives runner events
///
/// Called from the worker thread, or from the caller's thread for synchronous
/// operations while the queue is locked; an implementation must not call
/// back into the runner.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunnerEvent);
}

impl<F> EventSink for F
where
    F: Fn(RunnerEvent) + Send + Sync,
{
    fn emit(&self, event: RunnerEvent) {
        self(event);
    }
}

/// Logs every event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: RunnerEvent) {
        match &event {
            RunnerEvent::NodeValueReady { node, value, status, .. } => {
                tracing::info!(%node, ?value, ?status, "node value ready");
            }
            RunnerEvent::GraphUpdateReady { report, status, messages } => {
                let modified = report.as_ref().map_or(0, |r| r.modified_symbols.len());
                if *status == EventStatus::Error {
                    tracing::warn!(?messages, "graph update failed");
                } else {
                    tracing::info!(modified, ?status, "graph update ready");
                }
            }
            RunnerEvent::NodesToCodeCompleted { subtrees, code, .. } => {
                tracing::info!(subtrees = subtrees.len(), bytes = code.len(), "nodes converted to code");
            }
        }
    }
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<RunnerEvent>,
}

impl ChannelEventSink {
    /// Sink forwarding into `sender`
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<RunnerEvent>) -> Self {
        Self { sender }
    }

    /// Sink plus the receiving end
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunnerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: RunnerEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_graph_update_status() {
        let ok = RunnerEvent::graph_update(&Ok(BatchReport::default()));
        assert_eq!(ok.status(), EventStatus::Ok);

        let warned = RunnerEvent::graph_update(&Ok(BatchReport {
            warnings: vec!["careful".into()],
            ..BatchReport::default()
        }));
        assert_eq!(warned.status(), EventStatus::Warning);

        let failed = RunnerEvent::graph_update(&Err(RunnerError::WorkerStopped));
        assert_eq!(failed.status(), EventStatus::Error);
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |event: RunnerEvent| seen.lock().push(event.status())
        };
        sink.emit(RunnerEvent::graph_update(&Ok(BatchReport::default())));
        assert_eq!(*seen.lock(), vec![EventStatus::Ok]);
    }

    #[test]
    fn test_channel_sink() {
        let (sink, mut receiver) = ChannelEventSink::channel();
        sink.emit(RunnerEvent::NodesToCodeCompleted {
            subtrees: vec![],
            code: String::new(),
            status: EventStatus::Ok,
        });
        assert!(matches!(
            receiver.try_recv(),
            Ok(RunnerEvent::NodesToCodeCompleted { .. })
        ));
        drop(receiver);
        sink.emit(RunnerEvent::graph_update(&Ok(BatchReport::default())));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = RunnerEvent::NodeValueReady {
            node: NodeRef::Name("a".into()),
            value: Some(MirrorData::Int(2)),
            status: EventStatus::Ok,
            message: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "node_value_ready");
        assert_eq!(json["value"], 2);
    }
}
