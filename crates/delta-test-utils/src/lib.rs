//! Testing utilities for the delta workspace
//!
//! Subtree and batch fixtures, an event recorder and runner constructors.

#![allow(missing_docs)]

use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use delta_runner::{EventSink, EventStatus, LiveRunner, RunnerEvent, RunnerOptions};
use delta_vm::MirrorData;
use parking_lot::Mutex;
use std::sync::Arc;

pub fn id(value: u128) -> SubtreeId {
    SubtreeId::from_u128(value)
}

pub fn subtree(value: u128, code: &str) -> Subtree {
    Subtree::parse(id(value), code).unwrap()
}

pub fn added(subtrees: &[(u128, &str)]) -> GraphSyncData {
    subtrees
        .iter()
        .fold(GraphSyncData::builder(), |batch, (value, code)| batch.add(subtree(*value, code)))
        .build()
}

pub fn modified(value: u128, code: &str) -> GraphSyncData {
    GraphSyncData::builder().modify(subtree(value, code)).build()
}

pub fn deleted(value: u128) -> GraphSyncData {
    GraphSyncData::builder().delete(id(value)).build()
}

pub fn int(value: i64) -> Option<MirrorData> {
    Some(MirrorData::Int(value))
}

/// Keeps every event it receives
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RunnerEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RunnerEvent> {
        self.events.lock().clone()
    }

    pub fn statuses(&self) -> Vec<EventStatus> {
        self.events.lock().iter().map(RunnerEvent::status).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: RunnerEvent) {
        self.events.lock().push(event);
    }
}

pub fn runner_with(options: RunnerOptions) -> (LiveRunner, Arc<RecordingEventSink>) {
    let sink = RecordingEventSink::new();
    let runner = LiveRunner::new(options, sink.clone()).unwrap();
    (runner, sink)
}

pub fn runner() -> (LiveRunner, Arc<RecordingEventSink>) {
    runner_with(RunnerOptions::default())
}

pub fn interpreter_runner() -> (LiveRunner, Arc<RecordingEventSink>) {
    runner_with(RunnerOptions::default().with_interpreter_mode(true))
}
