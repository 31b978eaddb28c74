//! Delta Runner - incremental live execution
//!
//! A host streams edits to a program as graph batches (or raw statements in
//! interpreter mode). Each batch is compiled on top of the previous program
//! and only the new statements, plus everything that reads what they
//! changed, are executed.
//!
//! # Core Concepts
//!
//! - [`DeltaCoordinator`]: the synchronous compile/execute pipeline and the
//!   state that survives between batches
//! - [`TaskQueue`]: single worker draining [`Task`]s in order
//! - [`LiveRunner`]: thread-safe facade with synchronous and queued variants
//!   of every operation
//! - [`QueryResolver`]: reads node values by name, uid or subtree
//! - [`RunnerEvent`]: notifications delivered to an [`EventSink`]
//!
//! # Example
//!
//! ```rust,ignore
//! use delta_runner::{LiveRunner, RunnerOptions, TracingEventSink};
//!
//! let runner = LiveRunner::new(RunnerOptions::default(), Arc::new(TracingEventSink))?;
//! runner.update_graph(&GraphSyncData::builder().add(subtree).build())?;
//! let value = runner.query_node_value("a")?;
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod query;
pub mod queue;
pub mod runner;
pub mod state_machine;
pub mod tasks;

pub use config::{CoreConfiguration, RunnerOptions};
pub use coordinator::{BatchReport, DeltaCoordinator, ModifiedNode};
pub use error::RunnerError;
pub use events::{ChannelEventSink, EventSink, EventStatus, RunnerEvent, TracingEventSink};
pub use query::{NodeRef, QueryResolver};
pub use queue::{Task, TaskQueue};
pub use runner::LiveRunner;
pub use state_machine::{allowed_transitions, validate_transition, SessionState};
pub use tasks::{Completion, PropertyChangeNotifier, TaskContext};
