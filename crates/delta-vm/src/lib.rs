//! Delta VM - runtime side of the live runner
//!
//! - [`RuntimeMemory`]: global slots plus a heap for strings and arrays.
//!   Global storage only grows during a session; slots of deleted symbols
//!   are abandoned, never handed to another symbol.
//! - [`Interpreter`]: runs an [`delta_image::Executable`] against memory.
//!   [`AssociativeInterpreter`] is the reference implementation.
//! - [`RuntimeMirror`]: turns runtime values into owned [`MirrorData`]
//!   snapshots for queries, events and dumps.

pub mod error;
pub mod heap;
pub mod interpreter;
pub mod memory;
pub mod mirror;
pub mod value;

pub use error::ExecuteFault;
pub use heap::{Heap, HeapObject};
pub use interpreter::{AssociativeInterpreter, ExecutionOutcome, Interpreter, RuntimeContext, RuntimeWarning};
pub use memory::RuntimeMemory;
pub use mirror::{MirrorData, RuntimeMirror};
pub use value::{HeapPtr, StackValue};
