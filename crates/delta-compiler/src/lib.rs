//! Delta Compiler - the two compilers the live runner drives
//!
//! - [`GraphCompiler`] turns an edit batch into a [`SourceFragment`]: which
//!   subtrees to retire and which code to compile. [`SubtreeGraphCompiler`]
//!   also keeps the mapping between node uids, subtrees and variables.
//! - [`Compiler`] compiles a fragment on top of a [`CompileState`] and yields
//!   a new state plus an [`delta_image::Executable`]. The prior state is
//!   never touched, so a failed compilation leaves nothing behind.
//!   [`AssociativeCompiler`] is the reference implementation.

mod codegen;
pub mod compiler;
pub mod error;
pub mod fragment;
pub mod graph;
pub mod state;

pub use compiler::{AssociativeCompiler, CompileOutcome, CompiledImage, Compiler};
pub use error::{CompileError, Diagnostic, Severity};
pub use fragment::{FragmentUnit, SourceFragment};
pub use graph::{GraphCompiler, NodeUid, SubtreeGraphCompiler};
pub use state::CompileState;
