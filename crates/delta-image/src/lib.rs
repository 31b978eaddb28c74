//! Delta Image - compiled program snapshots
//!
//! The compiler keeps its state as a tree of [`CodeBlock`]s held in a
//! [`CodeBlockArena`]. Each block owns one [`InstructionStream`], one
//! [`SymbolTable`] and one [`ProcedureTable`]. [`Executable`] is the
//! read-only snapshot of that tree handed to the interpreter: its per-block
//! arrays are indexed by [`CodeBlockId`] and always have the same length.
//!
//! The top-level stream also carries the [`DependencyGraph`], which records
//! for each global symbol and procedure the expressions that read it.

pub mod class_table;
pub mod code_block;
pub mod dependency;
pub mod dynamic;
pub mod error;
pub mod executable;
pub mod instruction;
pub mod procedure;
pub mod symbol;

pub use class_table::{ClassNode, ClassTable, PrimitiveType};
pub use code_block::{CodeBlock, CodeBlockArena, CodeBlockId, CodeBlockType, Language};
pub use dependency::{DependencyGraph, DependencyVertex, ExprId, GraphNode};
pub use dynamic::{DynamicFunction, DynamicFunctionTable, DynamicVariable, DynamicVariableTable, FunctionPointerTable};
pub use error::ImageError;
pub use executable::Executable;
pub use instruction::{Instruction, InstructionStream, UpdateNodeRef};
pub use procedure::{ProcedureNode, ProcedureTable};
pub use symbol::{SymbolKey, SymbolNode, SymbolTable};
