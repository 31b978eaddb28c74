//! Query resolver
//!
//! Names resolve directly against top-level symbol storage. Node uids and
//! subtree ids go through the graph compiler's mapping to a variable name
//! first; an id without a mapping resolves to nothing, which is not an error.

use delta_compiler::{GraphCompiler, NodeUid};
use delta_diff::SubtreeId;
use delta_image::Executable;
use delta_vm::{MirrorData, RuntimeMemory, RuntimeMirror};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something a host can ask the value of
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRef {
    /// Top-level variable
    Name(String),
    /// Graph node; resolved through its subtree's canonical node
    Uid(NodeUid),
    /// Graph subtree; resolved through the variable it outputs
    Subtree(SubtreeId),
}

impl From<&str> for NodeRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for NodeRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<NodeUid> for NodeRef {
    fn from(uid: NodeUid) -> Self {
        Self::Uid(uid)
    }
}

impl From<SubtreeId> for NodeRef {
    fn from(id: SubtreeId) -> Self {
        Self::Subtree(id)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Uid(uid) => write!(f, "{uid}"),
            Self::Subtree(id) => write!(f, "subtree {id}"),
        }
    }
}

/// Reads node values out of the current program state
pub struct QueryResolver<'a> {
    executable: &'a Executable,
    memory: &'a RuntimeMemory,
    graph_compiler: &'a dyn GraphCompiler,
}

impl<'a> QueryResolver<'a> {
    /// Resolver over one snapshot of program state
    #[must_use]
    pub fn new(executable: &'a Executable, memory: &'a RuntimeMemory, graph_compiler: &'a dyn GraphCompiler) -> Self {
        Self {
            executable,
            memory,
            graph_compiler,
        }
    }

    /// Variable a reference stands for
    #[must_use]
    pub fn variable_for(&self, node: &NodeRef) -> Option<String> {
        match node {
            NodeRef::Name(name) => Some(name.clone()),
            NodeRef::Uid(uid) => {
                let canonical = self.graph_compiler.canonicalize(*uid);
                self.graph_compiler.variable_name(canonical)
            }
            NodeRef::Subtree(id) => self.graph_compiler.subtree_variable(*id),
        }
    }

    /// Current value, or `None` if the reference maps to no symbol
    #[must_use]
    pub fn resolve(&self, node: &NodeRef) -> Option<MirrorData> {
        let Some(variable) = self.variable_for(node) else {
            tracing::debug!(%node, "no variable mapped");
            return None;
        };
        RuntimeMirror::new(self.memory, self.executable).global_by_name(&variable)
    }
}
