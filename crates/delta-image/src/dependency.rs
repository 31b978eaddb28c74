//! Dependency graph
//!
//! Vertices are global symbols, procedures and compiled expressions. Edges
//! point from what is read to what reads it:
//!
//! - `Symbol -> Expr` when an expression reads a global
//! - `Expr -> Symbol` when an expression assigns a global
//! - `Procedure -> Expr` when an expression calls (or takes a pointer to) a procedure
//! - `Symbol -> Procedure` and `Procedure -> Procedure` for what a body reads and calls
//!
//! The petgraph index is derived from the node records and is rebuilt when
//! a graph is deserialized.

use crate::symbol::SymbolKey;
use delta_diff::SubtreeId;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Compiled expression id; ids grow in program order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u64);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Vertex of the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyVertex {
    Symbol(SymbolKey),
    Procedure(usize),
    Expr(ExprId),
}

/// One compiled top-level statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ExprId,
    /// Subtree the statement came from; `None` for runner-generated code
    pub owner: Option<SubtreeId>,
    /// Global assigned by the statement
    pub defines: Option<SymbolKey>,
    pub reads: Vec<SymbolKey>,
    /// Procedures called or referenced
    pub calls: Vec<usize>,
    /// Instruction range in the top-level stream
    pub pc_start: usize,
    pub pc_end: usize,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ProcedureDeps {
    reads: Vec<SymbolKey>,
    calls: Vec<usize>,
}

#[derive(Clone, Serialize, Deserialize)]
struct DependencyRecords {
    nodes: BTreeMap<ExprId, GraphNode>,
    procedures: BTreeMap<usize, ProcedureDeps>,
}

/// Who reads what
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "DependencyRecords", into = "DependencyRecords")]
pub struct DependencyGraph {
    graph: DiGraphMap<DependencyVertex, ()>,
    nodes: BTreeMap<ExprId, GraphNode>,
    procedures: BTreeMap<usize, ProcedureDeps>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a compiled statement and its edges
    ///
    /// Inactive nodes are stored but get no edges.
    pub fn insert_node(&mut self, node: GraphNode) {
        if node.is_active {
            self.link_node(&node);
        }
        self.nodes.insert(node.id, node);
    }

    fn link_node(&mut self, node: &GraphNode) {
        let vertex = DependencyVertex::Expr(node.id);
        self.graph.add_node(vertex);
        for read in &node.reads {
            self.graph.add_edge(DependencyVertex::Symbol(*read), vertex, ());
        }
        for call in &node.calls {
            self.graph.add_edge(DependencyVertex::Procedure(*call), vertex, ());
        }
        if let Some(defines) = node.defines {
            self.graph.add_edge(vertex, DependencyVertex::Symbol(defines), ());
        }
    }

    /// Record what a procedure body reads and calls, replacing earlier records
    pub fn define_procedure(&mut self, index: usize, reads: Vec<SymbolKey>, calls: Vec<usize>) {
        self.unlink_procedure_inputs(index);
        let vertex = DependencyVertex::Procedure(index);
        self.graph.add_node(vertex);
        for read in &reads {
            self.graph.add_edge(DependencyVertex::Symbol(*read), vertex, ());
        }
        for call in &calls {
            if *call != index {
                self.graph.add_edge(DependencyVertex::Procedure(*call), vertex, ());
            }
        }
        self.procedures.insert(index, ProcedureDeps { reads, calls });
    }

    /// Forget what a retired procedure read; its callers stay attached
    pub fn retire_procedure(&mut self, index: usize) {
        self.unlink_procedure_inputs(index);
        self.procedures.remove(&index);
    }

    fn unlink_procedure_inputs(&mut self, index: usize) {
        let vertex = DependencyVertex::Procedure(index);
        if !self.graph.contains_node(vertex) {
            return;
        }
        let inputs: Vec<_> = self
            .graph
            .neighbors_directed(vertex, Direction::Incoming)
            .collect();
        for input in inputs {
            self.graph.remove_edge(input, vertex);
        }
    }

    /// Deactivate one statement and drop its edges
    ///
    /// Returns `false` if the node is unknown or already inactive.
    pub fn deactivate(&mut self, id: ExprId) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) if node.is_active => {
                node.is_active = false;
                self.graph.remove_node(DependencyVertex::Expr(id));
                true
            }
            _ => false,
        }
    }

    /// Deactivate every statement a subtree produced
    pub fn deactivate_owner(&mut self, owner: SubtreeId) -> Vec<GraphNode> {
        let ids: Vec<ExprId> = self
            .nodes
            .values()
            .filter(|node| node.is_active && node.owner == Some(owner))
            .map(|node| node.id)
            .collect();
        let mut retired = Vec::with_capacity(ids.len());
        for id in ids {
            if self.deactivate(id) {
                if let Some(node) = self.nodes.get(&id) {
                    retired.push(node.clone());
                }
            }
        }
        retired
    }

    /// Active statements that read `vertex`, looking through procedures
    ///
    /// For a symbol this includes callers of every procedure whose body
    /// (directly or through further calls) reads the symbol.
    #[must_use]
    pub fn readers_of(&self, vertex: DependencyVertex) -> BTreeSet<ExprId> {
        let mut readers = BTreeSet::new();
        let mut seen = BTreeSet::from([vertex]);
        let mut queue = VecDeque::from([vertex]);

        while let Some(current) = queue.pop_front() {
            if !self.graph.contains_node(current) {
                continue;
            }
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                match next {
                    DependencyVertex::Expr(id) => {
                        if self.is_active(id) {
                            readers.insert(id);
                        }
                    }
                    DependencyVertex::Procedure(_) => {
                        if seen.insert(next) {
                            queue.push_back(next);
                        }
                    }
                    DependencyVertex::Symbol(_) => {}
                }
            }
        }
        readers
    }

    /// Active statements assigning `symbol`, in program order
    #[must_use]
    pub fn writers_of(&self, symbol: SymbolKey) -> Vec<ExprId> {
        let vertex = DependencyVertex::Symbol(symbol);
        if !self.graph.contains_node(vertex) {
            return Vec::new();
        }
        let mut writers: Vec<ExprId> = self
            .graph
            .neighbors_directed(vertex, Direction::Incoming)
            .filter_map(|v| match v {
                DependencyVertex::Expr(id) if self.is_active(id) => Some(id),
                _ => None,
            })
            .collect();
        writers.sort_unstable();
        writers
    }

    /// Every statement that may have to re-run when `roots` change
    ///
    /// Transitive closure over reads and the globals each reader assigns.
    #[must_use]
    pub fn affected_by(&self, roots: &[DependencyVertex]) -> BTreeSet<ExprId> {
        let mut affected = BTreeSet::new();
        let mut queue: VecDeque<DependencyVertex> = roots.iter().copied().collect();
        let mut seen: BTreeSet<DependencyVertex> = queue.iter().copied().collect();

        while let Some(vertex) = queue.pop_front() {
            for reader in self.readers_of(vertex) {
                if !affected.insert(reader) {
                    continue;
                }
                if let Some(defines) = self.nodes.get(&reader).and_then(|n| n.defines) {
                    let symbol = DependencyVertex::Symbol(defines);
                    if seen.insert(symbol) {
                        queue.push_back(symbol);
                    }
                }
            }
        }
        affected
    }

    #[inline]
    #[must_use]
    pub fn node(&self, id: ExprId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self, id: ExprId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.is_active)
    }

    /// Active statements in program order
    pub fn active_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(|node| node.is_active)
    }

    /// Active statements produced by `owner`
    pub fn nodes_owned_by(&self, owner: SubtreeId) -> impl Iterator<Item = &GraphNode> {
        self.active_nodes().filter(move |node| node.owner == Some(owner))
    }

    /// Statements ever recorded, active or not
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl From<DependencyRecords> for DependencyGraph {
    fn from(records: DependencyRecords) -> Self {
        let mut graph = Self::new();
        for (index, deps) in records.procedures {
            graph.define_procedure(index, deps.reads, deps.calls);
        }
        for node in records.nodes.into_values() {
            graph.insert_node(node);
        }
        graph
    }
}

impl From<DependencyGraph> for DependencyRecords {
    fn from(graph: DependencyGraph) -> Self {
        Self {
            nodes: graph.nodes,
            procedures: graph.procedures,
        }
    }
}
