//! Graph compiler
//!
//! Turns edit batches over graph subtrees into source fragments and keeps
//! track of which node, subtree and variable belong together so results can
//! be reported per node.
//!
//! Every statement of a subtree gets a [`NodeUid`]. The uid of a subtree's
//! last statement is its canonical uid: the node whose value stands for the
//! whole subtree. Mapping changes made while building a fragment stay
//! pending until the coordinator commits them after a successful run, or
//! drops them when the batch fails.

use crate::fragment::SourceFragment;
use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of one graph node (one statement of a subtree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeUid(pub u32);

impl fmt::Display for NodeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Converts edit batches into source and maps nodes back to variables
pub trait GraphCompiler: Send {
    /// Source fragment for `batch`; records pending mapping changes
    fn build_fragment(&mut self, batch: &GraphSyncData) -> SourceFragment;

    /// Canonical node of the subtree `uid` belongs to; unknown uids map to
    /// themselves
    fn canonicalize(&self, uid: NodeUid) -> NodeUid;

    /// Variable assigned by the statement `uid` identifies
    fn variable_name(&self, uid: NodeUid) -> Option<String>;

    /// Variable carrying a subtree's value
    fn subtree_variable(&self, subtree: SubtreeId) -> Option<String>;

    /// Subtree and canonical node that currently assign `variable`
    fn node_for_variable(&self, variable: &str) -> Option<(SubtreeId, NodeUid)>;

    /// Commit the pending mapping after a successful run
    fn reset_for_next_execution(&mut self);

    /// Drop the pending mapping after a failed batch
    fn abandon_pending(&mut self);

    /// Source text equivalent to `subtrees`, in order
    fn nodes_to_code(&self, subtrees: &[Subtree]) -> String;
}

#[derive(Debug, Clone, Default)]
struct SubtreeRecord {
    /// One per statement, in statement order
    uids: Vec<NodeUid>,
    /// Assigned variable per statement
    variables: Vec<Option<String>>,
    /// Every name bound by the subtree
    bound: BTreeSet<String>,
}

impl SubtreeRecord {
    fn canonical(&self) -> Option<NodeUid> {
        self.uids.last().copied()
    }
}

#[derive(Debug, Clone, Default)]
struct Mapping {
    subtrees: BTreeMap<SubtreeId, SubtreeRecord>,
    owners: BTreeMap<NodeUid, SubtreeId>,
}

impl Mapping {
    fn remove(&mut self, subtree: SubtreeId) -> Option<SubtreeRecord> {
        let record = self.subtrees.remove(&subtree)?;
        for uid in &record.uids {
            self.owners.remove(uid);
        }
        Some(record)
    }

    fn insert(&mut self, subtree: SubtreeId, record: SubtreeRecord) {
        for uid in &record.uids {
            self.owners.insert(*uid, subtree);
        }
        self.subtrees.insert(subtree, record);
    }

    fn binds(&self, name: &str) -> bool {
        self.subtrees.values().any(|record| record.bound.contains(name))
    }

    fn record_of(&self, uid: NodeUid) -> Option<&SubtreeRecord> {
        self.subtrees.get(self.owners.get(&uid)?)
    }
}

/// Graph compiler over [`Subtree`]s of associative statements
#[derive(Debug, Default)]
pub struct SubtreeGraphCompiler {
    committed: Mapping,
    pending: Option<Mapping>,
    next_uid: u32,
}

impl SubtreeGraphCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is waiting to be committed or abandoned
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Uids of a subtree's statements, in order
    #[must_use]
    pub fn node_uids(&self, subtree: SubtreeId) -> Vec<NodeUid> {
        self.committed
            .subtrees
            .get(&subtree)
            .map(|record| record.uids.clone())
            .unwrap_or_default()
    }

    fn record(&mut self, subtree: &Subtree) -> SubtreeRecord {
        let mut record = SubtreeRecord::default();
        for node in subtree.ast_nodes() {
            record.uids.push(NodeUid(self.next_uid));
            self.next_uid += 1;
            record.variables.push(node.assigned_variable().map(str::to_string));
            record.bound.insert(node.bound_name().to_string());
        }
        record
    }
}

impl GraphCompiler for SubtreeGraphCompiler {
    fn build_fragment(&mut self, batch: &GraphSyncData) -> SourceFragment {
        let mut mapping = self.committed.clone();
        let mut fragment = SourceFragment::default();
        let mut dropped = BTreeSet::new();

        // A re-added id supersedes the committed subtree of the same id
        let superseded = batch
            .added()
            .iter()
            .filter(|subtree| self.committed.subtrees.contains_key(&subtree.id()));
        for subtree in batch.deleted().iter().chain(batch.modified()).chain(superseded) {
            fragment.retire(subtree.id());
            if let Some(record) = mapping.remove(subtree.id()) {
                dropped.extend(record.variables.into_iter().flatten());
            }
        }

        let mut units = Vec::new();
        for subtree in batch.modified().iter().chain(batch.added()) {
            let record = self.record(subtree);
            mapping.insert(subtree.id(), record);
            if !subtree.ast_nodes().is_empty() {
                units.push((Some(subtree.id()), subtree.code()));
            }
        }

        // Variables nothing binds any more are reset so their readers see
        // null. Function names are left alone: retiring the procedure is
        // enough and a global of that name would block redefining it.
        for name in dropped.iter().filter(|name| !mapping.binds(name)) {
            tracing::trace!(name = %name, "variable orphaned by batch");
            fragment.push(None, format!("{name} = null;"));
        }
        for (owner, code) in units {
            fragment.push(owner, code);
        }

        tracing::debug!(
            retired = fragment.retired.len(),
            units = fragment.units.len(),
            "fragment built"
        );
        self.pending = Some(mapping);
        fragment
    }

    fn canonicalize(&self, uid: NodeUid) -> NodeUid {
        self.committed
            .record_of(uid)
            .and_then(SubtreeRecord::canonical)
            .unwrap_or(uid)
    }

    fn variable_name(&self, uid: NodeUid) -> Option<String> {
        let record = self.committed.record_of(uid)?;
        let position = record.uids.iter().position(|u| *u == uid)?;
        record.variables.get(position)?.clone()
    }

    fn subtree_variable(&self, subtree: SubtreeId) -> Option<String> {
        let record = self.committed.subtrees.get(&subtree)?;
        record.variables.iter().rev().find_map(Clone::clone)
    }

    fn node_for_variable(&self, variable: &str) -> Option<(SubtreeId, NodeUid)> {
        self.committed.subtrees.iter().find_map(|(id, record)| {
            let assigns = record.variables.iter().any(|v| v.as_deref() == Some(variable));
            assigns.then(|| record.canonical().map(|uid| (*id, uid))).flatten()
        })
    }

    fn reset_for_next_execution(&mut self) {
        if let Some(mapping) = self.pending.take() {
            self.committed = mapping;
        }
    }

    fn abandon_pending(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("pending node mapping dropped");
        }
    }

    fn nodes_to_code(&self, subtrees: &[Subtree]) -> String {
        subtrees
            .iter()
            .map(Subtree::code)
            .filter(|code| !code.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn subtree(id: u128, code: &str) -> Subtree {
        Subtree::parse(SubtreeId::from_u128(id), code).unwrap()
    }

    fn committed(compiler: &mut SubtreeGraphCompiler, batch: &GraphSyncData) -> SourceFragment {
        let fragment = compiler.build_fragment(batch);
        compiler.reset_for_next_execution();
        fragment
    }

    #[test]
    fn test_added_subtrees_become_owned_units() {
        let mut compiler = SubtreeGraphCompiler::new();
        let batch = GraphSyncData::builder()
            .add(subtree(1, "a = 1;"))
            .add(subtree(2, "b = a + 1;"))
            .build();
        let fragment = committed(&mut compiler, &batch);
        assert_eq!(fragment.to_string(), "a = 1;\nb = a + 1;\n");
        assert_eq!(fragment.units[0].owner, Some(SubtreeId::from_u128(1)));
        assert!(fragment.retired.is_empty());
    }

    #[test]
    fn test_canonical_uid_is_last_statement() {
        let mut compiler = SubtreeGraphCompiler::new();
        let batch = GraphSyncData::builder().add(subtree(1, "t = 2;\nout = t * 3;")).build();
        committed(&mut compiler, &batch);

        let uids = compiler.node_uids(SubtreeId::from_u128(1));
        assert_eq!(uids.len(), 2);
        assert_eq!(compiler.canonicalize(uids[0]), uids[1]);
        assert_eq!(compiler.variable_name(uids[0]).as_deref(), Some("t"));
        assert_eq!(compiler.subtree_variable(SubtreeId::from_u128(1)).as_deref(), Some("out"));
        assert_eq!(
            compiler.node_for_variable("t"),
            Some((SubtreeId::from_u128(1), uids[1]))
        );
        assert_eq!(compiler.canonicalize(NodeUid(999)), NodeUid(999));
    }

    #[test]
    fn test_deleted_variable_is_reset_to_null() {
        let mut compiler = SubtreeGraphCompiler::new();
        committed(&mut compiler, &GraphSyncData::builder().add(subtree(1, "a = 1;")).build());

        let batch = GraphSyncData::builder().delete(SubtreeId::from_u128(1)).build();
        let fragment = committed(&mut compiler, &batch);
        assert_eq!(fragment.retired, vec![SubtreeId::from_u128(1)]);
        assert_eq!(fragment.to_string(), "a = null;\n");
        assert_eq!(fragment.units[0].owner, None);
        assert_eq!(compiler.node_for_variable("a"), None);
    }

    #[test]
    fn test_modified_subtree_keeping_its_variable_is_not_reset() {
        let mut compiler = SubtreeGraphCompiler::new();
        committed(&mut compiler, &GraphSyncData::builder().add(subtree(1, "a = 1;")).build());

        let batch = GraphSyncData::builder().modify(subtree(1, "a = 2;")).build();
        let fragment = committed(&mut compiler, &batch);
        assert_eq!(fragment.retired, vec![SubtreeId::from_u128(1)]);
        assert_eq!(fragment.to_string(), "a = 2;\n");
    }

    #[test]
    fn test_deleted_function_is_not_reset_as_variable() {
        let mut compiler = SubtreeGraphCompiler::new();
        committed(&mut compiler, &GraphSyncData::builder().add(subtree(1, "def f(x) = x + 1;")).build());

        let batch = GraphSyncData::builder().delete(SubtreeId::from_u128(1)).build();
        let fragment = committed(&mut compiler, &batch);
        assert_eq!(fragment.retired, vec![SubtreeId::from_u128(1)]);
        assert!(fragment.units.is_empty());
    }

    #[test]
    fn test_re_added_id_supersedes_committed_subtree() {
        let mut compiler = SubtreeGraphCompiler::new();
        committed(&mut compiler, &GraphSyncData::builder().add(subtree(1, "a = 1;\nb = 2;")).build());
        let before = compiler.node_uids(SubtreeId::from_u128(1));

        let fragment = committed(&mut compiler, &GraphSyncData::builder().add(subtree(1, "a = 5;")).build());
        assert_eq!(fragment.retired, vec![SubtreeId::from_u128(1)]);
        assert_eq!(fragment.to_string(), "b = null;\na = 5;\n");
        let after = compiler.node_uids(SubtreeId::from_u128(1));
        assert_eq!(after.len(), 1);
        assert!(!before.contains(&after[0]));
        assert_eq!(compiler.node_for_variable("b"), None);
    }

    #[test]
    fn test_abandoned_batch_keeps_committed_mapping() {
        let mut compiler = SubtreeGraphCompiler::new();
        committed(&mut compiler, &GraphSyncData::builder().add(subtree(1, "a = 1;")).build());
        let before = compiler.node_uids(SubtreeId::from_u128(1));

        compiler.build_fragment(&GraphSyncData::builder().modify(subtree(1, "z = 2;")).build());
        assert!(compiler.has_pending());
        compiler.abandon_pending();
        assert!(!compiler.has_pending());
        assert_eq!(compiler.node_uids(SubtreeId::from_u128(1)), before);
        assert_eq!(compiler.subtree_variable(SubtreeId::from_u128(1)).as_deref(), Some("a"));
    }

    #[test]
    fn test_nodes_to_code() {
        let compiler = SubtreeGraphCompiler::new();
        let code = compiler.nodes_to_code(&[
            subtree(1, "a = 1;"),
            Subtree::empty(SubtreeId::from_u128(2)),
            subtree(3, "def f(x) = x + a;"),
        ]);
        assert_eq!(code, "a = 1;\ndef f(x) = x + a;");
    }
}
