//! Edit batches
//!
//! [`GraphSyncDataBuilder`] collects raw added, modified and deleted subtrees
//! in whatever shape the host produces them; [`GraphSyncDataBuilder::build`]
//! canonicalises them into a [`GraphSyncData`].

use crate::subtree::{Subtree, SubtreeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One canonical edit batch
///
/// The three sets are disjoint by id. Within a set the first occurrence of an
/// id fixes its position and the last occurrence fixes its content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphSyncDataBuilder")]
pub struct GraphSyncData {
    added: Vec<Subtree>,
    modified: Vec<Subtree>,
    deleted: Vec<Subtree>,
}

impl GraphSyncData {
    /// Start a batch
    #[inline]
    #[must_use]
    pub fn builder() -> GraphSyncDataBuilder {
        GraphSyncDataBuilder::default()
    }

    /// Canonical batch from raw sets
    #[must_use]
    pub fn new(added: Vec<Subtree>, modified: Vec<Subtree>, deleted: Vec<Subtree>) -> Self {
        GraphSyncDataBuilder {
            added,
            modified,
            deleted,
        }
        .build()
    }

    #[inline]
    #[must_use]
    pub fn added(&self) -> &[Subtree] {
        &self.added
    }

    #[inline]
    #[must_use]
    pub fn modified(&self) -> &[Subtree] {
        &self.modified
    }

    #[inline]
    #[must_use]
    pub fn deleted(&self) -> &[Subtree] {
        &self.deleted
    }

    /// No subtree added, modified or deleted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Number of subtrees touched by the batch
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// Whether the batch touches `id` at all
    #[must_use]
    pub fn contains(&self, id: SubtreeId) -> bool {
        self.all().any(|subtree| subtree.id() == id)
    }

    /// Every touched subtree: deleted first, then modified, then added
    pub fn all(&self) -> impl Iterator<Item = &Subtree> {
        self.deleted
            .iter()
            .chain(self.modified.iter())
            .chain(self.added.iter())
    }
}

impl From<GraphSyncDataBuilder> for GraphSyncData {
    fn from(builder: GraphSyncDataBuilder) -> Self {
        builder.build()
    }
}

/// Raw, possibly overlapping edit sets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSyncDataBuilder {
    #[serde(default)]
    added: Vec<Subtree>,
    #[serde(default)]
    modified: Vec<Subtree>,
    #[serde(default)]
    deleted: Vec<Subtree>,
}

impl GraphSyncDataBuilder {
    /// Add a newly created subtree
    #[inline]
    #[must_use]
    pub fn add(mut self, subtree: Subtree) -> Self {
        self.added.push(subtree);
        self
    }

    /// Add a new version of an existing subtree
    #[inline]
    #[must_use]
    pub fn modify(mut self, subtree: Subtree) -> Self {
        self.modified.push(subtree);
        self
    }

    /// Remove a subtree
    #[inline]
    #[must_use]
    pub fn delete(mut self, id: SubtreeId) -> Self {
        self.deleted.push(Subtree::empty(id));
        self
    }

    /// Canonicalise into a batch
    ///
    /// Deletion wins over modification and addition of the same id; an id
    /// both added and modified ends up modified.
    #[must_use]
    pub fn build(self) -> GraphSyncData {
        let deleted = dedupe(self.deleted);

        let mut modified = dedupe(self.modified);
        modified.retain(|id, _| {
            let keep = !deleted.contains_key(id);
            if !keep {
                tracing::debug!(subtree = %id, "dropping modification of deleted subtree");
            }
            keep
        });

        let mut added = dedupe(self.added);
        added.retain(|id, _| {
            let keep = !deleted.contains_key(id) && !modified.contains_key(id);
            if !keep {
                tracing::debug!(subtree = %id, "dropping addition superseded in the same batch");
            }
            keep
        });

        GraphSyncData {
            added: added.into_values().collect(),
            modified: modified.into_values().collect(),
            deleted: deleted.into_values().collect(),
        }
    }
}

fn dedupe(subtrees: Vec<Subtree>) -> IndexMap<SubtreeId, Subtree> {
    let mut map = IndexMap::with_capacity(subtrees.len());
    for subtree in subtrees {
        map.insert(subtree.id(), subtree);
    }
    map
}
