//! Delta Diff - edit batches for the live runner
//!
//! A host graph is split into [`Subtree`]s, each a stable identity plus the
//! statements it currently stands for. One edit of the host graph becomes one
//! [`GraphSyncData`]: the subtrees that were added, modified and deleted.
//!
//! Batches are canonical by construction: an id appears in at most one of the
//! three sets. Deletion wins over any other change to the same id, and an id
//! that was both added and modified in one batch is reported as modified.

pub mod error;
pub mod subtree;
pub mod sync_data;

pub use error::DiffError;
pub use subtree::{Subtree, SubtreeId};
pub use sync_data::{GraphSyncData, GraphSyncDataBuilder};
