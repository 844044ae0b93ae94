//! The narrow interface this crate consumes from the underlying
//! transactional storage engine: begin a read at a version, advance a read
//! transaction forward while collecting a change record, and commit a
//! write producing a new version. Everything else about the storage
//! engine — MVCC snapshots, transaction log replay, cluster/leaf access —
//! is out of scope; this trait is the seam.

use std::collections::HashMap;

use crate::error::Result;
use crate::object_change_set::ObjectChangeSet;
use crate::version::VersionId;

/// The per-table, per-list delta record produced by the storage engine
/// while advancing a read transaction across one or more versions.
#[derive(Debug, Clone, Default)]
pub struct TransactionChangeInfo {
    tables: HashMap<String, ObjectChangeSet>,
}

impl TransactionChangeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_mut(&mut self, name: &str) -> &mut ObjectChangeSet {
        self.tables.entry(name.to_string()).or_default()
    }

    pub fn table(&self, name: &str) -> Option<&ObjectChangeSet> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &ObjectChangeSet)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merges `other`, the chunk covering the window immediately after
    /// this one, into `self` in place, per table.
    pub fn merge(&mut self, other: TransactionChangeInfo) {
        for (name, change_set) in other.tables {
            self.tables.entry(name).or_default().merge(change_set);
        }
    }
}

/// The storage-engine seam this crate's coordinator drives. A concrete
/// implementation owns the actual MVCC machinery; this crate only needs
/// the three operations below.
pub trait StorageEngine: Send + Sync {
    /// Opens (or reuses) a read transaction pinned at `version`, or at the
    /// current head if `version` is `None`. Returns the version it landed
    /// on.
    fn begin_read(&self, version: Option<VersionId>) -> Result<VersionId>;

    /// Advances a read transaction from `from` to `to`, collecting and
    /// returning the change record that covers that span.
    fn advance_read(&self, from: VersionId, to: VersionId) -> Result<TransactionChangeInfo>;

    /// Commits a pending write, producing a new version.
    fn commit_write(&self) -> Result<VersionId>;

    /// The latest committed version visible to new readers.
    fn current_head(&self) -> Result<VersionId>;
}
