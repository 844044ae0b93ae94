use std::sync::Mutex;

use watchdb::error::Result;
use watchdb::object_change_set::ObjKey;
use watchdb::storage::{StorageEngine, TransactionChangeInfo};
use watchdb::version::VersionId;

/// A storage engine backed by a plain in-memory log of per-version change
/// records, sufficient to exercise the coordinator's read-advancement logic
/// without a real transaction manager.
pub struct FakeStorage {
    inner: Mutex<FakeStorageState>,
}

struct FakeStorageState {
    head: VersionId,
    log: Vec<(VersionId, TransactionChangeInfo)>,
}

impl FakeStorage {
    pub fn new() -> Self {
        FakeStorage {
            inner: Mutex::new(FakeStorageState { head: VersionId::new(0, 0), log: Vec::new() }),
        }
    }

    pub fn commit(&self, table: &str, inserted: ObjKey) -> VersionId {
        let mut state = self.inner.lock().unwrap();
        let next_version = VersionId::new(state.head.version + 1, 0);
        let mut info = TransactionChangeInfo::new();
        info.table_mut(table).insertions_add(inserted);
        state.log.push((next_version, info));
        state.head = next_version;
        next_version
    }
}

impl StorageEngine for FakeStorage {
    fn begin_read(&self, version: Option<VersionId>) -> Result<VersionId> {
        let state = self.inner.lock().unwrap();
        Ok(version.unwrap_or(state.head))
    }

    fn advance_read(&self, from: VersionId, to: VersionId) -> Result<TransactionChangeInfo> {
        let state = self.inner.lock().unwrap();
        let mut merged = TransactionChangeInfo::new();
        for (version, info) in &state.log {
            if *version > from && *version <= to {
                merged.merge(info.clone());
            }
        }
        Ok(merged)
    }

    fn commit_write(&self) -> Result<VersionId> {
        Ok(self.inner.lock().unwrap().head)
    }

    fn current_head(&self) -> Result<VersionId> {
        Ok(self.inner.lock().unwrap().head)
    }
}
