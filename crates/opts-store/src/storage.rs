//! # In-Memory Option Storage
//!
//! One `parking_lot::RwLock` guards the whole record table. Reads take the
//! read lock; writes go through a [`Transaction`] that holds the write lock
//! from its first check to commit, so a check-then-write sequence (the
//! uniqueness check for single-valued keys) cannot interleave with another
//! writer.
//!
//! Writes inside a transaction are staged and only applied on
//! [`Transaction::commit`]. Dropping a transaction without committing
//! discards them.

use std::collections::HashMap;
use std::sync::Arc;

use opts_core::{OptionId, OwnerId};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::record::OptionRecord;

#[derive(Debug, Clone)]
struct StoredOption {
    record: OptionRecord,
    seq: u64,
}

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<OptionId, StoredOption>,
    next_seq: u64,
}

impl Tables {
    fn owned_by(&self, owner: Option<OwnerId>) -> Vec<OptionRecord> {
        let mut rows: Vec<&StoredOption> = self
            .records
            .values()
            .filter(|s| s.record.owner_id == owner)
            .collect();
        rows.sort_by(|a, b| {
            a.record
                .created_at
                .cmp(&b.record.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        rows.into_iter().map(|s| s.record.clone()).collect()
    }
}

/// Shared in-memory record table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// A record by id.
    pub fn get(&self, id: OptionId) -> Option<OptionRecord> {
        self.tables.read().records.get(&id).map(|s| s.record.clone())
    }

    /// Records held by `owner` (`None` for global), oldest first, ties in
    /// insertion order.
    pub fn list_by_owner(&self, owner: Option<OwnerId>) -> Vec<OptionRecord> {
        self.tables.read().owned_by(owner)
    }

    /// A consistent read view across several owners.
    pub fn read(&self) -> StorageReader<'_> {
        StorageReader {
            tables: self.tables.read(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a write transaction. Blocks until no other reader or writer
    /// holds the table.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction {
            tables: self.tables.write(),
            staged: Vec::new(),
        }
    }
}

/// Read guard over the record table.
#[derive(Debug)]
pub struct StorageReader<'a> {
    tables: RwLockReadGuard<'a, Tables>,
}

impl StorageReader<'_> {
    /// Same ordering as [`MemoryStorage::list_by_owner`].
    pub fn owned_by(&self, owner: Option<OwnerId>) -> Vec<OptionRecord> {
        self.tables.owned_by(owner)
    }
}

#[derive(Debug)]
enum Staged {
    Upsert(OptionRecord),
    Remove(OptionId),
}

impl Staged {
    fn id(&self) -> OptionId {
        match self {
            Self::Upsert(record) => record.id,
            Self::Remove(id) => *id,
        }
    }
}

/// Exclusive write transaction.
#[derive(Debug)]
pub struct Transaction<'a> {
    tables: RwLockWriteGuard<'a, Tables>,
    staged: Vec<Staged>,
}

impl Transaction<'_> {
    /// A record by id, as seen by this transaction.
    pub fn get(&self, id: OptionId) -> Option<OptionRecord> {
        match self.staged.iter().rev().find(|s| s.id() == id) {
            Some(Staged::Upsert(record)) => Some(record.clone()),
            Some(Staged::Remove(_)) => None,
            None => self.tables.records.get(&id).map(|s| s.record.clone()),
        }
    }

    /// Some record other than `exclude` holding `key` for `owner`.
    pub fn find_other(
        &self,
        key: &str,
        owner: Option<OwnerId>,
        exclude: Option<OptionId>,
    ) -> Option<OptionId> {
        let matches = |r: &OptionRecord| {
            r.key == key && r.owner_id == owner && Some(r.id) != exclude
        };
        let staged_hit = self.staged.iter().find_map(|s| match s {
            Staged::Upsert(r) if matches(r) => Some(r.id),
            _ => None,
        });
        if staged_hit.is_some() {
            return staged_hit;
        }
        self.tables
            .records
            .values()
            .map(|s| &s.record)
            .filter(|r| matches(r))
            .map(|r| r.id)
            .find(|id| self.get(*id).is_some_and(|r| matches(&r)))
    }

    /// Stage an insert or update.
    pub fn upsert(&mut self, record: OptionRecord) {
        self.staged.push(Staged::Upsert(record));
    }

    /// Stage a removal, returning the record that will be removed.
    pub fn remove(&mut self, id: OptionId) -> Option<OptionRecord> {
        let existing = self.get(id)?;
        self.staged.push(Staged::Remove(id));
        Some(existing)
    }

    /// Apply every staged write. Updated records keep their original
    /// insertion sequence.
    pub fn commit(mut self) {
        let staged = std::mem::take(&mut self.staged);
        let tables = &mut *self.tables;
        for op in staged {
            match op {
                Staged::Upsert(record) => {
                    let seq = match tables.records.get(&record.id) {
                        Some(existing) => existing.seq,
                        None => {
                            tables.next_seq += 1;
                            tables.next_seq
                        }
                    };
                    tables.records.insert(record.id, StoredOption { record, seq });
                }
                Staged::Remove(id) => {
                    tables.records.remove(&id);
                }
            }
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            tracing::debug!(discarded = self.staged.len(), "transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OptionValue;
    use opts_core::Timestamp;

    fn record(key: &str, owner: Option<OwnerId>) -> OptionRecord {
        let now = Timestamp::now();
        OptionRecord::from_value(
            OptionId::new(),
            key.into(),
            owner,
            None,
            OptionValue::Boolean(true),
            now,
            now,
        )
    }

    #[test]
    fn uncommitted_writes_are_discarded() {
        let storage = MemoryStorage::new();
        {
            let mut tx = storage.begin();
            tx.upsert(record("k", None));
        }
        assert!(storage.is_empty());
    }

    #[test]
    fn staged_writes_visible_inside_transaction() {
        let storage = MemoryStorage::new();
        let owner = OwnerId::new();
        let r = record("k", Some(owner));
        let id = r.id;
        let mut tx = storage.begin();
        tx.upsert(r);
        assert!(tx.get(id).is_some());
        assert_eq!(tx.find_other("k", Some(owner), None), Some(id));
        assert_eq!(tx.find_other("k", Some(owner), Some(id)), None);
        assert_eq!(tx.find_other("k", None, None), None);
        tx.commit();
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn staged_removal_hides_committed_record() {
        let storage = MemoryStorage::new();
        let r = record("k", None);
        let id = r.id;
        let mut tx = storage.begin();
        tx.upsert(r);
        tx.commit();

        let mut tx = storage.begin();
        assert!(tx.remove(id).is_some());
        assert!(tx.get(id).is_none());
        assert_eq!(tx.find_other("k", None, None), None);
        assert!(tx.remove(id).is_none());
        tx.commit();
        assert!(storage.get(id).is_none());
    }

    #[test]
    fn update_keeps_insertion_order() {
        let storage = MemoryStorage::new();
        let owner = Some(OwnerId::new());
        let first = record("a", owner);
        let second = record("b", owner);
        let first_id = first.id;
        let mut tx = storage.begin();
        tx.upsert(first);
        tx.upsert(second);
        tx.commit();

        let mut updated = storage.get(first_id).unwrap();
        updated.boolean_value = Some(false);
        let mut tx = storage.begin();
        tx.upsert(updated);
        tx.commit();

        let keys: Vec<_> = storage
            .list_by_owner(owner)
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(storage.get(first_id).unwrap().boolean_value, Some(false));
    }

    #[test]
    fn list_by_owner_filters_global() {
        let storage = MemoryStorage::new();
        let mut tx = storage.begin();
        tx.upsert(record("g", None));
        tx.upsert(record("o", Some(OwnerId::new())));
        tx.commit();
        let global = storage.list_by_owner(None);
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].key, "g");
        assert_eq!(storage.read().owned_by(None).len(), 1);
    }
}
