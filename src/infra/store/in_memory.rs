// In-memory implementation of EntityStore.
//
// Used by tests and by `STORE_BACKEND=memory` for local demos. Documents live
// in a DashMap keyed by (collection, id); conditional updates take the entry's
// shard lock, so check-and-write is atomic per record.

use crate::core::store::{
    compare_field_values, record_id, Collection, Condition, Direction, EntityStore, Patch, Query,
    StoreError,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
struct RecordKey {
    collection: Collection,
    id: Uuid,
}

#[derive(Clone, Debug)]
struct StoredRecord {
    /// Insertion sequence, so unordered queries come back in insertion order.
    seq: u64,
    data: Value,
}

pub struct InMemoryEntityStore {
    records: DashMap<RecordKey, StoredRecord>,
    next_seq: AtomicU64,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    fn matching(&self, collection: Collection, query: &Query) -> Vec<StoredRecord> {
        let mut rows: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().collection == collection)
            .filter(|entry| query.matches(&entry.value().data))
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by_key(|r| r.seq);
        if let Some(order) = &query.order {
            // Stable sort keeps insertion order between equal keys.
            rows.sort_by(|a, b| {
                let left = a.data.get(&order.field).unwrap_or(&Value::Null);
                let right = b.data.get(&order.field).unwrap_or(&Value::Null);
                let ord = compare_field_values(left, right);
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        rows
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Value>, StoreError> {
        let mut rows = self.matching(collection, query);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows.into_iter().map(|r| r.data).collect())
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let id = record_id(&record)?;
        let key = RecordKey { collection, id };

        match self.records.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StoreError::Duplicate { collection, id })
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                slot.insert(StoredRecord {
                    seq,
                    data: record.clone(),
                });
                Ok(record)
            }
        }
    }

    async fn update_where(
        &self,
        collection: Collection,
        id: Uuid,
        guard: &[Condition],
        patch: &Patch,
    ) -> Result<Option<Value>, StoreError> {
        let key = RecordKey { collection, id };

        // get_mut holds the shard write lock until the guard is dropped.
        let Some(mut stored) = self.records.get_mut(&key) else {
            return Ok(None);
        };
        if !guard.iter().all(|c| c.matches(&stored.data)) {
            return Ok(None);
        }
        patch.apply_to(&mut stored.data);
        Ok(Some(stored.data.clone()))
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        self.records
            .remove(&RecordKey { collection, id })
            .map(|_| ())
            .ok_or(StoreError::NotFound { collection, id })
    }

    async fn count(&self, collection: Collection, query: &Query) -> Result<u64, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.key().collection == collection)
            .filter(|entry| query.matches(&entry.value().data))
            .count() as u64)
    }
}
