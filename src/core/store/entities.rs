// Typed facade over the entity store.
//
// Services work with `Offer`, `Review` and friends; this turns them into
// documents on the way in and back into structs on the way out.

use super::entity_store::{Collection, Condition, EntityStore, Patch, Query, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Anything that lives in a store collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

#[derive(Clone)]
pub struct Entities {
    store: Arc<dyn EntityStore>,
}

impl Entities {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn get<E: Entity>(&self, id: Uuid) -> Result<Option<E>, StoreError> {
        self.store
            .find_one(E::COLLECTION, &Query::by_id(id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Like `get`, but a missing record is a `StoreError::NotFound`.
    pub async fn require<E: Entity>(&self, id: Uuid) -> Result<E, StoreError> {
        self.get(id).await?.ok_or(StoreError::NotFound {
            collection: E::COLLECTION,
            id,
        })
    }

    pub async fn list<E: Entity>(&self, query: &Query) -> Result<Vec<E>, StoreError> {
        self.store
            .find(E::COLLECTION, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Loads every record whose id is in `ids`, keyed by id. Missing ids are
    /// simply absent from the map.
    pub async fn by_ids<E: Entity>(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, E>, StoreError> {
        let mut unique: Vec<Uuid> = ids.into_iter().collect();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let values = unique.iter().map(|id| json!(id)).collect();
        let records: Vec<E> = self.list(&Query::new().is_in("id", values)).await?;
        Ok(records.into_iter().map(|r| (r.id(), r)).collect())
    }

    pub async fn create<E: Entity>(&self, entity: &E) -> Result<E, StoreError> {
        let record = serde_json::to_value(entity)?;
        decode(self.store.insert(E::COLLECTION, record).await?)
    }

    pub async fn update<E: Entity>(&self, id: Uuid, patch: &Patch) -> Result<E, StoreError> {
        decode(self.store.update(E::COLLECTION, id, patch).await?)
    }

    /// Conditional write: `None` when the record is gone or no longer matches `guard`.
    pub async fn update_if<E: Entity>(
        &self,
        id: Uuid,
        guard: &[Condition],
        patch: &Patch,
    ) -> Result<Option<E>, StoreError> {
        self.store
            .update_where(E::COLLECTION, id, guard, patch)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn delete<E: Entity>(&self, id: Uuid) -> Result<(), StoreError> {
        self.store.delete(E::COLLECTION, id).await
    }

    pub async fn count<E: Entity>(&self, query: &Query) -> Result<u64, StoreError> {
        self.store.count(E::COLLECTION, query).await
    }
}

fn decode<E: DeserializeOwned>(value: Value) -> Result<E, StoreError> {
    Ok(serde_json::from_value(value)?)
}
