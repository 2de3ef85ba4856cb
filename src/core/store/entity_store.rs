// Entity store port - the generic query interface to the external relational store.
//
// The moderation core never owns persistence. It talks to named collections of
// JSON documents through this trait; infra decides whether that is memory,
// SQLite, or a hosted database.
//
// NO database dependencies here - just the contract and the query model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: Uuid },

    #[error("{collection} record {id} already exists")]
    Duplicate { collection: Collection, id: Uuid },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Backend(String),
}

// ============================================================================
// COLLECTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Offers,
    SalesReports,
    Reviews,
    Disputes,
    DisputeMessages,
    ContactLogs,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Offers => "offers",
            Collection::SalesReports => "sales_reports",
            Collection::Reviews => "reviews",
            Collection::Disputes => "disputes",
            Collection::DisputeMessages => "dispute_messages",
            Collection::ContactLogs => "contact_logs",
        }
    }

    /// Singular, human-readable name used in error messages.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Collection::Profiles => "Profile",
            Collection::Offers => "Offer",
            Collection::SalesReports => "Sales report",
            Collection::Reviews => "Review",
            Collection::Disputes => "Dispute",
            Collection::DisputeMessages => "Dispute message",
            Collection::ContactLogs => "Contact log",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// QUERY MODEL
// ============================================================================

/// A predicate on one top-level field of a document.
///
/// A missing field compares as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Condition {
    pub fn eq(field: &str, value: Value) -> Self {
        Condition::Eq {
            field: field.to_string(),
            value,
        }
    }

    pub fn ne(field: &str, value: Value) -> Self {
        Condition::Ne {
            field: field.to_string(),
            value,
        }
    }

    pub fn is_in(field: &str, values: Vec<Value>) -> Self {
        Condition::In {
            field: field.to_string(),
            values,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Condition::Eq { field, .. } | Condition::Ne { field, .. } | Condition::In { field, .. } => {
                field
            }
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        let actual = record.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Condition::Eq { value, .. } => actual == value,
            Condition::Ne { value, .. } => actual != value,
            Condition::In { values, .. } => values.iter().any(|v| v == actual),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filter + ordering + limit for `find` and `count`.
///
/// `count` ignores ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self::new().eq("id", json!(id))
    }

    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.conditions.push(Condition::eq(field, value));
        self
    }

    pub fn ne(mut self, field: &str, value: Value) -> Self {
        self.conditions.push(Condition::ne(field, value));
        self
    }

    pub fn is_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::is_in(field, values));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn newest_first(self) -> Self {
        self.order_by("created_at", Direction::Descending)
    }

    pub fn oldest_first(self) -> Self {
        self.order_by("created_at", Direction::Ascending)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Orders two field values the way the stores sort them.
///
/// Numbers compare numerically, RFC 3339 strings chronologically, other
/// strings lexically. `null` sorts first.
pub fn compare_field_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.with_timezone(&Utc).cmp(&y.with_timezone(&Utc)),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

// ============================================================================
// PATCHES
// ============================================================================

/// A shallow merge patch: each field replaces the stored one, `null` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.0.insert(field.to_string(), value);
        self
    }

    pub fn apply_to(&self, record: &mut Value) {
        if let Value::Object(fields) = record {
            for (key, value) in &self.0 {
                if value.is_null() {
                    fields.remove(key);
                } else {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Reads the `id` field every stored document carries.
pub fn record_id(record: &Value) -> Result<Uuid, StoreError> {
    record
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::InvalidQuery("record has no valid 'id' field".to_string()))
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// The external relational store, seen as named collections of JSON documents.
///
/// Every call may fail with `StoreError`; the core never retries.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// All documents matching the query, in query order (insertion order when unordered).
    async fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// First document matching the query.
    async fn find_one(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Option<Value>, StoreError> {
        let query = query.clone().limit(1);
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// Insert a new document. The document's `id` must be unique in the collection.
    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, StoreError>;

    /// Apply `patch` to the document only if it still satisfies every `guard`
    /// condition, as one atomic step. `None` when the document is missing or a
    /// guard failed.
    async fn update_where(
        &self,
        collection: Collection,
        id: Uuid,
        guard: &[Condition],
        patch: &Patch,
    ) -> Result<Option<Value>, StoreError>;

    /// Unconditional update.
    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Patch,
    ) -> Result<Value, StoreError> {
        self.update_where(collection, id, &[], patch)
            .await?
            .ok_or(StoreError::NotFound { collection, id })
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError>;

    async fn count(&self, collection: Collection, query: &Query) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions_treat_missing_fields_as_null() {
        let record = json!({ "id": "x", "status": "pending" });

        assert!(Condition::eq("status", json!("pending")).matches(&record));
        assert!(Condition::ne("status", json!("approved")).matches(&record));
        assert!(Condition::eq("reviewed_at", Value::Null).matches(&record));
        assert!(Condition::is_in("status", vec![json!("approved"), json!("pending")])
            .matches(&record));
        assert!(!Condition::is_in("status", vec![]).matches(&record));
    }

    #[test]
    fn test_patch_null_clears_field() {
        let mut record = json!({ "id": "x", "notes": "old", "active": false });
        Patch::new()
            .set("notes", Value::Null)
            .set("active", json!(true))
            .apply_to(&mut record);

        assert_eq!(record, json!({ "id": "x", "active": true }));
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        // Lexically "…00Z" > "…00.5Z", chronologically it is earlier.
        let earlier = json!("2024-03-01T10:00:00Z");
        let later = json!("2024-03-01T10:00:00.5Z");
        assert_eq!(compare_field_values(&earlier, &later), Ordering::Less);
        assert_eq!(
            compare_field_values(&json!(2), &json!(10)),
            Ordering::Less
        );
        assert_eq!(
            compare_field_values(&Value::Null, &json!("a")),
            Ordering::Less
        );
    }
}
