// SQLite implementation of the EntityStore trait.
//
// Tables:
// - entities: one JSON document per row, keyed by (collection, id)
//
// Field predicates are evaluated with json_extract, and conditional updates run
// as a single `UPDATE ... WHERE <guard> RETURNING data` so two admins racing on
// the same record cannot both win.

use crate::core::store::{
    record_id, Collection, Condition, Direction, EntityStore, Patch, Query, StoreError,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite};
use uuid::Uuid;

type SqlQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

pub struct SqliteEntityStore {
    pool: SqlitePool,
}

/// A value bound into a generated statement.
#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Int(i64),
    Real(f64),
    Bool(bool),
}

impl SqliteEntityStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        let connection_string = format!("sqlite://{}?mode=rwc", database_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                UNIQUE (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// `json_extract` expression for a top-level field.
///
/// Field names are spliced into SQL, so only plain identifiers are allowed.
fn field_expr(field: &str) -> Result<String, StoreError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidQuery(format!(
            "unsupported field name '{}'",
            field
        )));
    }
    Ok(format!("json_extract(data, '$.{}')", field))
}

fn to_bind(value: &Value) -> Result<Option<Bind>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(Bind::Text(s.clone()))),
        Value::Bool(b) => Ok(Some(Bind::Bool(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Some(Bind::Int(i))),
            None => Ok(Some(Bind::Real(n.as_f64().unwrap_or(0.0)))),
        },
        other => Err(StoreError::InvalidQuery(format!(
            "cannot filter on composite value {}",
            other
        ))),
    }
}

/// Builds `collection = ? AND <conditions...>` plus its bind values.
fn where_clause(
    collection: Collection,
    conditions: &[Condition],
) -> Result<(String, Vec<Bind>), StoreError> {
    let mut sql = String::from("collection = ?");
    let mut binds = vec![Bind::Text(collection.as_str().to_string())];

    for condition in conditions {
        let expr = field_expr(condition.field())?;
        match condition {
            Condition::Eq { value, .. } => match to_bind(value)? {
                Some(bind) => {
                    sql.push_str(&format!(" AND {} = ?", expr));
                    binds.push(bind);
                }
                None => sql.push_str(&format!(" AND {} IS NULL", expr)),
            },
            Condition::Ne { value, .. } => match to_bind(value)? {
                Some(bind) => {
                    sql.push_str(&format!(" AND {} IS NOT ?", expr));
                    binds.push(bind);
                }
                None => sql.push_str(&format!(" AND {} IS NOT NULL", expr)),
            },
            Condition::In { values, .. } => {
                let mut set = Vec::new();
                for value in values {
                    if let Some(bind) = to_bind(value)? {
                        set.push(bind);
                    }
                }
                if set.is_empty() {
                    sql.push_str(" AND 0");
                } else {
                    let placeholders = vec!["?"; set.len()].join(", ");
                    sql.push_str(&format!(" AND {} IN ({})", expr, placeholders));
                    binds.extend(set);
                }
            }
        }
    }

    Ok((sql, binds))
}

fn bind_all<'q>(mut query: SqlQuery<'q>, binds: Vec<Bind>) -> SqlQuery<'q> {
    for bind in binds {
        query = match bind {
            Bind::Text(s) => query.bind(s),
            Bind::Int(i) => query.bind(i),
            Bind::Real(f) => query.bind(f),
            Bind::Bool(b) => query.bind(b),
        };
    }
    query
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse_data(row: &sqlx::sqlite::SqliteRow) -> Result<Value, StoreError> {
    let data: String = row.try_get("data").map_err(backend)?;
    Ok(serde_json::from_str(&data)?)
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Value>, StoreError> {
        let (filter, mut binds) = where_clause(collection, &query.conditions)?;
        let mut sql = format!("SELECT data FROM entities WHERE {}", filter);

        match &query.order {
            Some(order) => {
                let expr = field_expr(&order.field)?;
                let direction = match order.direction {
                    Direction::Ascending => "ASC",
                    Direction::Descending => "DESC",
                };
                // julianday() makes RFC 3339 timestamps sort chronologically;
                // it is NULL for anything that is not a date, so fall back to the raw value.
                sql.push_str(&format!(
                    " ORDER BY COALESCE(julianday({expr}), {expr}) {direction}, seq ASC"
                ));
            }
            None => sql.push_str(" ORDER BY seq ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Bind::Int(limit as i64));
        }

        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.iter().map(parse_data).collect()
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let id = record_id(&record)?;

        let result = sqlx::query("INSERT INTO entities (collection, id, data) VALUES (?, ?, ?)")
            .bind(collection.as_str())
            .bind(id.to_string())
            .bind(record.to_string())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(record),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Duplicate { collection, id })
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn update_where(
        &self,
        collection: Collection,
        id: Uuid,
        guard: &[Condition],
        patch: &Patch,
    ) -> Result<Option<Value>, StoreError> {
        let (filter, filter_binds) = where_clause(collection, guard)?;
        let sql = format!(
            "UPDATE entities SET data = json_patch(data, ?) WHERE id = ? AND {} RETURNING data",
            filter
        );

        let mut binds = vec![Bind::Text(patch.to_value().to_string()), Bind::Text(id.to_string())];
        binds.extend(filter_binds);

        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(parse_data).transpose()
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM entities WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { collection, id });
        }
        Ok(())
    }

    async fn count(&self, collection: Collection, query: &Query) -> Result<u64, StoreError> {
        let (filter, binds) = where_clause(collection, &query.conditions)?;
        let sql = format!("SELECT COUNT(*) AS total FROM entities WHERE {}", filter);

        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        let total: i64 = row.try_get("total").map_err(backend)?;
        Ok(total as u64)
    }
}
