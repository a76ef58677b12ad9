//! Document store used for activities and the shared tag registry.
//!
//! Records are JSON objects grouped by collection. The SQLite implementation keeps
//! one row per document and sorts on JSON fields with `json_extract`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Sort direction for `DocumentStore::list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A stored record together with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// One-shot result of a `list` call. Call `list` again to refresh.
#[derive(Debug)]
pub struct Documents {
    inner: std::vec::IntoIter<Document>,
}

impl Documents {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            inner: documents.into_iter(),
        }
    }
}

impl Iterator for Documents {
    type Item = Document;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Storage contract for collections of JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record under a store-assigned key and return that key.
    async fn create(&self, collection: &str, record: Value) -> Result<String, AppError>;

    /// List every record of a collection sorted by a top-level field.
    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> Result<Documents, AppError>;

    /// Fetch one record by key.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, AppError>;

    /// Create or replace the record stored under `key`.
    async fn set(&self, collection: &str, key: &str, record: Value) -> Result<(), AppError>;

    /// Overwrite the top-level fields present in `partial`. Fails if the record is absent.
    async fn update_fields(&self, collection: &str, key: &str, partial: Value)
        -> Result<(), AppError>;
}

/// SQLite-backed document store.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::to_string(&record)?;

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(&body)
            .execute(&self.pool)
            .await
            .map_err(AppError::store_write)?;

        Ok(id)
    }

    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> Result<Documents, AppError> {
        let path = field_path(order_by)?;
        let sql = match direction {
            Direction::Ascending => {
                "SELECT id, body FROM documents WHERE collection = ? ORDER BY json_extract(body, ?) ASC, seq ASC"
            }
            Direction::Descending => {
                "SELECT id, body FROM documents WHERE collection = ? ORDER BY json_extract(body, ?) DESC, seq DESC"
            }
        };

        let rows = sqlx::query(sql)
            .bind(collection)
            .bind(&path)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::store_read)?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let body: String = row.get("body");
            documents.push(Document {
                id: row.get("id"),
                data: parse_body(&body)?,
            });
        }

        Ok(Documents::new(documents))
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::store_read)?;

        row.map(|r| parse_body(&r.get::<String, _>("body")))
            .transpose()
    }

    async fn set(&self, collection: &str, key: &str, record: Value) -> Result<(), AppError> {
        let body = serde_json::to_string(&record)?;

        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?) ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
        )
        .bind(collection)
        .bind(key)
        .bind(&body)
        .execute(&self.pool)
        .await
        .map_err(AppError::store_write)?;

        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        key: &str,
        partial: Value,
    ) -> Result<(), AppError> {
        let Value::Object(fields) = partial else {
            return Err(AppError::BadRequest(
                "Partial update must be a JSON object".to_string(),
            ));
        };

        let mut tx = self.pool.begin().await.map_err(AppError::store_write)?;

        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::store_write)?
            .ok_or_else(|| AppError::NotFound(format!("Document {}/{} not found", collection, key)))?;

        let mut current = parse_body(&row.get::<String, _>("body"))?;
        merge_fields(&mut current, fields);
        let body = serde_json::to_string(&current)?;

        sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
            .bind(&body)
            .bind(collection)
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(AppError::store_write)?;

        tx.commit().await.map_err(AppError::store_write)?;
        Ok(())
    }
}

/// Shallow merge: top-level keys of `fields` replace those in `target`.
pub fn merge_fields(target: &mut Value, fields: Map<String, Value>) {
    match target {
        Value::Object(existing) => existing.extend(fields),
        other => *other = Value::Object(fields),
    }
}

/// JSON path for a top-level field name.
fn field_path(field: &str) -> Result<String, AppError> {
    let valid = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(AppError::BadRequest(format!(
            "Invalid sort field: {:?}",
            field
        )));
    }
    Ok(format!("$.{}", field))
}

fn parse_body(body: &str) -> Result<Value, AppError> {
    serde_json::from_str(body)
        .map_err(|e| AppError::StoreRead(format!("Corrupt document body: {}", e)))
}
