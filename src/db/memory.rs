//! In-memory document store for unit tests, with switchable failures and a write log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{merge_fields, Direction, Document, DocumentStore, Documents};
use crate::errors::AppError;

/// One recorded write: (operation, collection, key, record).
pub type WriteEntry = (&'static str, String, String, Value);

#[derive(Default)]
pub struct MemoryDocumentStore {
    rows: Mutex<Vec<(String, Document)>>,
    writes: Mutex<Vec<WriteEntry>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<WriteEntry> {
        self.writes.lock().unwrap().clone()
    }

    fn check_read(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreRead("store unavailable".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreWrite("store unavailable".to_string()));
        }
        Ok(())
    }

    fn log(&self, op: &'static str, collection: &str, key: &str, record: &Value) {
        self.writes.lock().unwrap().push((
            op,
            collection.to_string(),
            key.to_string(),
            record.clone(),
        ));
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<String, AppError> {
        self.check_write()?;
        let id = uuid::Uuid::new_v4().to_string();
        self.log("create", collection, &id, &record);
        self.rows.lock().unwrap().push((
            collection.to_string(),
            Document {
                id: id.clone(),
                data: record,
            },
        ));
        Ok(id)
    }

    async fn list(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
    ) -> Result<Documents, AppError> {
        self.check_read()?;
        let rows = self.rows.lock().unwrap();
        // Stable sort keeps insertion order for ties; reversing makes ties newest-first.
        let mut docs: Vec<Document> = rows
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, d)| d.clone())
            .collect();
        docs.sort_by(|a, b| {
            let ka = a.data.get(order_by).map(|v| v.to_string()).unwrap_or_default();
            let kb = b.data.get(order_by).map(|v| v.to_string()).unwrap_or_default();
            ka.cmp(&kb)
        });
        if direction == Direction::Descending {
            docs.reverse();
        }
        Ok(Documents::new(docs))
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, AppError> {
        self.check_read()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|(c, d)| c == collection && d.id == key)
            .map(|(_, d)| d.data.clone()))
    }

    async fn set(&self, collection: &str, key: &str, record: Value) -> Result<(), AppError> {
        self.check_write()?;
        self.log("set", collection, key, &record);
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|(c, d)| c == collection && d.id == key)
        {
            Some((_, doc)) => doc.data = record,
            None => rows.push((
                collection.to_string(),
                Document {
                    id: key.to_string(),
                    data: record,
                },
            )),
        }
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        key: &str,
        partial: Value,
    ) -> Result<(), AppError> {
        self.check_write()?;
        let Value::Object(fields) = partial.clone() else {
            return Err(AppError::BadRequest("partial must be an object".to_string()));
        };
        let mut rows = self.rows.lock().unwrap();
        let (_, doc) = rows
            .iter_mut()
            .find(|(c, d)| c == collection && d.id == key)
            .ok_or_else(|| AppError::NotFound(format!("Document {}/{} not found", collection, key)))?;
        merge_fields(&mut doc.data, fields);
        drop(rows);
        self.log("update_fields", collection, key, &partial);
        Ok(())
    }
}
