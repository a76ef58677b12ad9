//! Tag registry and the editor-side tag manager.
//!
//! The registry is one shared document listing every known tag. The manager holds
//! an editor's view of it: known tags, live suggestions and the current selection.

mod manager;

pub use manager::*;

use std::sync::Arc;

use serde_json::json;

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{TagRegistryRecord, METADATA_COLLECTION, TAG_REGISTRY_KEY};

/// Access to the shared tag registry document.
#[derive(Clone)]
pub struct TagRegistry {
    store: Arc<dyn DocumentStore>,
}

impl TagRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read every known tag. An absent registry is an empty one.
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        let record = self
            .store
            .get(METADATA_COLLECTION, TAG_REGISTRY_KEY)
            .await?
            .map(serde_json::from_value::<TagRegistryRecord>)
            .transpose()
            .map_err(|e| AppError::StoreRead(format!("Corrupt tag registry: {}", e)))?
            .unwrap_or_default();
        Ok(record.tags)
    }

    /// Like `list`, but failures degrade to an empty set.
    pub async fn load_tags(&self) -> Vec<String> {
        match self.list().await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!("Failed to load tags: {}", e);
                Vec::new()
            }
        }
    }

    /// Add `tag` to the registry unless it is already there.
    ///
    /// Read-modify-write without a transaction: two clients adding different tags at
    /// the same moment can overwrite each other.
    pub async fn add_tag(&self, tag: &str) -> Result<(), AppError> {
        let current = self
            .store
            .get(METADATA_COLLECTION, TAG_REGISTRY_KEY)
            .await
            .map_err(as_write_error)?;

        match current {
            None => {
                let record = TagRegistryRecord {
                    tags: vec![tag.to_string()],
                };
                self.store
                    .set(
                        METADATA_COLLECTION,
                        TAG_REGISTRY_KEY,
                        serde_json::to_value(&record)?,
                    )
                    .await
                    .map_err(as_write_error)?;
            }
            Some(value) => {
                let mut record: TagRegistryRecord = serde_json::from_value(value)
                    .map_err(|e| AppError::StoreWrite(format!("Corrupt tag registry: {}", e)))?;
                if record.tags.iter().any(|t| t == tag) {
                    return Ok(());
                }
                record.tags.push(tag.to_string());
                self.store
                    .update_fields(
                        METADATA_COLLECTION,
                        TAG_REGISTRY_KEY,
                        json!({ "tags": record.tags }),
                    )
                    .await
                    .map_err(as_write_error)?;
            }
        }

        tracing::info!("Added tag {:?} to registry", tag);
        Ok(())
    }
}

/// A failed registry update surfaces as a write failure, whichever step broke.
fn as_write_error(err: AppError) -> AppError {
    match err {
        AppError::StoreWrite(_) => err,
        other => AppError::StoreWrite(other.message()),
    }
}
