//! Activity persistence, listing and the create-activity editor.

mod editor;

pub use editor::*;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::db::{Direction, DocumentStore};
use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::{Activity, ActivityRecord, NewActivity};
use crate::normalize::normalize_optional;

/// Collection holding activity documents.
pub const ACTIVITIES_COLLECTION: &str = "activities";

/// Field used to order listings.
const CREATED_AT_FIELD: &str = "createdAt";

/// Creates and lists activities in the document store.
#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn DocumentStore>,
    last_created_at: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl ActivityService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            last_created_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Persist a new activity authored by `author`.
    pub async fn create_activity(
        &self,
        fields: NewActivity,
        author: &Identity,
    ) -> Result<Activity, AppError> {
        let record = ActivityRecord {
            fields,
            created_at: self.next_created_at(),
            created_by: author.uid.clone(),
        };

        let body = serde_json::to_value(&record)
            .map_err(|e| AppError::StoreWrite(format!("Cannot encode activity: {}", e)))?;
        let id = self.store.create(ACTIVITIES_COLLECTION, body).await?;

        tracing::info!("Created activity {} ({:?})", id, record.fields.title);
        Ok(record.into_activity(id))
    }

    /// Every activity, newest first.
    pub async fn list_activities(&self) -> Result<Vec<Activity>, AppError> {
        let documents = self
            .store
            .list(ACTIVITIES_COLLECTION, CREATED_AT_FIELD, Direction::Descending)
            .await?;

        Ok(documents
            .filter_map(|doc| match serde_json::from_value::<ActivityRecord>(doc.data) {
                Ok(record) => Some(record.into_activity(doc.id)),
                Err(e) => {
                    tracing::warn!("Skipping unreadable activity {}: {}", doc.id, e);
                    None
                }
            })
            .collect())
    }

    /// Listing for display: image URLs normalized, failures degrade to an empty list.
    pub async fn listing(&self) -> Vec<Activity> {
        match self.list_activities().await {
            Ok(activities) => activities
                .into_iter()
                .map(|mut activity| {
                    activity.image_url = normalize_optional(activity.image_url.as_deref());
                    activity
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Error fetching activities: {}", e);
                Vec::new()
            }
        }
    }

    /// Creation timestamp, strictly after the previous one from this service.
    fn next_created_at(&self) -> String {
        let mut last = self
            .last_created_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let next = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        next.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}
