//! Activity model shared by the listing, the admin dashboard and the editor.

use serde::{Deserialize, Serialize};

/// Categories an activity can be filed under.
pub const CATEGORIES: [&str; 6] = ["sports", "arts", "music", "education", "outdoor", "other"];

/// Inclusive age bounds for an activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

/// A kids activity as stored and listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub age_range: AgeRange,
    pub price: f64,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: String,
    pub created_by: String,
}

/// The fields an editor supplies; the store and the session fill in the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub age_range: AgeRange,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Stored body of an activity document. The key lives outside the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(flatten)]
    pub fields: NewActivity,
    pub created_at: String,
    pub created_by: String,
}

impl ActivityRecord {
    pub fn into_activity(self, id: String) -> Activity {
        let NewActivity {
            title,
            description,
            location,
            age_range,
            price,
            date,
            time,
            category,
            tags,
            image_url,
        } = self.fields;

        Activity {
            id,
            title,
            description,
            location,
            age_range,
            price,
            date,
            time,
            category,
            tags,
            image_url,
            created_at: self.created_at,
            created_by: self.created_by,
        }
    }
}
