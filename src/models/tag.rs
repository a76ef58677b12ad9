//! Tag registry record and tag request bodies.

use serde::{Deserialize, Serialize};

/// Collection holding application metadata records.
pub const METADATA_COLLECTION: &str = "metadata";

/// Key of the shared tag registry record.
pub const TAG_REGISTRY_KEY: &str = "tags";

/// The shared registry of known tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagRegistryRecord {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request body for committing a tag to the editor selection.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitTagRequest {
    pub tag: String,
}

/// Query string for tag suggestions.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}
