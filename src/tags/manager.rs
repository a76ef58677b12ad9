//! Tag selection state for one activity editor.

use std::collections::BTreeSet;

use serde::Serialize;

use super::TagRegistry;
use crate::errors::AppError;

/// Snapshot of the tag widget, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWidget {
    pub input: String,
    pub suggestions: Vec<String>,
    pub show_suggestions: bool,
    pub selected: Vec<String>,
}

/// Known tags, suggestions and the selection for one activity being edited.
pub struct TagManager {
    registry: TagRegistry,
    known: BTreeSet<String>,
    selected: Vec<String>,
    input: String,
    suggestions: Vec<String>,
}

impl TagManager {
    pub fn new(registry: TagRegistry) -> Self {
        Self {
            registry,
            known: BTreeSet::new(),
            selected: Vec::new(),
            input: String::new(),
            suggestions: Vec::new(),
        }
    }

    /// Fetch the registry into the known set. Failures leave it empty.
    pub async fn load_tags(&mut self) {
        self.known = self.registry.load_tags().await.into_iter().collect();
    }

    /// Record new input and recompute suggestions.
    ///
    /// A suggestion is any known tag containing the trimmed input, ignoring case.
    pub fn on_input_change(&mut self, partial: &str) -> &[String] {
        self.input = partial.to_string();

        let needle = partial.trim().to_lowercase();
        self.suggestions = if needle.is_empty() {
            Vec::new()
        } else {
            self.known
                .iter()
                .filter(|tag| tag.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        };

        &self.suggestions
    }

    /// Add a tag to the selection, registering it first if it is new.
    ///
    /// Returns `Ok(false)` when nothing changed. A failed registry write leaves the
    /// selection and the input untouched.
    pub async fn commit_tag(&mut self, candidate: &str) -> Result<bool, AppError> {
        let tag = candidate.trim();
        if tag.is_empty() || self.is_selected(tag) {
            return Ok(false);
        }

        if !self.known.contains(tag) {
            self.registry.add_tag(tag).await?;
            self.known.insert(tag.to_string());
        }

        self.selected.push(tag.to_string());
        self.input.clear();
        self.suggestions.clear();
        Ok(true)
    }

    /// Commit whatever is in the input box.
    pub async fn confirm(&mut self) -> Result<bool, AppError> {
        let candidate = self.input.clone();
        self.commit_tag(&candidate).await
    }

    /// Drop a tag from the selection. Returns whether it was selected.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|t| t != tag);
        self.selected.len() != before
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.selected.iter().any(|t| t == tag)
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn known(&self) -> impl Iterator<Item = &String> {
        self.known.iter()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Empty the selection and input; known tags stay loaded.
    pub fn reset(&mut self) {
        self.selected.clear();
        self.input.clear();
        self.suggestions.clear();
    }

    pub fn widget(&self) -> TagWidget {
        TagWidget {
            input: self.input.clone(),
            suggestions: self.suggestions.clone(),
            show_suggestions: !self.suggestions.is_empty(),
            selected: self.selected.clone(),
        }
    }
}
