//! Create-activity editor: form fields, tag selection and submission.

use serde::Serialize;

use super::ActivityService;
use crate::errors::AppError;
use crate::identity::Identity;
use crate::models::{Activity, NewActivity, CATEGORIES};
use crate::normalize::normalize_optional;
use crate::tags::{TagManager, TagRegistry, TagWidget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Message shown after the last submit attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Render state of the editor.
#[derive(Debug, Clone, Serialize)]
pub struct EditorView {
    pub form: NewActivity,
    pub tags: TagWidget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// Draft of one activity plus its tag widget.
pub struct ActivityEditor {
    form: NewActivity,
    tags: TagManager,
    activities: ActivityService,
    notice: Option<Notice>,
}

impl ActivityEditor {
    /// New empty draft; loads the known tags once.
    pub async fn open(activities: ActivityService, registry: TagRegistry) -> Self {
        let mut tags = TagManager::new(registry);
        tags.load_tags().await;
        Self {
            form: NewActivity::default(),
            tags,
            activities,
            notice: None,
        }
    }

    pub fn form(&self) -> &NewActivity {
        &self.form
    }

    /// Replace the form fields. Tags are managed by the tag widget, so `form.tags` is ignored.
    pub fn set_form(&mut self, mut form: NewActivity) {
        form.tags.clear();
        self.form = form;
    }

    pub fn tags(&self) -> &TagManager {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagManager {
        &mut self.tags
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn view(&self) -> EditorView {
        EditorView {
            form: self.form.clone(),
            tags: self.tags.widget(),
            notice: self.notice.clone(),
        }
    }

    /// Submit the draft as a new activity.
    ///
    /// On success the form and tag selection reset. On failure everything is kept so
    /// the editor can retry.
    pub async fn submit(&mut self, author: &Identity) -> Result<Activity, AppError> {
        let result = match validate(&self.form) {
            Ok(()) => {
                let mut fields = self.form.clone();
                fields.tags = self.tags.selected().to_vec();
                fields.image_url = normalize_optional(fields.image_url.as_deref());
                self.activities.create_activity(fields, author).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => {
                self.form = NewActivity::default();
                self.tags.reset();
                self.notice = Some(Notice {
                    kind: NoticeKind::Success,
                    message: "Activity created successfully!".to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Error creating activity: {}", e);
                self.notice = Some(Notice {
                    kind: NoticeKind::Error,
                    message: format!("Failed to create activity: {}", e.message()),
                });
            }
        }

        result
    }
}

/// Required fields must be present; numbers must satisfy the activity invariants.
pub fn validate(form: &NewActivity) -> Result<(), AppError> {
    let required = [
        ("Title", &form.title),
        ("Description", &form.description),
        ("Location", &form.location),
        ("Date", &form.date),
        ("Time", &form.time),
        ("Category", &form.category),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} is required", label)));
        }
    }
    if !CATEGORIES.contains(&form.category.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown category: {}",
            form.category
        )));
    }

    if form.age_range.min > form.age_range.max {
        return Err(AppError::Validation(
            "Minimum age cannot exceed maximum age".to_string(),
        ));
    }
    if !form.price.is_finite() || form.price < 0.0 {
        return Err(AppError::Validation(
            "Price must be zero or more".to_string(),
        ));
    }

    Ok(())
}
