//! Document records: statusful and attachable.

use crate::model::audit::{AuditStamp, EntityKind, RecordId, Tracked};
use crate::model::status::{DocumentStatus, Statusful};
use crate::model::validation::{
    normalize_optional, normalize_text, require_text, ValidationErrors,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound for the free-text description.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub status: DocumentStatus,
    pub due_date: Option<NaiveDate>,
    /// Newline-separated, timestamped transition comments.
    pub status_log: String,
    #[serde(flatten)]
    pub audit: AuditStamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Honored on create only; later changes go through the workflow.
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl DocumentInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Tracked for Document {
    const KIND: EntityKind = EntityKind::Document;
    type Input = DocumentInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn from_input(input: DocumentInput) -> Self {
        let mut document = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            description: None,
            status: input.status.unwrap_or_default(),
            due_date: None,
            status_log: String::new(),
            audit: AuditStamp::default(),
        };
        document.apply_input(input);
        document
    }

    fn apply_input(&mut self, input: DocumentInput) {
        self.title = normalize_text(input.title);
        self.description = normalize_optional(input.description);
        self.due_date = input.due_date;
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "title", &self.title);
        if let Some(description) = self.description.as_deref() {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                errors.add(
                    "description",
                    format!("the description must not exceed {MAX_DESCRIPTION_LEN} characters"),
                );
            }
        }
        errors.into_result()
    }
}

impl Statusful for Document {
    fn status(&self) -> DocumentStatus {
        self.status
    }

    fn set_status(&mut self, status: DocumentStatus) {
        self.status = status;
    }

    fn status_log(&self) -> &str {
        &self.status_log
    }

    fn status_log_mut(&mut self) -> &mut String {
        &mut self.status_log
    }
}
