//! Publication records: statusful and attachable.

use crate::model::audit::{AuditStamp, EntityKind, RecordId, Tracked};
use crate::model::status::{DocumentStatus, Statusful};
use crate::model::validation::{
    normalize_optional, normalize_text, optional_text, require_text, ValidationErrors,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: RecordId,
    pub title: String,
    /// Display form of the author list, e.g. `"Ada Lovelace, Alan Turing"`.
    pub authors: String,
    pub journal: Option<String>,
    pub published_on: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub status_log: String,
    #[serde(flatten)]
    pub audit: AuditStamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicationInput {
    pub title: String,
    pub authors: String,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub published_on: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
}

impl Tracked for Publication {
    const KIND: EntityKind = EntityKind::Publication;
    type Input = PublicationInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn from_input(input: PublicationInput) -> Self {
        let mut publication = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            authors: String::new(),
            journal: None,
            published_on: None,
            status: input.status.unwrap_or_default(),
            status_log: String::new(),
            audit: AuditStamp::default(),
        };
        publication.apply_input(input);
        publication
    }

    fn apply_input(&mut self, input: PublicationInput) {
        self.title = normalize_text(input.title);
        self.authors = normalize_text(input.authors);
        self.journal = normalize_optional(input.journal);
        self.published_on = input.published_on;
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "title", &self.title);
        require_text(&mut errors, "authors", &self.authors);
        optional_text(&mut errors, "journal", self.journal.as_deref());
        errors.into_result()
    }
}

impl Statusful for Publication {
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
