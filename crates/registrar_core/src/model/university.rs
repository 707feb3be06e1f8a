//! University records.

use crate::model::audit::{AuditStamp, EntityKind, RecordId, Tracked};
use crate::model::validation::{
    normalize_optional, normalize_text, optional_text, require_text, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct University {
    pub id: RecordId,
    /// Unique across live and trashed rows.
    pub name: String,
    pub code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    #[serde(flatten)]
    pub audit: AuditStamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UniversityInput {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl UniversityInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Tracked for University {
    const KIND: EntityKind = EntityKind::University;
    type Input = UniversityInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn from_input(input: UniversityInput) -> Self {
        let mut university = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            code: None,
            country: None,
            website: None,
            audit: AuditStamp::default(),
        };
        university.apply_input(input);
        university
    }

    fn apply_input(&mut self, input: UniversityInput) {
        self.name = normalize_text(input.name);
        self.code = normalize_optional(input.code);
        self.country = normalize_optional(input.country);
        self.website = normalize_optional(input.website);
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "name", &self.name);
        optional_text(&mut errors, "code", self.code.as_deref());
        optional_text(&mut errors, "country", self.country.as_deref());
        optional_text(&mut errors, "website", self.website.as_deref());
        if let Some(website) = self.website.as_deref() {
            if !(website.starts_with("http://") || website.starts_with("https://")) {
                errors.add("website", "the website must be an http(s) URL");
            }
        }
        errors.into_result()
    }
}
