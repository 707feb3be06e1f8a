//! Course records. Every course belongs to one live university.

use crate::model::audit::{AuditStamp, EntityKind, RecordId, Reference, Tracked};
use crate::model::validation::{
    normalize_optional, normalize_text, optional_text, require_text, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound for `credits`.
pub const MAX_COURSE_CREDITS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: RecordId,
    pub university_id: RecordId,
    pub title: String,
    pub code: Option<String>,
    pub credits: Option<i64>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub audit: AuditStamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseInput {
    pub university_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub credits: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CourseInput {
    pub fn new(university_id: RecordId, title: impl Into<String>) -> Self {
        Self {
            university_id,
            title: title.into(),
            code: None,
            credits: None,
            description: None,
        }
    }
}

impl Tracked for Course {
    const KIND: EntityKind = EntityKind::Course;
    type Input = CourseInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn from_input(input: CourseInput) -> Self {
        let mut course = Self {
            id: Uuid::new_v4(),
            university_id: input.university_id,
            title: String::new(),
            code: None,
            credits: None,
            description: None,
            audit: AuditStamp::default(),
        };
        course.apply_input(input);
        course
    }

    fn apply_input(&mut self, input: CourseInput) {
        self.university_id = input.university_id;
        self.title = normalize_text(input.title);
        self.code = normalize_optional(input.code);
        self.credits = input.credits;
        self.description = normalize_optional(input.description);
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "title", &self.title);
        optional_text(&mut errors, "code", self.code.as_deref());
        if let Some(credits) = self.credits {
            if !(0..=MAX_COURSE_CREDITS).contains(&credits) {
                errors.add(
                    "credits",
                    format!("the credits must be between 0 and {MAX_COURSE_CREDITS}"),
                );
            }
        }
        errors.into_result()
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference {
            field: "university_id",
            kind: EntityKind::University,
            id: self.university_id,
        }]
    }
}
