//! Library book records.

use crate::model::audit::{AuditStamp, EntityKind, RecordId, Tracked};
use crate::model::validation::{normalize_text, require_text, ValidationErrors};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{9}[\dX]|\d{13})$").expect("valid isbn regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryBook {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    /// Digits only (ISBN-10 may end in `X`); unique when present.
    pub isbn: Option<String>,
    pub copies: i64,
    #[serde(flatten)]
    pub audit: AuditStamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LibraryBookInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub copies: i64,
}

impl Tracked for LibraryBook {
    const KIND: EntityKind = EntityKind::LibraryBook;
    type Input = LibraryBookInput;

    fn id(&self) -> RecordId {
        self.id
    }

    fn audit(&self) -> &AuditStamp {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamp {
        &mut self.audit
    }

    fn from_input(input: LibraryBookInput) -> Self {
        let mut book = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            author: String::new(),
            isbn: None,
            copies: 0,
            audit: AuditStamp::default(),
        };
        book.apply_input(input);
        book
    }

    fn apply_input(&mut self, input: LibraryBookInput) {
        self.title = normalize_text(input.title);
        self.author = normalize_text(input.author);
        self.isbn = input.isbn.as_deref().and_then(normalize_isbn);
        self.copies = input.copies;
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "title", &self.title);
        require_text(&mut errors, "author", &self.author);
        if let Some(isbn) = self.isbn.as_deref() {
            if !ISBN_RE.is_match(isbn) {
                errors.add("isbn", "the isbn must have 10 or 13 digits");
            }
        }
        if self.copies < 0 {
            errors.add("copies", "the copies must be at least 0");
        }
        errors.into_result()
    }
}

/// Strips separators and uppercases a trailing check character.
pub fn normalize_isbn(value: &str) -> Option<String> {
    let normalized: String = value
        .chars()
        .filter(|ch| !matches!(ch, '-' | ' '))
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    (!normalized.is_empty()).then_some(normalized)
}
