//! Field-level validation errors and shared field rules.
//!
//! # Invariants
//! - Messages are grouped by field name; field order is stable (sorted).
//! - Validation never touches storage.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum length accepted for short text fields.
pub const MAX_TEXT_LEN: usize = 255;

/// Field-level validation failures collected before any mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("validation failed: {}", summarize(.fields))]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn summarize(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Requires a non-blank value of bounded length.
pub fn require_text(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("the {field} field is required"));
    } else if value.chars().count() > MAX_TEXT_LEN {
        errors.add(
            field,
            format!("the {field} field must not exceed {MAX_TEXT_LEN} characters"),
        );
    }
}

/// Bounds the length of an optional value.
pub fn optional_text(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if let Some(value) = value {
        if value.chars().count() > MAX_TEXT_LEN {
            errors.add(
                field,
                format!("the {field} field must not exceed {MAX_TEXT_LEN} characters"),
            );
        }
    }
}

/// Trims text input.
pub fn normalize_text(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

/// Trims optional input and maps blank values to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(normalize_text)
        .filter(|value| !value.is_empty())
}
