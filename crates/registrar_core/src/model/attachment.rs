//! Attachment metadata and upload policy.
//!
//! # Responsibility
//! - Describe files bound to exactly one owning record.
//! - Check uploads against size and extension limits before any write.
//! - Derive collision-resistant stored names under a per-owner namespace.
//!
//! # Invariants
//! - `stored_path` is `<owner kind>/<owner id>/<uuid>.<ext>`.
//! - Stored extensions are lowercase and come from the allowlist.

use crate::model::actor::ActorId;
use crate::model::audit::{EntityKind, RecordId};
use crate::model::validation::{ValidationErrors, MAX_TEXT_LEN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type AttachmentId = Uuid;

/// Default upload cap (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default extension allowlist.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv", "jpg", "jpeg", "png", "zip",
];

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// The record that owns an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: EntityKind,
    pub id: RecordId,
}

impl OwnerRef {
    pub fn new(kind: EntityKind, id: RecordId) -> Self {
        Self { kind, id }
    }

    /// Storage namespace shared by all files of this owner.
    pub fn namespace(&self) -> String {
        format!("{}/{}", self.kind.as_str(), self.id)
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub owner_kind: EntityKind,
    pub owner_id: RecordId,
    pub stored_path: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    pub created_by: Option<ActorId>,
    pub created_at: i64,
}

impl Attachment {
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_kind, self.owner_id)
    }
}

/// An uploaded file that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub original_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Declared mime type, or `application/octet-stream`.
    pub fn effective_mime_type(&self) -> String {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string()
    }
}

/// Size and type limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub allowed_extensions: BTreeSet<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_UPLOAD_BYTES,
            DEFAULT_ALLOWED_EXTENSIONS.iter().copied(),
        )
    }
}

impl UploadPolicy {
    pub fn new<I, S>(max_bytes: u64, allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_bytes,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Validates an upload; returns the normalized extension on success.
    pub fn check(&self, upload: &Upload) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = upload.original_name.trim();

        if name.is_empty() {
            errors.add("file", "the file name is required");
        } else if name.chars().count() > MAX_TEXT_LEN {
            errors.add(
                "file",
                format!("the file name must not exceed {MAX_TEXT_LEN} characters"),
            );
        }

        if upload.bytes.is_empty() {
            errors.add("file", "the file must not be empty");
        } else if upload.size() > self.max_bytes {
            errors.add(
                "file",
                format!("the file must not be larger than {} bytes", self.max_bytes),
            );
        }

        let extension = file_extension(name);
        match extension.as_deref() {
            Some(ext) if self.allowed_extensions.contains(ext) => {}
            _ => errors.add(
                "file",
                format!(
                    "the file must be one of: {}",
                    self.allowed_extensions
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ),
        }

        errors.into_result()?;
        Ok(extension.unwrap_or_default())
    }
}

/// Lowercase extension of a file name, without the dot.
pub fn file_extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Generates a fresh storage key for one file of `owner`.
pub fn new_stored_path(owner: &OwnerRef, extension: &str) -> String {
    format!("{}/{}.{}", owner.namespace(), Uuid::new_v4(), extension)
}
