//! Ownership/audit stamps and the tracked-record capability.
//!
//! # Responsibility
//! - Hold the six audit columns shared by every tracked record.
//! - Apply creator/updater/deleter identity for each lifecycle step.
//!
//! # Invariants
//! - `created_by`/`created_at` are written once, on create.
//! - `deleted_by` and `deleted_at` are always written together.
//! - An anonymous actor never overwrites an existing identity.

use crate::model::actor::{ActorContext, ActorId};
use crate::model::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier of a tracked record.
pub type RecordId = Uuid;

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Entity categories managed by the registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    University,
    Course,
    Document,
    Publication,
    LibraryBook,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::University,
        EntityKind::Course,
        EntityKind::Document,
        EntityKind::Publication,
        EntityKind::LibraryBook,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::University => "university",
            Self::Course => "course",
            Self::Document => "document",
            Self::Publication => "publication",
            Self::LibraryBook => "library_book",
        }
    }

    /// Backing SQLite table.
    pub fn table(self) -> &'static str {
        match self {
            Self::University => "universities",
            Self::Course => "courses",
            Self::Document => "documents",
            Self::Publication => "publications",
            Self::LibraryBook => "library_books",
        }
    }

    /// Whether records of this kind may own file attachments.
    pub fn accepts_attachments(self) -> bool {
        matches!(self, Self::Document | Self::Publication)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "university" | "universities" => Ok(Self::University),
            "course" | "courses" => Ok(Self::Course),
            "document" | "documents" => Ok(Self::Document),
            "publication" | "publications" => Ok(Self::Publication),
            "library_book" | "library_books" | "book" | "books" => Ok(Self::LibraryBook),
            other => Err(format!("unknown entity kind `{other}`")),
        }
    }
}

/// Audit columns embedded in every tracked record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub created_by: Option<ActorId>,
    pub updated_by: Option<ActorId>,
    pub deleted_by: Option<ActorId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl AuditStamp {
    /// Stamps a record that is about to be inserted.
    pub fn stamp_created(&mut self, actor: &ActorContext, now_ms: i64) {
        self.created_by = actor.actor();
        self.updated_by = actor.actor();
        self.deleted_by = None;
        self.created_at = now_ms;
        self.updated_at = now_ms;
        self.deleted_at = None;
    }

    /// Stamps a record that is about to be rewritten.
    pub fn stamp_updated(&mut self, actor: &ActorContext, now_ms: i64) {
        if let Some(id) = actor.actor() {
            self.updated_by = Some(id);
        }
        self.updated_at = now_ms;
    }

    /// Stamps a record that is about to be soft-deleted.
    pub fn stamp_deleted(&mut self, actor: &ActorContext, now_ms: i64) {
        self.deleted_by = actor.actor();
        self.deleted_at = Some(now_ms);
    }

    /// Clears the deletion marker of a restored record.
    pub fn clear_deleted(&mut self, now_ms: i64) {
        self.deleted_by = None;
        self.deleted_at = None;
        self.updated_at = now_ms;
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A field of one record pointing at another tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub kind: EntityKind,
    pub id: RecordId,
}

/// Capability shared by every record that carries ownership/audit columns
/// and follows the soft-delete lifecycle.
pub trait Tracked: Sized {
    const KIND: EntityKind;

    /// Payload accepted by create and update calls.
    type Input;

    fn id(&self) -> RecordId;
    fn audit(&self) -> &AuditStamp;
    fn audit_mut(&mut self) -> &mut AuditStamp;

    /// Builds a new record with a freshly generated id and empty stamps.
    fn from_input(input: Self::Input) -> Self;

    /// Replaces payload fields; identity and stamps stay untouched.
    fn apply_input(&mut self, input: Self::Input);

    /// Field-level payload validation.
    fn validate(&self) -> Result<(), ValidationErrors>;

    /// Other records that must exist (and be live) for this one to be valid.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn is_trashed(&self) -> bool {
        self.audit().is_trashed()
    }
}
