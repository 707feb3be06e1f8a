//! Core domain logic for Registrar.
//! This crate is the single source of truth for record lifecycle invariants:
//! audit stamps, soft delete, attachments and the status workflow.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::actor::{ActorContext, ActorId};
pub use model::attachment::{Attachment, AttachmentId, OwnerRef, Upload, UploadPolicy};
pub use model::audit::{AuditStamp, EntityKind, RecordId, Tracked};
pub use model::course::{Course, CourseInput};
pub use model::document::{Document, DocumentInput};
pub use model::library_book::{LibraryBook, LibraryBookInput};
pub use model::publication::{Publication, PublicationInput};
pub use model::status::{DocumentStatus, Statusful};
pub use model::university::{University, UniversityInput};
pub use model::validation::ValidationErrors;
pub use repo::record_repo::{ListQuery, RecordTable, RepoError, TrashFilter};
pub use service::attachment_service::AttachmentService;
pub use service::error::{ServiceError, ServiceResult};
pub use service::record_service::{PurgeReport, RecordService};
pub use service::workflow_service::WorkflowService;
pub use storage::{BlobError, BlobStore, FsBlobStore, MemoryBlobStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
