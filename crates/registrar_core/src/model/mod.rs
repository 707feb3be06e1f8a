//! Domain model for tracked academic records.
//!
//! # Responsibility
//! - Define records, their inputs and field validation.
//! - Provide the audit/ownership capability shared by every record.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Deletion is a soft-delete marker first; purge is a separate step.

pub mod actor;
pub mod attachment;
pub mod audit;
pub mod course;
pub mod document;
pub mod library_book;
pub mod publication;
pub mod status;
pub mod university;
pub mod validation;
