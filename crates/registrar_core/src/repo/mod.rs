//! Repository layer: persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Persist tracked records through one generic soft-delete store.
//! - Persist attachment metadata.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce `Tracked::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod attachment_repo;
pub mod record_repo;
mod tables;
