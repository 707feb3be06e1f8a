//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and blob-store calls into use-case level APIs.
//! - Keep HTTP/CLI layers decoupled from storage details.

pub mod attachment_service;
pub mod error;
pub mod record_service;
pub mod workflow_service;
