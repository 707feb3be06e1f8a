//! Tracked-record use-cases.
//!
//! # Responsibility
//! - Provide create/update/get/list/delete/restore/purge for every record kind.
//! - Check cross-record references before mutations.
//! - Orchestrate purge: attachment metadata and row go in one unit, bytes
//!   are removed once it has committed.
//!
//! # Invariants
//! - Validation (payload + references) runs before any write.
//! - The actor is always an explicit parameter.
//! - A purge never leaves attachment metadata behind for a removed row.

use crate::model::actor::ActorContext;
use crate::model::attachment::{Attachment, OwnerRef, Upload, UploadPolicy};
use crate::model::audit::{RecordId, Tracked};
use crate::repo::record_repo::{
    live_record_exists, ListQuery, RecordStore, RecordTable, TrashFilter,
};
use crate::service::attachment_service::{
    check_upload, commit_or_discard, delete_owner_metadata, remove_blobs, store_attachment,
};
use crate::service::error::{ServiceError, ServiceResult};
use crate::storage::BlobStore;
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::marker::PhantomData;

/// Outcome of a permanent purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub id: RecordId,
    pub attachments_removed: usize,
}

/// Use-case service for one record kind.
pub struct RecordService<'a, R, B: ?Sized> {
    conn: &'a Connection,
    blobs: &'a B,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: RecordTable, B: BlobStore + ?Sized> RecordService<'a, R, B> {
    pub fn new(conn: &'a Connection, blobs: &'a B) -> Self {
        Self {
            conn,
            blobs,
            _record: PhantomData,
        }
    }

    fn store(&self) -> RecordStore<'a, R> {
        RecordStore::new(self.conn)
    }

    pub fn create(&self, input: R::Input, actor: &ActorContext) -> ServiceResult<R> {
        let mut record = R::from_input(input);
        validate_record(self.conn, &record)?;
        self.store().create(&mut record, actor)?;

        info!(
            "event=record_create module=service status=ok kind={} id={} actor={}",
            R::KIND,
            record.id(),
            actor
        );
        Ok(record)
    }

    /// Creates a record together with its first attachment.
    ///
    /// When the file cannot be stored, the record insert is rolled back too.
    pub fn create_with_attachment(
        &self,
        input: R::Input,
        upload: Upload,
        policy: &UploadPolicy,
        actor: &ActorContext,
    ) -> ServiceResult<(R, Attachment)> {
        let mut record = R::from_input(input);
        let owner = OwnerRef::new(R::KIND, record.id());
        let extension = match (
            check_upload(policy, &owner, &upload),
            validate_record(self.conn, &record),
        ) {
            (Ok(extension), Ok(())) => extension,
            (upload_result, record_result) => {
                let mut errors = upload_result.err().unwrap_or_default();
                match record_result {
                    Ok(()) => {}
                    Err(ServiceError::Validation(record_errors)) => errors.merge(record_errors),
                    Err(other) => return Err(other),
                }
                return Err(errors.into());
            }
        };

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        RecordStore::<R>::new(&tx).create(&mut record, actor)?;
        let attachment = store_attachment(&tx, self.blobs, owner, &extension, upload, actor)?;
        commit_or_discard(tx, self.blobs, &attachment)?;

        info!(
            "event=record_create module=service status=ok kind={} id={} attachment_id={} actor={}",
            R::KIND,
            record.id(),
            attachment.id,
            actor
        );
        Ok((record, attachment))
    }

    /// Replaces payload fields of a live record.
    pub fn update(&self, id: RecordId, input: R::Input, actor: &ActorContext) -> ServiceResult<R> {
        let mut record = self.store().require(id, TrashFilter::Exclude)?;
        record.apply_input(input);
        validate_record(self.conn, &record)?;
        self.store().update(&mut record, actor)?;

        info!(
            "event=record_update module=service status=ok kind={} id={} actor={}",
            R::KIND,
            id,
            actor
        );
        Ok(record)
    }

    pub fn get(&self, id: RecordId, trashed: TrashFilter) -> ServiceResult<R> {
        Ok(self.store().require(id, trashed)?)
    }

    pub fn list(&self, query: &ListQuery) -> ServiceResult<Vec<R>> {
        Ok(self.store().list(query)?)
    }

    /// Soft-deletes a live record. Attachments are kept.
    pub fn delete(&self, id: RecordId, actor: &ActorContext) -> ServiceResult<R> {
        let record = self.store().soft_delete(id, actor)?;
        info!(
            "event=record_delete module=service status=ok kind={} id={} actor={}",
            R::KIND,
            id,
            actor
        );
        Ok(record)
    }

    /// Restores a trashed record; `NotFound` when missing or not trashed.
    pub fn restore(&self, id: RecordId) -> ServiceResult<R> {
        let record = self.store().restore(id)?;
        info!(
            "event=record_restore module=service status=ok kind={} id={}",
            R::KIND,
            id
        );
        Ok(record)
    }

    /// Permanently removes a record (live or trashed) and its attachments.
    pub fn force_delete(&self, id: RecordId) -> ServiceResult<PurgeReport> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let store = RecordStore::<R>::new(&tx);
        store.require(id, TrashFilter::With)?;

        let removed = delete_owner_metadata(&tx, OwnerRef::new(R::KIND, id))?;
        store.purge(id)?;
        tx.commit()?;
        let blobs_left = remove_blobs(self.blobs, &removed);
        let attachments_removed = removed.len();

        info!(
            "event=record_purge module=service status=ok kind={} id={} attachments_removed={} blobs_left={}",
            R::KIND,
            id,
            attachments_removed,
            blobs_left
        );
        Ok(PurgeReport {
            id,
            attachments_removed,
        })
    }
}

/// Payload validation plus live-reference checks.
fn validate_record<R: Tracked>(conn: &Connection, record: &R) -> ServiceResult<()> {
    let mut errors = record.validate().err().unwrap_or_default();
    for reference in record.references() {
        if !live_record_exists(conn, reference.kind, reference.id)? {
            errors.add(
                reference.field,
                format!("the selected {} does not exist", reference.kind),
            );
        }
    }
    Ok(errors.into_result()?)
}
