//! File attachment use-cases.
//!
//! # Responsibility
//! - Attach, list, download and detach files of a tracked record.
//! - Purge every attachment of an owner.
//!
//! # Invariants
//! - Upload policy checks run before any storage write.
//! - Metadata insert and byte write share one transaction that is committed
//!   only after the write succeeded (no orphan metadata).
//! - Removal commits the metadata delete first and touches bytes only
//!   afterwards. A failed byte removal leaves unreachable bytes, never
//!   metadata without bytes.

use crate::model::actor::ActorContext;
use crate::model::attachment::{
    new_stored_path, Attachment, AttachmentId, OwnerRef, Upload, UploadPolicy,
};
use crate::model::audit::now_epoch_ms;
use crate::model::validation::ValidationErrors;
use crate::repo::attachment_repo::AttachmentStore;
use crate::repo::record_repo::{live_record_exists, record_exists, TrashFilter};
use crate::service::error::{ServiceError, ServiceResult};
use crate::storage::{BlobError, BlobStore};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Attachment service over one connection and one content store.
pub struct AttachmentService<'a, B: ?Sized> {
    conn: &'a Connection,
    blobs: &'a B,
    policy: &'a UploadPolicy,
}

impl<'a, B: BlobStore + ?Sized> AttachmentService<'a, B> {
    pub fn new(conn: &'a Connection, blobs: &'a B, policy: &'a UploadPolicy) -> Self {
        Self {
            conn,
            blobs,
            policy,
        }
    }

    /// Stores one file for a live owner.
    pub fn attach(
        &self,
        owner: OwnerRef,
        upload: Upload,
        actor: &ActorContext,
    ) -> ServiceResult<Attachment> {
        let extension = check_upload(self.policy, &owner, &upload)?;
        if !live_record_exists(self.conn, owner.kind, owner.id)? {
            return Err(ServiceError::NotFound {
                kind: owner.kind,
                id: owner.id,
            });
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let attachment = store_attachment(&tx, self.blobs, owner, &extension, upload, actor)?;
        commit_or_discard(tx, self.blobs, &attachment)?;

        info!(
            "event=attachment_create module=service status=ok owner={} attachment_id={} size={} actor={}",
            owner, attachment.id, attachment.size, actor
        );
        Ok(attachment)
    }

    /// Lists attachments of an existing (live or trashed) owner.
    pub fn list(&self, owner: OwnerRef) -> ServiceResult<Vec<Attachment>> {
        if !record_exists(self.conn, owner.kind, owner.id, TrashFilter::With)? {
            return Err(ServiceError::NotFound {
                kind: owner.kind,
                id: owner.id,
            });
        }
        Ok(AttachmentStore::new(self.conn).list_for_owner(&owner)?)
    }

    pub fn get(&self, id: AttachmentId) -> ServiceResult<Attachment> {
        AttachmentStore::new(self.conn)
            .get(id)?
            .ok_or(ServiceError::AttachmentNotFound(id))
    }

    /// Returns metadata and stored bytes of one attachment.
    pub fn download(&self, id: AttachmentId) -> ServiceResult<(Attachment, Vec<u8>)> {
        let attachment = self.get(id)?;
        match self.blobs.get(&attachment.stored_path) {
            Ok(bytes) => Ok((attachment, bytes)),
            Err(BlobError::NotFound(_)) => {
                warn!(
                    "event=attachment_download module=service status=error attachment_id={} error_code=file_missing",
                    id
                );
                Err(ServiceError::FileMissing(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes one attachment: metadata row, then bytes.
    pub fn detach(&self, id: AttachmentId) -> ServiceResult<Attachment> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let store = AttachmentStore::new(&tx);
        let attachment = store.get(id)?.ok_or(ServiceError::AttachmentNotFound(id))?;
        store.delete(id)?;
        tx.commit()?;
        remove_blobs(self.blobs, std::slice::from_ref(&attachment));

        info!(
            "event=attachment_delete module=service status=ok owner={} attachment_id={}",
            attachment.owner(),
            id
        );
        Ok(attachment)
    }

    /// Removes every attachment of `owner` and returns how many went.
    pub fn purge_owner(&self, owner: OwnerRef) -> ServiceResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed = delete_owner_metadata(&tx, owner)?;
        tx.commit()?;
        remove_blobs(self.blobs, &removed);

        info!(
            "event=attachment_purge module=service status=ok owner={} removed={}",
            owner,
            removed.len()
        );
        Ok(removed.len())
    }
}

/// Policy and ownership checks shared by every attach path.
pub(crate) fn check_upload(
    policy: &UploadPolicy,
    owner: &OwnerRef,
    upload: &Upload,
) -> Result<String, ValidationErrors> {
    if !owner.kind.accepts_attachments() {
        return Err(ValidationErrors::single(
            "file",
            format!("a {} does not accept attachments", owner.kind),
        ));
    }
    policy.check(upload)
}

/// Inserts metadata and writes bytes inside the caller's transaction.
///
/// On write failure the metadata insert is rolled back together with the
/// caller's transaction when it is dropped.
pub(crate) fn store_attachment<B: BlobStore + ?Sized>(
    conn: &Connection,
    blobs: &B,
    owner: OwnerRef,
    extension: &str,
    upload: Upload,
    actor: &ActorContext,
) -> ServiceResult<Attachment> {
    let attachment = Attachment {
        id: Uuid::new_v4(),
        owner_kind: owner.kind,
        owner_id: owner.id,
        stored_path: new_stored_path(&owner, extension),
        original_name: upload.original_name.trim().to_string(),
        size: upload.size(),
        mime_type: upload.effective_mime_type(),
        created_by: actor.actor(),
        created_at: now_epoch_ms(),
    };

    AttachmentStore::new(conn).insert(&attachment)?;
    if let Err(err) = blobs.put(&attachment.stored_path, &upload.bytes) {
        error!(
            "event=attachment_write module=service status=error owner={} error_code=blob_write_failed error={}",
            owner, err
        );
        return Err(err.into());
    }
    Ok(attachment)
}

/// Commits; when the commit fails the freshly written bytes are discarded.
pub(crate) fn commit_or_discard<B: BlobStore + ?Sized>(
    tx: Transaction<'_>,
    blobs: &B,
    attachment: &Attachment,
) -> ServiceResult<()> {
    if let Err(err) = tx.commit() {
        if let Err(cleanup) = blobs.delete(&attachment.stored_path) {
            warn!(
                "event=attachment_discard module=service status=error attachment_id={} error={}",
                attachment.id, cleanup
            );
        }
        return Err(err.into());
    }
    Ok(())
}

/// Deletes the metadata rows of every attachment of `owner` inside the
/// caller's transaction and returns them for `remove_blobs`.
pub(crate) fn delete_owner_metadata(
    conn: &Connection,
    owner: OwnerRef,
) -> ServiceResult<Vec<Attachment>> {
    let store = AttachmentStore::new(conn);
    let attachments = store.list_for_owner(&owner)?;
    store.delete_for_owner(&owner)?;
    Ok(attachments)
}

/// Best-effort byte removal after the metadata delete has committed.
///
/// Returns how many blobs could not be removed; each failure is logged.
pub(crate) fn remove_blobs<B: BlobStore + ?Sized>(
    blobs: &B,
    attachments: &[Attachment],
) -> usize {
    let mut failed = 0;
    for attachment in attachments {
        match blobs.delete(&attachment.stored_path) {
            Ok(()) => {}
            Err(BlobError::NotFound(_)) => {
                warn!(
                    "event=attachment_blob_delete module=service status=skipped attachment_id={} reason=already_missing",
                    attachment.id
                );
            }
            Err(err) => {
                failed += 1;
                error!(
                    "event=attachment_blob_delete module=service status=error attachment_id={} key={} error={}",
                    attachment.id, attachment.stored_path, err
                );
            }
        }
    }
    failed
}
