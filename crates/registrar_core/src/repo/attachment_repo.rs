//! Attachment metadata persistence.
//!
//! # Responsibility
//! - Store and query metadata rows of files bound to tracked records.
//!
//! # Invariants
//! - Metadata rows never outlive their owner record (purge removes both).
//! - This module never touches file bytes; see `storage`.

use crate::model::attachment::{Attachment, AttachmentId, OwnerRef};
use crate::model::audit::EntityKind;
use crate::repo::record_repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ATTACHMENT_SELECT_SQL: &str = "SELECT
    id,
    owner_kind,
    owner_id,
    stored_path,
    original_name,
    size,
    mime_type,
    created_by,
    created_at
FROM attachments";

/// SQLite-backed attachment metadata store.
pub struct AttachmentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AttachmentStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, attachment: &Attachment) -> RepoResult<()> {
        let size = i64::try_from(attachment.size).map_err(|_| {
            RepoError::InvalidData(format!("attachment size {} out of range", attachment.size))
        })?;
        self.conn.execute(
            "INSERT INTO attachments (
                id,
                owner_kind,
                owner_id,
                stored_path,
                original_name,
                size,
                mime_type,
                created_by,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                attachment.id.to_string(),
                attachment.owner_kind.as_str(),
                attachment.owner_id.to_string(),
                attachment.stored_path.as_str(),
                attachment.original_name.as_str(),
                size,
                attachment.mime_type.as_str(),
                attachment.created_by,
                attachment.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: AttachmentId) -> RepoResult<Option<Attachment>> {
        self.conn
            .query_row(
                &format!("{ATTACHMENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_attachment_row(row)),
            )
            .optional()?
            .transpose()
    }

    /// Attachments of one owner, oldest first.
    pub fn list_for_owner(&self, owner: &OwnerRef) -> RepoResult<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTACHMENT_SELECT_SQL}
             WHERE owner_kind = ?1 AND owner_id = ?2
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![owner.kind.as_str(), owner.id.to_string()])?;
        let mut attachments = Vec::new();
        while let Some(row) = rows.next()? {
            attachments.push(parse_attachment_row(row)?);
        }
        Ok(attachments)
    }

    pub fn count_for_owner(&self, owner: &OwnerRef) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM attachments WHERE owner_kind = ?1 AND owner_id = ?2;",
            params![owner.kind.as_str(), owner.id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.unsigned_abs())
    }

    /// Deletes one metadata row; `AttachmentNotFound` when absent.
    pub fn delete(&self, id: AttachmentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM attachments WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::AttachmentNotFound(id));
        }
        Ok(())
    }

    /// Deletes all metadata rows of one owner and returns how many went.
    pub fn delete_for_owner(&self, owner: &OwnerRef) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM attachments WHERE owner_kind = ?1 AND owner_id = ?2;",
            params![owner.kind.as_str(), owner.id.to_string()],
        )?;
        Ok(changed)
    }
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<Attachment> {
    let id: String = row.get("id")?;
    let owner_kind_text: String = row.get("owner_kind")?;
    let owner_kind = owner_kind_text.parse::<EntityKind>().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid owner kind `{owner_kind_text}` in attachments.owner_kind"
        ))
    })?;
    let owner_id: String = row.get("owner_id")?;
    let size: i64 = row.get("size")?;
    let size = u64::try_from(size).map_err(|_| {
        RepoError::InvalidData(format!("invalid size `{size}` in attachments.size"))
    })?;

    Ok(Attachment {
        id: parse_uuid(&id, "attachments", "id")?,
        owner_kind,
        owner_id: parse_uuid(&owner_id, "attachments", "owner_id")?,
        stored_path: row.get("stored_path")?,
        original_name: row.get("original_name")?,
        size,
        mime_type: row.get("mime_type")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
    })
}
