//! Generic soft-delete record store over SQLite.
//!
//! # Responsibility
//! - Persist every tracked record kind through one code path.
//! - Apply audit stamps on every mutation (create/update/delete/restore).
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Tracked::validate()` before SQL mutations.
//! - Update statements never write `created_by`/`created_at`.
//! - Default reads exclude soft-deleted rows.
//! - Unique/foreign-key violations surface as `RepoError::Conflict`.

use crate::db::DbError;
use crate::model::actor::ActorContext;
use crate::model::attachment::AttachmentId;
use crate::model::audit::{now_epoch_ms, AuditStamp, EntityKind, RecordId, Tracked};
use crate::model::validation::ValidationErrors;
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const AUDIT_COLUMNS: &[&str] = &[
    "created_by",
    "updated_by",
    "deleted_by",
    "created_at",
    "updated_at",
    "deleted_at",
];

const LIST_DEFAULT_LIMIT: u32 = 25;
const LIST_LIMIT_MAX: u32 = 100;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record and attachment persistence.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: RecordId },
    #[error("attachment not found: {0}")]
    AttachmentNotFound(AttachmentId),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Visibility of soft-deleted rows in reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashFilter {
    /// Live rows only.
    #[default]
    Exclude,
    /// Live and trashed rows.
    With,
    /// Trashed rows only.
    Only,
}

impl TrashFilter {
    fn sql(self) -> &'static str {
        match self {
            Self::Exclude => " AND deleted_at IS NULL",
            Self::With => "",
            Self::Only => " AND deleted_at IS NOT NULL",
        }
    }
}

impl FromStr for TrashFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "exclude" | "none" => Ok(Self::Exclude),
            "with" | "all" => Ok(Self::With),
            "only" => Ok(Self::Only),
            other => Err(format!(
                "unsupported trashed filter `{other}`; expected exclude|with|only"
            )),
        }
    }
}

/// Query options for listing records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub trashed: TrashFilter,
    /// Defaults to 25 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Normalizes list limit: `None`/`0` use the default, large values clamp.
pub fn normalize_list_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => LIST_DEFAULT_LIMIT,
        Some(value) if value > LIST_LIMIT_MAX => LIST_LIMIT_MAX,
        Some(value) => value,
    }
}

/// Column mapping for one tracked record kind.
///
/// `COLUMNS` lists payload columns only; `id` and the audit columns are
/// handled by the store.
pub trait RecordTable: Tracked {
    const COLUMNS: &'static [&'static str];

    /// Payload values in `COLUMNS` order.
    fn column_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// SQLite-backed store for one record kind.
pub struct RecordStore<'conn, R> {
    conn: &'conn Connection,
    _record: PhantomData<fn() -> R>,
}

impl<'conn, R: RecordTable> RecordStore<'conn, R> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _record: PhantomData,
        }
    }

    /// Stamps creator identity and inserts a new row.
    pub fn create(&self, record: &mut R, actor: &ActorContext) -> RepoResult<()> {
        record.validate()?;
        record.audit_mut().stamp_created(actor, now_epoch_ms());

        let columns = std::iter::once("id")
            .chain(R::COLUMNS.iter().copied())
            .chain(AUDIT_COLUMNS.iter().copied())
            .collect::<Vec<_>>();
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            R::KIND.table(),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut values = vec![Value::Text(record.id().to_string())];
        values.extend(record.column_values());
        values.extend(audit_values(record.audit()));

        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| map_write_error(err, R::KIND, WriteKind::Upsert))?;
        Ok(())
    }

    /// Stamps updater identity and rewrites payload columns of a live row.
    pub fn update(&self, record: &mut R, actor: &ActorContext) -> RepoResult<()> {
        record.validate()?;
        record.audit_mut().stamp_updated(actor, now_epoch_ms());

        let mut assignments = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>();
        let next = R::COLUMNS.len();
        assignments.push(format!("updated_by = ?{}", next + 1));
        assignments.push(format!("updated_at = ?{}", next + 2));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{} AND deleted_at IS NULL;",
            R::KIND.table(),
            assignments.join(", "),
            next + 3
        );

        let mut values = record.column_values();
        values.push(optional_integer(record.audit().updated_by));
        values.push(Value::Integer(record.audit().updated_at));
        values.push(Value::Text(record.id().to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| map_write_error(err, R::KIND, WriteKind::Upsert))?;
        if changed == 0 {
            return Err(not_found::<R>(record.id()));
        }
        Ok(())
    }

    pub fn find(&self, id: RecordId, trashed: TrashFilter) -> RepoResult<Option<R>> {
        let sql = format!("{} WHERE id = ?1{};", select_sql::<R>(), trashed.sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(R::from_row(row)?));
        }
        Ok(None)
    }

    /// Like `find`, but a missing row is `RepoError::NotFound`.
    pub fn require(&self, id: RecordId, trashed: TrashFilter) -> RepoResult<R> {
        self.find(id, trashed)?.ok_or_else(|| not_found::<R>(id))
    }

    pub fn list(&self, query: &ListQuery) -> RepoResult<Vec<R>> {
        let sql = format!(
            "{} WHERE 1 = 1{} ORDER BY updated_at DESC, id ASC LIMIT ?1 OFFSET ?2;",
            select_sql::<R>(),
            query.trashed.sql()
        );
        let limit = normalize_list_limit(query.limit);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![i64::from(limit), i64::from(query.offset)])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(R::from_row(row)?);
        }
        Ok(records)
    }

    /// Marks a live row deleted, stamping deleter identity.
    pub fn soft_delete(&self, id: RecordId, actor: &ActorContext) -> RepoResult<R> {
        let mut record = self.require(id, TrashFilter::Exclude)?;
        record.audit_mut().stamp_deleted(actor, now_epoch_ms());

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET deleted_by = ?1, deleted_at = ?2
                 WHERE id = ?3 AND deleted_at IS NULL;",
                R::KIND.table()
            ),
            params![
                record.audit().deleted_by,
                record.audit().deleted_at,
                id.to_string()
            ],
        )?;
        if changed == 0 {
            return Err(not_found::<R>(id));
        }
        Ok(record)
    }

    /// Clears the deletion marker of a trashed row.
    pub fn restore(&self, id: RecordId) -> RepoResult<R> {
        let mut record = self.require(id, TrashFilter::Only)?;
        record.audit_mut().clear_deleted(now_epoch_ms());

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET deleted_by = NULL, deleted_at = NULL, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NOT NULL;",
                R::KIND.table()
            ),
            params![record.audit().updated_at, id.to_string()],
        )?;
        if changed == 0 {
            return Err(not_found::<R>(id));
        }
        Ok(record)
    }

    /// Physically removes a row, live or trashed.
    ///
    /// Attachment cleanup is the caller's job; see `RecordService::force_delete`.
    pub fn purge(&self, id: RecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1;", R::KIND.table()),
                [id.to_string()],
            )
            .map_err(|err| map_write_error(err, R::KIND, WriteKind::Delete))?;
        if changed == 0 {
            return Err(not_found::<R>(id));
        }
        Ok(())
    }
}

/// Returns whether a record of `kind` exists and is not soft-deleted.
pub fn live_record_exists(conn: &Connection, kind: EntityKind, id: RecordId) -> RepoResult<bool> {
    record_exists(conn, kind, id, TrashFilter::Exclude)
}

pub fn record_exists(
    conn: &Connection,
    kind: EntityKind,
    id: RecordId,
    trashed: TrashFilter,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1{});",
            kind.table(),
            trashed.sql()
        ),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Reads the `id` column of a record row.
pub fn read_id(row: &Row<'_>, kind: EntityKind) -> RepoResult<RecordId> {
    let text: String = row.get("id")?;
    parse_uuid(&text, kind.table(), "id")
}

/// Reads the audit columns of a record row.
pub fn read_audit(row: &Row<'_>) -> RepoResult<AuditStamp> {
    Ok(AuditStamp {
        created_by: row.get("created_by")?,
        updated_by: row.get("updated_by")?,
        deleted_by: row.get("deleted_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, table: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {table}.{column}")))
}

pub(crate) fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

pub(crate) fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn audit_values(audit: &AuditStamp) -> Vec<Value> {
    vec![
        optional_integer(audit.created_by),
        optional_integer(audit.updated_by),
        optional_integer(audit.deleted_by),
        Value::Integer(audit.created_at),
        Value::Integer(audit.updated_at),
        optional_integer(audit.deleted_at),
    ]
}

fn select_sql<R: RecordTable>() -> String {
    let columns = std::iter::once("id")
        .chain(R::COLUMNS.iter().copied())
        .chain(AUDIT_COLUMNS.iter().copied())
        .collect::<Vec<_>>();
    format!("SELECT {} FROM {}", columns.join(", "), R::KIND.table())
}

fn not_found<R: RecordTable>(id: RecordId) -> RepoError {
    RepoError::NotFound { kind: R::KIND, id }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Upsert,
    Delete,
}

fn map_write_error(err: rusqlite::Error, kind: EntityKind, write: WriteKind) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    let field = message
                        .as_deref()
                        .and_then(|text| text.rsplit('.').next())
                        .unwrap_or("key");
                    return RepoError::Conflict(format!(
                        "a {kind} with the same {field} already exists"
                    ));
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY if write == WriteKind::Delete => {
                    return RepoError::Conflict(format!(
                        "the {kind} is still referenced by other records"
                    ));
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return RepoError::Conflict(format!(
                        "the {kind} references a record that does not exist"
                    ));
                }
                _ => {}
            }
        }
    }
    err.into()
}
