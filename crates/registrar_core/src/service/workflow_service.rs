//! Status transitions of document-like records.
//!
//! # Responsibility
//! - Move a live statusful record to a target status.
//! - Append the optional comment to the record's status log.
//!
//! # Invariants
//! - Trashed or missing records are `NotFound`.
//! - `DocumentStatus::can_transition_to` is consulted before any write.
//! - A transition writes status, log and updater identity in one statement.

use crate::model::actor::ActorContext;
use crate::model::audit::{now_epoch_ms, RecordId};
use crate::model::status::{append_log_line, status_log_line, DocumentStatus, Statusful};
use crate::repo::record_repo::{RecordStore, RecordTable, TrashFilter};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use rusqlite::Connection;
use std::marker::PhantomData;

pub struct WorkflowService<'a, R> {
    conn: &'a Connection,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Statusful + RecordTable> WorkflowService<'a, R> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            _record: PhantomData,
        }
    }

    /// Applies one transition and returns the updated record.
    pub fn transition(
        &self,
        id: RecordId,
        target: DocumentStatus,
        comment: Option<&str>,
        actor: &ActorContext,
    ) -> ServiceResult<R> {
        let store = RecordStore::<R>::new(self.conn);
        let mut record = store.require(id, TrashFilter::Exclude)?;
        let from = record.status();
        if !from.can_transition_to(target) {
            return Err(ServiceError::Conflict(format!(
                "a {} cannot move from {from} to {target}",
                R::KIND
            )));
        }

        let logged = match status_log_line(from, target, comment, actor, now_epoch_ms()) {
            Some(line) => {
                append_log_line(record.status_log_mut(), &line);
                true
            }
            None => false,
        };
        record.set_status(target);
        store.update(&mut record, actor)?;

        info!(
            "event=status_transition module=service status=ok kind={} id={} from={} to={} logged={} actor={}",
            R::KIND,
            id,
            from,
            target,
            logged,
            actor
        );
        Ok(record)
    }
}
