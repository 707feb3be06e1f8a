//! Status workflow shared by document-like records.
//!
//! # Responsibility
//! - Define the fixed status set and its storage names.
//! - Format the one-line, timestamped entries of the free-text status log.
//!
//! # Invariants
//! - Every status can transition to every other status (including itself).
//! - One commented transition appends exactly one log line.
//! - Transitions without a (non-blank) comment leave the log untouched.

use crate::model::actor::ActorContext;
use crate::model::audit::Tracked;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
    Archived,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 5] = [
        DocumentStatus::Draft,
        DocumentStatus::Pending,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
        DocumentStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    /// Transition guard. Observed behavior accepts every pair.
    pub fn can_transition_to(self, _target: DocumentStatus) -> bool {
        true
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown status `{value}`"))
    }
}

/// Records that carry a workflow status and a free-text status log.
pub trait Statusful: Tracked {
    fn status(&self) -> DocumentStatus;
    fn set_status(&mut self, status: DocumentStatus);
    fn status_log(&self) -> &str;
    fn status_log_mut(&mut self) -> &mut String;
}

/// Formats the log line for one transition, or `None` for a blank comment.
pub fn status_log_line(
    from: DocumentStatus,
    to: DocumentStatus,
    comment: Option<&str>,
    actor: &ActorContext,
    now_ms: i64,
) -> Option<String> {
    let comment = collapse_whitespace(comment?);
    if comment.is_empty() {
        return None;
    }

    let timestamp = DateTime::from_timestamp_millis(now_ms)
        .map(|at| at.format(LOG_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| now_ms.to_string());
    Some(format!("[{timestamp}] {from} -> {to} by {actor}: {comment}"))
}

/// Appends one line to a newline-separated log.
pub fn append_log_line(log: &mut String, line: &str) {
    if !log.is_empty() {
        log.push('\n');
    }
    log.push_str(line);
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
