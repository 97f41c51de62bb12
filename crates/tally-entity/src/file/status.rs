//! File status and the lifecycle transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing status of a stored record.
///
/// Fresh uploads start in [`FileStatus::Completed`] (the upload itself is
/// the completed unit of work). [`FileStatus::Pending`] is reserved for
/// deferred ingestion and no transition enters or leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Reserved; never produced by the current pipeline.
    Pending,
    /// Claimed by an in-flight aggregation run.
    Processing,
    /// Stored and idle; eligible for processing.
    Completed,
    /// The last aggregation run failed.
    Failed,
}

/// An event that moves a record between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A `process` call takes the single-flight claim.
    Claim,
    /// The transform and derived-record creation both succeeded.
    Succeed,
    /// The transform or the derived-record creation failed.
    Fail,
    /// An administrator sets the status directly.
    Override(FileStatus),
}

impl FileStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Resolve `transition` from this status.
    ///
    /// Returns `None` when the transition is not allowed. Every status is
    /// listed so adding a variant forces this table to be revisited.
    pub fn apply(self, transition: Transition) -> Option<FileStatus> {
        use FileStatus::*;
        use Transition::*;

        match (self, transition) {
            (Pending, _) => None,

            (Completed, Claim) => Some(Processing),
            (Completed, Override(target @ (Completed | Failed))) => Some(target),
            (Completed, Override(Pending | Processing)) => None,
            (Completed, Succeed | Fail) => None,

            (Processing, Succeed) => Some(Completed),
            (Processing, Fail) => Some(Failed),
            (Processing, Claim | Override(_)) => None,

            (Failed, Override(target @ (Completed | Failed))) => Some(target),
            (Failed, Override(Pending | Processing)) => None,
            (Failed, Claim | Succeed | Fail) => None,
        }
    }

    /// Whether `transition` is allowed from this status.
    pub fn can(self, transition: Transition) -> bool {
        self.apply(transition).is_some()
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
