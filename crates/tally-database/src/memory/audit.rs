//! In-memory audit trail.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_entity::audit::AuditLogEntry;

/// Audit entries in commit order, shared with the repository that writes
/// them.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditLogEntry>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed entry, oldest first.
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().await.clone()
    }

    /// Make every later append fail, as a broken audit table would.
    pub fn fail_appends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn check_append(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::database("Failed to append audit entry"));
        }
        Ok(())
    }

    pub(crate) async fn extend(&self, staged: Vec<AuditLogEntry>) {
        self.entries.lock().await.extend(staged);
    }
}
