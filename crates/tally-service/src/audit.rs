//! Audit trail writer.

use std::sync::Arc;

use tracing::{error, info};

use tally_core::result::AppResult;
use tally_core::traits::Clock;
use tally_database::repositories::FileTransaction;
use tally_entity::audit::{AuditLogEntry, CreateAuditLogEntry};

/// Stamps and appends audit entries inside the transaction carrying the
/// change they describe.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    /// Timestamps entries.
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    /// Creates a new audit trail.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Append one entry stamped with the current time. The entry becomes
    /// visible only when `tx` commits.
    pub async fn record(
        &self,
        tx: &mut dyn FileTransaction,
        entry: CreateAuditLogEntry,
    ) -> AppResult<AuditLogEntry> {
        let stored = tx
            .append_audit(&entry, self.clock.now())
            .await
            .inspect_err(|e| {
                error!(
                    action = %entry.action,
                    target_id = %entry.target_id,
                    "Failed to write audit entry: {e}"
                );
            })?;

        info!(
            actor = %stored.actor,
            action = %stored.action,
            target_type = %stored.target_type,
            target_id = %stored.target_id,
            "Audit entry staged"
        );
        Ok(stored)
    }
}
