//! Append-only audit trail entries.

pub mod model;

pub use model::{Actor, AuditLogEntry, CreateAuditLogEntry, actions, targets};
