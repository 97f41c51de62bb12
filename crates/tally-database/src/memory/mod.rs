//! In-memory repositories.
//!
//! Used by the in-memory server mode and by tests. Rows live behind one
//! async mutex; a transaction holds it until commit or drop.

pub mod audit;
pub mod file;

pub use audit::MemoryAuditLog;
pub use file::{MemoryFileRecordRepository, MemoryFileTransaction};
