//! # tally-database
//!
//! PostgreSQL connection management, migrations, and the repositories for
//! file records and the audit trail. Every repository trait has a
//! PostgreSQL implementation and an in-memory one.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use memory::{MemoryAuditLog, MemoryFileRecordRepository, MemoryFileTransaction};
pub use repositories::{
    FileFilter, FileRecordRepository, FileStats, FileTransaction, PgFileRecordRepository,
    PgFileTransaction,
};
