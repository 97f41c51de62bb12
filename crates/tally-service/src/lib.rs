//! # tally-service
//!
//! Business logic layer. Services follow constructor injection: all
//! dependencies (repositories, storage, clock, claim registry) are handed
//! in as `Arc`s at construction time so the same services run against
//! PostgreSQL in production and in-memory repositories in tests.

pub mod admin;
pub mod audit;
pub mod claim;
pub mod context;
pub mod file;

mod blocking;

#[cfg(test)]
pub(crate) mod testing;

pub use admin::{AdminFileService, AdminStats, CleanupSettings, UpdateFileRecord};
pub use audit::AuditTrail;
pub use claim::{ClaimGuard, ClaimRegistry};
pub use context::{Principal, Role};
pub use file::{
    BatchDeleteResult, CleanupResult, DeletedFile, Download, FileQueryService, LifecycleController,
    LifecycleSettings, PhysicalDelete, Preview, ProcessOutcome, Upload,
};
