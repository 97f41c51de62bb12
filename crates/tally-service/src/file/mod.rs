//! File lifecycle and owner-facing queries.

pub mod ingest;
pub mod lifecycle;
pub mod query;
pub mod retention;

pub use ingest::Upload;
pub use lifecycle::{
    BatchDeleteResult, DeletedFile, LifecycleController, LifecycleSettings, PhysicalDelete,
    ProcessOutcome,
};
pub use query::{Download, FileQueryService, Preview};
pub use retention::CleanupResult;
