//! # tally-storage
//!
//! Storage provider implementations for Tally and the key layout used
//! for uploaded and derived spreadsheets.

pub mod layout;
pub mod providers;

pub use layout::artifact_path;
pub use providers::local::LocalStorageProvider;
pub use providers::memory::MemoryStorageProvider;
