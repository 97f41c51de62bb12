//! Administrative file console.

pub mod service;

pub use service::{AdminFileService, AdminStats, CleanupSettings, UpdateFileRecord};
