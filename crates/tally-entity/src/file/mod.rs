//! Stored spreadsheet records and their lifecycle.

pub mod kind;
pub mod model;
pub mod status;

pub use kind::FileKind;
pub use model::FileRecord;
pub use status::{FileStatus, Transition};
