//! Core traits defined in `tally-core` and implemented by other crates.

pub mod clock;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use storage::StorageProvider;
