//! # tally-core
//!
//! Core crate for Tally. Contains the storage and clock traits,
//! configuration schemas, typed identifiers, pagination types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Tally crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
