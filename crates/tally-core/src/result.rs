//! Convenience result type alias for Tally.

use crate::error::AppError;

/// A specialized `Result` type for Tally operations.
pub type AppResult<T> = Result<T, AppError>;
