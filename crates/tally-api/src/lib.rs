//! # tally-api
//!
//! HTTP API layer for Tally built on Axum.
//!
//! Provides the REST endpoints for uploads, processing, history, and the
//! administrative console, plus the principal extractor, DTOs, and the
//! mapping from domain errors to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
