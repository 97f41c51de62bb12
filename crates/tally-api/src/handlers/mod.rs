//! HTTP request handlers, one module per domain.

pub mod admin;
pub mod file;
pub mod health;
