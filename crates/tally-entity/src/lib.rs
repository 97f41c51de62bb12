//! # tally-entity
//!
//! Domain entity models for Tally. Every struct in this crate represents
//! a database table row or a domain value object. Database entities
//! derive `sqlx::FromRow`.

pub mod audit;
pub mod file;
