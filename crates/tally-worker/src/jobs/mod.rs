//! Built-in scheduled job implementations.

pub mod retention;
