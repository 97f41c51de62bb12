//! Scheduled background tasks for Tally.
//!
//! This crate provides:
//! - The [`ScheduledJob`] trait implemented by periodic tasks
//! - A cron scheduler that runs registered jobs
//! - The daily retention sweep

pub mod executor;
pub mod jobs;
pub mod scheduler;

pub use executor::{JobExecutionError, ScheduledJob};
pub use jobs::retention::RetentionJob;
pub use scheduler::CronScheduler;
