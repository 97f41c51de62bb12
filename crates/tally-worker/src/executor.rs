//! Scheduled job contract.

use async_trait::async_trait;
use serde_json::Value;

use tally_core::error::AppError;

/// A task the scheduler runs on a cron schedule.
#[async_trait]
pub trait ScheduledJob: Send + Sync + std::fmt::Debug + 'static {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Six-field cron expression (`sec min hour day month weekday`), UTC.
    fn schedule(&self) -> String;

    /// Run the job once and describe what it did.
    async fn run(&self) -> Result<Value, JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The previous run of the same job has not finished.
    #[error("Job '{0}' is still running")]
    Overlap(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}
