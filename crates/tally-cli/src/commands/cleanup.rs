//! Retention sweep commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use tally_core::error::AppError;
use tally_core::traits::SystemClock;
use tally_database::PgFileRecordRepository;
use tally_entity::audit::Actor;
use tally_service::{AuditTrail, ClaimRegistry, CleanupResult, LifecycleController, LifecycleSettings};
use tally_storage::LocalStorageProvider;

use crate::output::{self, OutputFormat};

/// Arguments for cleanup commands
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Cleanup subcommand
    #[command(subcommand)]
    pub command: CleanupCommand,
}

/// Cleanup subcommands
#[derive(Debug, Subcommand)]
pub enum CleanupCommand {
    /// Run one sweep now, attributed to `system`
    Run {
        /// Override the configured retention window
        #[arg(long)]
        retention_days: Option<u32>,
    },
    /// Show the configured policy
    Config,
}

#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct PolicyRow {
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Retention (days)")]
    retention_days: u32,
    #[tabled(rename = "Schedule (UTC)")]
    schedule: String,
    #[tabled(rename = "Cron")]
    cron: String,
}

#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct SweepRow {
    #[tabled(rename = "Records deleted")]
    deleted_records: u64,
    #[tabled(rename = "Files deleted")]
    deleted_physical_files: u64,
    #[tabled(rename = "File deletes failed")]
    failed_physical_deletes: u64,
}

impl From<CleanupResult> for SweepRow {
    fn from(r: CleanupResult) -> Self {
        Self {
            deleted_records: r.deleted_records,
            deleted_physical_files: r.deleted_physical_files,
            failed_physical_deletes: r.failed_physical_deletes,
        }
    }
}

/// Execute cleanup commands
pub async fn execute(args: &CleanupArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;

    match &args.command {
        CleanupCommand::Config => {
            let cleanup = &config.cleanup;
            output::print_item(
                &PolicyRow {
                    enabled: cleanup.enabled,
                    retention_days: cleanup.retention_days,
                    schedule: format!("{:02}:{:02}", cleanup.schedule_hour, cleanup.schedule_minute),
                    cron: cleanup.cron_expression(),
                },
                format,
            );
        }
        CleanupCommand::Run { retention_days } => {
            let days = retention_days.unwrap_or(config.cleanup.retention_days);
            let database = super::connect_database(&config).await?;
            let storage = Arc::new(LocalStorageProvider::new(&config.storage.root_path).await?);
            let clock = Arc::new(SystemClock);

            let lifecycle = LifecycleController::new(
                Arc::new(PgFileRecordRepository::new(database.pool().clone())),
                storage,
                AuditTrail::new(clock.clone()),
                ClaimRegistry::new(),
                clock,
                LifecycleSettings::from_config(&config.storage, &config.processing),
            );

            let result = lifecycle.run_cleanup(days, Actor::System).await;
            database.close().await;

            output::print_item(&SweepRow::from(result?), format);
            output::print_success(&format!("Swept records older than {days} days."));
        }
    }

    Ok(())
}
