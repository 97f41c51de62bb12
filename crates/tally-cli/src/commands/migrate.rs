//! Schema migration commands.

use clap::{Args, Subcommand};

use tally_core::error::AppError;

use crate::output;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub command: MigrateCommand,
}

#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Apply pending migrations
    Run,
    /// List migrations that have not been applied
    Status,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, env: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let database = super::connect_database(&config).await?;

    let result = match &args.command {
        MigrateCommand::Run => tally_database::migration::run_migrations(database.pool())
            .await
            .map(|()| output::print_success("Schema is up to date")),
        MigrateCommand::Status => tally_database::migration::pending_migrations(database.pool())
            .await
            .map(|pending| {
                if pending.is_empty() {
                    output::print_success("No pending migrations");
                }
                for (version, description) in pending {
                    output::print_kv(&version.to_string(), &description);
                }
            }),
    };

    database.close().await;
    result
}
