//! CLI command definitions and dispatch.

pub mod aggregate;
pub mod cleanup;
pub mod config;
pub mod migrate;

use clap::{Parser, Subcommand};

use tally_core::config::AppConfig;
use tally_core::error::AppError;
use tally_database::DatabasePool;

use crate::output::OutputFormat;

/// Tally: spreadsheet ingestion and accounting-period aggregation
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment; `config/<env>.toml` is layered over
    /// `config/default.toml`
    #[arg(short, long, env = "TALLY_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Retention sweep
    Cleanup(cleanup::CleanupArgs),
    /// Aggregate a workbook on disk without touching the database
    Aggregate(aggregate::AggregateArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.env).await,
            Commands::Cleanup(args) => cleanup::execute(args, &self.env, self.format).await,
            Commands::Aggregate(args) => aggregate::execute(args, self.format).await,
            Commands::Config(args) => config::execute(args, &self.env),
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Helper: connect to the configured database
pub async fn connect_database(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}
