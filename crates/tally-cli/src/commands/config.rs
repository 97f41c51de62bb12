//! Configuration inspection commands.

use clap::{Args, Subcommand};

use tally_core::error::AppError;
use tally_database::connection::redact_url;

use crate::output;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the merged configuration as JSON, with the database password masked
    Show,
    /// Load and validate the configuration
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, env: &str) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(env)?;
            config.database.url = redact_url(&config.database.url);
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Validate => match super::load_config(env) {
            Ok(config) => {
                output::print_success(&format!("Configuration for '{env}' is valid"));
                output::print_kv("Server", &format!("{}:{}", config.server.host, config.server.port));
                let database = if config.database.url.is_empty() {
                    "in-memory".to_string()
                } else {
                    redact_url(&config.database.url)
                };
                output::print_kv("Database", &database);
                output::print_kv("Storage root", &config.storage.root_path);
                output::print_kv("Cleanup", &config.cleanup.cron_expression());
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
    }
    Ok(())
}
