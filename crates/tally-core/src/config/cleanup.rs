//! Retention sweep configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Retention policy and daily schedule for the cleanup sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Whether the scheduled sweep is registered at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Records uploaded more than this many days ago are expired.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Hour of day (0-23, server local time) the sweep runs.
    #[serde(default = "default_schedule_hour")]
    pub schedule_hour: u32,
    /// Minute of the hour (0-59) the sweep runs.
    #[serde(default)]
    pub schedule_minute: u32,
}

impl CleanupConfig {
    /// Reject schedules that cannot be expressed as a daily cron trigger.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.schedule_hour > 23 {
            return Err(AppError::configuration(format!(
                "cleanup.schedule_hour must be 0-23, got {}",
                self.schedule_hour
            )));
        }
        if self.schedule_minute > 59 {
            return Err(AppError::configuration(format!(
                "cleanup.schedule_minute must be 0-59, got {}",
                self.schedule_minute
            )));
        }
        Ok(())
    }

    /// Six-field cron expression (`sec min hour dom mon dow`) for the sweep.
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.schedule_minute, self.schedule_hour)
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: default_retention_days(),
            schedule_hour: default_schedule_hour(),
            schedule_minute: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    3
}

fn default_schedule_hour() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_is_three_am() {
        let config = CleanupConfig::default();
        assert_eq!(config.retention_days, 3);
        assert_eq!(config.cron_expression(), "0 0 3 * * *");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_hour() {
        let config = CleanupConfig {
            schedule_hour: 24,
            ..CleanupConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
