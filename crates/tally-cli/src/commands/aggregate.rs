//! Offline aggregation of a workbook on disk.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use tally_aggregate::{Aggregator, SpreadsheetFormat, workbook};
use tally_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the aggregate command
#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Workbook to aggregate (`.xlsx` or `.xls`)
    pub input: PathBuf,

    /// Where to write the result; defaults to `<stem>_processed.xlsx`
    /// next to the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct SummaryRow {
    #[tabled(rename = "Rows in")]
    total_rows: usize,
    #[tabled(rename = "Rows out")]
    grouped_rows: usize,
    #[tabled(rename = "Period column")]
    period_column: String,
    #[tabled(rename = "Numeric columns")]
    numeric_columns: String,
    #[tabled(rename = "Output")]
    output: String,
}

/// Execute the aggregate command
pub async fn execute(args: &AggregateArgs, format: OutputFormat) -> Result<(), AppError> {
    let bytes = tokio::fs::read(&args.input).await.map_err(|e| {
        AppError::validation(format!("Cannot read {}: {e}", args.input.display()))
    })?;

    let name = args.input.to_string_lossy();
    if SpreadsheetFormat::detect(&name, None, &bytes).is_none() {
        return Err(AppError::validation(format!(
            "{} is not an .xlsx or .xls workbook",
            args.input.display()
        )));
    }

    let target = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));

    let (encoded, summary) = tokio::task::spawn_blocking(move || {
        let table = workbook::read_table(&bytes)?;
        let aggregation = Aggregator::default().aggregate(&table)?;
        let encoded = workbook::write_table(&aggregation.table)?;
        Ok::<_, AppError>((encoded, aggregation.summary))
    })
    .await
    .map_err(|e| AppError::internal(format!("Aggregation task failed: {e}")))??;

    tokio::fs::write(&target, encoded).await.map_err(|e| {
        AppError::internal(format!("Cannot write {}: {e}", target.display()))
    })?;

    output::print_item(
        &SummaryRow {
            total_rows: summary.total_rows,
            grouped_rows: summary.grouped_rows,
            period_column: summary.period_column_name,
            numeric_columns: summary.numeric_column_names.join(", "),
            output: target.display().to_string(),
        },
        format,
    );
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    input.with_file_name(format!("{stem}_processed.xlsx"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("/data/q1 ledger.xls")),
            PathBuf::from("/data/q1 ledger_processed.xlsx")
        );
    }
}
