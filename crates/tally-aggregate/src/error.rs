//! Transform failures.

use tally_core::error::{AppError, codes};
use thiserror::Error;

/// Reasons a workbook cannot be turned into an aggregated table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// No header contains a period label.
    #[error("no period column found; expected a header containing one of: {labels}")]
    PeriodColumnNotFound {
        /// The labels that were searched for, comma separated.
        labels: String,
    },

    /// The period column is the last column of the sheet.
    #[error("period column '{period_column}' has no columns after it")]
    NoColumnsAfterPeriod { period_column: String },

    /// None of the columns after the period column hold a number.
    #[error("no numeric columns found after period column '{period_column}'")]
    NoNumericColumns { period_column: String },

    /// The bytes are not a readable workbook.
    #[error("unreadable workbook: {0}")]
    Unreadable(String),

    /// The workbook has no worksheet.
    #[error("workbook contains no worksheet")]
    NoWorksheet,

    /// The output workbook could not be produced.
    #[error("failed to encode workbook: {0}")]
    Encode(String),
}

impl TransformError {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PeriodColumnNotFound { .. } => codes::PERIOD_COLUMN_NOT_FOUND,
            Self::NoColumnsAfterPeriod { .. } => codes::NO_COLUMNS_AFTER_PERIOD,
            Self::NoNumericColumns { .. } => codes::NO_NUMERIC_COLUMNS,
            Self::Unreadable(_) | Self::NoWorksheet => codes::UNREADABLE_WORKBOOK,
            Self::Encode(_) => codes::ENCODE_FAILED,
        }
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        let code = err.code();
        match err {
            TransformError::Encode(_) => AppError::internal(err.to_string()).with_code(code),
            _ => AppError::processing(err.to_string()).with_code(code),
        }
    }
}
