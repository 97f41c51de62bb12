//! Accounting-period aggregation.
//!
//! Given a table, find the period column, keep the numeric columns that
//! follow it, and sum them per distinct period value. The engine is pure:
//! it never mutates its input and two runs over the same table produce
//! identical output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::table::{Cell, Table};

/// Header substrings that mark a period column, in priority order.
pub const DEFAULT_PERIOD_LABELS: &[&str] = &[
    "会计月",
    "会计期间",
    "月份",
    "期间",
    "accounting month",
    "period",
    "month",
];

/// Metadata describing one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSummary {
    /// Data rows in the input.
    pub total_rows: usize,
    /// Rows in the output, one per distinct period value.
    pub grouped_rows: usize,
    /// Output header: period column then numeric columns.
    pub output_columns: Vec<String>,
    /// Name of the detected period column.
    pub period_column_name: String,
    /// Retained numeric columns in input order.
    pub numeric_column_names: Vec<String>,
}

/// Grouped table plus its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One row per distinct period value.
    pub table: Table,
    /// Run metadata.
    pub summary: AggregationSummary,
}

/// Hashable identity of a period value. Exact equality, no normalization
/// beyond folding `-0.0` into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Number(u64),
    Text(String),
    Bool(bool),
    Empty,
}

impl GroupKey {
    fn of(cell: &Cell) -> Self {
        match cell {
            Cell::Number(n) if *n == 0.0 => Self::Number(0f64.to_bits()),
            Cell::Number(n) => Self::Number(n.to_bits()),
            Cell::Text(s) => Self::Text(s.clone()),
            Cell::Bool(b) => Self::Bool(*b),
            Cell::Empty => Self::Empty,
        }
    }
}

/// The aggregation engine, configured with its period labels.
#[derive(Debug, Clone)]
pub struct Aggregator {
    labels: Vec<String>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::with_labels(DEFAULT_PERIOD_LABELS.iter().copied())
    }
}

impl Aggregator {
    /// Engine using [`DEFAULT_PERIOD_LABELS`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine matching the given labels, case-insensitively, in order.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|l| l.as_ref().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Index of the first column whose header contains a period label.
    pub fn find_period_column(&self, columns: &[String]) -> Option<usize> {
        columns.iter().position(|name| {
            let name = name.to_lowercase();
            self.labels.iter().any(|label| name.contains(label.as_str()))
        })
    }

    /// Group `table` by its period column and sum the numeric columns.
    pub fn aggregate(&self, table: &Table) -> Result<Aggregation, TransformError> {
        let period_idx = self.find_period_column(&table.columns).ok_or_else(|| {
            TransformError::PeriodColumnNotFound {
                labels: self.labels.join(", "),
            }
        })?;
        let period_name = table.columns[period_idx].clone();

        let candidates = (period_idx + 1)..table.columns.len();
        if candidates.is_empty() {
            return Err(TransformError::NoColumnsAfterPeriod {
                period_column: period_name,
            });
        }

        let numeric: Vec<usize> = candidates
            .filter(|&col| table.rows.iter().any(|row| cell(row, col).as_number().is_some()))
            .collect();
        if numeric.is_empty() {
            return Err(TransformError::NoNumericColumns {
                period_column: period_name,
            });
        }

        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<(Cell, Vec<f64>)> = Vec::new();

        for row in &table.rows {
            let period = cell(row, period_idx);
            let slot = *index.entry(GroupKey::of(period)).or_insert_with(|| {
                groups.push((normalize(period), vec![0.0; numeric.len()]));
                groups.len() - 1
            });
            let sums = &mut groups[slot].1;
            for (sum, &col) in sums.iter_mut().zip(&numeric) {
                *sum += cell(row, col).as_number().unwrap_or(0.0);
            }
        }

        groups.sort_by(|a, b| a.0.total_cmp(&b.0));

        let numeric_names: Vec<String> = numeric.iter().map(|&c| table.columns[c].clone()).collect();
        let mut output_columns = Vec::with_capacity(numeric_names.len() + 1);
        output_columns.push(period_name.clone());
        output_columns.extend(numeric_names.iter().cloned());

        let rows: Vec<Vec<Cell>> = groups
            .into_iter()
            .map(|(period, sums)| {
                std::iter::once(period)
                    .chain(sums.into_iter().map(Cell::Number))
                    .collect()
            })
            .collect();

        let summary = AggregationSummary {
            total_rows: table.rows.len(),
            grouped_rows: rows.len(),
            output_columns: output_columns.clone(),
            period_column_name: period_name,
            numeric_column_names: numeric_names,
        };

        Ok(Aggregation {
            table: Table {
                columns: output_columns,
                rows,
            },
            summary,
        })
    }
}

/// Aggregate with the default period labels.
pub fn aggregate(table: &Table) -> Result<Aggregation, TransformError> {
    Aggregator::default().aggregate(table)
}

static EMPTY: Cell = Cell::Empty;

fn cell(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&EMPTY)
}

fn normalize(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(n) if *n == 0.0 => Cell::Number(0.0),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_rate_period_qty_example() {
        let input = table(
            &["rate", "period", "qty"],
            vec![
                vec![text("17%"), text("202501"), num(5.0)],
                vec![text("16%"), text("202501"), num(3.0)],
                vec![text("13%"), text("202502"), num(2.0)],
            ],
        );

        let result = aggregate(&input).expect("aggregates");
        assert_eq!(result.summary.period_column_name, "period");
        assert_eq!(result.summary.numeric_column_names, vec!["qty"]);
        assert_eq!(result.summary.output_columns, vec!["period", "qty"]);
        assert_eq!(result.summary.total_rows, 3);
        assert_eq!(result.summary.grouped_rows, 2);
        assert_eq!(
            result.table.rows,
            vec![
                vec![text("202501"), num(8.0)],
                vec![text("202502"), num(2.0)],
            ]
        );
    }

    #[test]
    fn test_free_text_after_period_is_rejected() {
        let input = table(
            &["会计月", "备注"],
            vec![vec![text("202501"), text("ok")], vec![text("202502"), Cell::Empty]],
        );
        let err = aggregate(&input).unwrap_err();
        assert_eq!(err.code(), "no_numeric_columns");
    }

    #[test]
    fn test_missing_period_column() {
        let input = table(&["name", "amount"], vec![vec![text("a"), num(1.0)]]);
        assert_eq!(aggregate(&input).unwrap_err().code(), "period_column_not_found");
    }

    #[test]
    fn test_period_column_last() {
        let input = table(&["amount", "会计期间"], vec![vec![num(1.0), text("202501")]]);
        assert_eq!(aggregate(&input).unwrap_err().code(), "no_columns_after_period");
    }

    #[test]
    fn test_first_matching_column_wins() {
        let input = table(
            &["月份", "会计月", "amount"],
            vec![vec![text("01"), text("Jan"), num(4.0)]],
        );
        let result = aggregate(&input).unwrap();
        assert_eq!(result.summary.period_column_name, "月份");
        // "会计月" follows the period column but holds no numbers.
        assert_eq!(result.summary.numeric_column_names, vec!["amount"]);
    }

    #[test]
    fn test_columns_before_period_are_dropped() {
        let input = table(
            &["amount_before", "Accounting Month", "amount"],
            vec![vec![num(100.0), num(202501.0), num(1.5)]],
        );
        let result = aggregate(&input).unwrap();
        assert_eq!(result.summary.output_columns, vec!["Accounting Month", "amount"]);
    }

    #[test]
    fn test_sums_are_conserved_with_mixed_cells() {
        let input = table(
            &["period", "a", "b", "note"],
            vec![
                vec![num(202501.0), num(1.5), text("x"), text("n1")],
                vec![num(202501.0), text("2"), num(3.0), text("n2")],
                vec![Cell::Empty, num(4.0), Cell::Empty, text("n3")],
                vec![num(202502.0), Cell::Bool(true), num(-1.0), Cell::Empty],
            ],
        );

        let result = aggregate(&input).unwrap();
        assert_eq!(result.summary.numeric_column_names, vec!["a", "b"]);

        for (out_col, in_col) in [(1usize, 1usize), (2, 2)] {
            let input_sum: f64 = input.rows.iter().map(|r| r[in_col].as_number().unwrap_or(0.0)).sum();
            let output_sum: f64 = result.table.rows.iter().map(|r| r[out_col].as_number().unwrap_or(0.0)).sum();
            assert!((input_sum - output_sum).abs() < 1e-9);
        }

        // The empty period is its own group and sorts last.
        assert_eq!(result.summary.grouped_rows, 3);
        assert!(result.table.rows[2][0].is_empty());
    }

    #[test]
    fn test_number_and_text_periods_stay_distinct() {
        let input = table(
            &["period", "v"],
            vec![vec![num(202501.0), num(1.0)], vec![text("202501"), num(2.0)]],
        );
        let result = aggregate(&input).unwrap();
        assert_eq!(result.summary.grouped_rows, 2);
    }

    #[test]
    fn test_output_is_deterministic() {
        let rows = (0..50)
            .map(|i| vec![text(&format!("2025{:02}", i % 7)), num(i as f64 * 0.1)])
            .collect();
        let input = table(&["period", "v"], rows);
        let first = aggregate(&input).unwrap();
        let second = aggregate(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.summary.grouped_rows, 7);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = table(&["period", "v"], vec![vec![text("p"), text("3")]]);
        let before = input.clone();
        aggregate(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_summary_wire_names() {
        let input = table(&["period", "v"], vec![vec![text("p"), num(1.0)]]);
        let summary = aggregate(&input).unwrap().summary;
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalRows"], 1);
        assert_eq!(json["groupedRows"], 1);
        assert_eq!(json["periodColumnName"], "period");
        assert_eq!(json["numericColumnNames"][0], "v");
        assert_eq!(json["outputColumns"][1], "v");
    }
}
