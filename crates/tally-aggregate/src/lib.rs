//! # tally-aggregate
//!
//! The pure half of the pipeline: a small in-memory table model, the
//! workbook reader/writer, spreadsheet format detection, and the
//! accounting-period aggregation engine. Nothing in this crate performs
//! I/O beyond byte buffers handed to it.

pub mod engine;
pub mod error;
pub mod format;
pub mod table;
pub mod workbook;

pub use engine::{Aggregation, AggregationSummary, Aggregator, aggregate};
pub use error::TransformError;
pub use format::SpreadsheetFormat;
pub use table::{Cell, Table};
