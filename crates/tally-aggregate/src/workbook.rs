//! Workbook codec.
//!
//! Reading goes through `calamine` (xlsx and xls); writing always produces
//! xlsx through `rust_xlsxwriter`. Only the first worksheet is read. Its
//! first row is the header.

use std::collections::HashSet;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveTime;
use rust_xlsxwriter::Workbook;

use crate::error::TransformError;
use crate::table::{Cell, Table};

/// Parse the first worksheet of a workbook.
///
/// Blank headers become `Unnamed: N`; repeated headers get `.1`, `.2`
/// suffixes. Rows with no values at all are skipped.
pub fn read_table(bytes: &[u8]) -> Result<Table, TransformError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| TransformError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TransformError::NoWorksheet)?
        .map_err(|e| TransformError::Unreadable(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };

    let columns = header_names(header.iter().map(convert));
    let body = rows
        .map(|row| row.iter().map(convert).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect();

    Ok(Table::new(columns, body))
}

/// Encode a table as a single-sheet xlsx workbook.
pub fn write_table(table: &Table) -> Result<Vec<u8>, TransformError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in table.columns.iter().enumerate() {
        sheet
            .write_string(0, col_index(col)?, name)
            .map_err(encode_err)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let row_idx = u32::try_from(r + 1).map_err(|_| TransformError::Encode("too many rows".into()))?;
        for (c, cell) in row.iter().enumerate() {
            let col_idx = col_index(c)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(row_idx, col_idx, s).map_err(encode_err)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(row_idx, col_idx, *n).map_err(encode_err)?;
                }
                Cell::Bool(b) => {
                    sheet.write_boolean(row_idx, col_idx, *b).map_err(encode_err)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(encode_err)
}

fn col_index(col: usize) -> Result<u16, TransformError> {
    u16::try_from(col).map_err(|_| TransformError::Encode("too many columns".into()))
}

fn encode_err(err: rust_xlsxwriter::XlsxError) -> TransformError {
    TransformError::Encode(err.to_string())
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == NaiveTime::MIN => Cell::Text(ts.format("%Y-%m-%d").to_string()),
            Some(ts) => Cell::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::Text(dt.as_f64().to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn header_names(cells: impl Iterator<Item = Cell>) -> Vec<String> {
    let mut seen = HashSet::new();
    cells
        .enumerate()
        .map(|(idx, cell)| {
            let base = cell.to_header().unwrap_or_else(|| format!("Unnamed: {idx}"));
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}.{n}");
                n += 1;
            }
            name
        })
        .collect()
}
