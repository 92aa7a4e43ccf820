use polars::prelude::*;
use rusqlite::{types::Value, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use crate::error::ReportError;

/// Loads the first table (catalog order) of a SQLite database file.
pub fn read_database(path: &Path) -> Result<DataFrame, ReportError> {
    info!("Opening SQLite database {}", path.display());
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    first_table_dataframe(&conn, &path.display().to_string())
}

/// Materializes a SQL script into an in-memory database, then loads its first
/// table like a database file.
pub fn read_script(path: &Path) -> Result<DataFrame, ReportError> {
    info!("Materializing SQL script {}", path.display());
    let sql = std::fs::read_to_string(path)?;
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(&sql)?;
    first_table_dataframe(&conn, &path.display().to_string())
}

fn first_table_dataframe(conn: &Connection, source: &str) -> Result<DataFrame, ReportError> {
    let table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let table = table.ok_or_else(|| ReportError::EmptyDataset(source.to_string()))?;
    debug!("Loading table {}", table);

    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table))?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); column_names.len()];
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get::<_, Value>(idx)?);
        }
    }
    drop(rows);

    let columns: Vec<Series> = column_names
        .iter()
        .zip(cells)
        .map(|(name, values)| column_series(name, values))
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// INTEGER/REAL columns (with NULLs) become f64 series, everything else
/// strings; NULL is a missing value either way.
fn column_series(name: &str, values: Vec<Value>) -> Series {
    let numeric = values
        .iter()
        .all(|v| matches!(v, Value::Integer(_) | Value::Real(_) | Value::Null))
        && values.iter().any(|v| !matches!(v, Value::Null));

    if numeric {
        let nums: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| match v {
                Value::Integer(i) => Some(i as f64),
                Value::Real(f) => Some(f),
                _ => None,
            })
            .collect();
        Series::new(name, nums)
    } else {
        let strings: Vec<Option<String>> = values
            .into_iter()
            .map(|v| match v {
                Value::Null => None,
                Value::Integer(i) => Some(i.to_string()),
                Value::Real(f) => Some(f.to_string()),
                Value::Text(t) => Some(t),
                Value::Blob(_) => Some("BLOB".to_string()),
            })
            .collect();
        Series::new(name, strings)
    }
}
