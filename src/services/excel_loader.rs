use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::path::Path;

use crate::error::ReportError;
use crate::services::loader::dedupe_headers;

/// Loads the first worksheet (by workbook order) into a DataFrame. The first
/// row supplies column names; numeric columns become f64 series, everything
/// else strings with empty cells as missing values.
pub fn read_first_sheet(path: &Path) -> Result<DataFrame, ReportError> {
    tracing::info!("Opening workbook {}", path.display());
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ReportError::FileProcessingError(format!("Failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| ReportError::EmptyDataset(path.display().to_string()))?;

    let range = workbook.worksheet_range(sheet_name).map_err(|e| {
        ReportError::FileProcessingError(format!(
            "Failed to read worksheet {}: {}",
            sheet_name, e
        ))
    })?;

    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
    if rows.is_empty() {
        return Err(ReportError::EmptyDataset(path.display().to_string()));
    }

    let headers = dedupe_headers(rows[0].iter().map(|cell| cell.to_string()).collect());
    tracing::debug!(
        "worksheet {} has {} data rows, {} columns",
        sheet_name,
        rows.len() - 1,
        headers.len()
    );
    create_dataframe(&rows[1..], &headers)
}

fn create_dataframe(rows: &[Vec<Data>], headers: &[String]) -> Result<DataFrame, ReportError> {
    let mut columns = Vec::with_capacity(headers.len());

    for (col_idx, header) in headers.iter().enumerate() {
        let values: Vec<Data> = rows
            .iter()
            .map(|row| row.get(col_idx).cloned().unwrap_or(Data::Empty))
            .collect();

        let series = if is_numeric_column(&values) {
            let nums: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Data::Float(f) => Some(*f),
                    Data::Int(i) => Some(*i as f64),
                    _ => None,
                })
                .collect();
            Series::new(header, nums)
        } else {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Data::Empty => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(header, strings)
        };

        columns.push(series);
    }

    Ok(DataFrame::new(columns)?)
}

fn is_numeric_column(values: &[Data]) -> bool {
    let mut any_number = false;
    for value in values {
        match value {
            Data::Float(_) | Data::Int(_) => any_number = true,
            Data::Empty => {}
            _ => return false,
        }
    }
    any_number
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_build_float_series() {
        let rows = vec![
            vec![Data::Int(1), Data::String("a".into())],
            vec![Data::Float(2.5), Data::Empty],
        ];
        let headers = vec!["n".to_string(), "s".to_string()];
        let df = create_dataframe(&rows, &headers).unwrap();
        assert_eq!(df.column("n").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("s").unwrap().null_count(), 1);
    }

    #[test]
    fn short_rows_pad_with_missing() {
        let rows = vec![vec![Data::Int(1)], vec![Data::Int(2), Data::Int(9)]];
        let headers = vec!["a".to_string(), "b".to_string()];
        let df = create_dataframe(&rows, &headers).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }
}
