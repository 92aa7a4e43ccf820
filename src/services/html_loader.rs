use once_cell::sync::Lazy;
use polars::prelude::*;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;

use crate::error::ReportError;
use crate::services::loader::{dataframe_from_strings, dedupe_headers};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("static selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("static selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").expect("static selector"));

/// Loads the first `<table>` on the page; the first non-empty row supplies
/// column names. Fails with `EmptyDataset` when the page has no table.
pub fn read_first_table(path: &Path) -> Result<DataFrame, ReportError> {
    let html = std::fs::read_to_string(path)?;
    parse_first_table(&html, &path.display().to_string())
}

fn parse_first_table(html: &str, source: &str) -> Result<DataFrame, ReportError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&TABLE)
        .next()
        .ok_or_else(|| ReportError::EmptyDataset(source.to_string()))?;

    let mut rows = table
        .select(&ROW)
        .map(row_cells)
        .filter(|cells| !cells.is_empty());

    let headers = rows
        .next()
        .ok_or_else(|| ReportError::EmptyDataset(source.to_string()))?;
    let headers = dedupe_headers(headers);

    let data: Vec<Vec<String>> = rows
        .map(|mut cells| {
            cells.resize(headers.len(), String::new());
            cells
        })
        .collect();

    tracing::debug!("html table: {} rows, {} columns", data.len(), headers.len());
    dataframe_from_strings(&headers, &data)
}

fn row_cells(row: ElementRef) -> Vec<String> {
    row.select(&CELL)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_table_wins() {
        let html = "<html><body>\
            <table><tr><th>a</th><th>b</th></tr><tr><td>1</td><td>x</td></tr></table>\
            <table><tr><th>other</th></tr></table>\
            </body></html>";
        let df = parse_first_table(html, "test.html").unwrap();
        assert_eq!(df.shape(), (1, 2));
        assert_eq!(df.get_column_names(), &["a", "b"]);
    }

    #[test]
    fn short_rows_pad_with_missing() {
        let html = "<table><tr><th>a</th><th>b</th></tr><tr><td>1</td></tr></table>";
        let df = parse_first_table(html, "test.html").unwrap();
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn page_without_table_is_an_empty_dataset() {
        match parse_first_table("<html><p>no tables</p></html>", "test.html") {
            Err(ReportError::EmptyDataset(_)) => {}
            other => panic!("expected EmptyDataset, got {:?}", other),
        }
    }
}
