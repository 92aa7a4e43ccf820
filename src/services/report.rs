use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReportError;
use crate::models::Table;
use crate::services::document::{ReportDocument, REPORT_TITLE};
use crate::services::{loader, pages};
use crate::services::pages::Page;

pub const DEFAULT_SAMPLE_ROWS: usize = 10;

/// Runs the whole pipeline: load the file, build the page sequence, write the
/// PDF, and return its path. Loader failures propagate unchanged.
pub fn generate(
    input_path: &Path,
    output_path: Option<&Path>,
    sample_rows: usize,
) -> Result<PathBuf, ReportError> {
    let table = loader::load(input_path)?;

    let output = resolve_output_path(input_path, output_path);
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let pages = build_pages(&table, sample_rows)?;
    tracing::info!("Rendering {} pages", pages.len());

    let mut doc = ReportDocument::new(REPORT_TITLE)?;
    for page in &pages {
        doc.render_page(page)?;
    }
    doc.save(&output)?;

    tracing::info!("Report saved to: {}", output.display());
    Ok(output)
}

/// The six generators in fixed order; absent preconditions are no-ops, not
/// errors.
pub fn build_pages(table: &Table, sample_rows: usize) -> Result<Vec<Page>, ReportError> {
    let mut out = Vec::new();
    out.push(pages::overview_page(table));
    out.push(pages::sample_page(table, sample_rows));
    if let Some(page) = pages::missing_page(table) {
        out.push(page);
    }
    if let Some(page) = pages::numeric_summary_page(table)? {
        out.push(page);
    }
    out.extend(pages::histogram_pages(table)?);
    out.extend(pages::categorical_pages(table)?);
    Ok(out)
}

fn resolve_output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("data");
            PathBuf::from(format!("{}_report.pdf", stem))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_derives_from_input_stem() {
        let out = resolve_output_path(Path::new("/data/sales.csv"), None);
        assert_eq!(out, PathBuf::from("sales_report.pdf"));
    }

    #[test]
    fn explicit_output_path_wins() {
        let out = resolve_output_path(
            Path::new("/data/sales.csv"),
            Some(Path::new("/tmp/out.pdf")),
        );
        assert_eq!(out, PathBuf::from("/tmp/out.pdf"));
    }
}
