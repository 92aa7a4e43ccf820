use crate::error::ReportError;
use crate::models::{display_value, Table};
use crate::services::profile::{self, Histogram, NumericSummary};

/// One self-contained unit of the output document. Variants carry exactly the
/// data their renderer needs; position in the produced sequence is the page's
/// place in the document.
#[derive(Debug)]
pub enum Page {
    Overview {
        source: String,
        rows: usize,
        columns: usize,
        column_types: Vec<(String, String)>,
    },
    Sample {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Missing {
        counts: Vec<(String, usize)>,
    },
    NumericSummary {
        stats: Vec<NumericSummary>,
    },
    Histogram {
        column: String,
        histogram: Histogram,
    },
    CategoricalFreq {
        column: String,
        counts: Vec<(String, usize)>,
    },
}

pub fn overview_page(table: &Table) -> Page {
    Page::Overview {
        source: table.source().display().to_string(),
        rows: table.height(),
        columns: table.width(),
        column_types: table
            .columns()
            .iter()
            .map(|c| (c.name.clone(), format!("{} ({})", c.dtype, c.kind.label())))
            .collect(),
    }
}

/// First `min(sample_rows, row_count)` rows, rendered as strings.
pub fn sample_page(table: &Table, sample_rows: usize) -> Page {
    let shown = sample_rows.min(table.height());
    let headers = table.columns().iter().map(|c| c.name.clone()).collect();
    let rows = (0..shown)
        .map(|idx| {
            table
                .dataframe()
                .get_columns()
                .iter()
                .map(|series| {
                    series
                        .get(idx)
                        .map(|value| display_value(&value))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    Page::Sample { headers, rows }
}

/// Declines when no column has a missing value.
pub fn missing_page(table: &Table) -> Option<Page> {
    let counts = profile::missing_counts(table);
    if counts.is_empty() {
        return None;
    }
    Some(Page::Missing { counts })
}

/// Declines when the table has no numeric column.
pub fn numeric_summary_page(table: &Table) -> Result<Option<Page>, ReportError> {
    if table.numeric_columns().is_empty() {
        return Ok(None);
    }
    Ok(Some(Page::NumericSummary {
        stats: profile::numeric_summary(table)?,
    }))
}

/// One page per numeric column with at least one non-missing value, in
/// column order.
pub fn histogram_pages(table: &Table) -> Result<Vec<Page>, ReportError> {
    let mut pages = Vec::new();
    for meta in table.numeric_columns() {
        let values = profile::numeric_values(table.column(&meta.name)?)?;
        if values.is_empty() {
            continue;
        }
        pages.push(Page::Histogram {
            column: meta.name.clone(),
            histogram: profile::histogram(&values, profile::HISTOGRAM_BINS),
        });
    }
    Ok(pages)
}

/// One page per categorical column whose frequency table is non-empty, in
/// column order.
pub fn categorical_pages(table: &Table) -> Result<Vec<Page>, ReportError> {
    let mut pages = Vec::new();
    for meta in table.categorical_columns() {
        let counts = profile::top_values(table.column(&meta.name)?);
        if counts.is_empty() {
            continue;
        }
        pages.push(Page::CategoricalFreq {
            column: meta.name.clone(),
            counts,
        });
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::path::Path;

    fn table(columns: Vec<Series>) -> Table {
        let df = DataFrame::new(columns).unwrap();
        Table::from_dataframe(df, Path::new("test_input.csv")).unwrap()
    }

    #[test]
    fn overview_reports_shape_and_every_column() {
        let t = table(vec![
            Series::new("a", vec![1.0f64, 2.0, 3.0]),
            Series::new("b", vec!["x", "y", "z"]),
        ]);
        match overview_page(&t) {
            Page::Overview {
                rows,
                columns,
                column_types,
                ..
            } => {
                assert_eq!(rows, 3);
                assert_eq!(columns, 2);
                assert_eq!(column_types.len(), 2);
                assert!(column_types[0].1.contains("numeric"));
                assert!(column_types[1].1.contains("categorical"));
            }
            other => panic!("expected Overview, got {:?}", other),
        }
    }

    #[test]
    fn sample_page_never_exceeds_row_count() {
        let t = table(vec![Series::new("a", vec![1.0f64, 2.0, 3.0])]);
        match sample_page(&t, 10) {
            Page::Sample { rows, .. } => assert_eq!(rows.len(), 3),
            other => panic!("expected Sample, got {:?}", other),
        }
        match sample_page(&t, 2) {
            Page::Sample { rows, .. } => assert_eq!(rows.len(), 2),
            other => panic!("expected Sample, got {:?}", other),
        }
    }

    #[test]
    fn missing_page_declines_without_gaps() {
        let t = table(vec![Series::new("a", vec![1.0f64, 2.0])]);
        assert!(missing_page(&t).is_none());

        let t = table(vec![Series::new("a", vec![Some(1.0f64), None])]);
        assert!(missing_page(&t).is_some());
    }

    #[test]
    fn numeric_summary_declines_without_numeric_columns() {
        let t = table(vec![Series::new("c", vec!["x", "y"])]);
        assert!(numeric_summary_page(&t).unwrap().is_none());
    }

    #[test]
    fn histogram_pages_skip_all_missing_columns() {
        let t = table(vec![
            Series::new("present", vec![Some(1.0f64), Some(2.0)]),
            Series::new("absent", vec![None::<f64>, None]),
        ]);
        let pages = histogram_pages(&t).unwrap();
        assert_eq!(pages.len(), 1);
        match &pages[0] {
            Page::Histogram { column, .. } => assert_eq!(column, "present"),
            other => panic!("expected Histogram, got {:?}", other),
        }
    }

    #[test]
    fn categorical_pages_follow_column_order() {
        let t = table(vec![
            Series::new("n", vec![1.0f64, 2.0]),
            Series::new("c1", vec!["x", "y"]),
            Series::new("c2", vec!["u", "v"]),
        ]);
        let pages = categorical_pages(&t).unwrap();
        let names: Vec<&str> = pages
            .iter()
            .map(|p| match p {
                Page::CategoricalFreq { column, .. } => column.as_str(),
                other => panic!("expected CategoricalFreq, got {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["c1", "c2"]);
    }
}
