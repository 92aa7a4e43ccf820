use polars::prelude::*;
use std::collections::HashMap;

use crate::error::ReportError;
use crate::models::{display_value, Table};

/// Distinct values shown on a categorical frequency page.
pub const TOP_VALUES: usize = 15;

/// Fixed bin count for numeric distribution histograms.
pub const HISTOGRAM_BINS: usize = 20;

/// The descriptive statistics block for one numeric column.
#[derive(Debug, Clone)]
pub struct NumericSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct Histogram {
    /// Bin boundaries; one more entry than `counts`.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Missing-value counts per column, restricted to columns that have any,
/// descending by count (ties by name, keeping repeated runs identical).
pub fn missing_counts(table: &Table) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = table
        .dataframe()
        .get_columns()
        .iter()
        .map(|series| (series.name().to_string(), series.null_count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// Describe-style statistics for every numeric column, in column order.
pub fn numeric_summary(table: &Table) -> Result<Vec<NumericSummary>, ReportError> {
    let mut out = Vec::new();
    for meta in table.numeric_columns() {
        let casted = table.column(&meta.name)?.cast(&DataType::Float64)?;
        let ca = casted.f64()?;
        out.push(NumericSummary {
            name: meta.name.clone(),
            count: ca.len() - ca.null_count(),
            mean: ca.mean().unwrap_or(f64::NAN),
            std: ca.std(1).unwrap_or(f64::NAN),
            min: ca.min().unwrap_or(f64::NAN),
            q25: quantile(ca, 0.25)?,
            median: quantile(ca, 0.5)?,
            q75: quantile(ca, 0.75)?,
            max: ca.max().unwrap_or(f64::NAN),
        });
    }
    Ok(out)
}

fn quantile(ca: &Float64Chunked, q: f64) -> Result<f64, ReportError> {
    Ok(ca
        .quantile(q, QuantileInterpolOptions::Linear)?
        .unwrap_or(f64::NAN))
}

/// Non-missing values of a column as f64, for histogram binning.
pub fn numeric_values(series: &Series) -> Result<Vec<f64>, ReportError> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Equal-width binning over the value range. A degenerate single-valued
/// column spans `value ± 0.5` so the lone bar still has width.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &value in values {
        let mut idx = ((value - lo) / width) as usize;
        if idx >= bins {
            // the maximum lands in the last bin
            idx = bins - 1;
        }
        counts[idx] += 1;
    }

    let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
    Histogram { edges, counts }
}

/// Top distinct values of a column by occurrence count, at most `TOP_VALUES`,
/// returned ascending for horizontal-bar display. Values past the cut are
/// silently excluded.
pub fn top_values(series: &Series) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for idx in 0..series.len() {
        if let Ok(value) = series.get(idx) {
            if matches!(value, AnyValue::Null) {
                continue;
            }
            *counts.entry(display_value(&value)).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_VALUES);
    ranked.reverse();
    ranked
}
