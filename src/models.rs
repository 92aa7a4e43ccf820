use polars::prelude::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::ReportError;

/// Column classification inferred from actual values, not declared types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
}

/// In-memory rows-by-columns dataset with per-column kind computed once at
/// construction. Immutable afterwards; one Table per pipeline run.
#[derive(Debug)]
pub struct Table {
    source: PathBuf,
    df: DataFrame,
    columns: Vec<ColumnMeta>,
}

impl Table {
    pub fn from_dataframe(mut df: DataFrame, source: &Path) -> Result<Self, ReportError> {
        let source = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            let kind = classify_series(df.column(name)?);
            if kind == ColumnKind::Numeric && !df.column(name)?.dtype().is_numeric() {
                // All non-missing values parse as numbers; carry the column as f64.
                let cast = df.column(name)?.cast(&DataType::Float64)?;
                df.replace(name, cast)?;
            }
            columns.push(ColumnMeta {
                name: name.clone(),
                dtype: df.column(name)?.dtype().to_string(),
                kind,
            });
        }

        Ok(Table {
            source,
            df,
            columns,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Series, ReportError> {
        Ok(self.df.column(name)?)
    }

    /// Numeric/categorical partition, in column order.
    pub fn numeric_columns(&self) -> Vec<&ColumnMeta> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
            .collect()
    }

    pub fn categorical_columns(&self) -> Vec<&ColumnMeta> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .collect()
    }
}

/// A column is Numeric when every non-missing value is interpretable as a
/// number; missing markers are type-neutral.
fn classify_series(series: &Series) -> ColumnKind {
    if series.dtype().is_numeric() {
        return ColumnKind::Numeric;
    }

    if let Ok(ca) = series.str() {
        let values: Vec<&str> = ca
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if values.par_iter().all(|v| v.parse::<f64>().is_ok()) {
            return ColumnKind::Numeric;
        }
    }

    ColumnKind::Categorical
}

/// Renders a single cell for report output. Missing values render empty,
/// strings render without the quoting AnyValue's Display adds.
pub fn display_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<Series>) -> Table {
        let df = DataFrame::new(columns).unwrap();
        Table::from_dataframe(df, Path::new("test_input.csv")).unwrap()
    }

    #[test]
    fn numeric_strings_classify_numeric_and_cast() {
        let t = table(vec![Series::new("a", vec!["1", "2.5", "-3"])]);
        assert_eq!(t.columns()[0].kind, ColumnKind::Numeric);
        assert_eq!(t.column("a").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn mixed_values_classify_categorical() {
        let t = table(vec![Series::new("a", vec!["1", "x", "3"])]);
        assert_eq!(t.columns()[0].kind, ColumnKind::Categorical);
    }

    #[test]
    fn missing_markers_are_type_neutral() {
        let t = table(vec![Series::new("a", vec![Some("1"), None, Some("2")])]);
        assert_eq!(t.columns()[0].kind, ColumnKind::Numeric);
    }

    #[test]
    fn native_numeric_dtypes_stay_numeric() {
        let t = table(vec![
            Series::new("i", vec![1i64, 2, 3]),
            Series::new("f", vec![0.5f64, 1.5, 2.5]),
        ]);
        assert!(t.columns().iter().all(|c| c.kind == ColumnKind::Numeric));
        assert_eq!(t.numeric_columns().len(), 2);
        assert!(t.categorical_columns().is_empty());
    }

    #[test]
    fn display_value_strips_quoting_and_renders_null_empty() {
        assert_eq!(display_value(&AnyValue::Null), "");
        assert_eq!(display_value(&AnyValue::String("abc")), "abc");
        assert_eq!(display_value(&AnyValue::Float64(2.5)), "2.5");
    }
}
