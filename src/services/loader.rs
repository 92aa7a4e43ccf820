use once_cell::sync::Lazy;
use polars::prelude::*;
use qsv_sniffer::{SampleSize, Sniffer};
use regex::Regex;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::ReportError;
use crate::models::Table;
use crate::services::{db_loader, excel_loader, html_loader};

/// How much of a delimited file the prefix-sniffing strategy samples.
const SNIFF_PREFIX_BYTES: usize = 8192;

/// Candidate delimiters for prefix sniffing, in preference order.
const CANDIDATE_SEPARATORS: [u8; 5] = [b',', b'\t', b';', b'|', b':'];

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-delimited text, parsed with a single strict strategy.
    Csv,
    /// Tab/plain text of uncertain shape, parsed through the fallback chain.
    Delimited,
    Spreadsheet,
    Json,
    Html,
    Sqlite,
    SqlScript,
}

/// Maps a file extension (case-insensitive) to its format.
pub fn detect_format(path: &Path) -> Result<FileFormat, ReportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(FileFormat::Csv),
        "tsv" | "txt" => Ok(FileFormat::Delimited),
        "xlsx" | "xls" => Ok(FileFormat::Spreadsheet),
        "json" => Ok(FileFormat::Json),
        "html" | "htm" => Ok(FileFormat::Html),
        "db" | "sqlite" => Ok(FileFormat::Sqlite),
        "sql" => Ok(FileFormat::SqlScript),
        _ => Err(ReportError::UnsupportedFormat(ext)),
    }
}

pub fn is_supported_extension(ext: &str) -> bool {
    detect_format(Path::new(&format!("upload.{}", ext.to_lowercase()))).is_ok()
}

/// Loads a file into a Table, dispatching on its extension. Fails with
/// `UnsupportedFormat` before any I/O when the extension is unknown.
pub fn load(path: &Path) -> Result<Table, ReportError> {
    let format = detect_format(path)?;
    tracing::info!("Loading {} as {:?}", path.display(), format);

    let df = match format {
        FileFormat::Csv => read_csv_with_separator(path, b',')?,
        FileFormat::Delimited => read_delimited(path)?,
        FileFormat::Spreadsheet => excel_loader::read_first_sheet(path)?,
        FileFormat::Json => read_json(path)?,
        FileFormat::Html => html_loader::read_first_table(path)?,
        FileFormat::Sqlite => db_loader::read_database(path)?,
        FileFormat::SqlScript => db_loader::read_script(path)?,
    };

    tracing::info!("Loaded {} rows x {} columns", df.height(), df.width());
    Table::from_dataframe(df, path)
}

fn read_csv_with_separator(path: &Path, separator: u8) -> Result<DataFrame, ReportError> {
    let df = CsvReader::from_path(path)?
        .has_header(true)
        .with_separator(separator)
        .finish()?;
    Ok(df)
}

fn read_json(path: &Path) -> Result<DataFrame, ReportError> {
    let file = std::fs::File::open(path)?;
    let df = JsonReader::new(file).finish()?;
    Ok(df)
}

/// Ordered fallback chain for tab/plain text. Strategies are tried in order;
/// the first to succeed wins, even if it warned about or dropped rows.
fn read_delimited(path: &Path) -> Result<DataFrame, ReportError> {
    let strategies: [(&str, fn(&Path) -> Result<DataFrame, ReportError>); 4] = [
        ("whole-file sniff", parse_with_sniffed_dialect),
        ("prefix sniff", parse_with_prefix_sniff),
        ("whitespace split", parse_whitespace_aligned),
        ("permissive", parse_permissive),
    ];

    for (name, strategy) in strategies {
        match strategy(path) {
            Ok(df) => {
                tracing::debug!("delimited strategy '{}' succeeded", name);
                return Ok(df);
            }
            Err(e) => tracing::debug!("delimited strategy '{}' failed: {}", name, e),
        }
    }

    Err(ReportError::ParseFailure(path.to_path_buf()))
}

/// Strategy 1: statistical dialect detection over the whole file.
fn parse_with_sniffed_dialect(path: &Path) -> Result<DataFrame, ReportError> {
    let metadata = Sniffer::new()
        .sample_size(SampleSize::All)
        .sniff_path(path)
        .map_err(|e| ReportError::FileProcessingError(format!("dialect sniffing failed: {}", e)))?;
    read_csv_with_separator(path, metadata.dialect.delimiter)
}

/// Strategy 2: delimiter heuristic over a fixed-size prefix, restricted to the
/// candidate set.
fn parse_with_prefix_sniff(path: &Path) -> Result<DataFrame, ReportError> {
    let sample = read_prefix(path, SNIFF_PREFIX_BYTES)?;
    let separator = sniff_prefix(&sample).ok_or_else(|| {
        ReportError::FileProcessingError(format!(
            "no consistent delimiter in the first {} bytes of {}",
            SNIFF_PREFIX_BYTES,
            path.display()
        ))
    })?;
    read_csv_with_separator(path, separator)
}

/// Strategy 3: split on runs of whitespace; assumes column-aligned plain text
/// and rejects files with ragged field counts.
fn parse_whitespace_aligned(path: &Path) -> Result<DataFrame, ReportError> {
    let text = read_lossy(path)?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .map(split_whitespace_run)
        .ok_or_else(|| ReportError::FileProcessingError("file contains no data".to_string()))?;

    let mut rows = Vec::new();
    for line in lines {
        let fields = split_whitespace_run(line);
        if fields.len() != header.len() {
            return Err(ReportError::FileProcessingError(format!(
                "line has {} fields, expected {}",
                fields.len(),
                header.len()
            )));
        }
        rows.push(fields);
    }

    dataframe_from_strings(&dedupe_headers(header), &rows)
}

/// Strategy 4: split on the best-guess delimiter and discard rows that do not
/// match the header's field count, warning about the drops.
fn parse_permissive(path: &Path) -> Result<DataFrame, ReportError> {
    let text = read_lossy(path)?;
    let separator = best_guess_separator(&text) as char;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header: Vec<String> = lines
        .next()
        .map(|l| l.split(separator).map(|f| f.trim().to_string()).collect())
        .ok_or_else(|| ReportError::FileProcessingError("file contains no data".to_string()))?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let fields: Vec<String> = line.split(separator).map(|f| f.trim().to_string()).collect();
        if fields.len() == header.len() {
            rows.push(fields);
        } else {
            dropped += 1;
        }
    }

    if rows.is_empty() {
        return Err(ReportError::FileProcessingError(
            "no rows matched the inferred column count".to_string(),
        ));
    }
    if dropped > 0 {
        tracing::warn!(
            "dropped {} malformed rows while parsing {}",
            dropped,
            path.display()
        );
    }

    dataframe_from_strings(&dedupe_headers(header), &rows)
}

fn read_prefix(path: &Path, limit: usize) -> Result<String, ReportError> {
    let mut buf = vec![0u8; limit];
    let mut file = std::fs::File::open(path)?;
    let mut read = 0;
    loop {
        let n = file.read(&mut buf[read..])?;
        if n == 0 {
            break;
        }
        read += n;
        if read == buf.len() {
            break;
        }
    }
    buf.truncate(read);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_lossy(path: &Path) -> Result<String, ReportError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A candidate wins when every sampled line contains the same nonzero number
/// of occurrences; ties go to candidate order.
fn sniff_prefix(sample: &str) -> Option<u8> {
    let mut lines: Vec<&str> = sample.lines().collect();
    if !sample.ends_with('\n') && lines.len() > 1 {
        // the prefix was cut mid-line
        lines.pop();
    }
    let lines: Vec<&str> = lines.into_iter().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }

    for sep in CANDIDATE_SEPARATORS {
        let first = count_byte(lines[0], sep);
        if first > 0 && lines.iter().all(|l| count_byte(l, sep) == first) {
            return Some(sep);
        }
    }
    None
}

/// Best scorer for the permissive strategy: the candidate present on the most
/// lines, comma when nothing scores.
fn best_guess_separator(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(200)
        .collect();

    CANDIDATE_SEPARATORS
        .iter()
        .copied()
        .max_by_key(|&sep| lines.iter().filter(|l| count_byte(l, sep) > 0).count())
        .filter(|&sep| lines.iter().any(|l| count_byte(l, sep) > 0))
        .unwrap_or(b',')
}

fn count_byte(line: &str, byte: u8) -> usize {
    line.bytes().filter(|&b| b == byte).count()
}

fn split_whitespace_run(line: &str) -> Vec<String> {
    WHITESPACE_RUN
        .split(line.trim())
        .map(str::to_string)
        .collect()
}

/// Builds an all-string DataFrame; empty fields become missing values.
pub(crate) fn dataframe_from_strings(
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<DataFrame, ReportError> {
    if headers.is_empty() {
        return Err(ReportError::InvalidInput("no columns found".to_string()));
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        let values: Vec<Option<String>> = rows
            .iter()
            .map(|row| {
                row.get(idx)
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
            })
            .collect();
        columns.push(Series::new(name, values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Keeps header names as written but makes duplicates unique with a numeric
/// suffix; blank headers get a placeholder.
pub(crate) fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.into_iter()
        .map(|name| {
            let base = if name.trim().is_empty() {
                "column".to_string()
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut counter = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, counter);
                counter += 1;
            }
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn detect_format_is_case_insensitive() {
        assert_eq!(
            detect_format(Path::new("Data.CSV")).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            detect_format(Path::new("data.XLSX")).unwrap(),
            FileFormat::Spreadsheet
        );
        assert_eq!(
            detect_format(Path::new("dump.sqlite")).unwrap(),
            FileFormat::Sqlite
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        match detect_format(Path::new("data.qux")) {
            Err(ReportError::UnsupportedFormat(ext)) => assert_eq!(ext, "qux"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn sniff_prefix_finds_consistent_separator() {
        assert_eq!(sniff_prefix("a;b;c\n1;2;3\n4;5;6\n"), Some(b';'));
        assert_eq!(sniff_prefix("a|b\n1|2\n"), Some(b'|'));
        assert_eq!(sniff_prefix("a b c\n1 2 3\n"), None);
    }

    #[test]
    fn sniff_prefix_prefers_candidate_order_on_ties() {
        // both ',' and ':' are consistent; comma comes first in the set
        assert_eq!(sniff_prefix("a:x,b:y\n1:2,3:4\n"), Some(b','));
    }

    #[test]
    fn sniff_prefix_drops_trailing_partial_line() {
        assert_eq!(sniff_prefix("a;b\n1;2\n3;4;5;6;7;8;9;1"), Some(b';'));
    }

    #[test]
    fn whitespace_strategy_parses_aligned_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "aligned.txt", "name  age\nann   31\nbob   45\n");
        let df = parse_whitespace_aligned(&path).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.get_column_names(), &["name", "age"]);
    }

    #[test]
    fn whitespace_strategy_rejects_ragged_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "ragged.txt", "a b c\n1 2\n");
        assert!(parse_whitespace_aligned(&path).is_err());
    }

    #[test]
    fn permissive_strategy_drops_mismatched_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "broken.txt",
            "name,city,age\nann lee,nyc,31\nbob,la\ncara m,sf,28\n",
        );
        let df = parse_permissive(&path).unwrap();
        assert_eq!(df.shape(), (2, 3));
    }

    #[test]
    fn permissive_strategy_fails_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "noise.txt", "a,b,c\n1,2\n3,4\n");
        assert!(parse_permissive(&path).is_err());
    }

    #[test]
    fn fallback_chain_handles_sniffable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.txt", "x;y\n1;2\n3;4\n5;6\n");
        let df = read_delimited(&path).unwrap();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.get_column_names(), &["x", "y"]);
    }

    #[test]
    fn fallback_chain_recovers_ragged_file() {
        let dir = tempfile::tempdir().unwrap();
        // text fields contain spaces, so the whitespace strategy is ragged too
        // and the permissive strategy has to recover what it can
        let path = write_file(
            &dir,
            "messy.txt",
            "name,note\nann lee,first entry\nbroken row without delimiter count,x,y\nbob,second entry\n",
        );
        let df = read_delimited(&path).unwrap();
        assert!(df.height() >= 1);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn dedupe_headers_suffixes_duplicates() {
        let out = dedupe_headers(vec![
            "a".to_string(),
            "a".to_string(),
            "".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(out, vec!["a", "a_1", "column", "a_2"]);
    }

    #[test]
    fn dataframe_from_strings_maps_empty_to_missing() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![
            vec!["1".to_string(), "".to_string()],
            vec!["2".to_string(), "x".to_string()],
        ];
        let df = dataframe_from_strings(&headers, &rows).unwrap();
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }
}
