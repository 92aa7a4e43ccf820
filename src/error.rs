use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReportError {
    /// File extension is not in the recognized set.
    UnsupportedFormat(String),
    /// Every parsing strategy for a delimited text file was exhausted.
    ParseFailure(PathBuf),
    /// A relational or HTML source defines no tables.
    EmptyDataset(String),
    InvalidInput(String),
    IoError(std::io::Error),
    DatabaseError(String),
    DataFrameError(String),
    FileProcessingError(String),
    RenderError(String),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::UnsupportedFormat(ext) => {
                write!(f, "Unsupported file format: .{}", ext)
            }
            ReportError::ParseFailure(path) => {
                write!(f, "Unable to parse {} with any strategy", path.display())
            }
            ReportError::EmptyDataset(src) => write!(f, "No tables found in {}", src),
            ReportError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ReportError::IoError(err) => write!(f, "IO error: {}", err),
            ReportError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ReportError::DataFrameError(msg) => write!(f, "DataFrame error: {}", msg),
            ReportError::FileProcessingError(msg) => {
                write!(f, "File processing error: {}", msg)
            }
            ReportError::RenderError(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::IoError(err)
    }
}

impl From<rusqlite::Error> for ReportError {
    fn from(err: rusqlite::Error) -> Self {
        ReportError::DatabaseError(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for ReportError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ReportError::DataFrameError(err.to_string())
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ReportError::UnsupportedFormat(_)
            | ReportError::ParseFailure(_)
            | ReportError::EmptyDataset(_)
            | ReportError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ReportError::IoError(_)
            | ReportError::DatabaseError(_)
            | ReportError::DataFrameError(_)
            | ReportError::FileProcessingError(_)
            | ReportError::RenderError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
