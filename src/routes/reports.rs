use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    error::ReportError,
    services::{loader, report},
    AppState,
};

pub fn routes(max_upload_size: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index).post(upload))
        .layer(DefaultBodyLimit::max(max_upload_size))
}

#[derive(Debug, Deserialize)]
struct IndexParams {
    notice: Option<String>,
}

async fn index(Query(params): Query<IndexParams>) -> Html<String> {
    Html(render_index(params.notice.as_deref()))
}

#[axum::debug_handler]
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ReportError> {
    let mut uploaded: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ReportError::InvalidInput(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ReportError::InvalidInput(e.to_string()))?;
            uploaded = Some((filename, data));
        }
    }

    let Some((filename, data)) = uploaded else {
        return Ok(notice_redirect("No file part in the request"));
    };
    if filename.is_empty() {
        return Ok(notice_redirect("No file selected"));
    }

    let extension = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !loader::is_supported_extension(&extension) {
        return Ok(notice_redirect(
            "Invalid file type. Please upload a supported data file.",
        ));
    }
    if data.len() > state.config.max_upload_size {
        return Ok(notice_redirect("File is too large"));
    }

    let stored_name = stored_filename(&filename);
    let report_name = format!(
        "{}_report.pdf",
        Path::new(&stored_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
    );
    let upload_path = state.config.upload_dir.join(&stored_name);
    let report_path = state.config.report_dir.join(&report_name);

    tracing::info!(
        "Upload {} ({} bytes), storing as {}",
        filename,
        data.len(),
        upload_path.display()
    );

    // The pipeline is synchronous and may churn for a while on large files.
    let result = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ReportError> {
        std::fs::write(&upload_path, &data)?;
        let path = report::generate(&upload_path, Some(&report_path), report::DEFAULT_SAMPLE_ROWS)?;
        Ok(std::fs::read(path)?)
    })
    .await
    .map_err(|e| ReportError::FileProcessingError(e.to_string()))?;

    match result {
        Ok(pdf) => {
            let headers = [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", report_name),
                ),
            ];
            Ok((headers, pdf).into_response())
        }
        Err(
            err @ (ReportError::UnsupportedFormat(_)
            | ReportError::ParseFailure(_)
            | ReportError::EmptyDataset(_)
            | ReportError::InvalidInput(_)),
        ) => {
            tracing::warn!("Report generation rejected: {}", err);
            Ok(notice_redirect(&err.to_string()))
        }
        Err(other) => Err(other),
    }
}

fn notice_redirect(message: &str) -> Response {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("notice", message)
        .finish();
    Redirect::to(&format!("/?{}", query)).into_response()
}

/// Flattens the client-supplied name to a safe basename and prefixes a
/// timestamp so repeated uploads of the same file never collide.
fn stored_filename(original: &str) -> String {
    let name = PathBuf::from(original.replace('\\', "/"))
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", chrono::Utc::now().timestamp(), sanitized)
}

fn render_index(notice: Option<&str>) -> String {
    let banner = notice
        .map(|n| format!("<p class=\"notice\">{}</p>", escape_html(n)))
        .unwrap_or_default();
    format!(
        "<!doctype html>\n<html>\n<head><title>{title}</title></head>\n<body>\n\
         <h1>{title}</h1>\n{banner}\n\
         <form method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\">\n\
         <button type=\"submit\">Generate report</button>\n\
         </form>\n</body>\n</html>\n",
        title = "Data Report Generator",
        banner = banner,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_filename_strips_path_components() {
        let name = stored_filename("../../etc/passwd.csv");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
        assert!(name.ends_with("passwd.csv"));
    }

    #[test]
    fn stored_filename_replaces_odd_characters() {
        let name = stored_filename("my data (v2).xlsx");
        assert!(name.ends_with("my_data__v2_.xlsx"));
    }

    #[test]
    fn notice_is_escaped_into_the_page() {
        let page = render_index(Some("<script>x</script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>x"));
    }
}
