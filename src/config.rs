use anyhow::Result;
use dotenvy::dotenv;
use std::path::PathBuf;

fn default_max_upload_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub report_dir: PathBuf,
    pub max_upload_size: usize,
    pub port: u16,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let upload_dir = std::env::var("TABREPORT_UPLOAD_DIR")
            .unwrap_or_else(|_| "uploads".to_string())
            .into();
        let report_dir = std::env::var("TABREPORT_REPORT_DIR")
            .unwrap_or_else(|_| "reports".to_string())
            .into();
        let max_upload_size = std::env::var("TABREPORT_MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_max_upload_size);
        let port = std::env::var("TABREPORT_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Ok(Config {
            upload_dir,
            report_dir,
            max_upload_size,
            port,
        })
    }
}
