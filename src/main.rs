use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Generate a PDF report from a tabular data file.
#[derive(Debug, Parser)]
#[command(name = "tabreport", version, about)]
struct Cli {
    /// Path to the input data file
    input: PathBuf,

    /// Path to the output PDF file (default: <input name>_report.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of sample rows to show in the report
    #[arg(long, default_value_t = tabreport::DEFAULT_SAMPLE_ROWS)]
    sample_rows: usize,
}

fn main() -> Result<()> {
    tabreport::logging::init_logging()?;
    let cli = Cli::parse();

    let output = tabreport::generate(&cli.input, cli.output.as_deref(), cli.sample_rows)?;
    println!("Report saved to: {}", output.display());
    Ok(())
}
