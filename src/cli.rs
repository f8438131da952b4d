//! Command-line front end: parse one PDF and print the result as JSON.

use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use crate::pipeline::labs::{ConfigError, LabParseError, LabReportParser, ParserConfig};

/// Extract structured lab-test records from a lab-report PDF
#[derive(Parser, Debug)]
#[command(name = "labvault", version, about)]
pub struct Cli {
    /// Lab report PDF to parse
    #[arg(value_name = "PDF")]
    pub pdf: PathBuf,

    /// JSON file overriding parser defaults (fallbacks, skip rules, minimum text length)
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Print single-line JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] LabParseError),

    #[error("Cannot serialize result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse the PDF the arguments name and render the document as JSON.
pub fn execute(args: &Cli) -> Result<String, CliError> {
    let config = match &args.config {
        Some(path) => ParserConfig::load(path)?,
        None => ParserConfig::default(),
    };

    let pdf_bytes = read_pdf(&args.pdf)?;
    tracing::info!(pdf = %args.pdf.display(), bytes = pdf_bytes.len(), "Parsing lab report");

    let parsed = LabReportParser::with_config(config).parse(&pdf_bytes)?;

    let json = if args.compact {
        serde_json::to_string(&parsed)?
    } else {
        serde_json::to_string_pretty(&parsed)?
    };
    Ok(json)
}

fn read_pdf(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })
}
