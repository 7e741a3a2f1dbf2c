use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use swagger_diff::DiffOptions;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Compare old and new Swagger documents, and print differences
#[derive(Parser)]
#[clap(about, version)]
struct Args {
    /// The old document
    lhs: PathBuf,
    /// The new document
    rhs: PathBuf,
    /// How to print the differences
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// How deep schemas may nest before a body comparison is given up
    #[arg(long, env = "SWAGGER_DIFF_MAX_DEPTH", default_value_t = DiffOptions::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Write the report to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn read_document(path: &Path) -> Result<serde_json::Value, Error> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let lhs = read_document(&args.lhs)?;
    let rhs = read_document(&args.rhs)?;

    let options = DiffOptions {
        max_depth: args.max_depth,
    };
    let diff = swagger_diff::diff_with_options(lhs, rhs, options)?;

    let mut out: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match args.format {
        OutputFormat::Text => write!(out, "{diff}")?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &diff)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}
