//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and the request built from flags.

use crate::request::RawRequest;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::path::PathBuf;

/// RegionStat - per-region latency and uptime statistics
///
/// Summarize average latency, nearest-rank p95 latency, average uptime
/// and threshold breaches for a set of regions.
///
/// Examples:
///   regionstat --data latency.json --regions apac,emea --threshold-ms 180
///   regionstat --data latency.json --request request.json
///   cat request.json | regionstat --data latency.json --request -
///   regionstat --data latency.json --list-regions
///   regionstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Observation dataset (JSON array of records)
    ///
    /// Defaults to the [dataset] path in .regionstat.toml.
    #[arg(short, long, value_name = "FILE", env = "REGIONSTAT_DATA")]
    pub data: Option<PathBuf>,

    /// JSON request body with "regions" and "threshold_ms" ("-" for stdin)
    #[arg(
        short,
        long,
        value_name = "FILE",
        conflicts_with_all = ["regions", "threshold_ms"]
    )]
    pub request: Option<PathBuf>,

    /// Regions to summarize (comma-separated)
    #[arg(long, value_name = "REGIONS", value_delimiter = ',')]
    pub regions: Option<Vec<String>>,

    /// Latency above which an observation counts as a breach
    #[arg(long, value_name = "MS", allow_negative_numbers = true)]
    pub threshold_ms: Option<f64>,

    /// Output format (json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Emit single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Exit with code 3 if any observation breaches the threshold
    #[arg(long)]
    pub fail_on_breach: bool,

    /// List the regions present in the dataset and exit
    #[arg(long)]
    pub list_regions: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .regionstat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .regionstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON region-to-summary object (default)
    #[default]
    Json,
    /// Markdown report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref request) = self.request {
            if !self.reads_request_from_stdin() && !request.is_file() {
                return Err(format!("Request file does not exist: {}", request.display()));
            }
        }

        if let Some(ref data) = self.data {
            if data.is_dir() {
                return Err(format!("Dataset path is a directory: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns true when the request body should be read from stdin.
    pub fn reads_request_from_stdin(&self) -> bool {
        self.request.as_deref() == Some(std::path::Path::new("-"))
    }

    /// Build an unvalidated request from `--regions` and `--threshold-ms`.
    ///
    /// Absent flags stay absent so validation reports them the same way
    /// as a JSON body missing the field.
    pub fn raw_request(&self) -> RawRequest {
        RawRequest {
            regions: self.regions.as_ref().map(|regions| {
                Value::Array(regions.iter().cloned().map(Value::String).collect())
            }),
            threshold_ms: self.threshold_ms.map(|t| match Number::from_f64(t) {
                Some(n) => Value::Number(n),
                None => Value::String(t.to_string()),
            }),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
