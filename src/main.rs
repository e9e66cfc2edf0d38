//! RegionStat - per-region latency and uptime statistics
//!
//! A CLI tool that answers one request against a fixed observation
//! dataset: for each requested region, the average latency, nearest-rank
//! p95 latency, average uptime and the number of threshold breaches.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, dataset, I/O)
//!   2 - Malformed request (missing or mistyped field)
//!   3 - Breaches found with --fail-on-breach

mod analysis;
mod cli;
mod config;
mod dataset;
mod models;
mod report;
mod request;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use dataset::Dataset;
use models::MetricsRequest;
use report::{MetricsReport, ReportMetadata};
use request::RequestError;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EXIT_INVALID_REQUEST: i32 = 2;
const EXIT_BREACHES: i32 = 3;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config)?;

    info!("RegionStat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(&args, &config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .regionstat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging on stderr; `RUST_LOG` overrides the CLI level.
fn init_logging(args: &Args, config: &Config) -> Result<()> {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Validate the request, compute the metrics and emit the report.
fn run(args: &Args, config: &Config) -> Result<i32> {
    if args.list_regions {
        let dataset = Dataset::load(config.dataset_path()?)?;
        return handle_list_regions(&dataset);
    }

    // Reject malformed requests before touching the dataset
    let request = match read_request(args)? {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected request: {}", e);
            eprintln!("Invalid request body: {}", e);
            return Ok(EXIT_INVALID_REQUEST);
        }
    };
    debug!(
        "Request: {} regions, threshold {}ms",
        request.regions.len(),
        request.threshold_ms
    );

    let dataset_path = config.dataset_path()?;
    let dataset = Dataset::load(dataset_path)?;
    let metrics = analysis::compute_request(&dataset, &request);
    let breaches = analysis::total_breaches(&metrics);

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json(&metrics, config.report.pretty)?,
        OutputFormat::Markdown => {
            let report = MetricsReport {
                metadata: ReportMetadata {
                    dataset: dataset_path.display().to_string(),
                    generated_at: Utc::now(),
                    observations: dataset.len(),
                    threshold_ms: request.threshold_ms,
                    regions_requested: request.regions.len(),
                },
                empty_regions: analysis::empty_regions(dataset.observations(), &metrics),
                metrics,
            };
            report::generate_markdown(&report)
        }
    };

    match config.report.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => println!("{}", output),
    }

    if args.fail_on_breach && breaches > 0 {
        eprintln!(
            "{} observations exceeded {}ms. Failing (exit code {}).",
            breaches, request.threshold_ms, EXIT_BREACHES
        );
        return Ok(EXIT_BREACHES);
    }

    Ok(0)
}

/// Read the request from `--request` (file or stdin) or from flags.
///
/// The outer error is an I/O failure; the inner one a malformed request.
fn read_request(args: &Args) -> Result<Result<MetricsRequest, RequestError>> {
    let body = match args.request {
        Some(_) if args.reads_request_from_stdin() => {
            std::io::read_to_string(std::io::stdin()).context("Failed to read request from stdin")?
        }
        Some(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))?,
        None => return Ok(args.raw_request().validate()),
    };

    Ok(request::parse_request(&body))
}

/// Handle --list-regions: print each region with its observation count.
fn handle_list_regions(dataset: &Dataset) -> Result<i32> {
    let regions = dataset.regions();

    if regions.is_empty() {
        println!("No observations in dataset.");
        return Ok(0);
    }

    for region in regions {
        println!("{}\t{}", region, dataset.count_for(region));
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: ignoring {}: {:#}", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
