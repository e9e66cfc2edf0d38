//! JSON and Markdown report generation.
//!
//! JSON output is the flat region-to-summary object; Markdown adds the
//! request context around the same numbers.

use crate::analysis::total_breaches;
use crate::models::{RegionMetrics, RegionSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Context recorded alongside the computed metrics.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Where the dataset was loaded from.
    pub dataset: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of observations in the dataset.
    pub observations: usize,
    /// Breach threshold in milliseconds.
    pub threshold_ms: f64,
    /// Number of region entries in the request, duplicates included.
    pub regions_requested: usize,
}

/// A complete metrics report.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub metadata: ReportMetadata,
    pub metrics: RegionMetrics,
    /// Requested regions with no observations in the dataset.
    pub empty_regions: Vec<String>,
}

/// Generate the JSON response body.
pub fn generate_json(metrics: &RegionMetrics, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(metrics)?
    } else {
        serde_json::to_string(metrics)?
    };
    Ok(json)
}

/// Generate a complete Markdown report.
pub fn generate_markdown(report: &MetricsReport) -> String {
    let mut output = String::new();

    output.push_str("# Region Latency Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_metrics_section(&report.metrics));
    output.push_str(&generate_breach_section(
        &report.metrics,
        report.metadata.threshold_ms,
    ));
    output.push_str(&generate_empty_regions_section(&report.empty_regions));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Observations:** {}\n", metadata.observations));
    section.push_str(&format!("- **Threshold:** {} ms\n", metadata.threshold_ms));
    section.push_str(&format!(
        "- **Regions Requested:** {}\n",
        metadata.regions_requested
    ));
    section.push('\n');

    section
}

fn generate_metrics_section(metrics: &RegionMetrics) -> String {
    let mut section = String::new();

    section.push_str("## Regions\n\n");

    if metrics.is_empty() {
        section.push_str("No regions were requested.\n\n");
        return section;
    }

    section.push_str("| Region | Avg Latency (ms) | P95 Latency (ms) | Avg Uptime (%) | Breaches |\n");
    section.push_str("|:---|---:|---:|---:|---:|\n");

    for (region, summary) in metrics {
        section.push_str(&generate_region_row(region, summary));
    }
    section.push('\n');

    section
}

fn generate_region_row(region: &str, summary: &RegionSummary) -> String {
    format!(
        "| {} | {:.2} | {:.2} | {:.2} | {} |\n",
        region, summary.avg_latency, summary.p95_latency, summary.avg_uptime, summary.breaches
    )
}

fn generate_breach_section(metrics: &RegionMetrics, threshold_ms: f64) -> String {
    let mut section = String::new();

    section.push_str("## Breaches\n\n");

    let total = total_breaches(metrics);
    if total == 0 {
        section.push_str(&format!(
            "No observations exceeded {} ms.\n\n",
            threshold_ms
        ));
        return section;
    }

    section.push_str(&format!(
        "**{}** observations exceeded {} ms.\n\n",
        total, threshold_ms
    ));

    let mut breached: Vec<_> = metrics.iter().filter(|(_, s)| s.breaches > 0).collect();
    breached.sort_by_key(|(_, s)| std::cmp::Reverse(s.breaches));

    for (region, summary) in breached {
        section.push_str(&format!("- `{}`: {}\n", region, summary.breaches));
    }
    section.push('\n');

    section
}

fn generate_empty_regions_section(empty: &[String]) -> String {
    if empty.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Regions Without Data\n\n");
    for region in empty {
        section.push_str(&format!("- `{}`\n", region));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*P95 is nearest-rank: the sorted latency at index floor(0.95 * n).*\n".to_string()
}
