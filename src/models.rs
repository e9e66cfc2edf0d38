//! Data models for region statistics.
//!
//! This module contains the observation records the dataset is made of,
//! the validated request type and the per-region summary returned to callers.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// A single latency/uptime sample tagged with a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Region identifier (e.g. "us-east").
    pub region: String,
    /// Observed latency in milliseconds.
    pub latency_ms: f64,
    /// Observed uptime percentage.
    pub uptime_pct: f64,
}

impl Observation {
    /// Creates a new observation.
    #[allow(dead_code)] // Used to build datasets in code rather than from JSON
    pub fn new(region: impl Into<String>, latency_ms: f64, uptime_pct: f64) -> Self {
        Self {
            region: region.into(),
            latency_ms,
            uptime_pct,
        }
    }
}

/// A validated metrics request.
///
/// Produced by [`crate::request::RawRequest::validate`]; both fields are
/// guaranteed present and well-typed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRequest {
    /// Regions to summarize, in request order. Duplicates are allowed.
    pub regions: Vec<String>,
    /// Latency above which an observation counts as a breach.
    pub threshold_ms: f64,
}

/// Summary statistics for one region.
///
/// The all-zero summary serializes its statistics as integer `0`
/// rather than `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RegionSummary {
    /// Mean latency, rounded to 2 decimal places.
    pub avg_latency: f64,
    /// Nearest-rank 95th percentile latency, rounded to 2 decimal places.
    pub p95_latency: f64,
    /// Mean uptime, rounded to 2 decimal places.
    pub avg_uptime: f64,
    /// Number of observations with latency strictly above the threshold.
    pub breaches: usize,
}

impl RegionSummary {
    /// The summary reported for a region with no observations.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns true if this is the all-zero summary.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Serialize for RegionSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RegionSummary", 4)?;
        if self.is_zero() {
            state.serialize_field("avg_latency", &0u8)?;
            state.serialize_field("p95_latency", &0u8)?;
            state.serialize_field("avg_uptime", &0u8)?;
        } else {
            state.serialize_field("avg_latency", &self.avg_latency)?;
            state.serialize_field("p95_latency", &self.p95_latency)?;
            state.serialize_field("avg_uptime", &self.avg_uptime)?;
        }
        state.serialize_field("breaches", &self.breaches)?;
        state.end()
    }
}

/// Region identifier to summary mapping.
pub type RegionMetrics = BTreeMap<String, RegionSummary>;
