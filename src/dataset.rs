//! Observation dataset loading.
//!
//! The dataset is read once at startup and shared read-only afterwards.
//! Clones of a [`Dataset`] share the same underlying slice.

use crate::models::Observation;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An immutable, shareable collection of observations.
#[derive(Debug, Clone)]
pub struct Dataset {
    observations: Arc<[Observation]>,
}

impl Dataset {
    /// Creates a dataset from already-parsed observations.
    pub fn new(observations: Vec<Observation>) -> Self {
        Self {
            observations: observations.into(),
        }
    }

    /// Parse a dataset from a JSON array of observation records.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let observations: Vec<Observation> =
            serde_json::from_str(content).context("Dataset must be a JSON array of observations")?;
        Ok(Self::new(observations))
    }

    /// Load a dataset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Reading dataset from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;

        let dataset = Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse dataset file: {}", path.display()))?;

        if dataset.is_empty() {
            warn!("Dataset {} contains no observations", path.display());
        } else {
            info!(
                "Loaded {} observations across {} regions",
                dataset.len(),
                dataset.regions().len()
            );
        }

        Ok(dataset)
    }

    /// All observations, in file order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns true if there are no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct region names in first-seen order.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.observations
            .iter()
            .map(|o| o.region.as_str())
            .filter(|r| seen.insert(*r))
            .collect()
    }

    /// Number of observations recorded for a region.
    pub fn count_for(&self, region: &str) -> usize {
        self.observations
            .iter()
            .filter(|o| o.region == region)
            .count()
    }
}
