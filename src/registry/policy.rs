//! Promotion gates
//!
//! A [`PromotionPolicy`] is a set of metric floors checked whenever a
//! version moves into Staging or Production. Registration itself is never
//! gated; a weak model may sit in the registry, it just cannot be promoted.

use super::ModelVersion;
use serde::{Deserialize, Serialize};

/// Minimum acceptable held-out ROC-AUC for the default policy
pub const DEFAULT_ROC_AUC_FLOOR: f64 = 0.70;

/// One required metric with its minimum value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFloor {
    pub name: String,
    pub min: f64,
}

/// Metric floors applied to promotions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionPolicy {
    pub floors: Vec<MetricFloor>,
}

impl Default for PromotionPolicy {
    /// The production default: `roc_auc >= 0.70`
    fn default() -> Self {
        Self {
            floors: vec![MetricFloor {
                name: "roc_auc".to_string(),
                min: DEFAULT_ROC_AUC_FLOOR,
            }],
        }
    }
}

impl PromotionPolicy {
    /// A policy with no requirements
    #[must_use]
    pub fn unrestricted() -> Self {
        Self { floors: Vec::new() }
    }

    /// Add a metric floor
    #[must_use]
    pub fn require(mut self, name: &str, min: f64) -> Self {
        self.floors.push(MetricFloor {
            name: name.to_string(),
            min,
        });
        self
    }

    /// Check a version against every floor; a missing metric fails its floor
    #[must_use]
    pub fn check(&self, version: &ModelVersion) -> PolicyCheckResult {
        let mut failures = Vec::new();
        for floor in &self.floors {
            match version.metrics.get(&floor.name) {
                Some(&value) if value >= floor.min => {}
                Some(&value) => {
                    failures.push(format!(
                        "metric '{}' = {value} is below the floor {}",
                        floor.name, floor.min
                    ));
                }
                None => failures.push(format!("missing required metric '{}'", floor.name)),
            }
        }
        PolicyCheckResult {
            passed: failures.is_empty(),
            failures,
        }
    }
}

/// Outcome of a policy check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckResult {
    pub passed: bool,
    pub failures: Vec<String>,
}
