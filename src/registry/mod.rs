//! Model registry
//!
//! Named models with monotonically increasing versions, each holding an
//! immutable artifact path, the run that produced it, and a lifecycle
//! stage. Stage moves are validated against
//! [`ModelStage::can_transition_to`] and, for moves into Staging or
//! Production, against the registry's [`PromotionPolicy`].

mod fs;
mod locator;
mod policy;
mod stage;

pub use fs::FsRegistry;
pub use locator::ModelLocator;
pub use policy::{MetricFloor, PolicyCheckResult, PromotionPolicy, DEFAULT_ROC_AUC_FLOOR};
pub use stage::ModelStage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Version not found: {name} v{version}")]
    VersionNotFound { name: String, version: u32 },

    #[error("No version of '{name}' is in stage {stage}")]
    NoVersionAtStage { name: String, stage: ModelStage },

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: ModelStage, to: ModelStage },

    #[error("Promotion blocked: {}", .0.join("; "))]
    PolicyFailed(Vec<String>),

    #[error("Cannot parse model locator '{0}'")]
    BadLocator(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry index error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// One registered version of a named model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    /// Monotonically increasing, starting at 1
    pub version: u32,
    pub stage: ModelStage,
    /// Run that produced this version
    pub run_id: String,
    /// Path of the immutable artifact copy
    pub artifact_path: String,
    pub metrics: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
    pub promoted_at: Option<DateTime<Utc>>,
    pub promoted_by: Option<String>,
}

impl ModelVersion {
    pub fn new(name: &str, version: u32, run_id: &str, artifact_path: &str) -> Self {
        Self {
            name: name.to_string(),
            version,
            stage: ModelStage::None,
            run_id: run_id.to_string(),
            artifact_path: artifact_path.to_string(),
            metrics: BTreeMap::new(),
            created_at: Utc::now(),
            promoted_at: None,
            promoted_by: None,
        }
    }
}

/// Registry operations over named, versioned models
pub trait ModelRegistry {
    /// Register a new version of `name`, recording the producing run and
    /// held-out metrics. Returns the assigned version.
    fn register_model(
        &mut self,
        name: &str,
        artifact: &std::path::Path,
        run_id: &str,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<ModelVersion>;

    fn get_model(&self, name: &str, version: u32) -> Result<ModelVersion>;

    /// Highest registered version of `name`
    fn get_latest(&self, name: &str) -> Result<ModelVersion>;

    /// Highest version of `name` currently in `stage`
    fn get_latest_by_stage(&self, name: &str, stage: ModelStage) -> Result<ModelVersion>;

    /// Registered model names, sorted
    fn list_models(&self) -> Vec<String>;

    fn list_versions(&self, name: &str) -> Result<Vec<ModelVersion>>;

    /// Move a version to `target`, enforcing the transition graph and the
    /// promotion policy for moves into Staging or Production
    fn transition_stage(
        &mut self,
        name: &str,
        version: u32,
        target: ModelStage,
        promoted_by: Option<&str>,
    ) -> Result<ModelVersion>;
}

/// Shared transition logic for registry backends
fn apply_transition(
    entry: &mut ModelVersion,
    target: ModelStage,
    policy: &PromotionPolicy,
    promoted_by: Option<&str>,
) -> Result<()> {
    if !entry.stage.can_transition_to(target) {
        return Err(RegistryError::InvalidTransition {
            from: entry.stage,
            to: target,
        });
    }
    if matches!(target, ModelStage::Staging | ModelStage::Production) {
        let check = policy.check(entry);
        if !check.passed {
            return Err(RegistryError::PolicyFailed(check.failures));
        }
    }
    entry.stage = target;
    entry.promoted_at = Some(Utc::now());
    entry.promoted_by = promoted_by.map(String::from);
    Ok(())
}

/// In-memory registry for tests; artifact paths are recorded verbatim
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    models: BTreeMap<String, Vec<ModelVersion>>,
    policy: PromotionPolicy,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: PromotionPolicy) -> Self {
        Self {
            models: BTreeMap::new(),
            policy,
        }
    }
}

impl ModelRegistry for InMemoryRegistry {
    fn register_model(
        &mut self,
        name: &str,
        artifact: &std::path::Path,
        run_id: &str,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<ModelVersion> {
        let versions = self.models.entry(name.to_string()).or_default();
        let version = versions.len() as u32 + 1;
        let mut entry = ModelVersion::new(name, version, run_id, &artifact.to_string_lossy());
        entry.metrics = metrics.clone();
        versions.push(entry.clone());
        Ok(entry)
    }

    fn get_model(&self, name: &str, version: u32) -> Result<ModelVersion> {
        let versions = self
            .models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
        versions
            .iter()
            .find(|v| v.version == version)
            .cloned()
            .ok_or(RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })
    }

    fn get_latest(&self, name: &str) -> Result<ModelVersion> {
        self.models
            .get(name)
            .and_then(|v| v.last())
            .cloned()
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    fn get_latest_by_stage(&self, name: &str, stage: ModelStage) -> Result<ModelVersion> {
        let versions = self
            .models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
        versions
            .iter()
            .rev()
            .find(|v| v.stage == stage)
            .cloned()
            .ok_or(RegistryError::NoVersionAtStage {
                name: name.to_string(),
                stage,
            })
    }

    fn list_models(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    fn list_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    fn transition_stage(
        &mut self,
        name: &str,
        version: u32,
        target: ModelStage,
        promoted_by: Option<&str>,
    ) -> Result<ModelVersion> {
        let versions = self
            .models
            .get_mut(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
        let entry = versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or(RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })?;
        apply_transition(entry, target, &self.policy, promoted_by)?;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn metrics(auc: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("roc_auc".to_string(), auc)])
    }

    fn registry_with_one_version(auc: f64) -> InMemoryRegistry {
        let mut registry = InMemoryRegistry::new();
        registry
            .register_model(
                "hospital_readmission",
                Path::new("store/v1/model.json"),
                "run-1",
                &metrics(auc),
            )
            .unwrap();
        registry
    }

    #[test]
    fn versions_increase_monotonically() {
        let mut registry = registry_with_one_version(0.72);
        let second = registry
            .register_model(
                "hospital_readmission",
                Path::new("store/v2/model.json"),
                "run-2",
                &metrics(0.74),
            )
            .unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(registry.get_latest("hospital_readmission").unwrap().version, 2);
    }

    #[test]
    fn weak_models_register_but_cannot_promote() {
        let mut registry = registry_with_one_version(0.55);
        // registration itself is never gated
        assert_eq!(registry.get_latest("hospital_readmission").unwrap().stage, ModelStage::None);

        let err = registry
            .transition_stage("hospital_readmission", 1, ModelStage::Staging, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::PolicyFailed(_)));
    }

    #[test]
    fn promotion_path_records_who_and_when() {
        let mut registry = registry_with_one_version(0.72);
        registry
            .transition_stage("hospital_readmission", 1, ModelStage::Staging, Some("mlops"))
            .unwrap();
        let promoted = registry
            .transition_stage("hospital_readmission", 1, ModelStage::Production, Some("mlops"))
            .unwrap();

        assert_eq!(promoted.stage, ModelStage::Production);
        assert_eq!(promoted.promoted_by.as_deref(), Some("mlops"));
        assert!(promoted.promoted_at.is_some());
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let mut registry = registry_with_one_version(0.9);
        let err = registry
            .transition_stage("hospital_readmission", 1, ModelStage::Production, None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    }

    #[test]
    fn archiving_ignores_the_policy() {
        let mut registry = registry_with_one_version(0.40);
        let archived = registry
            .transition_stage("hospital_readmission", 1, ModelStage::Archived, None)
            .unwrap();
        assert_eq!(archived.stage, ModelStage::Archived);
    }

    #[test]
    fn latest_by_stage_prefers_newer_versions() {
        let mut registry = registry_with_one_version(0.72);
        registry
            .register_model(
                "hospital_readmission",
                Path::new("store/v2/model.json"),
                "run-2",
                &metrics(0.75),
            )
            .unwrap();
        for v in [1, 2] {
            registry
                .transition_stage("hospital_readmission", v, ModelStage::Staging, None)
                .unwrap();
        }

        let staged = registry
            .get_latest_by_stage("hospital_readmission", ModelStage::Staging)
            .unwrap();
        assert_eq!(staged.version, 2);
        assert!(matches!(
            registry.get_latest_by_stage("hospital_readmission", ModelStage::Production),
            Err(RegistryError::NoVersionAtStage { .. })
        ));
    }

    #[test]
    fn unknown_names_and_versions_error() {
        let registry = InMemoryRegistry::new();
        assert!(matches!(
            registry.get_latest("nope"),
            Err(RegistryError::ModelNotFound(_))
        ));
        let registry = registry_with_one_version(0.8);
        assert!(matches!(
            registry.get_model("hospital_readmission", 9),
            Err(RegistryError::VersionNotFound { version: 9, .. })
        ));
    }
}
