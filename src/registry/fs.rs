//! Filesystem registry backend
//!
//! Layout under the store root:
//!
//! ```text
//! store/
//!   registry.json                 index of every version and the policy
//!   <model-name>/v<N>/model.json  immutable artifact copies
//! ```
//!
//! Registration copies the artifact into its versioned directory, so later
//! runs overwriting their own outputs cannot corrupt a released version.
//! Every mutation rewrites the index file.

use super::{
    apply_transition, ModelRegistry, ModelStage, ModelVersion, PromotionPolicy, RegistryError,
    Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "registry.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Index {
    models: BTreeMap<String, Vec<ModelVersion>>,
    #[serde(default)]
    policy: Option<PromotionPolicy>,
}

/// Registry persisted under a store directory
#[derive(Debug)]
pub struct FsRegistry {
    root: PathBuf,
    index: Index,
    policy: PromotionPolicy,
}

impl FsRegistry {
    /// Open (or initialize) the registry under `root` with the default
    /// promotion policy
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_policy(root, PromotionPolicy::default())
    }

    /// Open with an explicit policy. A policy stored in the index wins over
    /// `fallback`, so a registry keeps its configured gates across opens.
    pub fn open_with_policy(root: impl AsRef<Path>, fallback: PromotionPolicy) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let index_path = root.join(INDEX_FILE);
        let index: Index = if index_path.exists() {
            serde_json::from_str(&fs::read_to_string(&index_path)?)?
        } else {
            Index::default()
        };
        let policy = index.policy.clone().unwrap_or(fallback);
        Ok(Self {
            root,
            index,
            policy,
        })
    }

    /// Replace the promotion policy and persist it
    pub fn set_policy(&mut self, policy: PromotionPolicy) -> Result<()> {
        self.policy = policy;
        self.flush()
    }

    #[must_use]
    pub fn policy(&self) -> &PromotionPolicy {
        &self.policy
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.root.join(name).join(format!("v{version}"))
    }

    fn flush(&mut self) -> Result<()> {
        self.index.policy = Some(self.policy.clone());
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(&self.index)?;
        fs::write(self.root.join(INDEX_FILE), json)?;
        Ok(())
    }
}

impl ModelRegistry for FsRegistry {
    fn register_model(
        &mut self,
        name: &str,
        artifact: &Path,
        run_id: &str,
        metrics: &BTreeMap<String, f64>,
    ) -> Result<ModelVersion> {
        let version = self
            .index
            .models
            .get(name)
            .map_or(0, |v| v.len() as u32)
            + 1;

        let dir = self.version_dir(name, version);
        fs::create_dir_all(&dir)?;
        let dest = dir.join("model.json");
        fs::copy(artifact, &dest)?;

        let mut entry = ModelVersion::new(name, version, run_id, &dest.to_string_lossy());
        entry.metrics = metrics.clone();
        self.index
            .models
            .entry(name.to_string())
            .or_default()
            .push(entry.clone());
        self.flush()?;
        Ok(entry)
    }

    fn get_model(&self, name: &str, version: u32) -> Result<ModelVersion> {
        let versions = self
            .index
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
        self.index
            .models
            .get(name)
            .and_then(|v| v.last())
            .cloned()
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    fn get_latest_by_stage(&self, name: &str, stage: ModelStage) -> Result<ModelVersion> {
        let versions = self
            .index
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
        self.index.models.keys().cloned().collect()
    }

    fn list_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        self.index
            .models
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
        let entry = self
            .index
            .models
            .get_mut(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or(RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })?;
        apply_transition(entry, target, &self.policy, promoted_by)?;
        let result = entry.clone();
        self.flush()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_artifact(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("model.json");
        fs::write(&path, content).unwrap();
        path
    }

    fn auc(value: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("roc_auc".to_string(), value)])
    }

    #[test]
    fn registration_copies_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "{\"v\":1}");
        let store = dir.path().join("store");

        let mut registry = FsRegistry::open(&store).unwrap();
        let v1 = registry
            .register_model("hospital_readmission", &artifact, "run-1", &auc(0.72))
            .unwrap();

        let copied = store.join("hospital_readmission").join("v1").join("model.json");
        assert_eq!(v1.artifact_path, copied.to_string_lossy());
        assert_eq!(fs::read_to_string(&copied).unwrap(), "{\"v\":1}");

        // mutating the source artifact leaves the registered copy intact
        fs::write(&artifact, "{\"v\":2}").unwrap();
        assert_eq!(fs::read_to_string(&copied).unwrap(), "{\"v\":1}");
    }

    #[test]
    fn index_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "{}");
        let store = dir.path().join("store");

        {
            let mut registry = FsRegistry::open(&store).unwrap();
            registry
                .register_model("hospital_readmission", &artifact, "run-1", &auc(0.72))
                .unwrap();
            registry
                .transition_stage("hospital_readmission", 1, ModelStage::Staging, Some("ci"))
                .unwrap();
        }

        let registry = FsRegistry::open(&store).unwrap();
        let v1 = registry.get_model("hospital_readmission", 1).unwrap();
        assert_eq!(v1.stage, ModelStage::Staging);
        assert_eq!(v1.promoted_by.as_deref(), Some("ci"));
        assert_eq!(registry.list_models(), vec!["hospital_readmission".to_string()]);
    }

    #[test]
    fn stored_policy_wins_over_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        {
            let mut registry = FsRegistry::open(&store).unwrap();
            registry
                .set_policy(PromotionPolicy::unrestricted().require("roc_auc", 0.95))
                .unwrap();
        }

        let artifact = write_artifact(dir.path(), "{}");
        let mut registry = FsRegistry::open(&store).unwrap();
        registry
            .register_model("hospital_readmission", &artifact, "run-1", &auc(0.80))
            .unwrap();
        assert!(matches!(
            registry.transition_stage("hospital_readmission", 1, ModelStage::Staging, None),
            Err(RegistryError::PolicyFailed(_))
        ));
    }

    #[test]
    fn versions_are_assigned_per_model() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(dir.path(), "{}");
        let mut registry = FsRegistry::open(dir.path().join("store")).unwrap();

        let a = registry
            .register_model("model-a", &artifact, "run-1", &auc(0.7))
            .unwrap();
        let b = registry
            .register_model("model-b", &artifact, "run-2", &auc(0.7))
            .unwrap();
        assert_eq!(a.version, 1);
        assert_eq!(b.version, 1);
    }
}
