//! Model locators
//!
//! A locator names a model artifact one of four ways:
//!
//! - `models:/<name>/<version>` an exact registered version
//! - `models:/<name>/<stage>` the newest version at a lifecycle stage
//! - `runs:/<run-id>` the artifact a training run produced
//! - any other string is taken as a filesystem path

use super::{ModelRegistry, ModelStage, RegistryError, Result};
use std::path::{Path, PathBuf};

/// Parsed model locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocator {
    Version { name: String, version: u32 },
    Stage { name: String, stage: ModelStage },
    Run(String),
    Path(PathBuf),
}

impl ModelLocator {
    /// Parse a locator string
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("models:/") {
            let (name, selector) = rest
                .split_once('/')
                .ok_or_else(|| RegistryError::BadLocator(s.to_string()))?;
            if name.is_empty() || selector.is_empty() {
                return Err(RegistryError::BadLocator(s.to_string()));
            }
            if let Ok(version) = selector.parse::<u32>() {
                return Ok(ModelLocator::Version {
                    name: name.to_string(),
                    version,
                });
            }
            let stage = ModelStage::parse(selector)
                .ok_or_else(|| RegistryError::BadLocator(s.to_string()))?;
            return Ok(ModelLocator::Stage {
                name: name.to_string(),
                stage,
            });
        }
        if let Some(run_id) = s.strip_prefix("runs:/") {
            if run_id.is_empty() || run_id.contains('/') {
                return Err(RegistryError::BadLocator(s.to_string()));
            }
            return Ok(ModelLocator::Run(run_id.to_string()));
        }
        if s.is_empty() {
            return Err(RegistryError::BadLocator(s.to_string()));
        }
        Ok(ModelLocator::Path(PathBuf::from(s)))
    }

    /// Resolve to the artifact path, consulting the registry for `models:/`
    /// locators and the store layout for `runs:/`
    pub fn resolve(&self, registry: &dyn ModelRegistry, store_root: &Path) -> Result<PathBuf> {
        match self {
            ModelLocator::Version { name, version } => Ok(PathBuf::from(
                registry.get_model(name, *version)?.artifact_path,
            )),
            ModelLocator::Stage { name, stage } => Ok(PathBuf::from(
                registry.get_latest_by_stage(name, *stage)?.artifact_path,
            )),
            ModelLocator::Run(run_id) => Ok(store_root
                .join("runs")
                .join(run_id)
                .join("artifacts")
                .join("model.json")),
            ModelLocator::Path(path) => Ok(path.clone()),
        }
    }
}

impl std::fmt::Display for ModelLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelLocator::Version { name, version } => write!(f, "models:/{name}/{version}"),
            ModelLocator::Stage { name, stage } => write!(f, "models:/{name}/{stage}"),
            ModelLocator::Run(run_id) => write!(f, "runs:/{run_id}"),
            ModelLocator::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use std::collections::BTreeMap;

    #[test]
    fn parses_every_form() {
        assert_eq!(
            ModelLocator::parse("models:/hospital_readmission/3").unwrap(),
            ModelLocator::Version {
                name: "hospital_readmission".to_string(),
                version: 3
            }
        );
        assert_eq!(
            ModelLocator::parse("models:/hospital_readmission/Production").unwrap(),
            ModelLocator::Stage {
                name: "hospital_readmission".to_string(),
                stage: ModelStage::Production
            }
        );
        assert_eq!(
            ModelLocator::parse("runs:/run-00ff").unwrap(),
            ModelLocator::Run("run-00ff".to_string())
        );
        assert_eq!(
            ModelLocator::parse("store/m/v1/model.json").unwrap(),
            ModelLocator::Path(PathBuf::from("store/m/v1/model.json"))
        );
    }

    #[test]
    fn rejects_malformed_locators() {
        for bad in ["models:/only-name", "models:/name/NotAStage", "runs:/", ""] {
            assert!(
                matches!(ModelLocator::parse(bad), Err(RegistryError::BadLocator(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn resolves_against_the_registry() {
        let mut registry = InMemoryRegistry::new();
        let metrics = BTreeMap::from([("roc_auc".to_string(), 0.75)]);
        registry
            .register_model("m", Path::new("store/m/v1/model.json"), "run-1", &metrics)
            .unwrap();
        registry
            .transition_stage("m", 1, ModelStage::Staging, None)
            .unwrap();

        let store = Path::new("store");
        let by_version = ModelLocator::parse("models:/m/1").unwrap();
        assert_eq!(
            by_version.resolve(&registry, store).unwrap(),
            PathBuf::from("store/m/v1/model.json")
        );

        let by_stage = ModelLocator::parse("models:/m/Staging").unwrap();
        assert_eq!(
            by_stage.resolve(&registry, store).unwrap(),
            PathBuf::from("store/m/v1/model.json")
        );

        let by_run = ModelLocator::parse("runs:/run-1").unwrap();
        assert_eq!(
            by_run.resolve(&registry, store).unwrap(),
            PathBuf::from("store/runs/run-1/artifacts/model.json")
        );
    }

    #[test]
    fn display_round_trips() {
        for s in [
            "models:/m/2",
            "models:/m/Production",
            "runs:/run-1",
            "store/model.json",
        ] {
            let locator = ModelLocator::parse(s).unwrap();
            assert_eq!(locator.to_string(), s);
        }
    }
}
