//! Model lifecycle stages

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a registered model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelStage {
    /// Registered but not assigned to any stage
    None,
    /// Being validated before rollout
    Staging,
    /// Serving traffic
    Production,
    /// Retired from active use
    Archived,
}

impl ModelStage {
    /// Whether a transition to `target` is allowed
    #[must_use]
    pub fn can_transition_to(&self, target: ModelStage) -> bool {
        match (self, target) {
            // any stage can be archived
            (_, ModelStage::Archived) => true,
            (ModelStage::None, ModelStage::Staging) => true,
            (ModelStage::Staging, ModelStage::Production) => true,
            // rollback
            (ModelStage::Production, ModelStage::Staging) => true,
            // restore goes back through validation
            (ModelStage::Archived, ModelStage::Staging) => true,
            // same stage is a no-op
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStage::None => "None",
            ModelStage::Staging => "Staging",
            ModelStage::Production => "Production",
            ModelStage::Archived => "Archived",
        }
    }

    /// Parse a stage name, case-insensitively
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(ModelStage::None),
            "staging" => Some(ModelStage::Staging),
            "production" => Some(ModelStage::Production),
            "archived" => Some(ModelStage::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
