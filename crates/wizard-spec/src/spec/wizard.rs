use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ObjectSchema;
use crate::spec::field::FieldConfig;

pub type StepId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wizard '{0}' has no steps")]
    NoSteps(String),
    #[error("step id '{0}' is used more than once")]
    DuplicateStep(String),
    #[error("failed to parse wizard config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How the user may move between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    /// Forward movement one step at a time, gated by validation.
    #[default]
    Linear,
    /// Any step may be visited at any time.
    #[serde(alias = "non-linear")]
    NonLinear,
}

/// Which storage scope holds the persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Survives across sessions.
    #[default]
    #[serde(alias = "localStorage")]
    Local,
    /// Lives only as long as the hosting session.
    #[serde(alias = "sessionStorage")]
    Session,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,
    pub storage_key: String,
    #[serde(default)]
    pub storage_type: StorageType,
    #[serde(default)]
    pub clear_on_submit: bool,
    #[serde(default)]
    pub restore_on_mount: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitMethod {
    #[default]
    Post,
    Put,
    Patch,
}

impl SubmitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMethod::Post => "POST",
            SubmitMethod::Put => "PUT",
            SubmitMethod::Patch => "PATCH",
        }
    }
}

pub const DEFAULT_SUBMIT_ERROR: &str = "Failed to submit wizard";
pub const DEFAULT_INCOMPLETE_MESSAGE: &str = "Please complete all required steps: {{steps}}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SubmitConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_text: Option<String>,
    /// Submission is skipped entirely when no endpoint is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub method: SubmitMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Handlebars template; `{{steps}}` expands to the missing step titles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl SubmitConfig {
    pub fn error_message(&self) -> &str {
        self.error_message.as_deref().unwrap_or(DEFAULT_SUBMIT_ERROR)
    }

    pub fn incomplete_message(&self) -> &str {
        self.incomplete_message
            .as_deref()
            .unwrap_or(DEFAULT_INCOMPLETE_MESSAGE)
    }
}

/// One page of a wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WizardStep {
    pub id: StepId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub skippable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ObjectSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,
}

fn default_true() -> bool {
    true
}

/// Top-level wizard definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WizardConfig {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub navigation_mode: NavigationMode,
    pub steps: Vec<WizardStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<SubmitConfig>,
    #[serde(default = "default_true")]
    pub allow_back_navigation: bool,
    #[serde(default = "default_true")]
    pub show_progress_bar: bool,
    #[serde(default = "default_true")]
    pub show_step_numbers: bool,
}

impl WizardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: WizardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the state machine cannot hold invariants for.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::NoSteps(self.id.clone()));
        }
        let mut seen = BTreeSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(ConfigError::DuplicateStep(step.id.clone()));
            }
        }
        Ok(())
    }

    pub fn step(&self, step_id: &str) -> Option<&WizardStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == step_id)
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Persistence settings, only when enabled with a usable key.
    pub fn active_persistence(&self) -> Option<&PersistenceConfig> {
        self.persistence
            .as_ref()
            .filter(|persistence| persistence.enabled && !persistence.storage_key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_applied() {
        let config: WizardConfig = serde_json::from_value(json!({
            "id": "w",
            "title": "W",
            "steps": [{ "id": "a", "title": "A" }]
        }))
        .expect("config");
        assert_eq!(config.navigation_mode, NavigationMode::Linear);
        assert!(config.allow_back_navigation);
        assert!(!config.steps[0].optional);
        assert_eq!(SubmitConfig::default().error_message(), DEFAULT_SUBMIT_ERROR);
    }

    #[test]
    fn accepts_hyphenated_and_camel_case_labels() {
        let mode: NavigationMode = serde_json::from_value(json!("non-linear")).expect("mode");
        assert_eq!(mode, NavigationMode::NonLinear);
        let storage: StorageType = serde_json::from_value(json!("sessionStorage")).expect("storage");
        assert_eq!(storage, StorageType::Session);
    }

    #[test]
    fn rejects_empty_and_duplicate_steps() {
        let empty = r#"{ "id": "w", "title": "W", "steps": [] }"#;
        assert!(matches!(
            WizardConfig::from_json(empty),
            Err(ConfigError::NoSteps(_))
        ));
        let duplicate = r#"{ "id": "w", "title": "W", "steps": [
            { "id": "a", "title": "A" }, { "id": "a", "title": "Again" }
        ] }"#;
        assert!(matches!(
            WizardConfig::from_json(duplicate),
            Err(ConfigError::DuplicateStep(id)) if id == "a"
        ));
    }
}
