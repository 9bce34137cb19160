use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldConfig;

fn default_debounce_ms() -> u64 {
    1000
}

/// Autosave settings for a standalone form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormPersistenceConfig {
    #[serde(default)]
    pub enabled: bool,
    pub storage_key: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub clear_on_submit: bool,
}

/// Group of fields rendered together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSection {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Top-level form builder definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormConfig {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<FormSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<FormPersistenceConfig>,
}

impl FormConfig {
    /// Flat fields first, then section fields in declaration order.
    pub fn all_fields(&self) -> Vec<&FieldConfig> {
        self.fields
            .iter()
            .chain(self.sections.iter().flat_map(|section| section.fields.iter()))
            .collect()
    }
}
