use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::wizard::{StepId, WizardConfig};

/// Per-field error messages for one step.
pub type FieldErrors = BTreeMap<String, String>;

/// Validation status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Incomplete,
    Complete,
    Error,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Incomplete => "incomplete",
            StepStatus::Complete => "complete",
            StepStatus::Error => "error",
            StepStatus::Skipped => "skipped",
        }
    }
}

/// Mutable aggregate owned by a wizard machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WizardState {
    pub current_step_index: usize,
    #[serde(default)]
    pub completed_steps: BTreeSet<StepId>,
    #[serde(default)]
    pub skipped_steps: BTreeSet<StepId>,
    #[serde(default)]
    pub step_data: BTreeMap<StepId, Value>,
    #[serde(default)]
    pub step_errors: BTreeMap<StepId, FieldErrors>,
    #[serde(default)]
    pub step_status: BTreeMap<StepId, StepStatus>,
    #[serde(default)]
    pub is_submitting: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub wizard_errors: Vec<String>,
}

impl WizardState {
    /// Fresh state: first step, every step `incomplete`.
    pub fn initial(config: &WizardConfig) -> Self {
        Self {
            current_step_index: 0,
            completed_steps: BTreeSet::new(),
            skipped_steps: BTreeSet::new(),
            step_data: BTreeMap::new(),
            step_errors: BTreeMap::new(),
            step_status: config
                .steps
                .iter()
                .map(|step| (step.id.clone(), StepStatus::Incomplete))
                .collect(),
            is_submitting: false,
            is_completed: false,
            wizard_errors: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            current_step_index: self.current_step_index,
            completed_steps: self.completed_steps.clone(),
            skipped_steps: self.skipped_steps.clone(),
            step_data: self.step_data.clone(),
            step_status: self.step_status.clone(),
        }
    }

    /// Applies a persisted snapshot, repairing anything that would break the
    /// machine invariants: the index is clamped into range and a step found in
    /// both sets stays completed only.
    pub fn restore(&mut self, snapshot: WizardSnapshot, config: &WizardConfig) {
        self.current_step_index = snapshot.current_step_index.min(config.last_index());
        self.skipped_steps = snapshot
            .skipped_steps
            .difference(&snapshot.completed_steps)
            .cloned()
            .collect();
        self.completed_steps = snapshot.completed_steps;
        self.step_data = snapshot.step_data;
        if !snapshot.step_status.is_empty() {
            self.step_status = snapshot.step_status;
        }
    }

    pub fn errors_for(&self, step_id: &str) -> Option<&FieldErrors> {
        self.step_errors.get(step_id)
    }

    pub fn has_errors(&self, step_id: &str) -> bool {
        self.errors_for(step_id)
            .is_some_and(|errors| !errors.is_empty())
    }

    pub fn status_of(&self, step_id: &str) -> StepStatus {
        self.step_status.get(step_id).copied().unwrap_or_default()
    }

    /// A step counts as settled once it is completed or skipped.
    pub fn is_settled(&self, step_id: &str) -> bool {
        self.completed_steps.contains(step_id) || self.skipped_steps.contains(step_id)
    }
}

/// The persisted subset of [`WizardState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct WizardSnapshot {
    #[serde(default)]
    pub current_step_index: usize,
    #[serde(default)]
    pub completed_steps: BTreeSet<StepId>,
    #[serde(default)]
    pub skipped_steps: BTreeSet<StepId>,
    #[serde(default)]
    pub step_data: BTreeMap<StepId, Value>,
    #[serde(default)]
    pub step_status: BTreeMap<StepId, StepStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> WizardConfig {
        serde_json::from_value(json!({
            "id": "w",
            "title": "W",
            "steps": [{ "id": "a", "title": "A" }, { "id": "b", "title": "B" }]
        }))
        .expect("config")
    }

    #[test]
    fn initial_marks_every_step_incomplete() {
        let state = WizardState::initial(&config());
        assert_eq!(state.step_status.len(), 2);
        assert_eq!(state.status_of("b"), StepStatus::Incomplete);
    }

    #[test]
    fn restore_repairs_out_of_range_snapshots() {
        let config = config();
        let mut state = WizardState::initial(&config);
        let snapshot = WizardSnapshot {
            current_step_index: 9,
            completed_steps: BTreeSet::from(["a".to_string()]),
            skipped_steps: BTreeSet::from(["a".to_string(), "b".to_string()]),
            ..Default::default()
        };
        state.restore(snapshot, &config);
        assert_eq!(state.current_step_index, 1);
        assert!(state.completed_steps.contains("a"));
        assert_eq!(state.skipped_steps, BTreeSet::from(["b".to_string()]));
        assert_eq!(state.status_of("a"), StepStatus::Incomplete);
    }
}
