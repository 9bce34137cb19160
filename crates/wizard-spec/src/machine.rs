use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::navigation::{NavigationInfo, navigation};
use crate::persistence::{StorageBackends, WizardPersistence};
use crate::schema::{SchemaRegistry, StepSchema};
use crate::spec::wizard::{ConfigError, NavigationMode, SubmitConfig, WizardConfig, WizardStep};
use crate::state::{FieldErrors, StepStatus, WizardSnapshot, WizardState};
use crate::submit::{SubmitError, SubmitOutcome, Submitter};
use crate::template::MessageTemplates;
use crate::validator::{StepValidation, StepValidator};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Submission(#[from] SubmitError),
}

type SuccessHook = Box<dyn Fn(&Value) + Send + Sync>;
type FailureHook = Box<dyn Fn(&SubmitError) + Send + Sync>;

/// Owns a wizard's configuration and state and applies every transition.
///
/// Navigation methods return `false` when the move is refused; refusals never
/// surface as errors.
pub struct WizardMachine {
    config: WizardConfig,
    state: WizardState,
    persistence: Option<WizardPersistence>,
    schemas: SchemaRegistry,
    templates: MessageTemplates,
    on_success: Option<SuccessHook>,
    on_failure: Option<FailureHook>,
}

impl WizardMachine {
    /// Builds a machine in its initial state with in-memory storage.
    pub fn new(config: WizardConfig) -> Result<Self, WizardError> {
        config.validate()?;
        let state = WizardState::initial(&config);
        let persistence = config
            .active_persistence()
            .map(|persistence| WizardPersistence::new(persistence.clone(), &StorageBackends::default()));
        Ok(Self {
            config,
            state,
            persistence,
            schemas: SchemaRegistry::new(),
            templates: MessageTemplates::new(),
            on_success: None,
            on_failure: None,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, WizardError> {
        Self::new(WizardConfig::from_json(json)?)
    }

    /// Rebuilds a machine around state kept by the host between calls. The
    /// index is clamped and completed steps are dropped from the skipped set.
    pub fn resume(config: WizardConfig, mut state: WizardState) -> Result<Self, WizardError> {
        let mut machine = Self::new(config)?;
        state.current_step_index = state.current_step_index.min(machine.config.last_index());
        state
            .skipped_steps
            .retain(|id| !state.completed_steps.contains(id));
        machine.state = state;
        Ok(machine)
    }

    pub fn into_state(self) -> WizardState {
        self.state
    }

    /// Routes persistence to the given backends.
    pub fn with_storage(mut self, backends: &StorageBackends) -> Self {
        self.persistence = self
            .config
            .active_persistence()
            .map(|persistence| WizardPersistence::new(persistence.clone(), backends));
        self
    }

    /// Uses `schema` for `step_id` instead of the step's declared rules.
    pub fn with_schema(mut self, step_id: impl Into<String>, schema: Arc<dyn StepSchema>) -> Self {
        self.schemas.register(step_id, schema);
        self
    }

    pub fn on_submit_success(mut self, hook: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_submit_error(mut self, hook: impl Fn(&SubmitError) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> &WizardStep {
        &self.config.steps[self.state.current_step_index]
    }

    pub fn current_step_data(&self) -> Option<&Value> {
        self.state.step_data.get(&self.current_step().id)
    }

    pub fn current_step_errors(&self) -> Option<&FieldErrors> {
        self.state.errors_for(&self.current_step().id)
    }

    pub fn navigation(&self) -> NavigationInfo {
        navigation(&self.config, &self.state)
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        self.state.snapshot()
    }

    /// Advances one step. In linear mode a required step that is not
    /// completed and carries errors blocks the move.
    pub fn next_step(&mut self) -> bool {
        if self.state.is_completed {
            return false;
        }
        let index = self.state.current_step_index;
        if index >= self.config.last_index() {
            return false;
        }
        let step = &self.config.steps[index];
        if self.config.navigation_mode == NavigationMode::Linear
            && !step.optional
            && !self.state.completed_steps.contains(&step.id)
            && self.state.has_errors(&step.id)
        {
            log::debug!("next_step blocked by errors on '{}'", step.id);
            return false;
        }
        self.move_to(index + 1);
        true
    }

    pub fn previous_step(&mut self) -> bool {
        if self.state.is_completed || self.state.current_step_index == 0 {
            return false;
        }
        self.move_to(self.state.current_step_index - 1);
        true
    }

    pub fn go_to_step(&mut self, index: usize) -> bool {
        if self.state.is_completed || index >= self.config.steps.len() {
            return false;
        }
        let current = self.state.current_step_index;
        if index == current {
            return true;
        }
        match self.config.navigation_mode {
            NavigationMode::NonLinear => {
                self.move_to(index);
                true
            }
            NavigationMode::Linear if index < current => {
                self.move_to(index);
                true
            }
            NavigationMode::Linear if index == current + 1 => self.next_step(),
            NavigationMode::Linear => {
                log::debug!("go_to_step({}) refused in linear mode", index);
                false
            }
        }
    }

    /// Marks the current step skipped and moves on. Only skippable steps.
    pub fn skip_step(&mut self) -> bool {
        if self.state.is_completed {
            return false;
        }
        let step = self.current_step();
        if !step.skippable {
            return false;
        }
        let id = step.id.clone();
        if !self.state.completed_steps.contains(&id) {
            self.state.skipped_steps.insert(id.clone());
        }
        self.state.step_status.insert(id.clone(), StepStatus::Skipped);
        log::debug!("skipped step '{}'", id);
        let next = (self.state.current_step_index + 1).min(self.config.last_index());
        self.move_to(next);
        true
    }

    /// Replaces the step's data wholesale.
    pub fn update_step_data(&mut self, step_id: &str, data: Value) {
        self.state.step_data.insert(step_id.to_string(), data);
        self.auto_save();
    }

    /// Records validation errors. An empty map marks the step `complete`
    /// without adding it to the completed set.
    pub fn set_step_errors(&mut self, step_id: &str, errors: FieldErrors) {
        let status = if errors.is_empty() {
            StepStatus::Complete
        } else {
            StepStatus::Error
        };
        self.state.step_errors.insert(step_id.to_string(), errors);
        self.state.step_status.insert(step_id.to_string(), status);
        self.auto_save();
    }

    pub fn complete_step(&mut self, step_id: &str) {
        self.state.completed_steps.insert(step_id.to_string());
        self.state.skipped_steps.remove(step_id);
        self.state
            .step_status
            .insert(step_id.to_string(), StepStatus::Complete);
        self.auto_save();
    }

    pub fn incomplete_step(&mut self, step_id: &str) {
        self.state.completed_steps.remove(step_id);
        self.state
            .step_status
            .insert(step_id.to_string(), StepStatus::Incomplete);
        self.auto_save();
    }

    /// Back to the initial state; the persisted snapshot is removed.
    pub fn reset_wizard(&mut self) {
        self.state = WizardState::initial(&self.config);
        if let Some(persistence) = &self.persistence {
            persistence.clear();
        }
        log::debug!("wizard '{}' reset", self.config.id);
    }

    /// Titles of required steps that are neither completed nor skipped.
    pub fn missing_required_steps(&self) -> Vec<String> {
        self.config
            .steps
            .iter()
            .filter(|step| !step.optional && !self.state.is_settled(&step.id))
            .map(|step| step.title.clone())
            .collect()
    }

    /// Submission precondition. When required steps are missing, replaces the
    /// wizard errors with a single message naming them.
    pub fn check_required_steps(&mut self) -> Vec<String> {
        let missing = self.missing_required_steps();
        if !missing.is_empty() {
            let template = self.submit_config().incomplete_message().to_string();
            let message = self.templates.incomplete_steps(&template, &missing);
            self.state.wizard_errors = vec![message];
        }
        missing
    }

    /// Object of step data keyed by step id. Steps whose data is null, `false`,
    /// `0` or an empty string are left out.
    pub fn payload(&self) -> Value {
        let mut payload = Map::new();
        for step in &self.config.steps {
            if let Some(data) = self.state.step_data.get(&step.id)
                && is_truthy(data)
            {
                payload.insert(step.id.clone(), data.clone());
            }
        }
        Value::Object(payload)
    }

    pub async fn submit_wizard(
        &mut self,
        submitter: &dyn Submitter,
    ) -> Result<SubmitOutcome, WizardError> {
        if self.state.is_submitting || self.state.is_completed {
            return Ok(SubmitOutcome::Ignored);
        }

        let missing = self.check_required_steps();
        if !missing.is_empty() {
            return Ok(SubmitOutcome::Incomplete(missing));
        }

        self.state.is_submitting = true;
        self.state.wizard_errors.clear();
        let payload = self.payload();

        let submit = self.submit_config();
        let response = match submit.endpoint.as_deref() {
            Some(endpoint) => {
                log::debug!("submitting wizard '{}' to {}", self.config.id, endpoint);
                match submitter.submit(endpoint, submit.method, &payload).await {
                    Ok(response) => {
                        if let Some(hook) = &self.on_success {
                            hook(&response);
                        }
                        response
                    }
                    Err(err) => {
                        self.state.is_submitting = false;
                        self.state.wizard_errors = vec![submit.error_message().to_string()];
                        log::error!("{}", err);
                        if let Some(hook) = &self.on_failure {
                            hook(&err);
                        }
                        return Err(err.into());
                    }
                }
            }
            None => Value::Null,
        };

        self.state.is_completed = true;
        self.state.is_submitting = false;
        if let Some(persistence) = &self.persistence
            && persistence.config().clear_on_submit
        {
            persistence.clear();
        }
        Ok(SubmitOutcome::Submitted(response))
    }

    /// Validates the current step's data and records the result.
    pub async fn validate_current_step(&mut self) -> StepValidation {
        let step = self.current_step().clone();
        let data = self.current_step_data().cloned().unwrap_or(Value::Null);
        let existing = self.current_step_errors().cloned().unwrap_or_default();
        let mut validator = StepValidator::new(&step, self.schemas.resolve(&step)).with_errors(existing);
        let outcome = validator.validate(&data).await;
        self.set_step_errors(&step.id, outcome.errors.clone());
        outcome
    }

    pub fn persist_state(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.save(&self.state.snapshot());
        }
    }

    /// Restores a saved snapshot when `restore_on_mount` is set. Returns
    /// whether anything was applied.
    pub fn load_persisted_state(&mut self) -> bool {
        let Some(persistence) = &self.persistence else {
            return false;
        };
        if !persistence.config().restore_on_mount {
            return false;
        }
        match persistence.load() {
            Some(snapshot) => {
                self.state.restore(snapshot, &self.config);
                log::debug!(
                    "restored wizard '{}' at step {}",
                    self.config.id,
                    self.state.current_step_index
                );
                true
            }
            None => false,
        }
    }

    fn submit_config(&self) -> SubmitConfig {
        self.config.submit.clone().unwrap_or_default()
    }

    fn move_to(&mut self, index: usize) {
        log::debug!(
            "wizard '{}' step {} -> {}",
            self.config.id,
            self.state.current_step_index,
            index
        );
        self.state.current_step_index = index;
        self.auto_save();
    }

    fn auto_save(&self) {
        if !self.state.is_completed {
            self.persist_state();
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl std::fmt::Debug for WizardMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardMachine")
            .field("config", &self.config.id)
            .field("state", &self.state)
            .field("persistence", &self.persistence.is_some())
            .field("schemas", &self.schemas)
            .finish()
    }
}
