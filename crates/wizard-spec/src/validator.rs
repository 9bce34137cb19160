use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{SchemaError, StepSchema};
use crate::spec::wizard::WizardStep;
use crate::state::FieldErrors;

/// Key under which object-level schema issues (empty path) are recorded.
pub const FORM_ERROR_KEY: &str = "_form";

/// Outcome of validating a whole step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepValidation {
    pub valid: bool,
    pub errors: FieldErrors,
}

/// Collapses schema issues into one message per field: the first issue whose
/// path starts with that field wins.
pub fn field_errors(error: &SchemaError) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for issue in &error.issues {
        let key = issue
            .path
            .first()
            .cloned()
            .unwrap_or_else(|| FORM_ERROR_KEY.to_string());
        errors.entry(key).or_insert_with(|| issue.message.clone());
    }
    errors
}

/// Validates one step's data and tracks its field errors between calls.
pub struct StepValidator<'a> {
    step: &'a WizardStep,
    schema: Option<Arc<dyn StepSchema>>,
    errors: FieldErrors,
    validating: bool,
}

impl<'a> StepValidator<'a> {
    pub fn new(step: &'a WizardStep, schema: Option<Arc<dyn StepSchema>>) -> Self {
        Self {
            step,
            schema,
            errors: FieldErrors::new(),
            validating: false,
        }
    }

    /// Seeds the validator with errors recorded earlier (e.g. from state).
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    pub fn step(&self) -> &WizardStep {
        self.step
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_validating(&self) -> bool {
        self.validating
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Optional steps can always be completed; required ones need a clean
    /// error map.
    pub fn can_complete(&self) -> bool {
        self.step.optional || self.is_valid()
    }

    pub async fn validate(&mut self, data: &Value) -> StepValidation {
        let Some(schema) = self.schema.clone() else {
            self.errors.clear();
            return self.outcome();
        };

        self.validating = true;
        let result = schema.parse(data).await;
        self.validating = false;

        self.errors = match result {
            Ok(_) => FieldErrors::new(),
            Err(error) => {
                log::debug!(
                    "step '{}' failed validation: {}",
                    self.step.id,
                    error
                );
                field_errors(&error)
            }
        };
        self.outcome()
    }

    /// Re-validates the full step object with `name` set to `value` and
    /// updates only that field's entry.
    pub async fn validate_field(&mut self, data: &Value, name: &str, value: Value) -> bool {
        let Some(schema) = self.schema.clone() else {
            return true;
        };

        let mut full = data.as_object().cloned().unwrap_or_else(Map::new);
        full.insert(name.to_string(), value);

        self.validating = true;
        let result = schema.parse(&Value::Object(full)).await;
        self.validating = false;

        match result {
            Ok(_) => {
                self.errors.remove(name);
                true
            }
            Err(error) => match field_errors(&error).remove(name) {
                Some(message) => {
                    self.errors.insert(name.to_string(), message);
                    false
                }
                None => {
                    self.errors.remove(name);
                    false
                }
            },
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn clear_field_error(&mut self, name: &str) {
        self.errors.remove(name);
    }

    pub fn set_field_error(&mut self, name: &str, message: impl Into<String>) {
        self.errors.insert(name.to_string(), message.into());
    }

    fn outcome(&self) -> StepValidation {
        StepValidation {
            valid: self.errors.is_empty(),
            errors: self.errors.clone(),
        }
    }
}
