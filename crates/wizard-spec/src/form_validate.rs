use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rules::is_empty;
use crate::spec::field::{FieldConfig, FieldType};
use crate::spec::form::FormConfig;
use crate::state::FieldErrors;
use crate::visibility::{is_field_visible, resolve_form_visibility};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormValidation {
    pub valid: bool,
    /// Keyed by field key (`name`, falling back to `id`).
    pub errors: FieldErrors,
    pub missing_required: Vec<String>,
    /// Ids of fields skipped because their conditions hide them.
    pub hidden: Vec<String>,
}

/// Validates standalone form values. Hidden fields are neither required nor
/// checked.
pub fn validate_form(form: &FormConfig, values: &Value) -> FormValidation {
    let visibility = resolve_form_visibility(form, values);
    let empty = Map::new();
    let values_map = values.as_object().unwrap_or(&empty);

    let mut errors = FieldErrors::new();
    let mut missing_required = Vec::new();
    let mut hidden = Vec::new();

    for field in form.all_fields() {
        if !is_field_visible(&visibility, &field.id) {
            hidden.push(field.id.clone());
            continue;
        }

        let value = values_map.get(field.key());
        if is_empty(value) {
            if field.required {
                missing_required.push(field.key().to_string());
            }
            continue;
        }

        if let Some(value) = value
            && let Some(message) = validate_value(field, value)
        {
            errors.insert(field.key().to_string(), message);
        }
    }

    FormValidation {
        valid: errors.is_empty() && missing_required.is_empty(),
        errors,
        missing_required,
        hidden,
    }
}

fn validate_value(field: &FieldConfig, value: &Value) -> Option<String> {
    if !matches_type(field.kind, value) {
        return Some("Invalid value type".into());
    }

    if !field.options.is_empty() {
        let known = |candidate: &Value| field.options.iter().any(|option| &option.value == candidate);
        let valid = match value {
            Value::Array(items) => items.iter().all(known),
            other => known(other),
        };
        if !valid {
            return Some("Invalid option".into());
        }
    }

    field
        .validation
        .as_ref()
        .and_then(|constraint| constraint.check(value))
}

fn matches_type(kind: FieldType, value: &Value) -> bool {
    match kind {
        FieldType::Number => value.is_number(),
        FieldType::Checkbox => value.is_boolean(),
        FieldType::Multiselect => value.is_array(),
        FieldType::Select | FieldType::Radio => !value.is_array() && !value.is_object(),
        _ => value.is_string(),
    }
}
