use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use wizard_spec::{
    ConfigError, FieldErrors, FormConfig, WizardConfig, WizardError, WizardMachine, WizardState,
    field_errors, navigation as wizard_navigation, resolve_form_visibility,
    validate_form as spec_validate_form,
};

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse {0}: {1}")]
    InputParse(&'static str, #[source] serde_json::Error),
    #[error("invalid wizard config: {0}")]
    Config(#[from] ConfigError),
    #[error("step '{0}' is not part of this wizard")]
    UnknownStep(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

/// A single state transition requested by the host.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Next,
    Previous,
    GoTo { index: usize },
    Skip,
    UpdateData { step_id: String, data: Value },
    SetErrors { step_id: String, errors: FieldErrors },
    Complete { step_id: String },
    Incomplete { step_id: String },
    Reset,
    CheckSubmit,
}

fn load_config(config_json: &str) -> Result<WizardConfig, ComponentError> {
    let config: WizardConfig =
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?;
    config.validate()?;
    Ok(config)
}

fn load_form(form_json: &str) -> Result<FormConfig, ComponentError> {
    serde_json::from_str(form_json).map_err(ComponentError::ConfigParse)
}

/// Empty input means "start from the initial state".
fn load_state(config: &WizardConfig, state_json: &str) -> Result<WizardState, ComponentError> {
    if state_json.trim().is_empty() {
        return Ok(WizardState::initial(config));
    }
    serde_json::from_str(state_json).map_err(|err| ComponentError::InputParse("state", err))
}

fn parse_values(values_json: &str) -> Value {
    serde_json::from_str(values_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn state_response(machine: &WizardMachine) -> Result<Value, ComponentError> {
    Ok(json!({
        "state": serde_json::to_value(machine.state()).map_err(ComponentError::JsonEncode)?,
        "navigation": serde_json::to_value(machine.navigation()).map_err(ComponentError::JsonEncode)?,
        "current_step": machine.current_step().id,
    }))
}

pub fn describe(config_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        serde_json::to_value(config).map_err(ComponentError::JsonEncode)
    }))
}

pub fn initial_state(config_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let machine = WizardMachine::new(config)?;
        state_response(&machine)
    }))
}

pub fn navigation(config_json: &str, state_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let state = load_state(&config, state_json)?;
        serde_json::to_value(wizard_navigation(&config, &state)).map_err(ComponentError::JsonEncode)
    }))
}

pub fn visibility(form_json: &str, values_json: &str) -> String {
    respond(load_form(form_json).and_then(|form| {
        let values = parse_values(values_json);
        serde_json::to_value(resolve_form_visibility(&form, &values))
            .map_err(ComponentError::JsonEncode)
    }))
}

pub fn validate_form(form_json: &str, values_json: &str) -> String {
    respond(load_form(form_json).and_then(|form| {
        let values = parse_values(values_json);
        serde_json::to_value(spec_validate_form(&form, &values)).map_err(ComponentError::JsonEncode)
    }))
}

/// Checks a step's stored data against its declared rules and records the
/// outcome in the returned state.
pub fn validate_step(config_json: &str, state_json: &str, step_id: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let step = config
            .step(step_id)
            .cloned()
            .ok_or_else(|| ComponentError::UnknownStep(step_id.to_string()))?;
        let state = load_state(&config, state_json)?;
        let data = state.step_data.get(step_id).cloned().unwrap_or(Value::Null);
        let errors = match &step.validation {
            Some(schema) => schema
                .check(&data)
                .err()
                .map(|err| field_errors(&err))
                .unwrap_or_default(),
            None => FieldErrors::new(),
        };

        let mut machine = WizardMachine::resume(config, state)?;
        machine.set_step_errors(step_id, errors.clone());
        let mut response = state_response(&machine)?;
        response["valid"] = Value::Bool(errors.is_empty());
        response["errors"] = serde_json::to_value(&errors).map_err(ComponentError::JsonEncode)?;
        Ok(response)
    }))
}

/// Applies one action and returns the resulting state. Refused navigation is
/// reported with `"applied": false`, never as an error.
pub fn apply(config_json: &str, state_json: &str, action_json: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let state = load_state(&config, state_json)?;
        let action: Action = serde_json::from_str(action_json)
            .map_err(|err| ComponentError::InputParse("action", err))?;
        let mut machine = WizardMachine::resume(config, state)?;
        log::debug!("applying {:?}", action);

        let mut missing = Value::Null;
        let applied = match action {
            Action::Next => machine.next_step(),
            Action::Previous => machine.previous_step(),
            Action::GoTo { index } => machine.go_to_step(index),
            Action::Skip => machine.skip_step(),
            Action::UpdateData { step_id, data } => {
                machine.update_step_data(&step_id, data);
                true
            }
            Action::SetErrors { step_id, errors } => {
                machine.set_step_errors(&step_id, errors);
                true
            }
            Action::Complete { step_id } => {
                machine.complete_step(&step_id);
                true
            }
            Action::Incomplete { step_id } => {
                machine.incomplete_step(&step_id);
                true
            }
            Action::Reset => {
                machine.reset_wizard();
                true
            }
            Action::CheckSubmit => {
                let titles = machine.check_required_steps();
                let ready = titles.is_empty();
                missing = json!(titles);
                ready
            }
        };

        let mut response = state_response(&machine)?;
        response["applied"] = Value::Bool(applied);
        if !missing.is_null() {
            response["missing"] = missing;
        }
        Ok(response)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> String {
        json!({
            "id": "signup",
            "title": "Sign up",
            "steps": [
                {
                    "id": "account",
                    "title": "Account",
                    "validation": { "fields": [
                        { "name": "name", "type": "string", "min_len": 2 }
                    ] }
                },
                { "id": "extras", "title": "Extras", "skippable": true, "optional": true },
                { "id": "confirm", "title": "Confirm" }
            ]
        })
        .to_string()
    }

    fn parse(response: &str) -> Value {
        serde_json::from_str(response).expect("json")
    }

    #[test]
    fn describe_applies_defaults() {
        let parsed = parse(&describe(&config()));
        assert_eq!(parsed["navigation_mode"], "linear");
        assert_eq!(parsed["allow_back_navigation"], true);
    }

    #[test]
    fn describe_reports_invalid_configs() {
        let parsed = parse(&describe(r#"{"id":"x","title":"X","steps":[]}"#));
        assert_eq!(parsed["error"], "invalid wizard config: wizard 'x' has no steps");
        let parsed = parse(&describe("not json"));
        assert!(parsed["error"].as_str().unwrap_or("").starts_with("failed to parse config"));
    }

    #[test]
    fn initial_state_starts_at_first_step() {
        let parsed = parse(&initial_state(&config()));
        assert_eq!(parsed["current_step"], "account");
        assert_eq!(parsed["state"]["step_status"]["confirm"], "incomplete");
        assert_eq!(parsed["navigation"]["total_steps"], 3);
    }

    #[test]
    fn apply_chains_through_serialized_state() {
        let config = config();
        let first = parse(&apply(&config, "", r#"{"action":"next"}"#));
        assert_eq!(first["applied"], true);
        let state = first["state"].to_string();

        let skipped = parse(&apply(&config, &state, r#"{"action":"skip"}"#));
        assert_eq!(skipped["current_step"], "confirm");
        assert_eq!(skipped["navigation"]["progress"], json!(1.0_f64 / 3.0 * 100.0));

        let jump = parse(&apply(&config, &skipped["state"].to_string(), r#"{"action":"go_to","index":0}"#));
        assert_eq!(jump["applied"], true);
        assert_eq!(jump["state"]["current_step_index"], 0);
    }

    #[test]
    fn refused_moves_are_not_errors() {
        let parsed = parse(&apply(&config(), "", r#"{"action":"go_to","index":2}"#));
        assert_eq!(parsed["applied"], false);
        assert!(parsed.get("error").is_none());
    }

    #[test]
    fn check_submit_lists_missing_titles() {
        let parsed = parse(&apply(&config(), "", r#"{"action":"check_submit"}"#));
        assert_eq!(parsed["applied"], false);
        assert_eq!(parsed["missing"], json!(["Account", "Confirm"]));
        assert_eq!(
            parsed["state"]["wizard_errors"][0],
            "Please complete all required steps: Account, Confirm"
        );
    }

    #[test]
    fn validate_step_records_errors() {
        let config = config();
        let updated = parse(&apply(
            &config,
            "",
            r#"{"action":"update_data","step_id":"account","data":{"name":"a"}}"#,
        ));
        let parsed = parse(&validate_step(&config, &updated["state"].to_string(), "account"));
        assert_eq!(parsed["valid"], false);
        assert_eq!(parsed["errors"]["name"], "Must contain at least 2 character(s)");
        assert_eq!(parsed["state"]["step_status"]["account"], "error");

        let missing = parse(&validate_step(&config, "", "nope"));
        assert_eq!(missing["error"], "step 'nope' is not part of this wizard");
    }

    #[test]
    fn bad_actions_are_reported() {
        let parsed = parse(&apply(&config(), "", r#"{"action":"fly"}"#));
        assert!(parsed["error"].as_str().unwrap_or("").starts_with("failed to parse action"));
    }

    #[test]
    fn form_visibility_and_validation() {
        let form = json!({
            "id": "contact",
            "title": "Contact",
            "fields": [
                { "id": "kind", "label": "Kind", "type": "text" },
                { "id": "company", "label": "Company", "type": "text", "required": true,
                  "conditional": { "rules": [
                      { "field": "kind", "operator": "equals", "value": "business" }
                  ] } }
            ]
        })
        .to_string();
        let shown = parse(&visibility(&form, r#"{"kind":"business"}"#));
        assert_eq!(shown["company"], true);
        let hidden = parse(&visibility(&form, "{}"));
        assert_eq!(hidden["company"], false);

        let report = parse(&validate_form(&form, r#"{"kind":"business"}"#));
        assert_eq!(report["valid"], false);
        assert_eq!(report["missing_required"], json!(["company"]));
    }
}
