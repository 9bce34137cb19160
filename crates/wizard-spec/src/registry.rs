use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::spec::field::{FieldConfig, FieldOption, FieldType};

/// Error produced when raw input cannot be turned into a field value.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{user_message}")]
pub struct InputError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl InputError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Behaviour attached to one [`FieldType`]: turning typed text into a value
/// and describing the expected input.
pub trait FieldKind: Send + Sync {
    fn parse(&self, field: &FieldConfig, raw: &str) -> Result<Value, InputError>;

    fn hint(&self, _field: &FieldConfig) -> Option<String> {
        None
    }
}

/// Field type to [`FieldKind`] dispatch table.
pub struct FieldRegistry {
    kinds: BTreeMap<FieldType, Box<dyn FieldKind>>,
}

impl FieldRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Every [`FieldType`] mapped to its built-in kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for kind in FieldType::ALL {
            let handler: Box<dyn FieldKind> = match kind {
                FieldType::Number => Box::new(NumberKind),
                FieldType::Checkbox => Box::new(BooleanKind),
                FieldType::Select | FieldType::Radio => Box::new(ChoiceKind),
                FieldType::Multiselect => Box::new(MultiChoiceKind),
                FieldType::Email => Box::new(EmailKind),
                FieldType::Url => Box::new(UrlKind),
                FieldType::Date => Box::new(TextKind::hinted("YYYY-MM-DD")),
                FieldType::Time => Box::new(TextKind::hinted("HH:MM")),
                FieldType::DatetimeLocal => Box::new(TextKind::hinted("YYYY-MM-DDTHH:MM")),
                FieldType::Text
                | FieldType::Password
                | FieldType::Tel
                | FieldType::Textarea => Box::new(TextKind::default()),
            };
            registry.register(kind, handler);
        }
        registry
    }

    /// Replaces the handler for `kind`.
    pub fn register(&mut self, kind: FieldType, handler: Box<dyn FieldKind>) {
        self.kinds.insert(kind, handler);
    }

    pub fn get(&self, kind: FieldType) -> Option<&dyn FieldKind> {
        self.kinds.get(&kind).map(|handler| handler.as_ref())
    }

    /// Parses `raw` for `field`. Empty input yields the field's default, or
    /// `Null` for optional fields.
    pub fn parse(&self, field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        let raw = raw.trim();
        if raw.is_empty() {
            if let Some(default) = &field.default_value {
                return Ok(default.clone());
            }
            if field.required {
                return Err(InputError::new("This field requires a value.", None));
            }
            return Ok(Value::Null);
        }
        let handler = self.get(field.kind).ok_or_else(|| {
            InputError::new(
                "This field type cannot be entered here.",
                Some(format!("no handler registered for {:?}", field.kind)),
            )
        })?;
        handler.parse(field, raw)
    }

    pub fn hint(&self, field: &FieldConfig) -> Option<String> {
        self.get(field.kind).and_then(|handler| handler.hint(field))
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[derive(Default)]
struct TextKind {
    hint: Option<&'static str>,
}

impl TextKind {
    fn hinted(hint: &'static str) -> Self {
        Self { hint: Some(hint) }
    }
}

impl FieldKind for TextKind {
    fn parse(&self, _field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        Ok(Value::String(raw.to_string()))
    }

    fn hint(&self, _field: &FieldConfig) -> Option<String> {
        self.hint.map(|hint| format!("({})", hint))
    }
}

struct NumberKind;

impl FieldKind for NumberKind {
    fn parse(&self, _field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        if let Ok(integer) = raw.parse::<i64>() {
            return Ok(Value::Number(Number::from(integer)));
        }
        raw.parse::<f64>()
            .map_err(|_| InputError::new("Please enter a number.", Some("expected number".into())))
            .and_then(|value| {
                Number::from_f64(value).map(Value::Number).ok_or_else(|| {
                    InputError::new(
                        "Please enter a finite number.",
                        Some("number must be finite".into()),
                    )
                })
            })
    }

    fn hint(&self, _field: &FieldConfig) -> Option<String> {
        Some("(number)".into())
    }
}

struct BooleanKind;

impl FieldKind for BooleanKind {
    fn parse(&self, _field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        match raw.to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
            _ => Err(InputError::new(
                "Please enter yes or no.",
                Some("expected boolean (y/n/true/false)".into()),
            )),
        }
    }

    fn hint(&self, _field: &FieldConfig) -> Option<String> {
        Some("(yes/no)".into())
    }
}

fn option_text(option: &FieldOption) -> String {
    match &option.value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn find_option<'a>(options: &'a [FieldOption], raw: &str) -> Option<&'a FieldOption> {
    options.iter().find(|option| {
        option.label.eq_ignore_ascii_case(raw) || option_text(option).eq_ignore_ascii_case(raw)
    })
}

fn choices(field: &FieldConfig) -> String {
    field
        .options
        .iter()
        .map(option_text)
        .collect::<Vec<_>>()
        .join("/")
}

fn unknown_option(field: &FieldConfig, raw: &str) -> InputError {
    InputError::new(
        format!("Choose one of: {}.", choices(field).replace('/', ", ")),
        Some(format!("'{}' is not an option of '{}'", raw, field.id)),
    )
}

struct ChoiceKind;

impl FieldKind for ChoiceKind {
    fn parse(&self, field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        find_option(&field.options, raw)
            .map(|option| option.value.clone())
            .ok_or_else(|| unknown_option(field, raw))
    }

    fn hint(&self, field: &FieldConfig) -> Option<String> {
        (!field.options.is_empty()).then(|| format!("({})", choices(field)))
    }
}

struct MultiChoiceKind;

impl FieldKind for MultiChoiceKind {
    fn parse(&self, field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                find_option(&field.options, part)
                    .map(|option| option.value.clone())
                    .ok_or_else(|| unknown_option(field, part))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn hint(&self, field: &FieldConfig) -> Option<String> {
        (!field.options.is_empty()).then(|| format!("(comma-separated: {})", choices(field)))
    }
}

struct EmailKind;

impl FieldKind for EmailKind {
    fn parse(&self, _field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        let valid = raw
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.ends_with('.'));
        if valid {
            Ok(Value::String(raw.to_string()))
        } else {
            Err(InputError::new(
                "Please enter a valid email address.",
                Some("expected local@domain".into()),
            ))
        }
    }
}

static HTTP_URL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^https?://\S+$").ok());

struct UrlKind;

impl FieldKind for UrlKind {
    fn parse(&self, _field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
        let valid = HTTP_URL.as_ref().is_some_and(|regex| regex.is_match(raw));
        if valid {
            Ok(Value::String(raw.to_string()))
        } else {
            Err(InputError::new(
                "Please enter a URL starting with http:// or https://.",
                None,
            ))
        }
    }

    fn hint(&self, _field: &FieldConfig) -> Option<String> {
        Some("(https://...)".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(value: Value) -> FieldConfig {
        serde_json::from_value(value).expect("field")
    }

    fn size_field() -> FieldConfig {
        field(json!({
            "id": "size",
            "label": "Team size",
            "type": "select",
            "required": true,
            "options": [
                { "label": "Small", "value": "small" },
                { "label": "Large", "value": "large" }
            ]
        }))
    }

    #[test]
    fn every_type_has_a_handler() {
        let registry = FieldRegistry::with_defaults();
        for kind in FieldType::ALL {
            assert!(registry.get(kind).is_some(), "{:?}", kind);
        }
    }

    #[test]
    fn checkbox_accepts_yes_no_forms() {
        let registry = FieldRegistry::with_defaults();
        let agree = field(json!({ "id": "agree", "label": "Agree", "type": "checkbox" }));
        assert_eq!(registry.parse(&agree, "Y").expect("y"), json!(true));
        assert_eq!(registry.parse(&agree, "0").expect("0"), json!(false));
        assert!(registry.parse(&agree, "maybe").is_err());
    }

    #[test]
    fn numbers_must_be_finite() {
        let registry = FieldRegistry::with_defaults();
        let age = field(json!({ "id": "age", "label": "Age", "type": "number" }));
        assert_eq!(registry.parse(&age, "42").expect("int"), json!(42));
        assert_eq!(registry.parse(&age, "2.5").expect("float"), json!(2.5));
        assert!(registry.parse(&age, "inf").is_err());
        assert!(registry.parse(&age, "abc").is_err());
    }

    #[test]
    fn choices_match_label_or_value() {
        let registry = FieldRegistry::with_defaults();
        let size = size_field();
        assert_eq!(registry.parse(&size, "LARGE").expect("label"), json!("large"));
        assert_eq!(registry.parse(&size, "small").expect("value"), json!("small"));
        let err = registry.parse(&size, "medium").expect_err("unknown");
        assert_eq!(err.user_message, "Choose one of: small, large.");
        assert_eq!(registry.hint(&size).as_deref(), Some("(small/large)"));
    }

    #[test]
    fn multiselect_splits_on_commas() {
        let registry = FieldRegistry::with_defaults();
        let mut tags = size_field();
        tags.kind = FieldType::Multiselect;
        assert_eq!(
            registry.parse(&tags, "small, Large").expect("tags"),
            json!(["small", "large"])
        );
    }

    #[test]
    fn email_and_url_shapes() {
        let registry = FieldRegistry::with_defaults();
        let email = field(json!({ "id": "email", "label": "Email", "type": "email" }));
        assert!(registry.parse(&email, "ada@example.com").is_ok());
        assert!(registry.parse(&email, "ada@localhost").is_err());
        let site = field(json!({ "id": "site", "label": "Site", "type": "url" }));
        assert!(registry.parse(&site, "https://example.com").is_ok());
        let err = registry.parse(&site, "example.com").expect_err("no scheme");
        assert_eq!(
            err.to_string(),
            "Please enter a URL starting with http:// or https://."
        );
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn empty_input_uses_default_or_requires() {
        let registry = FieldRegistry::with_defaults();
        assert!(registry.parse(&size_field(), "  ").is_err());
        let mut with_default = size_field();
        with_default.default_value = Some(json!("small"));
        assert_eq!(registry.parse(&with_default, "").expect("default"), json!("small"));
        let optional = field(json!({ "id": "bio", "label": "Bio", "type": "textarea" }));
        assert_eq!(registry.parse(&optional, "").expect("null"), Value::Null);
    }

    struct Shouting;

    impl FieldKind for Shouting {
        fn parse(&self, _field: &FieldConfig, raw: &str) -> Result<Value, InputError> {
            Ok(Value::String(raw.to_uppercase()))
        }
    }

    #[test]
    fn register_replaces_handler() {
        let mut registry = FieldRegistry::with_defaults();
        registry.register(FieldType::Text, Box::new(Shouting));
        let name = field(json!({ "id": "name", "label": "Name", "type": "text" }));
        assert_eq!(registry.parse(&name, "ada").expect("text"), json!("ADA"));
    }
}
