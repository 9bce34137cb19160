use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::spec::wizard::WizardStep;

/// One structured validation failure. `path` is empty for object-level issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl SchemaIssue {
    pub fn at(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: vec![field.into()],
            message: message.into(),
        }
    }
}

/// Structured error raised by a [`StepSchema`].
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("schema validation failed with {} issue(s)", .issues.len())]
pub struct SchemaError {
    pub issues: Vec<SchemaIssue>,
}

/// Validator attached to a wizard step. Parsing may be asynchronous so that
/// implementations can perform cross-field or remote checks.
#[async_trait]
pub trait StepSchema: Send + Sync {
    async fn parse(&self, data: &Value) -> Result<Value, SchemaError>;
}

/// JSON type expected by a [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ValueKind {
    fn label(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    Email,
    Url,
}

/// Declarative checks applied to a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Constraint {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,
    /// Minimum length in characters (strings) or items (arrays).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    /// Value must be exactly this (e.g. `true` for a confirmation checkbox).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    /// Replaces every default failure message of this constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Constraint {
    /// Returns the failure message for `value`, or `None` when it satisfies
    /// every check.
    pub fn check(&self, value: &Value) -> Option<String> {
        self.first_failure(value)
            .map(|default| self.message.clone().unwrap_or(default))
    }

    fn first_failure(&self, value: &Value) -> Option<String> {
        if let Some(kind) = self.kind
            && !kind.matches(value)
        {
            return Some(format!("Expected {}", kind.label()));
        }

        if let Some(pattern) = &self.pattern
            && let Some(text) = value.as_str()
        {
            match compiled(pattern) {
                Ok(regex) if !regex.is_match(text) => {
                    return Some("Value does not match pattern".into());
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("ignoring invalid pattern '{}': {}", pattern, err);
                }
            }
        }

        if let Some(format) = self.format
            && let Some(text) = value.as_str()
            && !format_matches(format, text)
        {
            return Some(match format {
                StringFormat::Email => "Invalid email address".into(),
                StringFormat::Url => "Invalid URL".into(),
            });
        }

        if let Some(min_len) = self.min_len
            && let Some(len) = measured_len(value)
            && len < min_len
        {
            return Some(format!("Must contain at least {} character(s)", min_len));
        }

        if let Some(max_len) = self.max_len
            && let Some(len) = measured_len(value)
            && len > max_len
        {
            return Some(format!("Must contain at most {} character(s)", max_len));
        }

        if let Some(min) = self.min
            && let Some(number) = value.as_f64()
            && number < min
        {
            return Some(format!("Must be greater than or equal to {}", min));
        }

        if let Some(max) = self.max
            && let Some(number) = value.as_f64()
            && number > max
        {
            return Some(format!("Must be less than or equal to {}", max));
        }

        if let Some(choices) = &self.one_of
            && !choices.contains(value)
        {
            return Some("Invalid option".into());
        }

        if let Some(expected) = &self.equals
            && expected != value
        {
            return Some("Invalid value".into());
        }

        None
    }
}

fn measured_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

static EMAIL_FORMAT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
static URL_FORMAT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").ok());

/// Configured `pattern` strings compiled so far, keyed by source.
static PATTERNS: LazyLock<Mutex<HashMap<String, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern)?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

fn format_matches(format: StringFormat, text: &str) -> bool {
    let regex = match format {
        StringFormat::Email => &*EMAIL_FORMAT,
        StringFormat::Url => &*URL_FORMAT,
    };
    regex.as_ref().is_some_and(|regex| regex.is_match(text))
}

fn default_required() -> bool {
    true
}

/// Rule for one named field of a step object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldRule {
    pub name: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(flatten)]
    pub constraint: Constraint,
}

/// Declarative object schema loaded from configuration.
///
/// Null step data is treated as an empty object so that a step which has not
/// been touched yet reports its missing fields rather than a single
/// object-level error. Keys not named by a rule are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ObjectSchema {
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl ObjectSchema {
    pub fn check(&self, data: &Value) -> Result<(), SchemaError> {
        let empty = Map::new();
        let object = match data {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(SchemaError {
                    issues: vec![SchemaIssue {
                        path: Vec::new(),
                        message: format!("Expected object, received {}", json_type(other)),
                    }],
                });
            }
        };

        let issues = self
            .fields
            .iter()
            .filter_map(|rule| match object.get(&rule.name) {
                None | Some(Value::Null) => rule
                    .required
                    .then(|| SchemaIssue::at(&rule.name, "Required")),
                Some(value) => rule
                    .constraint
                    .check(value)
                    .map(|message| SchemaIssue::at(&rule.name, message)),
            })
            .collect::<Vec<_>>();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchemaError { issues })
        }
    }
}

#[async_trait]
impl StepSchema for ObjectSchema {
    async fn parse(&self, data: &Value) -> Result<Value, SchemaError> {
        self.check(data)?;
        Ok(data.clone())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Custom schemas registered per step id. A registered schema takes precedence
/// over the step's declarative `validation`.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<dyn StepSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step_id: impl Into<String>, schema: Arc<dyn StepSchema>) {
        self.schemas.insert(step_id.into(), schema);
    }

    pub fn resolve(&self, step: &WizardStep) -> Option<Arc<dyn StepSchema>> {
        self.schemas.get(&step.id).cloned().or_else(|| {
            step.validation
                .clone()
                .map(|schema| Arc::new(schema) as Arc<dyn StepSchema>)
        })
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("steps", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}
