use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Comparison applied by a [`ConditionalRule`].
///
/// Operator names are accepted in both camelCase (`notEquals`) and snake_case
/// (`not_equals`); anything else deserializes to [`Operator::Unknown`], which
/// never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    Unknown,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "equals" => Operator::Equals,
            "notEquals" | "not_equals" => Operator::NotEquals,
            "contains" => Operator::Contains,
            "notContains" | "not_contains" => Operator::NotContains,
            "greaterThan" | "greater_than" => Operator::GreaterThan,
            "lessThan" | "less_than" => Operator::LessThan,
            "greaterThanOrEqual" | "greater_than_or_equal" => Operator::GreaterThanOrEqual,
            "lessThanOrEqual" | "less_than_or_equal" => Operator::LessThanOrEqual,
            "isEmpty" | "is_empty" => Operator::IsEmpty,
            "isNotEmpty" | "is_not_empty" => Operator::IsNotEmpty,
            _ => Operator::Unknown,
        }
    }
}

impl From<String> for Operator {
    fn from(label: String) -> Self {
        Operator::from_label(&label)
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        operator.as_str().to_string()
    }
}

/// How the rules of a [`ConditionalGroup`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionMode {
    /// Visible when at least one rule matches.
    Any,
    /// Visible when every rule matches.
    #[default]
    All,
}

/// A single visibility rule watching a sibling field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalRule {
    /// Id of the field whose value is watched.
    pub field: String,
    #[schemars(with = "String")]
    pub operator: Operator,
    /// `None` when the key is absent; an explicit `null` is `Some(Value::Null)`.
    #[schemars(with = "Option<Value>")]
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Rules attached to a field, combined according to `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalGroup {
    #[serde(default)]
    pub mode: ConditionMode,
    #[serde(default)]
    pub rules: Vec<ConditionalRule>,
}

impl ConditionalGroup {
    /// Evaluates every rule against its watched value and combines the results.
    pub fn matches(&self, values: &serde_json::Map<String, Value>) -> bool {
        let mut results = self
            .rules
            .iter()
            .map(|rule| evaluate(rule, values.get(&rule.field)));
        match self.mode {
            ConditionMode::Any => results.any(|matched| matched),
            ConditionMode::All => results.all(|matched| matched),
        }
    }
}

/// Evaluates one rule against the watched field value (`None` when the field
/// has no value at all). Total over every input shape.
pub fn evaluate(rule: &ConditionalRule, watched: Option<&Value>) -> bool {
    let expected = rule.value.as_ref();
    match rule.operator {
        Operator::Equals => strict_eq(watched, expected),
        Operator::NotEquals => !strict_eq(watched, expected),
        Operator::Contains => contains(watched, expected).unwrap_or(false),
        Operator::NotContains => contains(watched, expected).map_or(true, |found| !found),
        Operator::GreaterThan => compare(watched, expected, |left, right| left > right),
        Operator::LessThan => compare(watched, expected, |left, right| left < right),
        Operator::GreaterThanOrEqual => compare(watched, expected, |left, right| left >= right),
        Operator::LessThanOrEqual => compare(watched, expected, |left, right| left <= right),
        Operator::IsEmpty => is_empty(watched),
        Operator::IsNotEmpty => !is_empty(watched),
        Operator::Unknown => false,
    }
}

/// Returns true when the value is absent, null, an empty string or an empty array.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn strict_eq(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.as_f64() == b.as_f64(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// `None` means the operands have no containment relation (neither a text
/// pair nor an array).
fn contains(watched: Option<&Value>, expected: Option<&Value>) -> Option<bool> {
    match (watched?, expected) {
        (Value::String(haystack), Some(Value::String(needle))) => Some(
            haystack
                .to_lowercase()
                .contains(needle.to_lowercase().as_str()),
        ),
        (Value::Array(items), Some(needle)) => {
            Some(items.iter().any(|item| strict_eq(Some(item), Some(needle))))
        }
        (Value::Array(_), None) => Some(false),
        _ => None,
    }
}

fn compare(watched: Option<&Value>, expected: Option<&Value>, op: fn(f64, f64) -> bool) -> bool {
    match (
        watched.and_then(Value::as_f64),
        expected.and_then(Value::as_f64),
    ) {
        (Some(left), Some(right)) => op(left, right),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(operator: &str, value: Value) -> ConditionalRule {
        serde_json::from_value(json!({
            "field": "watched",
            "operator": operator,
            "value": value,
        }))
        .expect("rule")
    }

    #[test]
    fn equals_is_strict() {
        let equals = rule("equals", json!("business"));
        assert!(evaluate(&equals, Some(&json!("business"))));
        assert!(!evaluate(&equals, Some(&json!("Business"))));
        assert!(!evaluate(&equals, None));
        assert!(evaluate(&rule("equals", json!(1)), Some(&json!(1.0))));
        assert!(!evaluate(&rule("equals", json!("1")), Some(&json!(1))));
        assert!(evaluate(&rule("notEquals", json!("a")), None));
    }

    #[test]
    fn contains_handles_text_and_arrays() {
        let contains = rule("contains", json!("RUST"));
        assert!(evaluate(&contains, Some(&json!("trusty rustacean"))));
        assert!(evaluate(&rule("contains", json!("react")), Some(&json!(["vue", "react"]))));
        assert!(!evaluate(&contains, Some(&json!(42))));
        assert!(!evaluate(&contains, None));
    }

    #[test]
    fn not_contains_fails_open_for_other_shapes() {
        let not_contains = rule("not_contains", json!("x"));
        assert!(evaluate(&not_contains, Some(&json!(12))));
        assert!(evaluate(&not_contains, None));
        assert!(!evaluate(&not_contains, Some(&json!("XYZ"))));
        assert!(!evaluate(&rule("notContains", json!("a")), Some(&json!(["a"]))));
    }

    #[test]
    fn numeric_operators_require_numbers() {
        assert!(evaluate(&rule("greaterThan", json!(10)), Some(&json!(11))));
        assert!(!evaluate(&rule("greaterThan", json!(10)), Some(&json!("11"))));
        assert!(evaluate(&rule("lessThanOrEqual", json!(3)), Some(&json!(3))));
        assert!(evaluate(&rule("greater_than_or_equal", json!(2.5)), Some(&json!(3))));
        assert!(!evaluate(&rule("less_than", json!(null)), Some(&json!(1))));
    }

    #[test]
    fn emptiness_checks() {
        let empty = rule("isEmpty", Value::Null);
        assert!(evaluate(&empty, None));
        assert!(evaluate(&empty, Some(&Value::Null)));
        assert!(evaluate(&empty, Some(&json!(""))));
        assert!(evaluate(&empty, Some(&json!([]))));
        assert!(!evaluate(&empty, Some(&json!(0))));

        let not_empty = rule("isNotEmpty", Value::Null);
        assert!(evaluate(&not_empty, Some(&json!(0))));
        assert!(evaluate(&not_empty, Some(&json!(false))));
        assert!(!evaluate(&not_empty, Some(&json!([]))));
    }

    #[test]
    fn explicit_null_operand_is_a_value() {
        let equals_null = rule("equals", Value::Null);
        assert_eq!(equals_null.value, Some(Value::Null));
        assert!(evaluate(&equals_null, Some(&Value::Null)));
        assert!(!evaluate(&equals_null, None));
        assert!(!evaluate(&equals_null, Some(&json!(""))));

        let not_equals_null = rule("notEquals", Value::Null);
        assert!(!evaluate(&not_equals_null, Some(&Value::Null)));
        assert!(evaluate(&not_equals_null, None));

        let contains_null = rule("contains", Value::Null);
        assert!(evaluate(&contains_null, Some(&json!(["a", null]))));
        assert!(!evaluate(&contains_null, Some(&json!(["a"]))));

        let absent: ConditionalRule =
            serde_json::from_value(json!({ "field": "watched", "operator": "equals" }))
                .expect("rule");
        assert_eq!(absent.value, None);
        assert!(evaluate(&absent, None));
        assert!(!evaluate(&absent, Some(&Value::Null)));
    }

    #[test]
    fn unknown_operator_never_matches() {
        let unknown = rule("startsWith", json!("a"));
        assert_eq!(unknown.operator, Operator::Unknown);
        assert!(!evaluate(&unknown, Some(&json!("abc"))));
    }

    #[test]
    fn group_modes_combine_results() {
        let values = json!({ "a": 1, "b": "x" });
        let values = values.as_object().expect("object");
        let any: ConditionalGroup = serde_json::from_value(json!({
            "mode": "any",
            "rules": [
                { "field": "a", "operator": "equals", "value": 2 },
                { "field": "b", "operator": "equals", "value": "x" }
            ]
        }))
        .expect("group");
        assert!(any.matches(values));

        let all = ConditionalGroup {
            mode: ConditionMode::All,
            ..any
        };
        assert!(!all.matches(values));
    }
}
