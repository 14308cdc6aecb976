use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::value::coerce_str;

/// How the outcomes of a condition group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

/// Comparison applied between a target field's value and the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = "=")]
    Equals,
    Contains,
    Includes,
    /// Anything the evaluator does not understand, including a missing operator.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::Includes => "includes",
            Operator::Unknown => "unknown",
        }
    }
}

/// One comparison against the current value of another field.
///
/// Older producers persist the target as `fieldId` and the expected value as
/// `answerString`; both spellings are accepted on input and the canonical
/// `targetId` / `value` names are written back out. A non-string target is
/// coerced to text and a non-string operator reads as [`Operator::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default, alias = "fieldId", deserialize_with = "lenient_target")]
    #[schemars(with = "String")]
    pub target_id: String,
    #[serde(default, deserialize_with = "lenient_operator")]
    #[schemars(with = "Operator")]
    pub operator: Operator,
    #[serde(default, alias = "answerString")]
    pub value: Value,
}

impl Condition {
    pub fn new(target_id: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            target_id: target_id.into(),
            operator,
            value: value.into(),
        }
    }

    /// Stand-in for an entry that is not a condition object. It names no
    /// field and uses no known operator, so it never matches.
    fn unreadable() -> Self {
        Self {
            target_id: String::new(),
            operator: Operator::Unknown,
            value: Value::Null,
        }
    }
}

/// Declarative `enableWhen` rule attached to a field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConditionGroup {
    #[serde(default, deserialize_with = "lenient_logic")]
    #[schemars(with = "Logic")]
    pub logic: Logic,
    #[serde(
        default,
        deserialize_with = "lenient_conditions",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Vec<Condition>>")]
    pub conditions: Option<Vec<Condition>>,
}

impl ConditionGroup {
    /// Group whose conditions must all hold.
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            logic: Logic::And,
            conditions: Some(conditions),
        }
    }

    /// Group where a single matching condition is enough.
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            logic: Logic::Or,
            conditions: Some(conditions),
        }
    }

    /// Conditions that actually take part in evaluation; `None` when the
    /// group places no constraint on the field.
    pub fn active_conditions(&self) -> Option<&[Condition]> {
        self.conditions
            .as_deref()
            .filter(|conditions| !conditions.is_empty())
    }
}

// Only the exact string "OR" selects any-of semantics.
fn lenient_logic<'de, D>(deserializer: D) -> Result<Logic, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) if text == "OR" => Logic::Or,
        _ => Logic::And,
    })
}

fn lenient_operator<'de, D>(deserializer: D) -> Result<Operator, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(raw @ Value::String(_)) => serde_json::from_value(raw).unwrap_or_default(),
        _ => Operator::Unknown,
    })
}

fn lenient_target<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().map(coerce_str).unwrap_or_default())
}

// A `conditions` entry that is not an array places no constraint on the field.
// Unreadable items stay in place as conditions that never match.
fn lenient_conditions<'de, D>(deserializer: D) -> Result<Option<Vec<Condition>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::Array(items)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let conditions = items
        .into_iter()
        .map(|item| {
            serde_json::from_value(item).unwrap_or_else(|error| {
                debug!(%error, "unreadable condition entry");
                Condition::unreadable()
            })
        })
        .collect();
    Ok(Some(conditions))
}
