use serde::Serialize;
use serde_json::Value;

use crate::spec::field::{Field, FieldType};

/// Normalized, comparable value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// String form used by `equals` and `contains`; null becomes empty and
    /// lists are comma-joined.
    pub fn coerced(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join(","),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Extracts the comparable value of a field according to its kind.
///
/// Never fails: kinds without an answer (sections, display fields) yield
/// [`FieldValue::Null`].
pub fn extract_value(field: &Field) -> FieldValue {
    match field.field_type {
        FieldType::Input => optional_text(field.answer.as_ref()),
        FieldType::Radio | FieldType::Selection => optional_text(field.selected.as_ref()),
        FieldType::Check => match &field.selected {
            Some(Value::Array(items)) => FieldValue::List(items.iter().map(coerce_str).collect()),
            None | Some(Value::Null) => FieldValue::List(
                field
                    .options
                    .iter()
                    .filter(|option| option.selected)
                    .map(|option| option.id.clone())
                    .collect(),
            ),
            Some(other) => FieldValue::Text(coerce_str(other)),
        },
        FieldType::Section | FieldType::Other => FieldValue::Null,
    }
}

fn optional_text(value: Option<&Value>) -> FieldValue {
    match value {
        None | Some(Value::Null) => FieldValue::Null,
        Some(value) => FieldValue::Text(coerce_str(value)),
    }
}

/// Loose string conversion applied to both sides of a comparison.
pub fn coerce_str(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(coerce_str).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
