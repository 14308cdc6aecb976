use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::spec::condition::ConditionGroup;

/// Supported field kinds. The kind decides where a field keeps its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Input,
    Radio,
    Check,
    Selection,
    Section,
    /// Display-only or editor-specific kinds that carry no comparable value.
    #[default]
    #[serde(other)]
    Other,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Input => "input",
            FieldType::Radio => "radio",
            FieldType::Check => "check",
            FieldType::Selection => "selection",
            FieldType::Section => "section",
            FieldType::Other => "other",
        }
    }

    /// Whether the kind holds an answer that conditions can test.
    pub fn holds_value(&self) -> bool {
        matches!(
            self,
            FieldType::Input | FieldType::Radio | FieldType::Check | FieldType::Selection
        )
    }
}

/// A selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

/// A question, choice, or section container in a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_field_type")]
    #[schemars(with = "FieldType")]
    pub field_type: FieldType,
    #[serde(default, alias = "label", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Free-text answer of an `input` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    /// Selected option id (radio, selection) or ids (check).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Children of a `section`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_when: Option<ConditionGroup>,
}

impl Field {
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            title: None,
            required: false,
            answer: None,
            selected: None,
            options: Vec::new(),
            fields: Vec::new(),
            enable_when: None,
        }
    }

    pub fn input(id: impl Into<String>, answer: impl Into<String>) -> Self {
        let mut field = Self::new(id, FieldType::Input);
        field.answer = Some(Value::String(answer.into()));
        field
    }

    pub fn radio(id: impl Into<String>, selected: Option<&str>) -> Self {
        let mut field = Self::new(id, FieldType::Radio);
        field.selected = Some(selected.map_or(Value::Null, |id| Value::String(id.into())));
        field
    }

    pub fn check<I, S>(id: impl Into<String>, selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(id, FieldType::Check);
        field.selected = Some(Value::Array(
            selected
                .into_iter()
                .map(|item| Value::String(item.into()))
                .collect(),
        ));
        field
    }

    pub fn section(id: impl Into<String>, fields: Vec<Field>) -> Self {
        let mut field = Self::new(id, FieldType::Section);
        field.fields = fields;
        field
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_enable_when(mut self, group: ConditionGroup) -> Self {
        self.enable_when = Some(group);
        self
    }

    pub fn is_section(&self) -> bool {
        matches!(self.field_type, FieldType::Section)
    }

    /// Title for listings, falling back to the id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

// A missing or non-string `fieldType` is an unknown kind.
fn lenient_field_type<'de, D>(deserializer: D) -> Result<FieldType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(raw @ Value::String(_)) => serde_json::from_value(raw).unwrap_or_default(),
        _ => FieldType::Other,
    })
}
