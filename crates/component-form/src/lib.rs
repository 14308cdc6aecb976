use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use form_spec::{
    Field, FormSpec, VisibilityMode, build_report, collect_answers, explain, is_visible, lint,
    report_json, report_text,
};

const DEFAULT_FORM: &str = include_str!("../tests/fixtures/default_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse form: {0}")]
    FormParse(#[source] serde_json::Error),
    #[error("failed to parse field: {0}")]
    FieldParse(#[source] serde_json::Error),
    #[error("failed to parse fields: {0}")]
    FieldsParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("field '{0}' is not part of the form")]
    FieldUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

/// Host-supplied configuration. An empty string selects the bundled form in
/// preview mode.
#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_json: Option<String>,
    #[serde(default)]
    mode: Option<VisibilityMode>,
}

struct Loaded {
    spec: FormSpec,
    mode: VisibilityMode,
}

fn load(config_json: &str) -> Result<Loaded, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let form_json = config.form_json.as_deref().unwrap_or(DEFAULT_FORM);
    let spec = serde_json::from_str(form_json).map_err(ComponentError::FormParse)?;
    Ok(Loaded {
        spec,
        mode: config.mode.unwrap_or_default(),
    })
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<Loaded, ComponentError> {
    let loaded = load(config_json)?;
    if loaded.spec.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(loaded)
    }
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            debug!(error = %err, "component call failed");
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Returns the form document in its canonical shape.
pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|loaded| {
        serde_json::to_value(loaded.spec).map_err(ComponentError::JsonEncode)
    }))
}

/// Visibility listing of every field as JSON.
pub fn visibility(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .map(|loaded| report_json(&build_report(&loaded.spec, loaded.mode))),
    )
}

/// Visibility listing of every field as text.
pub fn visibility_text(form_id: &str, config_json: &str) -> String {
    respond_string(
        ensure_form(form_id, config_json)
            .map(|loaded| report_text(&build_report(&loaded.spec, loaded.mode))),
    )
}

/// Per-condition breakdown of one field's visibility.
pub fn explain_field(form_id: &str, config_json: &str, field_id: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|loaded| {
        let index = loaded.spec.index();
        let field = index
            .get(field_id)
            .ok_or_else(|| ComponentError::FieldUnavailable(field_id.to_string()))?;
        serde_json::to_value(explain(field, &index)).map_err(ComponentError::JsonEncode)
    }))
}

pub fn lint_form(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|loaded| {
        serde_json::to_value(lint(&loaded.spec)).map_err(ComponentError::JsonEncode)
    }))
}

/// Answers of the visible fields, keyed by id.
pub fn answers(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .map(|loaded| Value::Object(collect_answers(&loaded.spec, loaded.mode))),
    )
}

/// Checks one field against a raw field collection without a form wrapper.
pub fn field_visible(field_json: &str, fields_json: &str) -> String {
    let result = serde_json::from_str::<Field>(field_json)
        .map_err(ComponentError::FieldParse)
        .and_then(|field| {
            let fields: Vec<Field> =
                serde_json::from_str(fields_json).map_err(ComponentError::FieldsParse)?;
            Ok(json!({ "visible": is_visible(&field, &fields) }))
        });
    respond(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_returns_form_json() {
        let payload = describe("example-form", "");
        let spec: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(spec["id"], "example-form");
        assert_eq!(spec["fields"][1]["enableWhen"]["logic"], "AND");
    }

    #[test]
    fn unknown_form_is_reported_as_error() {
        let payload = describe("other-form", "");
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["error"], "form 'other-form' is not available");
    }

    #[test]
    fn visibility_hides_unselected_branch() {
        let payload = visibility("example-form", "");
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["mode"], "preview");
        assert_eq!(parsed["visible"], 2);
        let phone = parsed["fields"]
            .as_array()
            .expect("fields")
            .iter()
            .find(|field| field["id"] == "phone_number")
            .expect("phone field");
        assert_eq!(phone["visible"], false);
    }

    #[test]
    fn edit_mode_from_config_shows_everything() {
        let config = json!({ "mode": "edit" });
        let payload = visibility("example-form", &config.to_string());
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["visible"], 3);

        let text = visibility_text("example-form", &config.to_string());
        assert!(text.contains("Mode: edit (3/3 visible)"));
    }

    #[test]
    fn explain_field_reports_condition_outcomes() {
        let payload = explain_field("example-form", "", "phone_number");
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["visible"], false);
        assert_eq!(parsed["conditions"][0]["expected"], "phone");
        assert_eq!(parsed["conditions"][0]["actual"], "email");

        let missing = explain_field("example-form", "", "nope");
        let parsed: Value = serde_json::from_str(&missing).expect("json");
        assert_eq!(parsed["error"], "field 'nope' is not part of the form");
    }

    #[test]
    fn custom_form_and_answers() {
        let form = json!({
            "id": "custom",
            "title": "Custom",
            "fields": [
                { "id": "likes", "fieldType": "check", "selected": ["tea"] },
                { "id": "brew", "fieldType": "input", "answer": "green",
                  "enableWhen": { "conditions": [
                      { "targetId": "likes", "operator": "includes", "value": "tea" }
                  ] } },
                { "id": "roast", "fieldType": "input", "answer": "dark",
                  "enableWhen": { "conditions": [
                      { "targetId": "likes", "operator": "includes", "value": "coffee" }
                  ] } }
            ]
        });
        let config = json!({ "form_json": form.to_string() });
        let payload = answers("custom", &config.to_string());
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed, json!({ "likes": ["tea"], "brew": "green" }));

        let report = lint_form("custom", &config.to_string());
        let parsed: Value = serde_json::from_str(&report).expect("json");
        assert_eq!(parsed["valid"], true);
    }

    #[test]
    fn field_visible_accepts_raw_collections() {
        let fields = json!([
            { "id": "section", "fieldType": "section", "fields": [
                { "id": "inner", "fieldType": "radio", "selected": "x" }
            ] }
        ]);
        let field = json!({
            "id": "outer",
            "fieldType": "input",
            "enableWhen": { "logic": "OR", "conditions": [
                { "targetId": "inner", "operator": "equals", "value": "x" },
                { "targetId": "missing", "operator": "equals", "value": "x" }
            ] }
        });
        let payload = field_visible(&field.to_string(), &fields.to_string());
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["visible"], true);

        let broken = field_visible("not json", "[]");
        let parsed: Value = serde_json::from_str(&broken).expect("json");
        assert!(parsed["error"].as_str().is_some());
    }

    #[test]
    fn field_visible_names_which_input_failed() {
        let broken_field = field_visible("not json", "[]");
        let parsed: Value = serde_json::from_str(&broken_field).expect("json");
        let message = parsed["error"].as_str().expect("error message");
        assert!(message.starts_with("failed to parse field: "));

        let broken_fields = field_visible(r#"{ "id": "a", "fieldType": "input" }"#, "{}");
        let parsed: Value = serde_json::from_str(&broken_fields).expect("json");
        let message = parsed["error"].as_str().expect("error message");
        assert!(message.starts_with("failed to parse fields: "));
    }
}
