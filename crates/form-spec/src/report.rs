use serde_json::{Map, Value, json};

use crate::index::FieldIndex;
use crate::spec::field::{Field, FieldType};
use crate::spec::form::FormSpec;
use crate::visibility::{VisibilityMode, effective};

/// One listed field.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub id: String,
    pub title: String,
    pub field_type: FieldType,
    /// 0 for top-level fields, 1 for section children, and so on.
    pub depth: usize,
    pub visible: bool,
}

/// Visibility listing of a whole form, in document order.
#[derive(Debug, Clone)]
pub struct VisibilityReport {
    pub form_id: String,
    pub form_title: String,
    pub mode: VisibilityMode,
    pub visible: usize,
    pub total: usize,
    pub entries: Vec<ReportEntry>,
}

/// Build the report from the form and the chosen mode.
///
/// Visibility is decided per entry, so fields sharing an id keep their own
/// result.
pub fn build_report(spec: &FormSpec, mode: VisibilityMode) -> VisibilityReport {
    let index = spec.index();
    let mut entries = Vec::new();
    push_entries(&spec.fields, 0, true, &index, mode, &mut entries);

    VisibilityReport {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        mode,
        visible: entries.iter().filter(|entry| entry.visible).count(),
        total: entries.len(),
        entries,
    }
}

fn push_entries(
    fields: &[Field],
    depth: usize,
    parent_visible: bool,
    index: &FieldIndex<'_>,
    mode: VisibilityMode,
    entries: &mut Vec<ReportEntry>,
) {
    for field in fields {
        let visible = parent_visible && effective(field, index, mode);
        entries.push(ReportEntry {
            id: field.id.clone(),
            title: field.display_title().to_string(),
            field_type: field.field_type,
            depth,
            visible,
        });
        push_entries(&field.fields, depth + 1, visible, index, mode, entries);
    }
}

/// Render the report as a structured JSON value.
pub fn report_json(report: &VisibilityReport) -> Value {
    let fields = report
        .entries
        .iter()
        .map(|entry| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(entry.id.clone()));
            map.insert("title".into(), Value::String(entry.title.clone()));
            map.insert(
                "field_type".into(),
                Value::String(entry.field_type.as_str().to_string()),
            );
            map.insert("depth".into(), Value::from(entry.depth));
            map.insert("visible".into(), Value::Bool(entry.visible));
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": report.form_id,
        "form_title": report.form_title,
        "mode": report.mode.as_str(),
        "visible": report.visible,
        "total": report.total,
        "fields": fields,
    })
}

/// Render the report as human-friendly text.
pub fn report_text(report: &VisibilityReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", report.form_title, report.form_id));
    lines.push(format!(
        "Mode: {} ({}/{} visible)",
        report.mode, report.visible, report.total
    ));
    for entry in &report.entries {
        let marker = if entry.visible { "+" } else { "-" };
        lines.push(format!(
            "{}{} {} ({}) [{}]",
            "  ".repeat(entry.depth),
            marker,
            entry.id,
            entry.title,
            entry.field_type.as_str()
        ));
    }
    lines.join("\n")
}
