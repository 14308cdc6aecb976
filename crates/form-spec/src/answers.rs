use serde_json::{Map, Value};

use crate::index::FieldIndex;
use crate::spec::field::Field;
use crate::spec::form::FormSpec;
use crate::value::{FieldValue, extract_value};
use crate::visibility::{VisibilityMode, effective};

/// Collects the answers a renderer would submit: the extracted value of
/// every visible, value-holding field, keyed by id. Hidden fields, fields
/// inside hidden sections, and unanswered (null) fields are left out.
pub fn collect_answers(spec: &FormSpec, mode: VisibilityMode) -> Map<String, Value> {
    let index = spec.index();
    let mut answers = Map::new();
    collect_into(&spec.fields, &index, mode, &mut answers);
    answers
}

fn collect_into(
    fields: &[Field],
    index: &FieldIndex<'_>,
    mode: VisibilityMode,
    answers: &mut Map<String, Value>,
) {
    for field in fields {
        if !effective(field, index, mode) {
            continue;
        }
        if field.field_type.holds_value() {
            match extract_value(field) {
                FieldValue::Null => {}
                value => {
                    answers.insert(field.id.clone(), value.to_json());
                }
            }
        }
        if !field.fields.is_empty() {
            collect_into(&field.fields, index, mode, answers);
        }
    }
}
