use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::explain::{combine, explain_condition};
use crate::index::{FieldIndex, FieldSource};
use crate::spec::condition::Condition;
use crate::spec::field::Field;
use crate::spec::form::FormSpec;

/// Effective visibility per field id, section children included.
pub type VisibilityMap = BTreeMap<String, bool>;

/// Whether rules are applied. The editing surface shows everything while
/// preview is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    Edit,
    #[default]
    Preview,
}

impl VisibilityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityMode::Edit => "edit",
            VisibilityMode::Preview => "preview",
        }
    }
}

impl fmt::Display for VisibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(VisibilityMode::Edit),
            "preview" => Ok(VisibilityMode::Preview),
            other => Err(format!("unknown visibility mode '{}'", other)),
        }
    }
}

/// Tests one condition against the current values in `index`.
pub fn evaluate_condition(condition: &Condition, index: &FieldIndex<'_>) -> bool {
    explain_condition(condition, index).matched
}

/// Decides whether `field` should be shown right now.
///
/// Fields without a rule, or whose rule has no conditions, are always
/// visible. Otherwise every condition is evaluated and the results are
/// combined with the group's logic. Never panics and never mutates input.
pub fn is_visible<'i, 'a: 'i>(field: &Field, source: impl Into<FieldSource<'i, 'a>>) -> bool {
    let Some(group) = field.enable_when.as_ref() else {
        return true;
    };
    let Some(conditions) = group.active_conditions() else {
        return true;
    };

    let results: Vec<bool> = match source.into() {
        FieldSource::Index(index) => evaluate_each(conditions, index),
        FieldSource::Fields(fields) => evaluate_each(conditions, &FieldIndex::build(fields)),
    };
    combine(group.logic, &results)
}

fn evaluate_each(conditions: &[Condition], index: &FieldIndex<'_>) -> Vec<bool> {
    conditions
        .iter()
        .map(|condition| evaluate_condition(condition, index))
        .collect()
}

/// Resolves effective visibility for every field of the form.
///
/// A section child is visible only when its own rule passes and its section
/// is visible. In [`VisibilityMode::Edit`] every field is reported visible.
pub fn resolve_visibility(spec: &FormSpec, mode: VisibilityMode) -> VisibilityMap {
    let index = spec.index();
    let mut map = VisibilityMap::new();
    resolve_into(&spec.fields, &index, mode, true, &mut map);
    trace!(
        form_id = %spec.id,
        %mode,
        visible = map.values().filter(|visible| **visible).count(),
        total = map.len(),
        "resolved visibility"
    );
    map
}

fn resolve_into(
    fields: &[Field],
    index: &FieldIndex<'_>,
    mode: VisibilityMode,
    parent_visible: bool,
    map: &mut VisibilityMap,
) {
    for field in fields {
        let visible = parent_visible && effective(field, index, mode);
        map.insert(field.id.clone(), visible);
        if !field.fields.is_empty() {
            resolve_into(&field.fields, index, mode, visible, map);
        }
    }
}

pub(crate) fn effective(field: &Field, index: &FieldIndex<'_>, mode: VisibilityMode) -> bool {
    match mode {
        VisibilityMode::Edit => true,
        VisibilityMode::Preview => is_visible(field, index),
    }
}
