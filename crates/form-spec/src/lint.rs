use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::index::FieldIndex;
use crate::spec::condition::Operator;
use crate::spec::field::{Field, FieldType};
use crate::spec::form::FormSpec;

/// Categories of rule problems found by [`lint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintCode {
    DuplicateId,
    DanglingTarget,
    SelfReference,
    UnknownOperator,
    OperatorMismatch,
    SectionTarget,
    Cycle,
}

impl LintCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintCode::DuplicateId => "duplicate_id",
            LintCode::DanglingTarget => "dangling_target",
            LintCode::SelfReference => "self_reference",
            LintCode::UnknownOperator => "unknown_operator",
            LintCode::OperatorMismatch => "operator_mismatch",
            LintCode::SectionTarget => "section_target",
            LintCode::Cycle => "cycle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub field_id: String,
    pub code: LintCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    pub valid: bool,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    pub fn has(&self, code: LintCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Reports rules the evaluator would silently resolve to `false`, plus
/// duplicate ids and dependency cycles. Evaluation itself is unaffected.
pub fn lint(spec: &FormSpec) -> LintReport {
    let mut flat = Vec::new();
    flatten(&spec.fields, &mut flat);
    let index = spec.index();

    let mut issues = Vec::new();
    duplicate_ids(&flat, &mut issues);
    for field in &flat {
        check_conditions(field, &index, &mut issues);
    }
    for cycle in find_cycles(&flat, &index) {
        issues.push(LintIssue {
            field_id: cycle[0].clone(),
            code: LintCode::Cycle,
            message: format!(
                "visibility depends on itself through {} -> {}",
                cycle.join(" -> "),
                cycle[0]
            ),
        });
    }

    LintReport {
        valid: issues.is_empty(),
        issues,
    }
}

fn flatten<'a>(fields: &'a [Field], out: &mut Vec<&'a Field>) {
    for field in fields {
        out.push(field);
        flatten(&field.fields, out);
    }
}

fn duplicate_ids(flat: &[&Field], issues: &mut Vec<LintIssue>) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for field in flat {
        *counts.entry(field.id.as_str()).or_default() += 1;
    }
    for (id, count) in counts.into_iter().filter(|(_, count)| *count > 1) {
        issues.push(LintIssue {
            field_id: id.to_string(),
            code: LintCode::DuplicateId,
            message: format!("id is used by {} fields; the last one wins", count),
        });
    }
}

fn check_conditions(field: &Field, index: &FieldIndex<'_>, issues: &mut Vec<LintIssue>) {
    let Some(conditions) = field
        .enable_when
        .as_ref()
        .and_then(|group| group.active_conditions())
    else {
        return;
    };

    for condition in conditions {
        let issue = |code: LintCode, message: String| LintIssue {
            field_id: field.id.clone(),
            code,
            message,
        };

        if condition.operator == Operator::Unknown {
            issues.push(issue(
                LintCode::UnknownOperator,
                format!(
                    "condition on '{}' uses an unsupported operator",
                    condition.target_id
                ),
            ));
        }

        if condition.target_id == field.id {
            issues.push(issue(
                LintCode::SelfReference,
                "condition targets the field itself".into(),
            ));
            continue;
        }

        let Some(target) = index.get(&condition.target_id) else {
            issues.push(issue(
                LintCode::DanglingTarget,
                format!("condition targets unknown field '{}'", condition.target_id),
            ));
            continue;
        };

        match (condition.operator, target.field_type) {
            (_, FieldType::Section) => issues.push(issue(
                LintCode::SectionTarget,
                format!(
                    "condition targets section '{}', which holds no value",
                    target.id
                ),
            )),
            (Operator::Equals, FieldType::Check) => issues.push(issue(
                LintCode::OperatorMismatch,
                format!(
                    "'equals' never matches multi-select field '{}'; use 'includes'",
                    target.id
                ),
            )),
            (Operator::Includes, kind) if kind != FieldType::Check => issues.push(issue(
                LintCode::OperatorMismatch,
                format!(
                    "'includes' only matches multi-select fields, '{}' is {}",
                    target.id,
                    kind.as_str()
                ),
            )),
            _ => {}
        }
    }
}

/// Enumerates every elementary cycle of the "field depends on target" graph.
/// Each walk starts at one id and only steps onto larger ids, so a cycle is
/// found exactly once, already rotated to begin at its smallest id.
fn find_cycles(flat: &[&Field], index: &FieldIndex<'_>) -> Vec<Vec<String>> {
    let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for field in flat {
        let targets = field
            .enable_when
            .as_ref()
            .and_then(|group| group.active_conditions())
            .unwrap_or_default()
            .iter()
            .map(|condition| condition.target_id.as_str())
            .filter(|target| *target != field.id && index.contains(target));
        edges.entry(field.id.as_str()).or_default().extend(targets);
    }

    let mut cycles: BTreeSet<Vec<String>> = BTreeSet::new();
    for &start in edges.keys() {
        let mut path = vec![start];
        walk(start, start, &edges, &mut path, &mut cycles);
    }
    cycles.into_iter().collect()
}

fn walk<'a>(
    start: &'a str,
    node: &'a str,
    edges: &BTreeMap<&'a str, BTreeSet<&'a str>>,
    path: &mut Vec<&'a str>,
    cycles: &mut BTreeSet<Vec<String>>,
) {
    let Some(targets) = edges.get(node) else {
        return;
    };
    for &next in targets {
        if next == start {
            cycles.insert(path.iter().map(|id| id.to_string()).collect());
        } else if next > start && !path.contains(&next) {
            path.push(next);
            walk(start, next, edges, path, cycles);
            path.pop();
        }
    }
}
