use serde::Serialize;
use tracing::debug;

use crate::index::{FieldIndex, FieldSource};
use crate::spec::condition::{Condition, Logic, Operator};
use crate::spec::field::Field;
use crate::value::{FieldValue, coerce_str, extract_value};

/// Why a condition evaluated to false without a real comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionFailure {
    /// `targetId` does not name any indexed field.
    MissingTarget,
    /// The operator is outside the supported set.
    UnknownOperator,
    /// `equals` against a list, or `includes` against a non-list.
    ShapeMismatch,
}

/// Outcome of one condition, with the values that were compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionOutcome {
    pub target_id: String,
    pub operator: Operator,
    pub expected: String,
    pub actual: Option<FieldValue>,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ConditionFailure>,
}

/// Full account of a field's visibility decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub field_id: String,
    pub visible: bool,
    /// `None` when the field carries no active rule.
    pub logic: Option<Logic>,
    pub conditions: Vec<ConditionOutcome>,
}

/// Evaluates a single condition against the index and records how the
/// result came about. A missing target, an unknown operator, or a value of
/// the wrong shape all produce `matched == false`.
pub fn explain_condition(condition: &Condition, index: &FieldIndex<'_>) -> ConditionOutcome {
    let expected = coerce_str(&condition.value);
    let mut outcome = ConditionOutcome {
        target_id: condition.target_id.clone(),
        operator: condition.operator,
        expected,
        actual: None,
        matched: false,
        failure: None,
    };

    let Some(target) = index.get(&condition.target_id) else {
        debug!(target_id = %condition.target_id, "condition target not found");
        outcome.failure = Some(ConditionFailure::MissingTarget);
        return outcome;
    };

    let actual = extract_value(target);
    let result = compare(condition.operator, &actual, &outcome.expected);
    outcome.actual = Some(actual);
    match result {
        Ok(matched) => outcome.matched = matched,
        Err(failure) => {
            debug!(
                target_id = %condition.target_id,
                operator = condition.operator.as_str(),
                ?failure,
                "condition cannot be evaluated"
            );
            outcome.failure = Some(failure);
        }
    }
    outcome
}

fn compare(
    operator: Operator,
    actual: &FieldValue,
    expected: &str,
) -> Result<bool, ConditionFailure> {
    match operator {
        Operator::Equals => match actual {
            FieldValue::List(_) => Err(ConditionFailure::ShapeMismatch),
            other => Ok(other.coerced() == expected),
        },
        Operator::Contains => Ok(actual
            .coerced()
            .to_lowercase()
            .contains(&expected.to_lowercase())),
        Operator::Includes => actual
            .as_list()
            .map(|items| items.iter().any(|item| item == expected))
            .ok_or(ConditionFailure::ShapeMismatch),
        Operator::Unknown => Err(ConditionFailure::UnknownOperator),
    }
}

/// Explains whether `field` is visible, evaluating every condition of its
/// rule in order.
pub fn explain<'i, 'a: 'i>(field: &Field, source: impl Into<FieldSource<'i, 'a>>) -> Explanation {
    let rule = field.enable_when.as_ref().and_then(|group| {
        group
            .active_conditions()
            .map(|conditions| (group.logic, conditions))
    });
    let Some((logic, conditions)) = rule else {
        return Explanation {
            field_id: field.id.clone(),
            visible: true,
            logic: None,
            conditions: Vec::new(),
        };
    };

    let outcomes = match source.into() {
        FieldSource::Index(index) => evaluate_all(conditions, index),
        FieldSource::Fields(fields) => evaluate_all(conditions, &FieldIndex::build(fields)),
    };
    let results: Vec<bool> = outcomes.iter().map(|outcome| outcome.matched).collect();
    let visible = combine(logic, &results);

    Explanation {
        field_id: field.id.clone(),
        visible,
        logic: Some(logic),
        conditions: outcomes,
    }
}

fn evaluate_all(conditions: &[Condition], index: &FieldIndex<'_>) -> Vec<ConditionOutcome> {
    conditions
        .iter()
        .map(|condition| explain_condition(condition, index))
        .collect()
}

/// Folds condition results; anything but `OR` requires every result.
pub(crate) fn combine(logic: Logic, results: &[bool]) -> bool {
    match logic {
        Logic::Or => results.iter().any(|matched| *matched),
        Logic::And => results.iter().all(|matched| *matched),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::condition::ConditionGroup;

    #[test]
    fn records_missing_target() {
        let fields = vec![Field::input("name", "Ada")];
        let index = FieldIndex::build(&fields);
        let outcome = explain_condition(&Condition::new("ghost", Operator::Equals, "x"), &index);
        assert!(!outcome.matched);
        assert_eq!(outcome.failure, Some(ConditionFailure::MissingTarget));
        assert!(outcome.actual.is_none());
    }

    #[test]
    fn records_shape_mismatch_and_actual_value() {
        let fields = vec![Field::check("pets", ["cat", "dog"])];
        let index = FieldIndex::build(&fields);
        let outcome = explain_condition(&Condition::new("pets", Operator::Equals, "cat"), &index);
        assert!(!outcome.matched);
        assert_eq!(outcome.failure, Some(ConditionFailure::ShapeMismatch));
        assert_eq!(
            outcome.actual,
            Some(FieldValue::List(vec!["cat".into(), "dog".into()]))
        );
    }

    #[test]
    fn explanation_lists_each_condition_in_order() {
        let fields = vec![
            Field::radio("color", Some("red")),
            Field::input("name", "Ada Lovelace"),
        ];
        let field = Field::input("extra", "").with_enable_when(ConditionGroup::any(vec![
            Condition::new("color", Operator::Equals, "blue"),
            Condition::new("name", Operator::Contains, "LOVE"),
            Condition::new("color", Operator::Unknown, "red"),
        ]));

        let explanation = explain(&field, &fields);
        assert!(explanation.visible);
        assert_eq!(explanation.logic, Some(Logic::Or));
        let matched: Vec<bool> = explanation.conditions.iter().map(|c| c.matched).collect();
        assert_eq!(matched, vec![false, true, false]);
        assert_eq!(
            explanation.conditions[2].failure,
            Some(ConditionFailure::UnknownOperator)
        );
    }

    #[test]
    fn unconditional_field_has_no_logic() {
        let field = Field::input("free", "x").with_enable_when(ConditionGroup::all(vec![]));
        let fields: Vec<Field> = Vec::new();
        let explanation = explain(&field, &fields);
        assert!(explanation.visible);
        assert!(explanation.logic.is_none());
        assert!(explanation.conditions.is_empty());
    }
}
