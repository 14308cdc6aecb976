#![allow(missing_docs)]

pub mod answers;
pub mod error;
pub mod explain;
pub mod index;
pub mod lint;
pub mod report;
pub mod spec;
pub mod value;
pub mod visibility;

pub use answers::collect_answers;
pub use error::FormError;
pub use explain::{ConditionFailure, ConditionOutcome, Explanation, explain, explain_condition};
pub use index::{FieldIndex, FieldSource, build_index};
pub use lint::{LintCode, LintIssue, LintReport, lint};
pub use report::{ReportEntry, VisibilityReport, build_report, report_json, report_text};
pub use spec::{
    Condition, ConditionGroup, Field, FieldOption, FieldType, FormSpec, Logic, Operator,
};
pub use value::{FieldValue, coerce_str, extract_value};
pub use visibility::{
    VisibilityMap, VisibilityMode, evaluate_condition, is_visible, resolve_visibility,
};
