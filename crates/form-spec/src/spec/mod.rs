pub mod condition;
pub mod field;
pub mod form;

pub use condition::{Condition, ConditionGroup, Logic, Operator};
pub use field::{Field, FieldOption, FieldType};
pub use form::FormSpec;
