pub mod form;
pub mod question;

pub use form::{FormSpec, PublicationStatus, SpecError};
pub use question::{
    Condition, ConditionOperator, Constraint, QuestionOption, QuestionSpec, QuestionType,
    ScaleLabels,
};
