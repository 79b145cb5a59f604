#![allow(missing_docs)]

pub mod answers;
pub mod questionnaire;
pub mod render;
pub mod session;
pub mod spec;
pub mod store;
pub mod validate;
pub mod visibility;

pub use answers::{
    Answer, AnswerMap, AnswerSet, Meta, SubmissionReport, ValidationError, ValidationResult,
};
pub use questionnaire::{
    AnswerOption, ItemType, MappingError, Questionnaire, QuestionnaireItem, from_external,
    from_questionnaire, to_external, to_questionnaire,
};
pub use render::{
    RenderPayload, RenderProgress, RenderQuestion, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use session::{
    Callbacks, Clock, FixedClock, FormSession, Progress, SessionError, SessionHandler,
    SessionState, Step, SystemClock,
};
pub use spec::{
    Condition, ConditionOperator, Constraint, FormSpec, PublicationStatus, QuestionOption,
    QuestionSpec, QuestionType, ScaleLabels, SpecError,
};
pub use store::{DirectoryRepository, FormRepository, MemoryRepository, StoreError};
pub use validate::{validate_answer, validate_submission};
pub use visibility::{AnswerLookup, VisibilityMap, is_visible, resolve_visibility};
