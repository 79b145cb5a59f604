use serde_json::{Map, Value};

use crate::answers::{AnswerMap, as_number, as_text};
use crate::spec::form::FormSpec;
use crate::spec::question::{Condition, ConditionOperator, QuestionSpec};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Read access to recorded answer values by question id.
pub trait AnswerLookup {
    fn answer_value(&self, question_id: &str) -> Option<&Value>;
}

impl AnswerLookup for AnswerMap {
    fn answer_value(&self, question_id: &str) -> Option<&Value> {
        self.get(question_id).map(|answer| &answer.value)
    }
}

impl AnswerLookup for Map<String, Value> {
    fn answer_value(&self, question_id: &str) -> Option<&Value> {
        self.get(question_id)
    }
}

/// Whether `question` should currently be presented.
pub fn is_visible<A: AnswerLookup + ?Sized>(question: &QuestionSpec, answers: &A) -> bool {
    match &question.condition {
        None => true,
        Some(condition) => condition_holds(condition, answers),
    }
}

pub fn resolve_visibility<A: AnswerLookup + ?Sized>(
    spec: &FormSpec,
    answers: &A,
) -> VisibilityMap {
    spec.questions
        .iter()
        .map(|question| (question.id.clone(), is_visible(question, answers)))
        .collect()
}

fn condition_holds<A: AnswerLookup + ?Sized>(condition: &Condition, answers: &A) -> bool {
    let Some(actual) = answers
        .answer_value(&condition.question_id)
        .filter(|value| !value.is_null())
    else {
        return false;
    };
    let expected = &condition.value;

    match condition.operator {
        ConditionOperator::Equals => loose_eq(actual, expected),
        ConditionOperator::NotEquals => !loose_eq(actual, expected),
        ConditionOperator::Contains => match actual {
            Value::Array(items) => items.iter().any(|item| loose_eq(item, expected)),
            Value::String(text) => text.contains(&as_text(expected)),
            _ => false,
        },
        ConditionOperator::GreaterThan => {
            matches!((as_number(actual), as_number(expected)), (Some(a), Some(b)) if a > b)
        }
        ConditionOperator::LessThan => {
            matches!((as_number(actual), as_number(expected)), (Some(a), Some(b)) if a < b)
        }
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a == b;
    }
    let scalar = |value: &Value| !matches!(value, Value::Array(_) | Value::Object(_));
    scalar(left) && scalar(right) && as_text(left) == as_text(right)
}
