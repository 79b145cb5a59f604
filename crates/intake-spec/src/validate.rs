use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::answers::{
    SubmissionReport, ValidationError, ValidationResult, as_number, as_text, is_blank,
};
use crate::spec::form::FormSpec;
use crate::spec::question::{Constraint, QuestionSpec, QuestionType};
use crate::visibility::{AnswerLookup, resolve_visibility};

pub const REQUIRED_MESSAGE: &str = "This question is required";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const NUMBER_MESSAGE: &str = "Please enter a valid number";
pub const PATTERN_MESSAGE: &str = "Please match the requested format";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Checks a candidate value against its question. The first failing rule
/// wins; failures are returned as data.
pub fn validate_answer<A: AnswerLookup + ?Sized>(
    question: &QuestionSpec,
    value: &Value,
    _prior_answers: &A,
) -> ValidationResult {
    if is_blank(value) {
        return if question.required {
            ValidationResult::invalid(REQUIRED_MESSAGE)
        } else {
            ValidationResult::valid()
        };
    }

    let constraint = question.validation.as_ref();
    let failure = match question.kind {
        QuestionType::Email => check_email(value),
        QuestionType::Number | QuestionType::Scale => check_number(value, constraint),
        QuestionType::Text | QuestionType::Textarea => check_length(value, constraint),
        QuestionType::Date
        | QuestionType::Select
        | QuestionType::Radio
        | QuestionType::Checkbox
        | QuestionType::Boolean => None,
    }
    .or_else(|| check_pattern(value, constraint));

    match failure {
        Some(message) => ValidationResult::invalid(message),
        None => ValidationResult::valid(),
    }
}

fn check_email(value: &Value) -> Option<String> {
    if EMAIL.is_match(&as_text(value)) {
        None
    } else {
        Some(EMAIL_MESSAGE.into())
    }
}

fn check_number(value: &Value, constraint: Option<&Constraint>) -> Option<String> {
    let Some(number) = as_number(value) else {
        return Some(NUMBER_MESSAGE.into());
    };
    let constraint = constraint?;

    if let Some(min) = constraint.min
        && number < min
    {
        return Some(format!("Value must be at least {}", min));
    }

    if let Some(max) = constraint.max
        && number > max
    {
        return Some(format!("Value must be at most {}", max));
    }

    None
}

fn check_length(value: &Value, constraint: Option<&Constraint>) -> Option<String> {
    let constraint = constraint?;
    let length = as_text(value).chars().count();

    if let Some(min_length) = constraint.min_length
        && length < min_length
    {
        return Some(format!("Must be at least {} characters", min_length));
    }

    if let Some(max_length) = constraint.max_length
        && length > max_length
    {
        return Some(format!("Must be at most {} characters", max_length));
    }

    None
}

fn check_pattern(value: &Value, constraint: Option<&Constraint>) -> Option<String> {
    let pattern = constraint?.pattern.as_deref()?;
    // Patterns that fail to compile are not enforced.
    let regex = Regex::new(pattern).ok()?;
    if regex.is_match(&as_text(value)) {
        None
    } else {
        Some(PATTERN_MESSAGE.into())
    }
}

/// Validates a complete answer object against the form, skipping hidden
/// questions.
pub fn validate_submission(spec: &FormSpec, answers: &Value) -> SubmissionReport {
    let answers_map = answers.as_object().cloned().unwrap_or_default();
    let visibility = resolve_visibility(spec, &answers_map);

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for question in &spec.questions {
        if !visibility.get(&question.id).copied().unwrap_or(true) {
            continue;
        }

        let value = answers_map.get(&question.id).unwrap_or(&Value::Null);
        let result = validate_answer(question, value, &answers_map);
        if result.ok {
            continue;
        }
        if is_blank(value) {
            missing_required.push(question.id.clone());
        } else {
            errors.push(ValidationError {
                question_id: question.id.clone(),
                message: result.message.unwrap_or_default(),
            });
        }
    }

    let all_ids: BTreeSet<_> = spec
        .questions
        .iter()
        .map(|question| question.id.as_str())
        .collect();
    let unknown_fields: Vec<String> = answers_map
        .keys()
        .filter(|key| !all_ids.contains(key.as_str()))
        .cloned()
        .collect();

    SubmissionReport {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn check(question: &QuestionSpec, value: Value) -> ValidationResult {
        validate_answer(question, &value, &Map::new())
    }

    fn number(min: f64, max: f64) -> QuestionSpec {
        QuestionSpec::new("n", QuestionType::Number, "N").with_validation(Constraint {
            min: Some(min),
            max: Some(max),
            ..Default::default()
        })
    }

    #[test]
    fn required_blank_values_fail() {
        for kind in [QuestionType::Text, QuestionType::Checkbox, QuestionType::Date] {
            let question = QuestionSpec::new("q", kind, "Q").required();
            for blank in [Value::Null, json!(""), json!("   "), json!([])] {
                assert_eq!(
                    check(&question, blank),
                    ValidationResult::invalid(REQUIRED_MESSAGE)
                );
            }
        }
    }

    #[test]
    fn optional_blank_values_pass_without_type_checks() {
        let question = QuestionSpec::new("mail", QuestionType::Email, "Mail");
        assert!(check(&question, Value::Null).ok);
        assert!(check(&question, json!("")).ok);
    }

    #[test]
    fn false_counts_as_an_answer() {
        let question = QuestionSpec::new("agree", QuestionType::Boolean, "Agree?").required();
        assert!(check(&question, json!(false)).ok);
    }

    #[test]
    fn email_shape_matches_reference_pattern() {
        let question = QuestionSpec::new("mail", QuestionType::Email, "Mail").required();
        for good in ["a@b.co", "first.last@clinic.example.org", "x+y@d.io"] {
            assert!(check(&question, json!(good)).ok, "{good} should pass");
        }
        for bad in ["plain", "a@b", "a b@c.d", "@c.d", "a@@b.c", "a@b.", "a@.b c"] {
            assert_eq!(
                check(&question, json!(bad)).message.as_deref(),
                Some(EMAIL_MESSAGE),
                "{bad} should fail"
            );
        }
    }

    #[test]
    fn number_bounds_are_inclusive() {
        let question = number(1.0, 10.0);
        assert!(check(&question, json!(1)).ok);
        assert!(check(&question, json!("10")).ok);
        assert_eq!(
            check(&question, json!(0)).message.as_deref(),
            Some("Value must be at least 1")
        );
        assert_eq!(
            check(&question, json!("11")).message.as_deref(),
            Some("Value must be at most 10")
        );
        assert_eq!(
            check(&question, json!("abc")).message.as_deref(),
            Some(NUMBER_MESSAGE)
        );
    }

    #[test]
    fn scale_uses_number_rules() {
        let mut question = number(1.0, 5.0);
        question.kind = QuestionType::Scale;
        assert!(check(&question, json!(3)).ok);
        assert!(!check(&question, json!(6)).ok);
        assert_eq!(
            check(&question, json!(true)).message.as_deref(),
            Some(NUMBER_MESSAGE)
        );
    }

    #[test]
    fn text_length_counts_characters() {
        let question = QuestionSpec::new("t", QuestionType::Textarea, "T").with_validation(
            Constraint {
                min_length: Some(2),
                max_length: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(
            check(&question, json!("A")).message.as_deref(),
            Some("Must be at least 2 characters")
        );
        assert!(check(&question, json!("éé")).ok);
        assert_eq!(
            check(&question, json!("hello")).message.as_deref(),
            Some("Must be at most 4 characters")
        );
    }

    #[test]
    fn pattern_runs_after_type_rules() {
        let question = QuestionSpec::new("zip", QuestionType::Text, "Zip").with_validation(
            Constraint {
                min_length: Some(5),
                pattern: Some(r"^\d+$".into()),
                ..Default::default()
            },
        );
        assert_eq!(
            check(&question, json!("12")).message.as_deref(),
            Some("Must be at least 5 characters")
        );
        assert_eq!(
            check(&question, json!("abcde")).message.as_deref(),
            Some(PATTERN_MESSAGE)
        );
        assert!(check(&question, json!("12345")).ok);

        let broken = QuestionSpec::new("b", QuestionType::Text, "B").with_validation(Constraint {
            pattern: Some("(".into()),
            ..Default::default()
        });
        assert!(check(&broken, json!("anything")).ok);
    }

    #[test]
    fn submission_report_splits_missing_errors_and_unknown() {
        let spec = FormSpec::new(
            "f",
            "F",
            vec![
                QuestionSpec::new("name", QuestionType::Text, "Name").required(),
                number(0.0, 120.0),
            ],
        );
        let report = validate_submission(&spec, &json!({ "n": 200, "extra": 1 }));
        assert!(!report.valid);
        assert_eq!(report.missing_required, vec!["name"]);
        assert_eq!(report.errors[0].question_id, "n");
        assert_eq!(report.unknown_fields, vec!["extra"]);

        let ok = validate_submission(&spec, &json!({ "name": "Al", "n": 30 }));
        assert!(ok.valid);
    }
}
