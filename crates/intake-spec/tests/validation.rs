use serde_json::{Map, Value, json};

use intake_spec::{
    Constraint, FormSpec, QuestionSpec, QuestionType, VisibilityMap, resolve_visibility,
    validate_answer, validate_submission,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "weight_intake" => include_str!("fixtures/weight_intake.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn weight_intake() -> FormSpec {
    serde_json::from_str(fixture("weight_intake")).expect("deserialize")
}

#[test]
fn required_questions_reject_null_for_every_type() {
    for kind in [
        QuestionType::Text,
        QuestionType::Textarea,
        QuestionType::Email,
        QuestionType::Number,
        QuestionType::Date,
        QuestionType::Select,
        QuestionType::Radio,
        QuestionType::Checkbox,
        QuestionType::Boolean,
        QuestionType::Scale,
    ] {
        let question = QuestionSpec::new("q", kind, "Q").required();
        let result = validate_answer(&question, &Value::Null, &Map::new());
        assert!(!result.ok);
        assert_eq!(result.message.as_deref(), Some("This question is required"));
    }
}

#[test]
fn number_between_one_and_ten() {
    let question = QuestionSpec::new("n", QuestionType::Number, "N").with_validation(Constraint {
        min: Some(1.0),
        max: Some(10.0),
        ..Default::default()
    });
    let accepts = |value: Value| validate_answer(&question, &value, &Map::new()).ok;
    assert!(accepts(json!(1)));
    assert!(accepts(json!(10)));
    assert!(!accepts(json!(0)));
    assert!(!accepts(json!(11)));
    assert!(!accepts(json!("abc")));
}

#[test]
fn visibility_follows_answers() {
    let spec = weight_intake();
    let visibility = resolve_visibility(
        &spec,
        json!({ "sex": "male", "conditions": ["Diabetes"] })
            .as_object()
            .expect("object"),
    );
    let expected: VisibilityMap = [
        ("name", true),
        ("email", true),
        ("sex", true),
        ("pregnant", false),
        ("weight", true),
        ("conditions", true),
        ("diabetes_details", true),
        ("motivation", true),
    ]
    .into_iter()
    .map(|(id, visible)| (id.to_string(), visible))
    .collect();
    assert_eq!(visibility, expected);
}

#[test]
fn submission_report_ignores_hidden_required_questions() {
    let spec = weight_intake();
    let answers = json!({
        "name": "Sam",
        "email": "sam@example.com",
        "sex": "male",
        "weight": 180
    });
    let report = validate_submission(&spec, &answers);
    assert!(report.valid, "{report:?}");
}

#[test]
fn submission_report_flags_bad_values() {
    let spec = weight_intake();
    let answers = json!({
        "name": "Sam",
        "email": "sam@",
        "sex": "female",
        "weight": 20,
        "motivation": 4
    });
    let report = validate_submission(&spec, &answers);
    assert!(!report.valid);
    assert_eq!(report.missing_required, vec!["pregnant"]);
    let failing = report
        .errors
        .iter()
        .map(|error| (error.question_id.as_str(), error.message.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        failing,
        vec![
            ("email", "Please enter a valid email address"),
            ("weight", "Value must be at least 50"),
        ]
    );
}
