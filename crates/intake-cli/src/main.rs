mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use intake_spec::{
    DirectoryRepository, FormRepository, FormSession, FormSpec, QuestionSpec, QuestionType,
    Questionnaire, SessionState, Step, SubmissionReport, build_render_payload, from_questionnaire,
    to_questionnaire, validate_submission,
};
use serde_json::{Number, Value};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wizard::{AnswerParseError, Display, WizardOutcome, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const OUTPUT_DIR_ENV: &str = "INTAKE_FORMS_OUTPUT_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Intake form runner",
    long_about = "Runs multi-step intake forms in a text shell, validates answer files and converts forms to and from Questionnaire resources"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Take a form one question at a time on stdin.
    Wizard {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Also emit answer JSON on completion.
        #[arg(long)]
        answers_json: bool,
        /// Render output mode for prompts.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate an answers file against a FormSpec.
    Validate {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Convert a FormSpec into a Questionnaire resource.
    Export {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Directory to store the questionnaire in (defaults to INTAKE_FORMS_OUTPUT_DIR, otherwise stdout).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Convert a Questionnaire resource into a FormSpec.
    Import {
        /// Path to the Questionnaire JSON.
        #[arg(long, value_name = "FILE")]
        questionnaire: PathBuf,
    },
    /// Print the JSON Schema of the FormSpec format.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Wizard {
            spec,
            answers_json,
            format,
        } => run_wizard(spec, answers_json, format),
        Command::Validate { spec, answers } => run_validate(spec, answers),
        Command::Export { spec, out } => run_export(spec, out),
        Command::Import { questionnaire } => run_import(questionnaire),
        Command::Schema => run_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_form(path: &Path) -> CliResult<FormSpec> {
    let contents = fs::read_to_string(path)?;
    let spec: FormSpec = serde_json::from_str(&contents)?;
    spec.check()?;
    tracing::debug!(
        path = %path.display(),
        form = %spec.id,
        questions = spec.questions.len(),
        "loaded form"
    );
    Ok(spec)
}

fn run_wizard(spec_path: PathBuf, answers_json: bool, format: RenderMode) -> CliResult<()> {
    let spec = load_form(&spec_path)?;
    let display = match format {
        RenderMode::Text => Display::Text,
        RenderMode::Json => Display::Json,
    };
    let mut presenter = WizardPresenter::new(display, answers_json);
    let mut session = FormSession::new(spec, WizardOutcome::default())?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let SessionState::InProgress { .. } = session.state() {
        let payload = build_render_payload(&session);
        presenter.show_prompt(&payload);
        let question = session
            .current_question()
            .cloned()
            .ok_or("wizard lost track of the current question")?;

        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            session.cancel();
            break;
        };
        let raw = line?;
        let trimmed = raw.trim();

        if trimmed.eq_ignore_ascii_case("exit") {
            session.cancel();
            break;
        }
        if trimmed.eq_ignore_ascii_case("back") {
            session.previous();
            continue;
        }

        let value = match parse_answer(&question, trimmed) {
            Ok(value) => value,
            Err(err) => {
                presenter.show_parse_error(&err);
                continue;
            }
        };
        let result = session.answer(&question.id, value)?;
        if let Some(message) = result.message {
            presenter.show_validation_error(&message);
            continue;
        }
        if let Step::Blocked(message) = session.next() {
            presenter.show_validation_error(&message);
        }
    }

    let outcome = session.into_handler();
    match outcome.submitted {
        Some(answer_set) => {
            presenter.show_completion(&answer_set);
            Ok(())
        }
        None => {
            presenter.show_cancelled();
            Err("wizard aborted by user".into())
        }
    }
}

fn parse_answer(question: &QuestionSpec, raw: &str) -> Result<Value, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    match question.kind {
        QuestionType::Boolean => parse_boolean(raw),
        QuestionType::Number | QuestionType::Scale => Ok(parse_number(raw)),
        QuestionType::Select | QuestionType::Radio => parse_choice(question, raw),
        QuestionType::Checkbox => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| parse_choice(question, part))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        QuestionType::Text | QuestionType::Textarea | QuestionType::Email | QuestionType::Date => {
            Ok(Value::String(raw.to_string()))
        }
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

/// Numeric input becomes a JSON number; anything else is passed through so
/// the validator can report it.
fn parse_number(raw: &str) -> Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Number(Number::from(integer));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn parse_choice(question: &QuestionSpec, raw: &str) -> Result<Value, AnswerParseError> {
    question
        .options
        .iter()
        .find(|option| {
            option.value.eq_ignore_ascii_case(raw) || option.label.eq_ignore_ascii_case(raw)
        })
        .map(|option| Value::String(option.value.clone()))
        .ok_or_else(|| {
            let labels = question
                .options
                .iter()
                .map(|option| option.label.as_str())
                .collect::<Vec<_>>();
            AnswerParseError::new(
                format!("'{}' is not one of the available options.", raw),
                Some(format!("one of: {}", labels.join(", "))),
            )
        })
}

fn run_validate(spec_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let spec = load_form(&spec_path)?;
    let answers_json = fs::read_to_string(answers_path)?;
    let answers: Value = serde_json::from_str(&answers_json)?;

    let report = validate_submission(&spec, &answers);
    println!(
        "Validation result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    describe_validation(&report);

    if report.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(report: &SubmissionReport) {
    if !report.errors.is_empty() {
        println!("Errors:");
        for error in &report.errors {
            println!("  {} - {}", error.question_id, error.message);
        }
    }
    if !report.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            report.missing_required.join(", ")
        );
    }
    if !report.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            report.unknown_fields.join(", ")
        );
    }
}

fn run_export(spec_path: PathBuf, out: Option<PathBuf>) -> CliResult<()> {
    let spec = load_form(&spec_path)?;
    let questionnaire = to_questionnaire(&spec);

    match resolve_output_dir(out) {
        Some(dir) => {
            let mut repository = DirectoryRepository::new(dir);
            repository.save(questionnaire)?;
            println!(
                "Exported questionnaire to {}",
                repository.path_for(&spec.id).display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&questionnaire)?),
    }
    Ok(())
}

fn resolve_output_dir(out: Option<PathBuf>) -> Option<PathBuf> {
    out.or_else(|| {
        env::var_os(OUTPUT_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

fn run_import(path: PathBuf) -> CliResult<()> {
    let contents = fs::read_to_string(path)?;
    let questionnaire: Questionnaire = serde_json::from_str(&contents)?;
    let spec = from_questionnaire(&questionnaire)?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use intake_spec::QuestionOption;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const WEIGHT_INTAKE: &str =
        include_str!("../../intake-spec/tests/fixtures/weight_intake.json");

    const BASICS: &str = r#"{
        "id": "basics",
        "title": "Basics",
        "questions": [
            { "id": "name", "type": "text", "text": "Name", "required": true, "validation": { "minLength": 2 } },
            { "id": "age", "type": "number", "text": "Age", "required": true, "validation": { "min": 0, "max": 120 } }
        ]
    }"#;

    fn choice_question(kind: QuestionType) -> QuestionSpec {
        QuestionSpec::new("color", kind, "Color").with_options([
            QuestionOption::new("r", "Red"),
            QuestionOption::new("g", "Green"),
        ])
    }

    #[test]
    fn parse_answer_boolean_accepts_yes() {
        let question = QuestionSpec::new("ok", QuestionType::Boolean, "Ok?");
        assert_eq!(parse_answer(&question, "yes").unwrap(), Value::Bool(true));
        assert!(parse_answer(&question, "maybe").is_err());
    }

    #[test]
    fn parse_answer_numbers_fall_back_to_text() {
        let question = QuestionSpec::new("n", QuestionType::Number, "N");
        assert_eq!(parse_answer(&question, "42").unwrap(), json!(42));
        assert_eq!(parse_answer(&question, "4.5").unwrap(), json!(4.5));
        assert_eq!(parse_answer(&question, "abc").unwrap(), json!("abc"));
    }

    #[test]
    fn parse_answer_choice_matches_value_or_label() {
        let question = choice_question(QuestionType::Radio);
        assert_eq!(parse_answer(&question, "green").unwrap(), json!("g"));
        assert_eq!(parse_answer(&question, "R").unwrap(), json!("r"));
        assert!(parse_answer(&question, "blue").is_err());
    }

    #[test]
    fn parse_answer_checkbox_splits_on_commas() {
        let question = choice_question(QuestionType::Checkbox);
        assert_eq!(
            parse_answer(&question, "Red, g").unwrap(),
            json!(["r", "g"])
        );
    }

    #[test]
    fn parse_answer_blank_is_null() {
        let question = QuestionSpec::new("t", QuestionType::Text, "T");
        assert_eq!(parse_answer(&question, "   ").unwrap(), Value::Null);
    }

    #[test]
    fn wizard_collects_answers_after_retries() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let spec = workspace.child("basics.json");
        spec.write_str(BASICS)?;

        let assert = Command::cargo_bin("intake-forms")?
            .arg("wizard")
            .arg("--spec")
            .arg(spec.path())
            .arg("--answers-json")
            .write_stdin("A\nAl\nabc\n30\n")
            .assert()
            .success();

        let output = assert.get_output();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Must be at least 2 characters"));
        assert!(stderr.contains("Please enter a valid number"));
        assert!(stdout.contains("Done"));
        assert!(stdout.contains("\"formId\": \"basics\""));
        assert!(stdout.contains("\"value\": 30"));
        Ok(())
    }

    #[test]
    fn wizard_exit_cancels() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let spec = workspace.child("basics.json");
        spec.write_str(BASICS)?;

        Command::cargo_bin("intake-forms")?
            .arg("wizard")
            .arg("--spec")
            .arg(spec.path())
            .write_stdin("Al\nexit\n")
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn validate_command_reports_failures() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let spec = workspace.child("intake.json");
        spec.write_str(WEIGHT_INTAKE)?;
        let answers = workspace.child("answers.json");
        answers.write_str(r#"{ "name": "Sam", "email": "sam@example.com", "sex": "male", "weight": 10 }"#)?;

        let assert = Command::cargo_bin("intake-forms")?
            .arg("validate")
            .arg("--spec")
            .arg(spec.path())
            .arg("--answers")
            .arg(answers.path())
            .assert()
            .failure();
        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
        assert!(stdout.contains("weight - Value must be at least 50"));
        Ok(())
    }

    #[test]
    fn export_writes_questionnaire_file() -> Result<(), Box<dyn std::error::Error>> {
        let temp = TempDir::new()?;
        let spec_path = temp.path().join("intake.json");
        fs::write(&spec_path, WEIGHT_INTAKE)?;
        let out = temp.path().join("out");

        Command::cargo_bin("intake-forms")?
            .arg("export")
            .arg("--spec")
            .arg(&spec_path)
            .arg("--out")
            .arg(&out)
            .assert()
            .success();

        let written = fs::read_to_string(out.join("weight-intake.questionnaire.json"))?;
        let value: Value = serde_json::from_str(&written)?;
        assert_eq!(value["resourceType"], "Questionnaire");
        assert_eq!(value["item"][2]["type"], "single-choice");
        assert_eq!(value["item"][0]["maxLength"], 80);
        Ok(())
    }

    #[test]
    fn import_prints_form_spec() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let file = workspace.child("q.json");
        file.write_str(
            r#"{ "resourceType": "Questionnaire", "id": "mini", "title": "Mini",
                 "item": [ { "linkId": "pick", "type": "single-choice", "answerOption": [ { "valueString": "A" } ] } ] }"#,
        )?;

        let assert = Command::cargo_bin("intake-forms")?
            .arg("import")
            .arg("--questionnaire")
            .arg(file.path())
            .assert()
            .success();
        let spec: Value = serde_json::from_slice(&assert.get_output().stdout)?;
        assert_eq!(spec["id"], "mini");
        assert_eq!(spec["questions"][0]["type"], "select");
        assert_eq!(
            spec["questions"][0]["options"],
            json!([{ "value": "A", "label": "A" }])
        );
        Ok(())
    }

    #[test]
    fn resolve_output_dir_prefers_flag() {
        let flag = PathBuf::from("/tmp/explicit");
        assert_eq!(resolve_output_dir(Some(flag.clone())), Some(flag));
    }
}
