use serde_json::{Map, Value, json};

use crate::answers::as_text;
use crate::session::{FormSession, SessionHandler, SessionState};
use crate::spec::question::{QuestionOption, QuestionType};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A question is waiting for input.
    NeedInput,
    /// The answers were submitted.
    Complete,
    /// The respondent abandoned the form.
    Cancelled,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
            RenderStatus::Cancelled => "cancelled",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    pub position: usize,
    pub total: usize,
    pub answered: usize,
}

/// Describes the question currently on screen.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub text: String,
    pub description: Option<String>,
    pub kind: QuestionType,
    pub required: bool,
    pub options: Vec<QuestionOption>,
    pub current_value: Option<Value>,
    pub error: Option<String>,
}

/// Snapshot used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub help: Option<String>,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub question: Option<RenderQuestion>,
}

pub fn build_render_payload<H: SessionHandler>(session: &FormSession<H>) -> RenderPayload {
    let progress = session.progress();
    let status = match session.state() {
        SessionState::InProgress { .. } => RenderStatus::NeedInput,
        SessionState::Submitting | SessionState::Completed => RenderStatus::Complete,
        SessionState::Cancelled => RenderStatus::Cancelled,
    };

    let question = session.current_question().map(|question| RenderQuestion {
        id: question.id.clone(),
        text: question.text.clone(),
        description: question.description.clone(),
        kind: question.kind,
        required: question.required,
        options: question.options.clone(),
        current_value: session.answer_value(&question.id).cloned(),
        error: session.error_for(&question.id).map(String::from),
    });

    let form = session.form();
    RenderPayload {
        form_id: form.id.clone(),
        form_title: form.title.clone(),
        help: form.description.clone(),
        status,
        progress: RenderProgress {
            position: progress.position,
            total: progress.total,
            answered: progress.answered,
        },
        question,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let question = payload.question.as_ref().map(|question| {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(question.id.clone()));
        map.insert("text".into(), Value::String(question.text.clone()));
        map.insert(
            "description".into(),
            question
                .description
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        map.insert("type".into(), Value::String(question.kind.as_str().into()));
        map.insert("required".into(), Value::Bool(question.required));
        if !question.options.is_empty() {
            map.insert(
                "options".into(),
                Value::Array(
                    question
                        .options
                        .iter()
                        .map(|option| json!({ "value": option.value, "label": option.label }))
                        .collect(),
                ),
            );
        }
        if let Some(current_value) = &question.current_value {
            map.insert("current_value".into(), current_value.clone());
        }
        if let Some(error) = &question.error {
            map.insert("error".into(), Value::String(error.clone()));
        }
        Value::Object(map)
    });

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "status": payload.status.as_str(),
        "progress": {
            "position": payload.progress.position,
            "total": payload.progress.total,
            "answered": payload.progress.answered,
        },
        "help": payload.help,
        "question": question,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    match &payload.question {
        Some(question) => {
            let mut prompt = format!(
                "{}/{} {}",
                payload.progress.position, payload.progress.total, question.text
            );
            if question.required {
                prompt.push_str(" *");
            }
            if let Some(hint) = input_hint(question) {
                prompt.push(' ');
                prompt.push_str(&hint);
            }
            lines.push(prompt);
            if let Some(description) = &question.description {
                lines.push(format!("  {}", description));
            }
            if let Some(value) = &question.current_value {
                lines.push(format!("  Current value: {}", as_text(value)));
            }
            if let Some(error) = &question.error {
                lines.push(format!("  Error: {}", error));
            }
        }
        None => lines.push(format!("Status: {}", payload.status.as_str())),
    }

    lines.join("\n")
}

fn input_hint(question: &RenderQuestion) -> Option<String> {
    let labels = || {
        question
            .options
            .iter()
            .map(|option| option.label.as_str())
            .collect::<Vec<_>>()
    };
    match question.kind {
        QuestionType::Boolean => Some("(yes/no)".into()),
        QuestionType::Number => Some("(number)".into()),
        QuestionType::Scale => Some("(scale)".into()),
        QuestionType::Date => Some("(YYYY-MM-DD)".into()),
        QuestionType::Email => Some("(email)".into()),
        QuestionType::Select | QuestionType::Radio if !question.options.is_empty() => {
            Some(format!("({})", labels().join("/")))
        }
        QuestionType::Checkbox if !question.options.is_empty() => {
            Some(format!("({}; comma separated)", labels().join("/")))
        }
        _ => None,
    }
}
