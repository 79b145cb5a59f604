use std::fmt::Write;

use intake_spec::{AnswerSet, RenderPayload, SessionHandler, render_json_ui, render_text};

/// Output format for the wizard display.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Display {
    Text,
    Json,
}

/// Collects the terminal event of a wizard session.
#[derive(Debug, Default)]
pub struct WizardOutcome {
    pub submitted: Option<AnswerSet>,
    pub cancelled: bool,
}

impl SessionHandler for WizardOutcome {
    fn on_submit(&mut self, answers: AnswerSet) {
        self.submitted = Some(answers);
    }

    fn on_cancel(&mut self) {
        self.cancelled = true;
    }
}

/// Prints prompts and results for the interactive wizard.
pub struct WizardPresenter {
    display: Display,
    show_answers_json: bool,
    header_printed: bool,
}

impl WizardPresenter {
    pub fn new(display: Display, show_answers_json: bool) -> Self {
        Self {
            display,
            show_answers_json,
            header_printed: false,
        }
    }

    pub fn show_prompt(&mut self, payload: &RenderPayload) {
        match self.display {
            Display::Json => {
                let ui = render_json_ui(payload);
                match serde_json::to_string_pretty(&ui) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(err) => eprintln!("Failed to serialize prompt: {}", err),
                }
            }
            Display::Text => {
                let text = render_text(payload);
                let mut lines = text.lines();
                // The form header only needs to appear once.
                if self.header_printed {
                    lines.next();
                    if payload.help.is_some() {
                        lines.next();
                    }
                }
                for line in lines {
                    println!("{}", line);
                }
            }
        }
        self.header_printed = true;
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_validation_error(&self, message: &str) {
        eprintln!("Invalid answer: {}", message);
    }

    pub fn show_completion(&self, answer_set: &AnswerSet) {
        println!("Done ✅");
        match answer_set.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        if self.show_answers_json {
            match answer_set.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize answers to JSON: {}", err);
                }
            }
        }
    }

    pub fn show_cancelled(&self) {
        println!("Cancelled; answers were discarded.");
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
