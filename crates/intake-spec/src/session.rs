//! One-question-at-a-time form session.
//!
//! A [`FormSession`] walks the visible questions of a [`FormSpec`] in order,
//! gating forward navigation on validation and handing the collected
//! [`AnswerSet`] to a [`SessionHandler`] exactly once on completion.

use std::collections::BTreeMap;
use std::mem;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::answers::{Answer, AnswerMap, AnswerSet, Meta, ValidationResult, is_blank};
use crate::spec::form::{FormSpec, SpecError};
use crate::spec::question::QuestionSpec;
use crate::validate::validate_answer;
use crate::visibility::is_visible;

/// Source of answer timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Receives the terminal events of a session.
pub trait SessionHandler {
    fn on_submit(&mut self, answers: AnswerSet);

    fn on_cancel(&mut self) {}
}

/// Adapts a pair of closures into a [`SessionHandler`].
pub struct Callbacks<S, C> {
    pub on_submit: S,
    pub on_cancel: C,
}

impl<S, C> SessionHandler for Callbacks<S, C>
where
    S: FnMut(AnswerSet),
    C: FnMut(),
{
    fn on_submit(&mut self, answers: AnswerSet) {
        (self.on_submit)(answers)
    }

    fn on_cancel(&mut self) {
        (self.on_cancel)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress { index: usize },
    Submitting,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::InProgress { .. } => "in_progress",
            SessionState::Submitting => "submitting",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Moved to the question at this index.
    Moved(usize),
    /// Nothing changed.
    Stayed,
    /// The current answer failed validation.
    Blocked(String),
    /// The answer set was handed to the handler.
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("form has no questions")]
    EmptyForm,
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("session is already finished")]
    Finished,
}

/// Position of the current question among the visible ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based rank of the current question; 0 once the session is over.
    pub position: usize,
    pub total: usize,
    pub answered: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.position as f64 / self.total as f64).min(1.0)
    }
}

pub struct FormSession<H> {
    form: FormSpec,
    state: SessionState,
    answers: AnswerMap,
    errors: BTreeMap<String, String>,
    started_at: DateTime<Utc>,
    clock: Box<dyn Clock>,
    handler: H,
}

impl<H: SessionHandler> FormSession<H> {
    pub fn new(form: FormSpec, handler: H) -> Result<Self, SessionError> {
        Self::with_clock(form, handler, SystemClock)
    }

    pub fn with_clock(
        form: FormSpec,
        handler: H,
        clock: impl Clock + 'static,
    ) -> Result<Self, SessionError> {
        if form.questions.is_empty() {
            return Err(SessionError::EmptyForm);
        }
        form.check()?;

        let answers = AnswerMap::new();
        let index = first_visible(&form.questions, &answers).unwrap_or(0);
        tracing::debug!(form = %form.id, index, "session started");

        Ok(Self {
            started_at: clock.now(),
            form,
            state: SessionState::InProgress { index },
            answers,
            errors: BTreeMap::new(),
            clock: Box::new(clock),
            handler,
        })
    }

    pub fn form(&self) -> &FormSpec {
        &self.form
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::InProgress { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&QuestionSpec> {
        self.current_index().map(|index| &self.form.questions[index])
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answer_value(&self, question_id: &str) -> Option<&Value> {
        self.answers.get(question_id).map(|answer| &answer.value)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn error_for(&self, question_id: &str) -> Option<&str> {
        self.errors.get(question_id).map(String::as_str)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    pub fn is_visible(&self, question: &QuestionSpec) -> bool {
        is_visible(question, &self.answers)
    }

    /// Records `value` for `question_id` if it validates; otherwise stores
    /// the message under the question's id.
    pub fn answer(
        &mut self,
        question_id: &str,
        value: impl Into<Value>,
    ) -> Result<ValidationResult, SessionError> {
        if self.state.is_finished() {
            tracing::warn!(question = question_id, "answer on finished session ignored");
            return Err(SessionError::Finished);
        }
        let Some(question) = self.form.question(question_id) else {
            tracing::warn!(question = question_id, "answer for unknown question ignored");
            return Err(SessionError::UnknownQuestion(question_id.to_string()));
        };

        let value = value.into();
        let result = validate_answer(question, &value, &self.answers);
        if let Some(message) = &result.message {
            tracing::debug!(question = question_id, %message, "answer rejected");
            self.errors.insert(question_id.to_string(), message.clone());
            return Ok(result);
        }

        self.errors.remove(question_id);
        self.answers.insert(
            question_id.to_string(),
            Answer {
                question_id: question_id.to_string(),
                value,
                timestamp: self.clock.now(),
            },
        );
        self.settle_on_visible();
        Ok(result)
    }

    /// Steps back from a current question that an earlier answer has hidden.
    fn settle_on_visible(&mut self) {
        let SessionState::InProgress { index } = self.state else {
            return;
        };
        if is_visible(&self.form.questions[index], &self.answers) {
            return;
        }
        let earlier = (0..index)
            .rev()
            .find(|candidate| is_visible(&self.form.questions[*candidate], &self.answers))
            .or_else(|| first_visible(&self.form.questions, &self.answers));
        if let Some(prior) = earlier {
            tracing::debug!(from = index, to = prior, "current question hidden");
            self.errors.remove(&self.form.questions[index].id);
            self.state = SessionState::InProgress { index: prior };
        }
    }

    /// Advances past the current question, submitting after the last
    /// visible one.
    pub fn next(&mut self) -> Step {
        let SessionState::InProgress { index } = self.state else {
            tracing::debug!(state = self.state.as_str(), "next ignored");
            return Step::Stayed;
        };

        let question = &self.form.questions[index];
        let current = self
            .answers
            .get(&question.id)
            .map(|answer| answer.value.clone())
            .unwrap_or(Value::Null);
        let result = validate_answer(question, &current, &self.answers);
        if let Some(message) = result.message {
            self.errors.insert(question.id.clone(), message.clone());
            return Step::Blocked(message);
        }
        self.errors.remove(&question.id);

        let upcoming = (index + 1..self.form.questions.len())
            .find(|candidate| is_visible(&self.form.questions[*candidate], &self.answers));
        match upcoming {
            Some(next) => {
                tracing::debug!(from = index, to = next, "advanced");
                self.state = SessionState::InProgress { index: next };
                Step::Moved(next)
            }
            None => {
                self.submit();
                Step::Submitted
            }
        }
    }

    /// Returns to the nearest earlier visible question. Later answers and
    /// errors are kept.
    pub fn previous(&mut self) -> Step {
        let SessionState::InProgress { index } = self.state else {
            tracing::debug!(state = self.state.as_str(), "previous ignored");
            return Step::Stayed;
        };

        let earlier = (0..index)
            .rev()
            .find(|candidate| is_visible(&self.form.questions[*candidate], &self.answers));
        match earlier {
            Some(prior) => {
                self.state = SessionState::InProgress { index: prior };
                Step::Moved(prior)
            }
            None => Step::Stayed,
        }
    }

    /// Abandons the session and discards everything collected so far.
    pub fn cancel(&mut self) {
        if self.state == SessionState::Cancelled {
            return;
        }
        tracing::debug!(form = %self.form.id, "session cancelled");
        self.state = SessionState::Cancelled;
        self.answers.clear();
        self.errors.clear();
        self.handler.on_cancel();
    }

    pub fn progress(&self) -> Progress {
        let visible = self
            .form
            .questions
            .iter()
            .enumerate()
            .filter(|(_, question)| is_visible(question, &self.answers))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let position = match self.state {
            SessionState::InProgress { index } => {
                visible.iter().filter(|visible| **visible <= index).count()
            }
            _ => 0,
        };
        let answered = visible
            .iter()
            .filter(|index| self.answers.contains_key(&self.form.questions[**index].id))
            .count();
        Progress {
            position,
            total: visible.len(),
            answered,
        }
    }

    fn submit(&mut self) {
        self.state = SessionState::Submitting;

        let answers = mem::take(&mut self.answers);
        let submitted = self
            .form
            .questions
            .iter()
            .filter(|question| is_visible(question, &answers))
            .filter_map(|question| {
                answers
                    .get(&question.id)
                    .filter(|answer| !is_blank(&answer.value))
                    .map(|answer| (question.id.clone(), answer.clone()))
            })
            .collect::<AnswerMap>();
        self.errors.clear();

        let answer_set = AnswerSet {
            form_id: self.form.id.clone(),
            answers: submitted,
            meta: Some(Meta {
                started_at: self.started_at,
                submitted_at: self.clock.now(),
            }),
        };
        tracing::debug!(form = %self.form.id, answers = answer_set.len(), "submitting");
        self.handler.on_submit(answer_set);
        self.state = SessionState::Completed;
    }
}

fn first_visible(questions: &[QuestionSpec], answers: &AnswerMap) -> Option<usize> {
    questions
        .iter()
        .position(|question| is_visible(question, answers))
}
