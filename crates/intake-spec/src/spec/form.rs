use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::question::QuestionSpec;

/// Publication status shared with the Questionnaire resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    #[default]
    Draft,
    Active,
    Retired,
    Unknown,
}

/// Structural problems detected in a form definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("question at position {0} has an empty id")]
    EmptyId(usize),
    #[error("duplicate question id '{0}'")]
    DuplicateId(String),
    #[error("question '{question}' depends on '{target}', which is not an earlier question")]
    ForwardCondition { question: String, target: String },
}

/// Top-level intake form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionSpec>,
}

impl FormSpec {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<QuestionSpec>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            status: PublicationStatus::default(),
            date: None,
            questions,
        }
    }

    pub fn question(&self, id: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.id == id)
    }

    /// Checks id uniqueness and that every condition points backwards.
    pub fn check(&self) -> Result<(), SpecError> {
        let mut seen = BTreeMap::new();
        for (index, question) in self.questions.iter().enumerate() {
            if question.id.trim().is_empty() {
                return Err(SpecError::EmptyId(index));
            }
            if seen.insert(question.id.as_str(), index).is_some() {
                return Err(SpecError::DuplicateId(question.id.clone()));
            }
            if let Some(condition) = &question.condition
                && !seen
                    .get(condition.question_id.as_str())
                    .is_some_and(|target| *target < index)
            {
                return Err(SpecError::ForwardCondition {
                    question: question.id.clone(),
                    target: condition.question_id.clone(),
                });
            }
        }
        Ok(())
    }
}
