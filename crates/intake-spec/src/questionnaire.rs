//! Mapping between intake questions and the FHIR-shaped Questionnaire tree.
//!
//! The mapping is lossy in both directions. Export keeps `linkId`, type,
//! text, `required`, option labels and `maxLength`; everything else is
//! dropped. Import cannot tell `text` from `email` or `select` from `radio`
//! and always picks the first. Unknown item types import as `text`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::form::{FormSpec, PublicationStatus};
use crate::spec::question::{Constraint, QuestionOption, QuestionSpec, QuestionType};

pub const RESOURCE_TYPE: &str = "Questionnaire";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("expected resourceType 'Questionnaire', found '{0}'")]
    ResourceType(String),
}

/// External item type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    StringText,
    LongText,
    DecimalNumeric,
    Date,
    SingleChoice,
    MultiChoice,
    Boolean,
    IntegerNumeric,
}

impl ItemType {
    pub const ALL: [ItemType; 8] = [
        ItemType::StringText,
        ItemType::LongText,
        ItemType::DecimalNumeric,
        ItemType::Date,
        ItemType::SingleChoice,
        ItemType::MultiChoice,
        ItemType::Boolean,
        ItemType::IntegerNumeric,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ItemType::StringText => "string-text",
            ItemType::LongText => "long-text",
            ItemType::DecimalNumeric => "decimal-numeric",
            ItemType::Date => "date",
            ItemType::SingleChoice => "single-choice",
            ItemType::MultiChoice => "multi-choice",
            ItemType::Boolean => "boolean",
            ItemType::IntegerNumeric => "integer-numeric",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl From<QuestionType> for ItemType {
    fn from(kind: QuestionType) -> Self {
        match kind {
            QuestionType::Text | QuestionType::Email => ItemType::StringText,
            QuestionType::Textarea => ItemType::LongText,
            QuestionType::Number => ItemType::DecimalNumeric,
            QuestionType::Date => ItemType::Date,
            QuestionType::Select | QuestionType::Radio => ItemType::SingleChoice,
            QuestionType::Checkbox => ItemType::MultiChoice,
            QuestionType::Boolean => ItemType::Boolean,
            QuestionType::Scale => ItemType::IntegerNumeric,
        }
    }
}

impl From<ItemType> for QuestionType {
    fn from(kind: ItemType) -> Self {
        match kind {
            ItemType::StringText => QuestionType::Text,
            ItemType::LongText => QuestionType::Textarea,
            ItemType::DecimalNumeric => QuestionType::Number,
            ItemType::Date => QuestionType::Date,
            ItemType::SingleChoice => QuestionType::Select,
            ItemType::MultiChoice => QuestionType::Checkbox,
            ItemType::Boolean => QuestionType::Boolean,
            ItemType::IntegerNumeric => QuestionType::Scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub value_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireItem {
    pub link_id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer_option: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl QuestionnaireItem {
    pub fn kind(&self) -> Option<ItemType> {
        ItemType::from_code(&self.item_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub item: Vec<QuestionnaireItem>,
}

pub fn to_external(questions: &[QuestionSpec]) -> Vec<QuestionnaireItem> {
    questions.iter().map(to_item).collect()
}

fn to_item(question: &QuestionSpec) -> QuestionnaireItem {
    if question.condition.is_some() || question.scale_labels.is_some() {
        tracing::debug!(link_id = %question.id, "condition and scale labels are not exported");
    }
    QuestionnaireItem {
        link_id: question.id.clone(),
        item_type: ItemType::from(question.kind).code().to_string(),
        text: Some(question.text.clone()),
        required: question.required,
        answer_option: question
            .options
            .iter()
            .map(|option| AnswerOption {
                value_string: option.label.clone(),
            })
            .collect(),
        max_length: question
            .validation
            .as_ref()
            .and_then(|validation| validation.max_length),
    }
}

pub fn from_external(items: &[QuestionnaireItem]) -> Vec<QuestionSpec> {
    items.iter().map(from_item).collect()
}

fn from_item(item: &QuestionnaireItem) -> QuestionSpec {
    let kind = match item.kind() {
        Some(kind) => QuestionType::from(kind),
        None => {
            tracing::debug!(
                link_id = %item.link_id,
                code = %item.item_type,
                "unknown item type imported as text"
            );
            QuestionType::Text
        }
    };
    let validation = item.max_length.map(|max_length| Constraint {
        max_length: Some(max_length),
        ..Default::default()
    });

    QuestionSpec {
        id: item.link_id.clone(),
        kind,
        text: item.text.clone().unwrap_or_default(),
        description: None,
        required: item.required,
        options: item
            .answer_option
            .iter()
            .map(|option| QuestionOption::from(option.value_string.as_str()))
            .collect(),
        validation,
        scale_labels: None,
        condition: None,
    }
}

pub fn to_questionnaire(form: &FormSpec) -> Questionnaire {
    Questionnaire {
        resource_type: RESOURCE_TYPE.to_string(),
        id: Some(form.id.clone()),
        status: form.status,
        title: Some(form.title.clone()),
        description: form.description.clone(),
        date: form.date,
        item: to_external(&form.questions),
    }
}

pub fn from_questionnaire(questionnaire: &Questionnaire) -> Result<FormSpec, MappingError> {
    if questionnaire.resource_type != RESOURCE_TYPE {
        return Err(MappingError::ResourceType(
            questionnaire.resource_type.clone(),
        ));
    }
    Ok(FormSpec {
        id: questionnaire.id.clone().unwrap_or_default(),
        title: questionnaire.title.clone().unwrap_or_default(),
        description: questionnaire.description.clone(),
        status: questionnaire.status,
        date: questionnaire.date,
        questions: from_external(&questionnaire.item),
    })
}
