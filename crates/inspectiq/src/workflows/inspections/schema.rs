use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::Answer;
use crate::workflows::WorkflowError;

/// Answer shape a registered question expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    YesNo,
    Text,
    Number,
    MultipleChoice { options: Vec<String> },
    Photo,
    /// Text answer holding a `YYYY-MM-DD` date.
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSchema {
    pub text: String,
    pub section: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
}

/// Registered questions keyed by question id.
///
/// An empty registry accepts any answers. Once questions are registered, answers must
/// reference known ids with matching types, and a non-empty questionnaire must cover every
/// required question. A wholly empty questionnaire is let through so the classifier can flag it.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    questions: BTreeMap<String, QuestionSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_question(mut self, id: impl Into<String>, question: QuestionSchema) -> Self {
        self.register(id, question);
        self
    }

    pub fn register(&mut self, id: impl Into<String>, question: QuestionSchema) {
        self.questions.insert(id.into(), question);
    }

    pub fn validate(&self, responses: &BTreeMap<String, Answer>) -> Result<(), WorkflowError> {
        if self.questions.is_empty() || responses.is_empty() {
            return Ok(());
        }

        for (id, answer) in responses {
            let question = self.questions.get(id).ok_or_else(|| {
                WorkflowError::validation(format!("response '{id}' does not match a registered question"))
            })?;
            check_answer(id, &question.kind, answer)?;
        }

        let missing: Vec<&str> = self
            .questions
            .iter()
            .filter(|(id, question)| {
                question.required
                    && responses
                        .get(id.as_str())
                        .map_or(true, |answer| answer.is_blank())
            })
            .map(|(id, _)| id.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(WorkflowError::validation(format!(
                "required questions unanswered: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

fn check_answer(id: &str, kind: &QuestionKind, answer: &Answer) -> Result<(), WorkflowError> {
    let valid = match (kind, answer) {
        (QuestionKind::YesNo, Answer::Boolean(_)) => true,
        (QuestionKind::Text, Answer::Text(_)) => true,
        (QuestionKind::Number, Answer::Number(value)) => value.is_finite(),
        (QuestionKind::Photo, Answer::Photo(_)) => true,
        (QuestionKind::MultipleChoice { options }, Answer::Text(choice)) => {
            options.iter().any(|option| option == choice)
        }
        (QuestionKind::Date, Answer::Text(text)) => {
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_ok()
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(WorkflowError::validation(format!(
            "response '{id}' is not a valid {} answer",
            kind_label(kind)
        )))
    }
}

fn kind_label(kind: &QuestionKind) -> &'static str {
    match kind {
        QuestionKind::YesNo => "yes/no",
        QuestionKind::Text => "text",
        QuestionKind::Number => "number",
        QuestionKind::MultipleChoice { .. } => "multiple-choice",
        QuestionKind::Photo => "photo",
        QuestionKind::Date => "date",
    }
}
