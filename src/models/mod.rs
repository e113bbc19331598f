use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub question: String,
    pub answers: Vec<SurveyAnswer>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One participant's current answer to one survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResult {
    pub survey_id: String,
    pub participant_id: String,
    pub answer: String,
    pub date: DateTime<Utc>,
}

/// Vote statistics for a single answer option. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResultAnswer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub count: u64,
    pub percent: u64,
    pub is_current_answer: bool,
}

/// Aggregated distribution for a survey as seen by one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResultView {
    pub survey_id: String,
    pub question: String,
    pub answers: Vec<SurveyResultAnswer>,
    pub date: DateTime<Utc>,
}

impl Survey {
    pub fn new(question: String, answers: Vec<SurveyAnswer>) -> Result<Self, ValidationError> {
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(ValidationError::MissingParam("question"));
        }
        if answers.is_empty() {
            return Err(ValidationError::MissingParam("answers"));
        }

        let mut seen = HashSet::new();
        for option in &answers {
            if option.answer.trim().is_empty() {
                return Err(ValidationError::MissingParam("answer"));
            }
            if !seen.insert(option.answer.as_str()) {
                return Err(ValidationError::DuplicateAnswer(option.answer.clone()));
            }
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            question,
            answers,
            created_at: Utc::now(),
        })
    }

    pub fn has_answer(&self, label: &str) -> bool {
        self.answers.iter().any(|option| option.answer == label)
    }
}
