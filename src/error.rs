use thiserror::Error;

/// Failure reported by either store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Coarse classification callers map to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    StoreFailure,
    AggregationInvariantViolation,
}

#[derive(Error, Debug)]
pub enum SurveyResultError {
    #[error("survey {survey_id} not found")]
    SurveyNotFound { survey_id: String },

    #[error("answer '{answer}' is not an option of survey {survey_id}")]
    AnswerNotFound { survey_id: String, answer: String },

    #[error("store failure (survey {survey_id}, participant {participant_id}): {source}")]
    StoreFailure {
        survey_id: String,
        participant_id: String,
        #[source]
        source: StoreError,
    },

    #[error("survey {survey_id} is malformed: {reason}")]
    InvariantViolation { survey_id: String, reason: String },
}

impl SurveyResultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SurveyResultError::SurveyNotFound { .. } | SurveyResultError::AnswerNotFound { .. } => {
                ErrorKind::NotFound
            }
            SurveyResultError::StoreFailure { .. } => ErrorKind::StoreFailure,
            SurveyResultError::InvariantViolation { .. } => ErrorKind::AggregationInvariantViolation,
        }
    }

    pub(crate) fn store(survey_id: &str, participant_id: &str, source: StoreError) -> Self {
        SurveyResultError::StoreFailure {
            survey_id: survey_id.to_string(),
            participant_id: participant_id.to_string(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("missing param: {0}")]
    MissingParam(&'static str),

    #[error("duplicate answer: {0}")]
    DuplicateAnswer(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
