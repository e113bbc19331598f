use chrono::{DateTime, Utc};
use log::info;

use crate::error::SurveyResultError;
use crate::models::SurveyResultView;
use crate::results::aggregate::check_answers;
use crate::results::load_survey_result;
use crate::store::{SurveyResultStore, SurveyStore};

#[derive(Debug, Clone)]
pub struct SaveSurveyResult {
    pub survey_id: String,
    pub participant_id: String,
    pub answer: String,
    pub date: DateTime<Utc>,
}

/// Records `participant_id`'s answer, replacing any earlier one, and returns
/// the refreshed distribution.
pub async fn save_survey_result<S, R>(
    surveys: &S,
    results: &R,
    submission: SaveSurveyResult,
) -> Result<SurveyResultView, SurveyResultError>
where
    S: SurveyStore + ?Sized,
    R: SurveyResultStore + ?Sized,
{
    let SaveSurveyResult {
        survey_id,
        participant_id,
        answer,
        date,
    } = submission;

    let survey = surveys
        .get_by_id(&survey_id)
        .await
        .map_err(|e| SurveyResultError::store(&survey_id, &participant_id, e))?
        .ok_or_else(|| SurveyResultError::SurveyNotFound {
            survey_id: survey_id.clone(),
        })?;

    // A malformed survey must fail before anything is written
    check_answers(&survey)?;
    if !survey.has_answer(&answer) {
        return Err(SurveyResultError::AnswerNotFound { survey_id, answer });
    }

    results
        .upsert(&survey_id, &participant_id, &answer, date)
        .await
        .map_err(|e| SurveyResultError::store(&survey_id, &participant_id, e))?;

    info!(
        "Participant {} answered '{}' on survey {}",
        participant_id, answer, survey_id
    );

    load_survey_result(surveys, results, &survey_id, &participant_id).await
}
