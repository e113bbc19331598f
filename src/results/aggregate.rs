use std::collections::HashSet;

use crate::error::SurveyResultError;
use crate::models::{Survey, SurveyResult, SurveyResultAnswer};

/// Builds the per-answer distribution for `survey`, in the survey's answer
/// order, flagging the option `viewer` currently has on record.
///
/// Every record counts towards the total, so percentages are computed
/// independently per answer and are not forced to add up to 100.
pub fn aggregate(
    survey: &Survey,
    records: &[SurveyResult],
    viewer: &str,
) -> Result<Vec<SurveyResultAnswer>, SurveyResultError> {
    check_answers(survey)?;

    let total = records.len() as u64;
    let viewer_answer = records
        .iter()
        .find(|record| record.participant_id == viewer)
        .map(|record| record.answer.as_str());

    let answers = survey
        .answers
        .iter()
        .map(|option| {
            let count = records
                .iter()
                .filter(|record| record.answer == option.answer)
                .count() as u64;

            SurveyResultAnswer {
                answer: option.answer.clone(),
                image: option.image.clone(),
                count,
                percent: percent(count, total),
                is_current_answer: viewer_answer == Some(option.answer.as_str()),
            }
        })
        .collect();

    Ok(answers)
}

/// `count / total` as a percentage, rounded half up.
pub fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (count * 200 + total) / (total * 2)
}

pub(crate) fn check_answers(survey: &Survey) -> Result<(), SurveyResultError> {
    if survey.answers.is_empty() {
        return Err(SurveyResultError::InvariantViolation {
            survey_id: survey.id.clone(),
            reason: "survey has no answer options".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for option in &survey.answers {
        if !seen.insert(option.answer.as_str()) {
            return Err(SurveyResultError::InvariantViolation {
                survey_id: survey.id.clone(),
                reason: format!("answer '{}' appears more than once", option.answer),
            });
        }
    }

    Ok(())
}
