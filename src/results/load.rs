use chrono::Utc;
use log::debug;

use crate::error::SurveyResultError;
use crate::models::SurveyResultView;
use crate::results::aggregate;
use crate::store::{SurveyResultStore, SurveyStore};

/// Loads the current distribution for a survey as seen by `participant_id`.
/// Always re-reads both stores.
pub async fn load_survey_result<S, R>(
    surveys: &S,
    results: &R,
    survey_id: &str,
    participant_id: &str,
) -> Result<SurveyResultView, SurveyResultError>
where
    S: SurveyStore + ?Sized,
    R: SurveyResultStore + ?Sized,
{
    let survey = surveys
        .get_by_id(survey_id)
        .await
        .map_err(|e| SurveyResultError::store(survey_id, participant_id, e))?
        .ok_or_else(|| SurveyResultError::SurveyNotFound {
            survey_id: survey_id.to_string(),
        })?;

    let records = results
        .list_by_survey(survey_id)
        .await
        .map_err(|e| SurveyResultError::store(survey_id, participant_id, e))?;

    debug!(
        "Aggregating {} result(s) for survey {} on behalf of {}",
        records.len(),
        survey_id,
        participant_id
    );

    let answers = aggregate(&survey, &records, participant_id)?;

    Ok(SurveyResultView {
        survey_id: survey.id,
        question: survey.question,
        answers,
        date: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{memory_db, survey};
    use crate::error::{ErrorKind, StoreError};
    use crate::models::{Survey, SurveyResult};
    use async_trait::async_trait;
    use chrono::DateTime;

    struct BrokenResults;

    #[async_trait]
    impl SurveyResultStore for BrokenResults {
        async fn upsert(&self, _: &str, _: &str, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn list_by_survey(&self, _: &str) -> Result<Vec<SurveyResult>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    struct FixedSurvey(Survey);

    #[async_trait]
    impl SurveyStore for FixedSurvey {
        async fn get_by_id(&self, survey_id: &str) -> Result<Option<Survey>, StoreError> {
            Ok((self.0.id == survey_id).then(|| self.0.clone()))
        }
    }

    #[tokio::test]
    async fn unknown_survey_is_not_found() {
        let db = memory_db().await;
        let err = load_survey_result(&db, &db, "nonexistent-id", "alice")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, SurveyResultError::SurveyNotFound { .. }));
    }

    #[tokio::test]
    async fn view_reflects_stored_results() {
        let db = memory_db().await;
        let survey = survey(&["red", "blue"]);
        db.add_survey(&survey).await.unwrap();
        let now = Utc::now();
        db.upsert(&survey.id, "alice", "blue", now).await.unwrap();

        let before = Utc::now();
        let view = load_survey_result(&db, &db, &survey.id, "alice").await.unwrap();

        assert_eq!(view.survey_id, survey.id);
        assert_eq!(view.question, survey.question);
        assert!(view.date >= before);
        assert_eq!(view.answers[0].count, 0);
        assert!(!view.answers[0].is_current_answer);
        assert_eq!(view.answers[1].count, 1);
        assert_eq!(view.answers[1].percent, 100);
        assert!(view.answers[1].is_current_answer);
    }

    #[tokio::test]
    async fn store_failures_propagate_with_context() {
        let surveys = FixedSurvey(survey(&["red", "blue"]));
        let survey_id = surveys.0.id.clone();

        let err = load_survey_result(&surveys, &BrokenResults, &survey_id, "alice")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreFailure);
        match err {
            SurveyResultError::StoreFailure {
                survey_id: failed_survey,
                participant_id,
                source: StoreError::Database(sqlx::Error::PoolTimedOut),
            } => {
                assert_eq!(failed_survey, survey_id);
                assert_eq!(participant_id, "alice");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
