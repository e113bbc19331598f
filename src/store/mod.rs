use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{Survey, SurveyResult};

#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn get_by_id(&self, survey_id: &str) -> Result<Option<Survey>, StoreError>;
}

#[async_trait]
pub trait SurveyResultStore: Send + Sync {
    /// Insert or replace the record for `(survey_id, participant_id)` in a
    /// single conditional write.
    async fn upsert(
        &self,
        survey_id: &str,
        participant_id: &str,
        answer: &str,
        date: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_by_survey(&self, survey_id: &str) -> Result<Vec<SurveyResult>, StoreError>;
}
