mod error;
mod participant;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use log::info;
use serde::Deserialize;

use crate::db::Database;
use crate::error::ValidationError;
use crate::models::{Survey, SurveyAnswer, SurveyResultView};
use crate::results::{load_survey_result, save_survey_result, SaveSurveyResult};

pub use error::{log_server_errors, ApiError};
pub use participant::{Admin, Participant, ADMIN_ROLE, PARTICIPANT_HEADER, ROLE_HEADER};

pub struct AppState {
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct AddSurveyRequest {
    pub question: String,
    pub answers: Vec<SurveyAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct SaveSurveyResultRequest {
    pub answer: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/surveys", get(list_surveys).post(add_survey))
        .route(
            "/api/surveys/{survey_id}/results",
            put(save_result).get(load_result),
        )
        // Persist 5xx failures to the errors table
        .layer(middleware::from_fn_with_state(state.clone(), log_server_errors))
        .with_state(state)
}

pub async fn add_survey(
    State(state): State<Arc<AppState>>,
    Admin(admin_id): Admin,
    Json(payload): Json<AddSurveyRequest>,
) -> Result<(StatusCode, Json<Survey>), ApiError> {
    let survey = Survey::new(payload.question, payload.answers)?;
    state.database.add_survey(&survey).await?;

    info!(
        "Admin {} created survey {} with {} answer(s)",
        admin_id,
        survey.id,
        survey.answers.len()
    );
    Ok((StatusCode::CREATED, Json(survey)))
}

pub async fn list_surveys(
    State(state): State<Arc<AppState>>,
    _participant: Participant,
) -> Result<Json<Vec<Survey>>, ApiError> {
    Ok(Json(state.database.list_surveys().await?))
}

pub async fn save_result(
    State(state): State<Arc<AppState>>,
    Participant(participant_id): Participant,
    Path(survey_id): Path<String>,
    payload: Result<Json<SaveSurveyResultRequest>, JsonRejection>,
) -> Result<Json<SurveyResultView>, ApiError> {
    // A missing field and an unreadable body are both a missing answer
    let Ok(Json(payload)) = payload else {
        return Err(ValidationError::MissingParam("answer").into());
    };
    if payload.answer.is_empty() {
        return Err(ValidationError::MissingParam("answer").into());
    }

    let submission = SaveSurveyResult {
        survey_id,
        participant_id,
        answer: payload.answer,
        date: Utc::now(),
    };
    let view = save_survey_result(&state.database, &state.database, submission).await?;
    Ok(Json(view))
}

pub async fn load_result(
    State(state): State<Arc<AppState>>,
    Participant(participant_id): Participant,
    Path(survey_id): Path<String>,
) -> Result<Json<SurveyResultView>, ApiError> {
    let view = load_survey_result(&state.database, &state.database, &survey_id, &participant_id).await?;
    Ok(Json(view))
}
