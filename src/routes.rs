use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::{
    error::AppError,
    questions::{QuestionListing, filter_aggregable_questions},
    registry::Credentials,
    state::AppState,
    submissions::fetch_all_submissions,
    tally::{AnswerTally, tally},
    utils::passthrough,
};

/// Wakes the server and checks the store is reachable.
pub async fn ping_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let message = if state.registry.store().ping().await {
        "pong"
    } else {
        warn!("Ping: store unreachable");
        "Error."
    };

    Json(json!({ "message": message }))
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(credentials) = payload.map_err(|e| {
        warn!("Rejected registration body: {e}");
        AppError::MalformedPayload
    })?;

    if credentials.app_key.is_empty() || credentials.poll_id.is_empty() {
        return Err(AppError::MalformedPayload);
    }

    let token = state.registry.register(&credentials).await?;

    Ok((StatusCode::CREATED, Json(json!({ "uuid": token }))))
}

pub async fn submissions_handler(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
    payload: Result<Json<Vec<Map<String, Value>>>, JsonRejection>,
) -> Result<Response, AppError> {
    let credentials = state.registry.resolve(&uuid).await?;
    let Json(submissions) = payload.map_err(|_| AppError::MalformedPayload)?;

    info!(
        "Forwarding {} submissions to poll {}",
        submissions.len(),
        credentials.poll_id
    );

    let body = Value::Array(submissions.into_iter().map(Value::Object).collect());
    let reply = state.api.create_submissions(&credentials, &body).await?;

    passthrough(reply)
}

pub async fn questions_handler(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Result<Response, AppError> {
    let credentials = state.registry.resolve(&uuid).await?;
    let reply = state.api.list_questions(&credentials).await?;

    passthrough(reply)
}

pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Result<Json<AnswerTally>, AppError> {
    let credentials = state.registry.resolve(&uuid).await?;

    let (questions, submissions) = tokio::try_join!(
        state.api.list_questions(&credentials),
        fetch_all_submissions(state.api.as_ref(), &credentials),
    )?;

    let question_ids = filter_aggregable_questions(&QuestionListing::from_reply(&questions));
    let counts = tally(&submissions, &question_ids);

    info!(
        "Stats for poll {}: {} submissions, {} aggregable questions",
        credentials.poll_id,
        submissions.len(),
        question_ids.len()
    );

    Ok(Json(counts))
}
