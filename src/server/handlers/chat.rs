use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::require_session;
use crate::core::errors::ApiError;
use crate::history::Feedback;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuestion {
    pub question: String,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatQuestion>,
) -> Result<impl IntoResponse, ApiError> {
    let username = require_session(&headers, &state.sessions)?;

    let outcome = state.engine.answer(&username, &payload.question).await?;

    let mut body = json!({
        "exchange_id": outcome.exchange_id,
        "answer": outcome.answer,
        "truncated": outcome.truncated,
    });
    if outcome.truncated {
        body["notice"] = json!(format!(
            "Your input exceeds {} words. It has been truncated.",
            state.settings.input_word_limit
        ));
    }

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Feedback,
}

pub async fn feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(exchange_id): Path<i64>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = require_session(&headers, &state.sessions)?;

    let updated = state
        .store
        .set_feedback(exchange_id, &username, payload.feedback)
        .await?;
    if !updated {
        return Err(ApiError::NotFound("Exchange not found".to_string()));
    }

    Ok(Json(json!({"success": true})))
}
