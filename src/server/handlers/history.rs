use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::auth::require_session;
use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let username = require_session(&headers, &state.sessions)?;

    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(state.settings.history_limit);

    let exchanges = state.store.get_history(&username, limit).await?;
    let result: Vec<Value> = exchanges
        .into_iter()
        .map(|exchange| {
            json!({
                "id": exchange.id,
                "user_message": exchange.user_message,
                "bot_response": exchange.bot_response,
                "feedback": exchange.feedback,
                "timestamp": exchange.timestamp,
            })
        })
        .collect();

    Ok(Json(json!({"exchanges": result})))
}
