use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::session_token;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let created = state.store.register_user(username, &payload.password).await?;
    if !created {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }

    tracing::info!("registered user '{}'", username);
    Ok(Json(json!({"success": true})))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();

    let authenticated = state
        .store
        .authenticate_user(username, &payload.password)
        .await?;
    if !authenticated {
        return Err(ApiError::Unauthorized);
    }

    let token = state.sessions.issue(username);
    Ok(Json(json!({"token": token, "username": username})))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = session_token(&headers)
        .map(|token| state.sessions.revoke(token))
        .unwrap_or(false);

    Ok(Json(json!({"success": revoked})))
}
