//! Session-log persistence.
//!
//! The UI owns the schema; the bridge just persists the list wholesale to
//! `sessions.json` and hands it back. A missing or corrupt file reads as
//! an empty list rather than an error.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_sessions(State(state): State<AppState>) -> Json<Vec<Value>> {
    let path = state.config.sessions_file();
    let sessions = match tokio::fs::read(&path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            warn!("ignoring corrupt {}: {err}", path.display());
            Vec::new()
        }),
        Err(_) => Vec::new(),
    };
    Json(sessions)
}

pub async fn save_sessions(
    State(state): State<AppState>,
    Json(sessions): Json<Vec<Value>>,
) -> Result<Json<Value>, ApiError> {
    let path = state.config.sessions_file();
    let body = serde_json::to_vec_pretty(&sessions)
        .map_err(|err| ApiError::internal(format!("could not serialize sessions: {err}")))?;
    tokio::fs::write(&path, body)
        .await
        .map_err(|err| ApiError::internal(format!("could not write {}: {err}", path.display())))?;
    Ok(Json(json!({ "status": "saved" })))
}
