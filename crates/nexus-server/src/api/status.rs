//! Status snapshot endpoint.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub current_model: Option<String>,
    pub loaded: bool,
    pub image_model: Option<String>,
    pub image_loaded: bool,
    pub model_dir: PathBuf,
    pub image_dir: PathBuf,
    pub context_size: u32,
    pub timestamp: f64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let session = state.session.status().await;
    Json(StatusResponse {
        status: "ok",
        current_model: session.text_name,
        loaded: session.text_loaded,
        image_model: session.image_name,
        image_loaded: session.image_loaded,
        model_dir: state.config.models_dir.clone(),
        image_dir: state.config.images_dir.clone(),
        context_size: state.config.context_size,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
    })
}
