//! Image generation endpoint.

use std::path::PathBuf;

use axum::{extract::State, Json};
use serde::Serialize;

use nexus_core::ImageGenRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub status: &'static str,
    /// Base64 PNG data URI.
    pub image: String,
    pub saved_to: Option<PathBuf>,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<ImageGenRequest>,
) -> Result<Json<GenerateImageResponse>, ApiError> {
    let result = state.images.generate(req).await?;
    Ok(Json(GenerateImageResponse {
        status: "success",
        image: result.image,
        saved_to: result.saved_to,
    }))
}
