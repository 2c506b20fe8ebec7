//! Model discovery and lifecycle endpoints.

use std::path::PathBuf;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use nexus_core::registry;
use nexus_core::types::LoadRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `GET /api/models` and `GET /v1/models`.
///
/// A missing directory is reported in-band (`models: [], error: ...`)
/// rather than as an HTTP failure, so a UI pointed at an empty machine
/// still renders. The `data` array is the OpenAI-style shape.
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let dir = query.path.unwrap_or_else(|| state.config.models_dir.clone());
    info!("scanning for text models in {}", dir.display());
    match registry::list_text_models(&dir) {
        Ok(models) => {
            let data: Vec<Value> = models
                .iter()
                .map(|m| json!({ "id": m, "object": "model", "owned_by": "local" }))
                .collect();
            Json(json!({ "models": models, "object": "list", "data": data }))
        }
        Err(err) => Json(json!({ "models": [], "error": err.to_string() })),
    }
}

/// `GET /api/image-models` - all files in the image directory, so any
/// model format shows up.
pub async fn list_image_models(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let dir = query.path.unwrap_or_else(|| state.config.images_dir.clone());
    info!("scanning for image models in {}", dir.display());
    match registry::list_image_models(&dir) {
        Ok(models) => Json(json!({ "models": models })),
        Err(err) => Json(json!({ "models": [], "error": err.to_string() })),
    }
}

pub async fn list_image_subfolders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let dir = query.path.unwrap_or_else(|| state.config.images_dir.clone());
    match registry::list_subfolders(&dir) {
        Ok(subfolders) => Json(json!({ "subfolders": subfolders })),
        Err(_) => Json(json!({ "subfolders": [] })),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
}

pub async fn create_image_subfolder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<Value>, ApiError> {
    registry::create_subfolder(&state.config.images_dir, &req.name)?;
    Ok(Json(json!({ "status": "success", "folder": req.name })))
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub status: &'static str,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

/// `POST /api/load` - load a text model, replacing any loaded one.
pub async fn load_model(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let outcome = state
        .session
        .load_text(&req.path, req.base_dir.as_deref())
        .await?;
    Ok(Json(LoadResponse {
        status: "success",
        model: req.path,
        warning: outcome.fallback.then_some("CPU fallback"),
    }))
}

/// `POST /api/load-image-model`.
pub async fn load_image_model(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    state
        .session
        .load_image(&req.path, req.base_dir.as_deref())
        .await?;
    Ok(Json(LoadResponse {
        status: "success",
        model: req.path,
        warning: None,
    }))
}

#[derive(Debug, Serialize)]
pub struct UnloadResponse {
    pub status: &'static str,
    pub unloaded: bool,
}

pub async fn unload_model(State(state): State<AppState>) -> Json<UnloadResponse> {
    Json(UnloadResponse {
        status: "success",
        unloaded: state.session.unload_text().await,
    })
}

pub async fn unload_image_model(State(state): State<AppState>) -> Json<UnloadResponse> {
    Json(UnloadResponse {
        status: "success",
        unloaded: state.session.unload_image().await,
    })
}
