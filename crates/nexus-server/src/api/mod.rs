//! API routes and handlers.

mod chat;
mod files;
mod image;
mod models;
mod sessions;
mod status;
mod web;

use std::path::Path;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main router: API endpoints plus the bundled UI as a static
/// fallback. Every response carries no-cache headers so the UI never
/// serves a stale status snapshot.
pub fn create_router(state: AppState, ui_dir: &Path) -> Router {
    Router::new()
        // Status
        .route("/api/status", get(status::get_status))
        .route("/health", get(status::get_status))
        // Model discovery
        .route("/api/models", get(models::list_models))
        .route("/v1/models", get(models::list_models))
        .route("/api/image-models", get(models::list_image_models))
        .route("/api/image-subfolders", get(models::list_image_subfolders))
        .route(
            "/api/create-image-subfolder",
            post(models::create_image_subfolder),
        )
        // Model lifecycle
        .route("/api/load", post(models::load_model))
        .route("/api/load-image-model", post(models::load_image_model))
        .route("/api/unload", post(models::unload_model))
        .route("/api/unload-image-model", post(models::unload_image_model))
        // Generation
        .route("/api/generate-image", post(image::generate))
        .route("/v1/chat/completions", post(chat::chat))
        .route("/api/chat", post(chat::chat))
        // Web utilities
        .route("/search", post(web::search))
        .route("/scrape", get(web::scrape))
        // Session log persistence
        .route(
            "/sessions",
            get(sessions::get_sessions).post(sessions::save_sessions),
        )
        .route("/save-file", post(files::save_file))
        // Bundled UI
        .fallback_service(
            ServeDir::new(ui_dir).fallback(ServeFile::new(ui_dir.join("index.html"))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .with_state(state)
}
