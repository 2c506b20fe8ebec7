//! Text file export under the output directory.

use std::path::{Path, PathBuf};

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveFileRequest {
    pub filename: String,
    pub content: String,
}

/// `POST /save-file` - writes caller-supplied text under `<runtime>/output`.
/// The filename is reduced to its basename so it cannot point elsewhere.
pub async fn save_file(
    State(state): State<AppState>,
    Json(req): Json<SaveFileRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = sanitize_filename(&req.filename)
        .ok_or_else(|| ApiError::bad_request("invalid filename"))?;
    let output_dir = state.config.output_dir();
    tokio::fs::create_dir_all(&output_dir).await.map_err(|err| {
        ApiError::internal(format!("could not create {}: {err}", output_dir.display()))
    })?;
    let path = output_dir.join(name);
    tokio::fs::write(&path, req.content)
        .await
        .map_err(|err| ApiError::internal(format!("could not write {}: {err}", path.display())))?;
    Ok(Json(json!({ "status": "success", "path": path })))
}

fn sanitize_filename(raw: &str) -> Option<PathBuf> {
    Path::new(raw).file_name().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_reduced_to_their_basename() {
        assert_eq!(
            sanitize_filename("../../etc/passwd"),
            Some(PathBuf::from("passwd"))
        );
        assert_eq!(sanitize_filename("notes.md"), Some(PathBuf::from("notes.md")));
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }
}
