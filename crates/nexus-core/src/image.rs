//! Image generation jobs.
//!
//! Runs the loaded image model synchronously (isolated on the blocking
//! pool by the session), encodes the first produced image as a base64 PNG
//! data URI, and optionally persists it under the image root. Persistence
//! is best-effort: a failed save is logged and the response simply carries
//! no `saved_to`.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{info, warn};

use crate::backend::{ImageGenParams, ImageOutput};
use crate::error::{Error, Result};
use crate::session::ModelSession;
use crate::types::{ImageGenRequest, ImageGenResult};

pub struct ImageJobRunner {
    session: Arc<ModelSession>,
}

impl ImageJobRunner {
    pub fn new(session: Arc<ModelSession>) -> Self {
        Self { session }
    }

    pub async fn generate(&self, req: ImageGenRequest) -> Result<ImageGenResult> {
        info!("generating image: {}", req.prompt);
        let params = ImageGenParams {
            prompt: req.prompt.clone(),
            negative_prompt: req.negative_prompt.clone(),
            steps: req.steps,
            cfg_scale: req.cfg_scale,
            width: req.width,
            height: req.height,
            seed: req.seed,
        };
        let output = self.session.generate_image(params).await?;
        let png = encode_png(&output)?;

        let saved_to = match req.subfolder.as_deref() {
            Some(subfolder) => {
                let base = req
                    .base_dir
                    .clone()
                    .unwrap_or_else(|| self.session.config().images_dir.clone());
                match persist(&base, subfolder, &png) {
                    Ok(path) => {
                        info!("image saved to {}", path.display());
                        Some(path)
                    }
                    Err(err) => {
                        warn!("failed to save image to disk: {err}");
                        None
                    }
                }
            }
            None => None,
        };

        Ok(ImageGenResult {
            image: format!("data:image/png;base64,{}", BASE64.encode(&png)),
            saved_to,
        })
    }
}

fn encode_png(output: &ImageOutput) -> Result<Vec<u8>> {
    let buffer = image::RgbImage::from_raw(output.width, output.height, output.rgb.clone())
        .ok_or_else(|| {
            Error::internal("image backend returned a malformed pixel buffer", "")
        })?;
    let mut bytes = Cursor::new(Vec::new());
    buffer
        .write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|err| Error::internal(format!("png encoding failed: {err}"), format!("{err:?}")))?;
    Ok(bytes.into_inner())
}

/// Write the PNG under `base/<sanitized subfolder>/nexus_<unix_ts>.png`.
///
/// The subfolder is reduced to its final path component, so `../../etc`
/// lands in `base/etc` and can never escape the image root.
fn persist(base: &Path, subfolder: &str, png: &[u8]) -> std::io::Result<PathBuf> {
    let clean = Path::new(subfolder)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_default();
    let dir = base.join(clean);
    std::fs::create_dir_all(&dir)?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(format!("nexus_{stamp}.png"));
    std::fs::write(&path, png)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeImageBackend;
    use crate::backend::UnavailableTextBackend;
    use crate::config::BridgeConfig;
    use std::fs;

    fn runner(dir: &Path) -> ImageJobRunner {
        fs::write(dir.join("sd.safetensors"), b"x").unwrap();
        let config = BridgeConfig {
            models_dir: dir.to_path_buf(),
            images_dir: dir.to_path_buf(),
            runtime_dir: dir.to_path_buf(),
            context_size: 2048,
        };
        let session = Arc::new(ModelSession::new(
            config,
            Arc::new(UnavailableTextBackend),
            Arc::new(FakeImageBackend { fail_load: false }),
        ));
        ImageJobRunner::new(session)
    }

    fn gen_request() -> ImageGenRequest {
        ImageGenRequest {
            prompt: "a lighthouse".to_string(),
            negative_prompt: String::new(),
            steps: 1,
            cfg_scale: 1.0,
            width: 4,
            height: 4,
            seed: -1,
            subfolder: None,
            base_dir: None,
        }
    }

    async fn loaded_runner(dir: &Path) -> ImageJobRunner {
        let runner = runner(dir);
        runner
            .session
            .load_image("sd.safetensors", None)
            .await
            .unwrap();
        runner
    }

    #[tokio::test]
    async fn without_a_loaded_model_generation_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        assert!(matches!(
            runner.generate(gen_request()).await.unwrap_err(),
            Error::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn result_is_a_decodable_png_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let runner = loaded_runner(dir.path()).await;

        let result = runner.generate(gen_request()).await.unwrap();
        assert!(result.saved_to.is_none());
        let encoded = result
            .image
            .strip_prefix("data:image/png;base64,")
            .expect("data URI prefix");
        let png = BASE64.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
    }

    #[tokio::test]
    async fn traversal_subfolders_stay_inside_the_image_root() {
        let dir = tempfile::tempdir().unwrap();
        let runner = loaded_runner(dir.path()).await;

        let mut req = gen_request();
        req.subfolder = Some("../../etc".to_string());
        let result = runner.generate(req).await.unwrap();

        let saved = result.saved_to.expect("image should be persisted");
        assert!(saved.starts_with(dir.path().join("etc")));
        assert!(saved.exists());
        assert!(saved
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("nexus_"));
    }

    #[tokio::test]
    async fn failed_persistence_degrades_to_no_saved_path() {
        let dir = tempfile::tempdir().unwrap();
        let runner = loaded_runner(dir.path()).await;

        // A file where the save directory should be makes create_dir_all fail.
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"x").unwrap();

        let mut req = gen_request();
        req.subfolder = Some("anything".to_string());
        req.base_dir = Some(blocker);
        let result = runner.generate(req).await.unwrap();

        assert!(result.saved_to.is_none());
        assert!(result.image.starts_with("data:image/png;base64,"));
    }
}
