//! The process-wide model session.
//!
//! Owns at most one loaded text model and one loaded image model.
//! Constructed once in `main` and shared through application state; nothing
//! here is a global.
//!
//! Concurrency rules:
//! - generations against one handle are serialized by a per-handle async
//!   mutex, so concurrent chat requests queue instead of interleaving on
//!   the backend's internal state;
//! - load and unload take the slot's write lock and then drain the old
//!   handle's generation gate, so a handle is never replaced while a
//!   generation is still running on it;
//! - the blocking backend calls run on `spawn_blocking`, keeping the
//!   request loop responsive during long generations. A panicking backend
//!   surfaces as an internal error, not a crash.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::backend::{
    Completion, ImageBackend, ImageGenParams, ImageModel, ImageOutput, LoadOptions, TextBackend,
    TextModel,
};
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::registry;
use crate::types::{ChatMessage, GenerationParams, LoadOutcome, SessionStatus};

pub struct ModelSession {
    config: BridgeConfig,
    text_backend: Arc<dyn TextBackend>,
    image_backend: Arc<dyn ImageBackend>,
    text: RwLock<Option<LoadedText>>,
    image: RwLock<Option<LoadedImage>>,
}

struct LoadedText {
    model: Arc<dyn TextModel>,
    name: String,
    gate: Arc<Mutex<()>>,
}

struct LoadedImage {
    model: Arc<dyn ImageModel>,
    name: String,
    gate: Arc<Mutex<()>>,
}

impl ModelSession {
    pub fn new(
        config: BridgeConfig,
        text_backend: Arc<dyn TextBackend>,
        image_backend: Arc<dyn ImageBackend>,
    ) -> Self {
        Self {
            config,
            text_backend,
            image_backend,
            text: RwLock::new(None),
            image: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Load a text model, replacing (and releasing) any previous one.
    ///
    /// The accelerated attempt comes first; when it fails the load is
    /// retried once with acceleration disabled and the outcome carries
    /// `fallback = true` as a warning annotation.
    pub async fn load_text(&self, path: &str, base_dir: Option<&Path>) -> Result<LoadOutcome> {
        let base = base_dir.unwrap_or(&self.config.models_dir);
        let resolved = registry::resolve_model_path(base, path)?;
        info!("loading text model from {}", resolved.display());

        let options = LoadOptions {
            context_size: self.config.context_size,
            accelerated: true,
        };
        let first = load_text_blocking(self.text_backend.clone(), resolved.clone(), options).await;
        let (model, fallback) = match first {
            Ok(model) => (model, false),
            Err(err @ Error::NotInstalled(_)) => return Err(err),
            Err(err) => {
                warn!("accelerated load failed ({err}), retrying with acceleration disabled");
                let retry_options = LoadOptions {
                    accelerated: false,
                    ..options
                };
                let model =
                    load_text_blocking(self.text_backend.clone(), resolved.clone(), retry_options)
                        .await
                        .map_err(|retry_err| match retry_err {
                            keep @ (Error::NotInstalled(_) | Error::LoadFailure(_)) => keep,
                            other => Error::LoadFailure(other.to_string()),
                        })?;
                (model, true)
            }
        };

        let loaded = LoadedText {
            model: Arc::from(model),
            name: basename(&resolved),
            gate: Arc::new(Mutex::new(())),
        };

        let mut slot = self.text.write().await;
        if let Some(prev) = slot.take() {
            // Wait for any generation still running on the old handle, then
            // release it before the replacement goes live.
            let _drain = prev.gate.clone().lock_owned().await;
            info!("released previously loaded text model {}", prev.name);
        }
        *slot = Some(loaded);
        Ok(LoadOutcome {
            loaded_path: resolved,
            fallback,
        })
    }

    /// Load an image model, replacing any previous one. No acceleration
    /// retry here; image backends manage their own device placement.
    pub async fn load_image(&self, path: &str, base_dir: Option<&Path>) -> Result<LoadOutcome> {
        let base = base_dir.unwrap_or(&self.config.images_dir);
        let resolved = registry::resolve_model_path(base, path)?;
        info!("loading image model from {}", resolved.display());

        let backend = self.image_backend.clone();
        let load_path = resolved.clone();
        let model = tokio::task::spawn_blocking(move || backend.load(&load_path))
            .await
            .map_err(|join| Error::internal("image model load task panicked", join.to_string()))??;

        let loaded = LoadedImage {
            model: Arc::from(model),
            name: basename(&resolved),
            gate: Arc::new(Mutex::new(())),
        };

        let mut slot = self.image.write().await;
        if let Some(prev) = slot.take() {
            let _drain = prev.gate.clone().lock_owned().await;
            info!("released previously loaded image model {}", prev.name);
        }
        *slot = Some(loaded);
        Ok(LoadOutcome {
            loaded_path: resolved,
            fallback: false,
        })
    }

    /// Explicitly release the loaded text model. Returns whether one was
    /// loaded.
    pub async fn unload_text(&self) -> bool {
        let mut slot = self.text.write().await;
        match slot.take() {
            Some(prev) => {
                let _drain = prev.gate.clone().lock_owned().await;
                info!("unloaded text model {}", prev.name);
                true
            }
            None => false,
        }
    }

    /// Explicitly release the loaded image model. Returns whether one was
    /// loaded.
    pub async fn unload_image(&self) -> bool {
        let mut slot = self.image.write().await;
        match slot.take() {
            Some(prev) => {
                let _drain = prev.gate.clone().lock_owned().await;
                info!("unloaded image model {}", prev.name);
                true
            }
            None => false,
        }
    }

    pub async fn is_text_loaded(&self) -> bool {
        self.text.read().await.is_some()
    }

    pub async fn status(&self) -> SessionStatus {
        let text = self.text.read().await;
        let image = self.image.read().await;
        SessionStatus {
            text_loaded: text.is_some(),
            text_name: text.as_ref().map(|t| t.name.clone()),
            image_loaded: image.is_some(),
            image_name: image.as_ref().map(|i| i.name.clone()),
        }
    }

    /// Run a non-streamed completion on the loaded text model.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        params: GenerationParams,
    ) -> Result<Completion> {
        let (model, gate) = self.text_handle().await?;
        let _running = gate.lock_owned().await;
        let result =
            tokio::task::spawn_blocking(move || model.complete(&messages, &params)).await;
        match result {
            Ok(inner) => inner,
            Err(join) => Err(Error::internal(
                "text generation task panicked",
                join.to_string(),
            )),
        }
    }

    /// Run a streamed completion; each chunk is handed to `on_chunk` as it
    /// is produced. Returns once generation finishes or fails.
    pub async fn chat_stream<F>(
        &self,
        messages: Vec<ChatMessage>,
        params: GenerationParams,
        mut on_chunk: F,
    ) -> Result<()>
    where
        F: FnMut(serde_json::Value) + Send + 'static,
    {
        let (model, gate) = self.text_handle().await?;
        let _running = gate.lock_owned().await;
        let result = tokio::task::spawn_blocking(move || {
            model.complete_stream(&messages, &params, &mut on_chunk)
        })
        .await;
        match result {
            Ok(inner) => inner,
            Err(join) => Err(Error::internal(
                "text generation task panicked",
                join.to_string(),
            )),
        }
    }

    /// Run one txt2img job on the loaded image model.
    pub async fn generate_image(&self, params: ImageGenParams) -> Result<ImageOutput> {
        let (model, gate) = {
            let slot = self.image.read().await;
            let loaded = slot
                .as_ref()
                .ok_or_else(|| Error::BadRequest("no image model loaded".to_string()))?;
            (loaded.model.clone(), loaded.gate.clone())
        };
        let _running = gate.lock_owned().await;
        let result = tokio::task::spawn_blocking(move || model.txt2img(&params)).await;
        match result {
            Ok(inner) => inner,
            Err(join) => Err(Error::internal(
                "image generation task panicked",
                join.to_string(),
            )),
        }
    }

    async fn text_handle(&self) -> Result<(Arc<dyn TextModel>, Arc<Mutex<()>>)> {
        let slot = self.text.read().await;
        let loaded = slot
            .as_ref()
            .ok_or_else(|| Error::BadRequest("no text model loaded".to_string()))?;
        Ok((loaded.model.clone(), loaded.gate.clone()))
    }
}

async fn load_text_blocking(
    backend: Arc<dyn TextBackend>,
    path: PathBuf,
    options: LoadOptions,
) -> Result<Box<dyn TextModel>> {
    tokio::task::spawn_blocking(move || backend.load(&path, &options))
        .await
        .map_err(|join| Error::internal("text model load task panicked", join.to_string()))?
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
