//! Bridge configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Process-wide configuration, built once at startup from CLI arguments and
/// passed down through the session and runners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Directory scanned for GGUF text models.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Directory scanned for image models; also the default save root for
    /// generated images.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Runtime directory holding `sessions.json` and the `output/` folder.
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,

    /// Context size handed to the text backend on load.
    #[serde(default = "default_context_size")]
    pub context_size: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            images_dir: default_images_dir(),
            runtime_dir: default_runtime_dir(),
            context_size: default_context_size(),
        }
    }
}

impl BridgeConfig {
    /// Best-effort creation of the configured directories. A directory that
    /// cannot be created is logged and left for the first operation that
    /// actually needs it to report.
    pub fn ensure_dirs(&self) {
        for dir in [&self.models_dir, &self.images_dir, &self.runtime_dir] {
            if let Err(err) = std::fs::create_dir_all(dir) {
                warn!("could not create {}: {err}", dir.display());
            }
        }
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.runtime_dir.join("sessions.json")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.runtime_dir.join("output")
    }
}

fn env_dir(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn default_models_dir() -> PathBuf {
    env_dir("NEXUS_MODELS_DIR").unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nexus")
            .join("models")
    })
}

fn default_images_dir() -> PathBuf {
    env_dir("NEXUS_IMAGES_DIR").unwrap_or_else(|| default_models_dir().join("img_gens"))
}

fn default_runtime_dir() -> PathBuf {
    env_dir("NEXUS_RUNTIME_DIR").unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nexus")
    })
}

fn default_context_size() -> u32 {
    4096
}
