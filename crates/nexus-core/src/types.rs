//! Wire-facing request and response types.
//!
//! Field names follow the JSON the bridge has always spoken (snake_case,
//! Ollama-flavoured chat payloads), so existing UIs keep working.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One turn of a conversation. Caller-supplied; never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Whether a chat request is forwarded to an external provider or run
/// against the locally loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Proxy,
    Local,
}

/// Permissive chat request; every field but `messages` has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
    #[serde(default)]
    pub mode: ChatMode,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub stream: bool,
}

fn default_provider_url() -> String {
    "http://localhost:11434/api/chat".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

/// Sampling parameters forwarded to the text backend.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&ChatRequest> for GenerationParams {
    fn from(req: &ChatRequest) -> Self {
        Self {
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        }
    }
}

/// Normalized non-streamed local completion.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub model: String,
    pub message: ChatMessage,
    /// The backend's completion choices, passed through untouched.
    pub choices: serde_json::Value,
    pub done: bool,
}

/// Body of `/api/load` and `/api/load-image-model`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadRequest {
    pub path: String,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

/// Result of a successful model load.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub loaded_path: PathBuf,
    /// True when the accelerated attempt failed and the model was loaded
    /// with acceleration disabled instead. Surfaced as a warning, not an
    /// error.
    pub fallback: bool,
}

/// Pure read of what the session currently holds.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub text_loaded: bool,
    pub text_name: Option<String>,
    pub image_loaded: bool,
    pub image_name: Option<String>,
}

/// Body of `/api/generate-image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenRequest {
    pub prompt: String,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: String,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_cfg_scale")]
    pub cfg_scale: f32,
    #[serde(default = "default_image_dim")]
    pub width: u32,
    #[serde(default = "default_image_dim")]
    pub height: u32,
    /// -1 asks the backend for a random seed.
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default)]
    pub subfolder: Option<String>,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

fn default_negative_prompt() -> String {
    "ugly, blurry, low quality".to_string()
}

fn default_steps() -> u32 {
    20
}

fn default_cfg_scale() -> f32 {
    7.5
}

fn default_image_dim() -> u32 {
    512
}

fn default_seed() -> i64 {
    -1
}

/// Result of an image generation job.
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenResult {
    /// Base64 PNG data URI of the first generated image.
    pub image: String,
    /// Where the image landed on disk, when persistence was requested and
    /// succeeded.
    pub saved_to: Option<PathBuf>,
}
