//! Model backend capability traits.
//!
//! The session never talks to a native inference library directly; it goes
//! through these traits, selected once at startup. A build without native
//! bindings gets the unavailable implementations, which turn every load
//! into [`Error::NotInstalled`] while leaving the proxy path fully
//! functional. Native bindings (llama.cpp, stable-diffusion.cpp) plug in
//! behind cargo features without touching session or router code.
//!
//! All trait methods are blocking; callers are expected to isolate them on
//! `spawn_blocking` so a long generation never stalls the request loop.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ChatMessage, GenerationParams};

/// Options handed to the text backend on load.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub context_size: u32,
    /// Whether to offload to the accelerator. The session retries once with
    /// this disabled when the accelerated attempt fails.
    pub accelerated: bool,
}

/// A finished (non-streamed) completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The first choice's message.
    pub message: ChatMessage,
    /// The backend's full choice list, opaque to the bridge.
    pub raw_choices: serde_json::Value,
}

/// A loaded text-generation model.
pub trait TextModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<Completion>;

    /// Streamed completion. Each produced chunk is handed to `on_chunk` as
    /// soon as it exists; the call returns once generation finishes.
    fn complete_stream(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
        on_chunk: &mut dyn FnMut(serde_json::Value),
    ) -> Result<()>;
}

/// Loader for text-generation models.
pub trait TextBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Box<dyn TextModel>>;
}

/// Parameters for one txt2img job.
#[derive(Debug, Clone)]
pub struct ImageGenParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub seed: i64,
}

/// Raw pixels of one generated image, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// A loaded image-generation model.
pub trait ImageModel: Send + Sync {
    fn txt2img(&self, params: &ImageGenParams) -> Result<ImageOutput>;
}

/// Loader for image-generation models.
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&self, path: &Path) -> Result<Box<dyn ImageModel>>;
}

/// Text backend for builds without native text-generation bindings.
#[derive(Debug, Default)]
pub struct UnavailableTextBackend;

impl TextBackend for UnavailableTextBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn load(&self, _path: &Path, _options: &LoadOptions) -> Result<Box<dyn TextModel>> {
        Err(Error::NotInstalled("text generation"))
    }
}

/// Image backend for builds without native image-generation bindings.
#[derive(Debug, Default)]
pub struct UnavailableImageBackend;

impl ImageBackend for UnavailableImageBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn load(&self, _path: &Path) -> Result<Box<dyn ImageModel>> {
        Err(Error::NotInstalled("image generation"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable fakes for exercising session, router, and relay logic
    //! without any native library.

    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Text backend that hands out [`FakeTextModel`]s and records load calls.
    pub struct FakeTextBackend {
        pub load_count: Arc<AtomicUsize>,
        /// Fail loads with `accelerated == true`.
        pub fail_accelerated: bool,
        /// Fail every load.
        pub fail_always: bool,
        pub model: Arc<FakeTextModel>,
    }

    impl FakeTextBackend {
        pub fn new(model: FakeTextModel) -> Self {
            Self {
                load_count: Arc::new(AtomicUsize::new(0)),
                fail_accelerated: false,
                fail_always: false,
                model: Arc::new(model),
            }
        }

    }

    impl TextBackend for FakeTextBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn load(&self, path: &Path, options: &LoadOptions) -> Result<Box<dyn TextModel>> {
            self.load_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_always {
                return Err(Error::LoadFailure(format!(
                    "rejected {}",
                    path.display()
                )));
            }
            if self.fail_accelerated && options.accelerated {
                return Err(Error::LoadFailure("accelerator unavailable".to_string()));
            }
            Ok(Box::new(FakeTextModel {
                reply: self.model.reply.clone(),
                chunks: self.model.chunks.clone(),
                fail_after: self.model.fail_after,
                fail_complete: self.model.fail_complete,
                seen: self.model.seen.clone(),
            }))
        }
    }

    /// Text model with a scripted reply and chunk sequence.
    pub struct FakeTextModel {
        pub reply: String,
        pub chunks: Vec<serde_json::Value>,
        /// Emit this many chunks, then fail.
        pub fail_after: Option<usize>,
        /// Make non-streamed completion fail.
        pub fail_complete: bool,
        /// Message lists this model has been asked to complete.
        pub seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl FakeTextModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                chunks: Vec::new(),
                fail_after: None,
                fail_complete: false,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn streaming(chunks: Vec<serde_json::Value>) -> Self {
            Self {
                chunks,
                ..Self::replying("")
            }
        }
    }

    impl TextModel for FakeTextModel {
        fn complete(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<Completion> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if self.fail_complete {
                return Err(Error::LoadFailure("scripted inference failure".to_string()));
            }
            let message = ChatMessage {
                role: "assistant".to_string(),
                content: self.reply.clone(),
            };
            Ok(Completion {
                raw_choices: json!([{ "index": 0, "message": message, "finish_reason": "stop" }]),
                message,
            })
        }

        fn complete_stream(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
            on_chunk: &mut dyn FnMut(serde_json::Value),
        ) -> Result<()> {
            self.seen.lock().unwrap().push(messages.to_vec());
            for (idx, chunk) in self.chunks.iter().enumerate() {
                if self.fail_after == Some(idx) {
                    return Err(Error::LoadFailure("scripted stream failure".to_string()));
                }
                on_chunk(chunk.clone());
            }
            if self.fail_after == Some(self.chunks.len()) {
                return Err(Error::LoadFailure("scripted stream failure".to_string()));
            }
            Ok(())
        }
    }

    /// Image backend producing a solid-colour image.
    pub struct FakeImageBackend {
        pub fail_load: bool,
    }

    impl ImageBackend for FakeImageBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn load(&self, path: &Path) -> Result<Box<dyn ImageModel>> {
            if self.fail_load {
                return Err(Error::LoadFailure(format!("rejected {}", path.display())));
            }
            Ok(Box::new(FakeImageModel))
        }
    }

    pub struct FakeImageModel;

    impl ImageModel for FakeImageModel {
        fn txt2img(&self, params: &ImageGenParams) -> Result<ImageOutput> {
            let pixels = (params.width * params.height * 3) as usize;
            Ok(ImageOutput {
                width: params.width,
                height: params.height,
                rgb: vec![0x7f; pixels],
            })
        }
    }
}
