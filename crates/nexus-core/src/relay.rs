//! Streaming relay: typed frames between generation and the HTTP layer.
//!
//! Generation (local or proxied) feeds a channel of [`Frame`]s; the HTTP
//! layer drains it into server-sent events. Keeping the channel typed means
//! the wire format lives in exactly one place ([`Frame::payload`]) and the
//! producers never think about SSE.
//!
//! Framing contract:
//! - a successful generation of N chunks yields N `Chunk` frames followed
//!   by one `Done` sentinel;
//! - a generation failing after K chunks yields K `Chunk` frames followed
//!   by one `Error` frame and no sentinel, so clients can tell a crash from
//!   a completion;
//! - frames are emitted strictly in production order, one per chunk, with
//!   no buffering.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::session::ModelSession;
use crate::types::{ChatMessage, GenerationParams};

/// One unit of the streaming wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A partial completion chunk, passed through as JSON.
    Chunk(serde_json::Value),
    /// In-band failure report; always the last frame of its stream.
    Error(String),
    /// End-of-stream sentinel.
    Done,
}

impl Frame {
    /// The payload carried by this frame's `data` event.
    pub fn payload(&self) -> String {
        match self {
            Frame::Chunk(value) => value.to_string(),
            Frame::Error(message) => {
                serde_json::json!({ "error": message }).to_string()
            }
            Frame::Done => "[DONE]".to_string(),
        }
    }

    /// Whether no further frames follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Error(_) | Frame::Done)
    }
}

/// Receiving half of a frame stream. Dropping it stops delivery; the
/// producer keeps running to completion (no cancellation contract).
#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl FrameStream {
    pub fn channel() -> (mpsc::UnboundedSender<Frame>, FrameStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, FrameStream { rx })
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

/// Stream a local generation as frames.
pub fn local_stream(
    session: Arc<ModelSession>,
    messages: Vec<ChatMessage>,
    params: GenerationParams,
) -> FrameStream {
    let (tx, stream) = FrameStream::channel();
    tokio::spawn(async move {
        let chunk_tx = tx.clone();
        let result = session
            .chat_stream(messages, params, move |chunk| {
                let _ = chunk_tx.send(Frame::Chunk(chunk));
            })
            .await;
        match result {
            Ok(()) => {
                let _ = tx.send(Frame::Done);
            }
            Err(err) => {
                let _ = tx.send(Frame::Error(err.to_string()));
            }
        }
    });
    stream
}

/// Stream an upstream provider's streamed body as frames.
///
/// The upstream is expected to speak newline-delimited JSON, optionally
/// with SSE `data:` prefixes; both are normalized into the same frame
/// alphabet as local streaming. An upstream `[DONE]` maps to the sentinel.
pub fn proxy_stream(response: reqwest::Response) -> FrameStream {
    let (tx, stream) = FrameStream::channel();
    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(next) = body.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(err) => {
                    let _ = tx.send(Frame::Error(err.to_string()));
                    return;
                }
            };
            buf.extend_from_slice(&bytes);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                match parse_upstream_line(&line) {
                    Some(Frame::Done) => {
                        let _ = tx.send(Frame::Done);
                        return;
                    }
                    Some(frame) => {
                        if tx.send(frame).is_err() {
                            // Client went away; stop reading upstream.
                            return;
                        }
                    }
                    None => {}
                }
            }
        }
        if !buf.is_empty() {
            match parse_upstream_line(&buf) {
                Some(Frame::Done) => {
                    let _ = tx.send(Frame::Done);
                    return;
                }
                Some(frame) => {
                    let _ = tx.send(frame);
                }
                None => {}
            }
        }
        let _ = tx.send(Frame::Done);
    });
    stream
}

fn parse_upstream_line(raw: &[u8]) -> Option<Frame> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    let line = line.strip_prefix("data:").map(str::trim).unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    if line == "[DONE]" {
        return Some(Frame::Done);
    }
    match serde_json::from_str(line) {
        Ok(value) => Some(Frame::Chunk(value)),
        // Not JSON; forward the raw line rather than dropping data.
        Err(_) => Some(Frame::Chunk(serde_json::Value::String(line.to_string()))),
    }
}

/// Drain a stream to completion. Test helper shared with the router tests.
#[cfg(test)]
pub(crate) async fn collect(mut stream: FrameStream) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = stream.recv().await {
        let terminal = frame.is_terminal();
        frames.push(frame);
        if terminal {
            break;
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeTextBackend, FakeTextModel};
    use crate::backend::UnavailableImageBackend;
    use crate::config::BridgeConfig;
    use serde_json::json;
    use std::fs;
    use std::path::Path;

    fn loaded_session(model: FakeTextModel, dir: &Path) -> Arc<ModelSession> {
        fs::write(dir.join("m.gguf"), b"x").unwrap();
        let config = BridgeConfig {
            models_dir: dir.to_path_buf(),
            images_dir: dir.to_path_buf(),
            runtime_dir: dir.to_path_buf(),
            context_size: 2048,
        };
        Arc::new(ModelSession::new(
            config,
            Arc::new(FakeTextBackend::new(model)),
            Arc::new(UnavailableImageBackend),
        ))
    }

    fn params() -> GenerationParams {
        GenerationParams {
            temperature: 0.7,
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn successful_stream_is_chunks_then_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = vec![json!({"t": 0}), json!({"t": 1}), json!({"t": 2})];
        let session = loaded_session(FakeTextModel::streaming(chunks.clone()), dir.path());
        session.load_text("m.gguf", None).await.unwrap();

        let frames = collect(local_stream(session, Vec::new(), params())).await;
        assert_eq!(frames.len(), 4);
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(frames[idx], Frame::Chunk(chunk.clone()));
        }
        assert_eq!(frames[3], Frame::Done);
        assert_eq!(frames[3].payload(), "[DONE]");
    }

    #[tokio::test]
    async fn failing_stream_ends_with_error_and_no_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = FakeTextModel::streaming(vec![json!({"t": 0}), json!({"t": 1})]);
        model.fail_after = Some(2);
        let session = loaded_session(model, dir.path());
        session.load_text("m.gguf", None).await.unwrap();

        let frames = collect(local_stream(session, Vec::new(), params())).await;
        assert_eq!(frames.len(), 3);
        assert!(matches!(frames[0], Frame::Chunk(_)));
        assert!(matches!(frames[1], Frame::Chunk(_)));
        assert!(matches!(frames[2], Frame::Error(_)));
        assert!(!frames.contains(&Frame::Done));
    }

    #[tokio::test]
    async fn failure_before_any_chunk_is_a_lone_error_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = FakeTextModel::streaming(vec![json!({"t": 0})]);
        model.fail_after = Some(0);
        let session = loaded_session(model, dir.path());
        session.load_text("m.gguf", None).await.unwrap();

        let frames = collect(local_stream(session, Vec::new(), params())).await;
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], Frame::Error(_)));
    }

    #[test]
    fn error_frame_payload_is_json() {
        let payload = Frame::Error("boom".to_string()).payload();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn upstream_lines_are_normalized() {
        assert_eq!(parse_upstream_line(b"\n"), None);
        assert_eq!(parse_upstream_line(b"data: [DONE]\n"), Some(Frame::Done));
        assert_eq!(
            parse_upstream_line(b"{\"a\":1}\n"),
            Some(Frame::Chunk(json!({"a": 1})))
        );
        assert_eq!(
            parse_upstream_line(b"data: {\"a\":1}\n"),
            Some(Frame::Chunk(json!({"a": 1})))
        );
    }
}
