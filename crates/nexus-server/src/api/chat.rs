//! Chat endpoint: `/api/chat` and `/v1/chat/completions`.
//!
//! The router decides proxy-vs-local; this handler only picks the response
//! shape. Streaming responses drain the relay's frame channel into SSE and
//! stop at the first terminal frame, so an error frame really is the last
//! thing a client sees.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{sse::Event, sse::KeepAlive, IntoResponse, Response, Sse},
    Json,
};
use tracing::info;

use nexus_core::{ChatRequest, Routed};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    info!(
        "incoming chat request: {} messages, mode {:?}, stream {}",
        req.messages.len(),
        req.mode,
        req.stream
    );

    match state.router.route(req).await? {
        Routed::Completed(result) => Ok(Json(result).into_response()),
        Routed::Forwarded(value) => Ok(Json(value).into_response()),
        Routed::Stream(mut frames) => {
            let stream = async_stream::stream! {
                while let Some(frame) = frames.recv().await {
                    let terminal = frame.is_terminal();
                    yield Ok::<_, Infallible>(Event::default().data(frame.payload()));
                    if terminal {
                        break;
                    }
                }
            };
            Ok(Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response())
        }
    }
}
