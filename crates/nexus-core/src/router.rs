//! Chat routing: proxy to an external provider or run local inference.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::relay::{self, FrameStream};
use crate::session::ModelSession;
use crate::types::{ChatMessage, ChatMode, ChatRequest, GenerationParams, GenerationResult};

/// Model name sent upstream when the caller supplies none.
const DEFAULT_PROXY_MODEL: &str = "llama3";

/// Hard timeout on the outbound provider call. Local inference has no
/// enforced timeout.
const PROXY_TIMEOUT: Duration = Duration::from_secs(60);

/// The three shapes a routed chat request can come back in.
#[derive(Debug)]
pub enum Routed {
    /// Normalized result of a local, non-streamed generation.
    Completed(GenerationResult),
    /// The upstream provider's successful response, forwarded as-is.
    Forwarded(serde_json::Value),
    /// A live frame stream, local or proxied.
    Stream(FrameStream),
}

pub struct ChatRouter {
    session: Arc<ModelSession>,
    client: reqwest::Client,
}

impl ChatRouter {
    pub fn new(session: Arc<ModelSession>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROXY_TIMEOUT)
            .build()
            .expect("static client configuration");
        Self { session, client }
    }

    pub async fn route(&self, req: ChatRequest) -> Result<Routed> {
        match req.mode {
            ChatMode::Proxy => self.route_proxy(req).await,
            ChatMode::Local => self.route_local(req).await,
        }
    }

    async fn route_proxy(&self, req: ChatRequest) -> Result<Routed> {
        info!(
            "proxying {} messages to {}",
            req.messages.len(),
            req.provider_url
        );
        let payload = json!({
            "model": req.model.as_deref().unwrap_or(DEFAULT_PROXY_MODEL),
            "messages": req.messages,
            "stream": req.stream,
            "options": {
                "temperature": req.temperature,
                "num_predict": req.max_tokens,
            },
        });

        let response = self
            .client
            .post(&req.provider_url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() {
                    Error::Unavailable {
                        url: req.provider_url.clone(),
                    }
                } else {
                    Error::internal(format!("proxy request failed: {err}"), format!("{err:?}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("provider returned {status}: {body}");
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        if req.stream {
            return Ok(Routed::Stream(relay::proxy_stream(response)));
        }

        let value: serde_json::Value = response.json().await.map_err(|err| {
            Error::internal(
                format!("provider returned unparseable body: {err}"),
                format!("{err:?}"),
            )
        })?;
        Ok(Routed::Forwarded(value))
    }

    async fn route_local(&self, req: ChatRequest) -> Result<Routed> {
        if !self.session.is_text_loaded().await {
            match req.model.as_deref() {
                Some(name) => {
                    info!("auto-loading requested model {name}");
                    // Implicit-load failures keep their own variant; they are
                    // load errors, not bad requests.
                    self.session.load_text(name, None).await?;
                }
                None => {
                    return Err(Error::BadRequest(
                        "no model loaded and no model name provided".to_string(),
                    ))
                }
            }
        }

        let params = GenerationParams::from(&req);
        let messages = sanitize_messages(req.messages);
        info!("local chat: {} messages after sanitization", messages.len());

        if req.stream {
            return Ok(Routed::Stream(relay::local_stream(
                self.session.clone(),
                messages,
                params,
            )));
        }

        match self.session.chat(messages, params).await {
            Ok(completion) => {
                let model = self
                    .session
                    .status()
                    .await
                    .text_name
                    .unwrap_or_else(|| "local".to_string());
                Ok(Routed::Completed(GenerationResult {
                    model,
                    message: completion.message,
                    choices: completion.raw_choices,
                    done: true,
                }))
            }
            Err(err @ (Error::BadRequest(_) | Error::Internal { .. })) => Err(err),
            // Never let a generation failure escape as anything but an
            // internal error; the process must survive any single request.
            Err(err) => Err(Error::internal(err.to_string(), format!("{err:?}"))),
        }
    }
}

/// Drop messages missing a role or content; keep the rest in order.
fn sanitize_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter(|m| !m.role.is_empty() && !m.content.is_empty())
        .collect()
}
