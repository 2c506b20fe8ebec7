//! Shared application state.
//!
//! Everything handlers need, constructed once in `main` and cloned per
//! request. The model session is the single shared heavyweight resource;
//! it does its own locking.

use std::sync::Arc;
use std::time::Duration;

use nexus_core::{BridgeConfig, ChatRouter, ImageJobRunner, ModelSession};

/// Timeout for the scrape and search helpers' outbound requests.
const WEB_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub config: BridgeConfig,
    pub session: Arc<ModelSession>,
    pub router: Arc<ChatRouter>,
    pub images: Arc<ImageJobRunner>,
    /// Client for the web utility endpoints (search, scrape).
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: BridgeConfig,
        session: Arc<ModelSession>,
        router: Arc<ChatRouter>,
        images: Arc<ImageJobRunner>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(WEB_TIMEOUT)
            .build()
            .expect("static client configuration");
        Self {
            config,
            session,
            router,
            images,
            http,
        }
    }
}
