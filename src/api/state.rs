//! Shared state for the HTTP API.

use crate::config::Config;
use crate::gallery::GalleryRenderer;

use anyhow::Context as _;
use axum::http::HeaderValue;
use std::sync::Arc;

/// State shared across all API handlers. Read-only after startup.
pub struct ApiState {
    pub config: Arc<Config>,
    pub gallery: GalleryRenderer,
    pub cache_control: HeaderValue,
}

impl ApiState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let gallery = GalleryRenderer::new().context("failed to parse gallery template")?;
        let cache_control = HeaderValue::from_str(&config.cache_control())
            .context("invalid Cache-Control value")?;

        Ok(Self {
            config: Arc::new(config),
            gallery,
            cache_control,
        })
    }
}
