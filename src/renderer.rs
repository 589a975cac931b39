//! Renderer boundary.
//!
//! Rendering a page (navigating a headless browser, waiting for network
//! idle, rasterizing a screenshot) happens outside this crate. The engine
//! only depends on this contract: give it a URL and a timeout, get back the
//! rendered markup, the visible text and a fixed-size raster, or a
//! `Render` error.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::EngineResult;
use crate::types::Screenshot;

/// Output of one successful render.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub visible_text: String,
    pub screenshot: Screenshot,
}

/// Contract the engine requires from the external rendering layer.
///
/// Implementations must bound navigation by `timeout` and fail with
/// `EngineError::Render` on navigation, timeout or network errors.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> EngineResult<RenderedPage>;
}
