//! Shared test doubles: a scripted renderer and snapshot builders.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::renderer::{RenderedPage, Renderer};
use crate::types::Screenshot;

/// Solid-color RGBA raster.
pub fn screenshot(width: u32, height: u32, rgba: [u8; 4]) -> Screenshot {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        pixels.extend_from_slice(&rgba);
    }
    Screenshot {
        width,
        height,
        pixels,
    }
}

/// A rendered page with a small fixed screenshot.
pub fn page(html: &str, visible_text: &str) -> RenderedPage {
    RenderedPage {
        html: html.to_string(),
        visible_text: visible_text.to_string(),
        screenshot: screenshot(4, 4, [128, 128, 128, 255]),
    }
}

/// Renderer returning scripted pages per URL; unscripted URLs and URLs
/// marked as failing produce render errors.
#[derive(Default)]
pub struct MockRenderer {
    pages: RwLock<HashMap<String, RenderedPage>>,
    failures: RwLock<HashSet<String>>,
    render_count: AtomicU64,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, url: &str, page: RenderedPage) {
        self.pages.write().insert(url.to_string(), page);
        self.failures.write().remove(url);
    }

    pub fn set_failure(&self, url: &str) {
        self.failures.write().insert(url.to_string());
    }

    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> EngineResult<RenderedPage> {
        self.render_count.fetch_add(1, Ordering::Relaxed);
        if self.failures.read().contains(url) {
            return Err(EngineError::Render(format!("navigation failed: {}", url)));
        }
        self.pages
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::Render(format!("no page scripted for {}", url)))
    }
}

/// Renderer that always fails with a navigation error.
pub struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> EngineResult<RenderedPage> {
        Err(EngineError::Render(format!("unreachable: {}", url)))
    }
}
