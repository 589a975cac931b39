//! Baseline Manager - owns the trusted snapshot of the legitimate site.
//!
//! Exactly one baseline exists per manager. It is replaced by a single
//! `Arc` swap, so a reader holds whichever baseline was current when it
//! asked and a concurrent refresh can never show it a half-updated value.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::features::FeatureExtractor;
use crate::renderer::Renderer;
use crate::store::Store;
use crate::types::{Baseline, Snapshot};

pub struct BaselineManager {
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn Store>,
    extractor: FeatureExtractor,
    legitimate_site_url: String,
    render_timeout: Duration,
    current: RwLock<Option<Arc<Baseline>>>,
    /// Serializes create/load so concurrent lazy initializations collapse
    /// into one render of the legitimate site.
    init_lock: tokio::sync::Mutex<()>,
}

impl BaselineManager {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn Store>,
        extractor: FeatureExtractor,
        legitimate_site_url: &str,
        render_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            store,
            extractor,
            legitimate_site_url: legitimate_site_url.to_string(),
            render_timeout,
            current: RwLock::new(None),
            init_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The live baseline, if one has been created or loaded. The returned
    /// `Arc` stays valid for the caller even if a refresh lands afterwards.
    pub fn current(&self) -> Option<Arc<Baseline>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Capture a fresh baseline from the legitimate site, persist it and
    /// swap it in. Safe to call while checks are in flight.
    pub async fn create(&self) -> EngineResult<Arc<Baseline>> {
        let _guard = self.init_lock.lock().await;
        self.create_locked().await
    }

    /// Load the persisted baseline; absent or corrupt falls back to a fresh
    /// capture.
    pub async fn load(&self) -> EngineResult<Arc<Baseline>> {
        let _guard = self.init_lock.lock().await;

        match self.store.get_baseline().await {
            Ok(Some(baseline)) => {
                log::info!(
                    "Baseline loaded ({}, captured {})",
                    baseline.snapshot.source_url,
                    baseline.created_at
                );
                let baseline = Arc::new(baseline);
                *self.current.write() = Some(baseline.clone());
                Ok(baseline)
            }
            Ok(None) => {
                log::info!("No persisted baseline, creating a new one");
                self.create_locked().await
            }
            Err(e) => {
                log::warn!("Baseline load failed: {}. Creating a new one", e);
                self.create_locked().await
            }
        }
    }

    /// The current baseline, lazily loading or creating one when missing.
    pub async fn ensure(&self) -> EngineResult<Arc<Baseline>> {
        if let Some(baseline) = self.current() {
            return Ok(baseline);
        }
        self.load().await
    }

    /// Recapture the legitimate site. In-flight checks keep the baseline
    /// reference they took at call start.
    pub async fn refresh(&self) -> EngineResult<Arc<Baseline>> {
        self.create().await
    }

    async fn create_locked(&self) -> EngineResult<Arc<Baseline>> {
        log::info!("Creating baseline from {}", self.legitimate_site_url);

        let page = self
            .renderer
            .render(&self.legitimate_site_url, self.render_timeout)
            .await
            .map_err(|e| match e {
                EngineError::Render(reason) => {
                    EngineError::Render(format!("baseline capture failed: {}", reason))
                }
                other => other,
            })?;

        let snapshot = Snapshot {
            source_url: self.legitimate_site_url.clone(),
            html: page.html,
            visible_text: page.visible_text,
            screenshot: page.screenshot,
            captured_at: chrono::Utc::now(),
        };
        let features = self.extractor.extract(&snapshot);
        let baseline = Baseline {
            snapshot,
            features,
            created_at: chrono::Utc::now(),
        };

        self.store.put_baseline(&baseline).await?;

        let baseline = Arc::new(baseline);
        *self.current.write() = Some(baseline.clone());
        log::info!("Baseline created successfully");
        Ok(baseline)
    }
}
