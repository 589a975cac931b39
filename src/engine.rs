//! Detection engine facade - the control surface the API layer embeds.
//!
//! Wires the baseline manager, checker and scheduler against externally
//! supplied Renderer and Store implementations. Baseline creation at
//! startup is deliberately lazy: a missing baseline is captured on the
//! first check instead of failing construction.

use std::sync::Arc;
use std::time::Duration;

use crate::baseline::BaselineManager;
use crate::checker::DomainChecker;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::features::FeatureExtractor;
use crate::renderer::Renderer;
use crate::scheduler::{MonitorScheduler, StartOutcome};
use crate::similarity::SimilarityEngine;
use crate::store::Store;
use crate::types::{Baseline, CheckRecord, MonitoringStatus};

pub struct DetectionEngine {
    baseline: Arc<BaselineManager>,
    checker: Arc<DomainChecker>,
    scheduler: MonitorScheduler,
}

impl DetectionEngine {
    /// Build the engine from validated configuration and the two external
    /// collaborators.
    pub fn new(
        config: EngineConfig,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn Store>,
    ) -> Result<Self, String> {
        config.validate()?;

        let extractor = FeatureExtractor::new(&config.brand_keywords);
        let render_timeout = Duration::from_millis(config.render_timeout_ms);

        let baseline = Arc::new(BaselineManager::new(
            renderer.clone(),
            store.clone(),
            extractor.clone(),
            &config.legitimate_site_url,
            render_timeout,
        ));
        let checker = Arc::new(DomainChecker::new(
            baseline.clone(),
            renderer,
            store.clone(),
            extractor,
            SimilarityEngine::new(
                config.weights,
                config.thresholds,
                config.visual_pixel_tolerance,
                config.visual_fallback_score,
            ),
            render_timeout,
            config.max_concurrent_checks,
        ));
        let scheduler = MonitorScheduler::new(
            checker.clone(),
            store,
            baseline.clone(),
            Duration::from_millis(config.check_interval_ms),
        );

        Ok(Self {
            baseline,
            checker,
            scheduler,
        })
    }

    /// Try to load the persisted baseline. Failure is non-fatal: the
    /// baseline will be created lazily on the first check.
    pub async fn warm_up(&self) {
        if let Err(e) = self.baseline.load().await {
            log::warn!("Baseline not available yet ({}); will create on first check", e);
        }
    }

    pub fn start_monitoring(&self) -> StartOutcome {
        self.scheduler.start()
    }

    pub fn stop_monitoring(&self) {
        self.scheduler.stop()
    }

    pub fn monitoring_status(&self) -> MonitoringStatus {
        self.scheduler.status()
    }

    /// Foreground "check now" for one domain; failures surface to the
    /// caller instead of being swallowed.
    pub async fn check_now(&self, domain: &str) -> EngineResult<CheckRecord> {
        self.checker.check(domain).await
    }

    /// Recapture the baseline from the legitimate site.
    pub async fn refresh_baseline(&self) -> EngineResult<Arc<Baseline>> {
        self.baseline.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testutil::{page, MockRenderer};
    use crate::types::ThreatLevel;

    fn engine_with(renderer: Arc<MockRenderer>, store: Arc<MemoryStore>) -> DetectionEngine {
        let mut config = EngineConfig::default();
        config.legitimate_site_url = "https://legit.example".to_string();
        config.check_interval_ms = 10;
        DetectionEngine::new(config, renderer, store).unwrap()
    }

    #[tokio::test]
    async fn test_check_now_end_to_end() {
        let renderer = Arc::new(MockRenderer::new());
        let clone_page = page(
            "<html><form><input name='user'></form></html>",
            "Commercial Bank digital login account",
        );
        renderer.set_page("https://legit.example", clone_page.clone());
        renderer.set_page("https://clone.example", clone_page);
        let store = Arc::new(MemoryStore::new());
        store.add_domain("clone.example");

        let engine = engine_with(renderer, store);
        let record = engine.check_now("clone.example").await.unwrap();
        assert_eq!(record.result.threat_level, ThreatLevel::High);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.weights.visual = 0.9;
        let result = DetectionEngine::new(
            config,
            Arc::new(MockRenderer::new()),
            Arc::new(MemoryStore::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_warm_up_failure_is_non_fatal() {
        let renderer = Arc::new(MockRenderer::new()); // legit site not scripted yet
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(renderer.clone(), store);

        engine.warm_up().await;
        assert!(!engine.monitoring_status().baseline_loaded);

        // Once the site is reachable, the first check creates the baseline.
        renderer.set_page("https://legit.example", page("<html></html>", "bank"));
        renderer.set_page("https://clone.example", page("<html></html>", "bank"));
        engine.check_now("clone.example").await.unwrap();
        assert!(engine.monitoring_status().baseline_loaded);
    }

    #[tokio::test]
    async fn test_refresh_baseline_visible_to_later_checks() {
        let renderer = Arc::new(MockRenderer::new());
        renderer.set_page("https://legit.example", page("<html></html>", "alpha beta"));
        renderer.set_page("https://clone.example", page("<html></html>", "gamma delta"));
        let store = Arc::new(MemoryStore::new());
        let engine = engine_with(renderer.clone(), store);

        let first = engine.check_now("clone.example").await.unwrap();
        assert_eq!(first.result.text_similarity, 0);

        renderer.set_page("https://legit.example", page("<html></html>", "gamma delta"));
        engine.refresh_baseline().await.unwrap();

        let second = engine.check_now("clone.example").await.unwrap();
        assert_eq!(second.result.text_similarity, 100);
    }
}
