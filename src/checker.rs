//! Domain Check Orchestrator - render, extract, score, persist for one domain.
//!
//! Checks are serialized per domain identity (a manual "check now" and a
//! scheduled check can never race on the same domain) and globally capped by
//! a semaphore so rendering contexts stay bounded. A render failure produces
//! no partial state: nothing is persisted unless the whole check succeeded.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

use crate::baseline::BaselineManager;
use crate::error::{EngineError, EngineResult};
use crate::features::FeatureExtractor;
use crate::renderer::Renderer;
use crate::similarity::SimilarityEngine;
use crate::store::Store;
use crate::types::{CheckRecord, Snapshot};

pub struct DomainChecker {
    baseline: Arc<BaselineManager>,
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn Store>,
    extractor: FeatureExtractor,
    engine: SimilarityEngine,
    render_timeout: Duration,
    /// One mutex per domain identity; at most one in-flight check per domain.
    domain_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Bounds simultaneous renders across all domains.
    render_slots: Arc<Semaphore>,
    /// Disambiguates screenshot names within the same millisecond.
    check_seq: AtomicU64,
}

impl DomainChecker {
    pub fn new(
        baseline: Arc<BaselineManager>,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn Store>,
        extractor: FeatureExtractor,
        engine: SimilarityEngine,
        render_timeout: Duration,
        max_concurrent_checks: usize,
    ) -> Self {
        Self {
            baseline,
            renderer,
            store,
            extractor,
            engine,
            render_timeout,
            domain_locks: Mutex::new(HashMap::new()),
            render_slots: Arc::new(Semaphore::new(max_concurrent_checks.max(1))),
            check_seq: AtomicU64::new(0),
        }
    }

    /// Run the full check pipeline for one domain. Overlapping calls for the
    /// same domain queue behind each other.
    pub async fn check(&self, domain: &str) -> EngineResult<CheckRecord> {
        let lock = self.domain_lock(domain);
        let _domain_guard = lock.lock().await;
        let _render_slot = self
            .render_slots
            .acquire()
            .await
            .map_err(|_| EngineError::Render("checker is shut down".to_string()))?;

        log::info!("Checking domain: {}", domain);

        // The baseline reference is captured once here; a concurrent refresh
        // cannot change what this check compares against.
        let baseline = self.baseline.ensure().await?;

        let url = target_url(domain);
        let page = self.renderer.render(&url, self.render_timeout).await?;

        let snapshot = Snapshot {
            source_url: url,
            html: page.html,
            visible_text: page.visible_text,
            screenshot: page.screenshot,
            captured_at: chrono::Utc::now(),
        };
        let features = self.extractor.extract(&snapshot);
        let result = self.engine.score(&baseline, &snapshot, &features);

        let screenshot_ref = self.screenshot_name(domain, &snapshot);
        self.store
            .put_screenshot(&screenshot_ref, &snapshot.screenshot)
            .await?;

        let record = CheckRecord {
            domain: domain.to_string(),
            result,
            screenshot_ref,
            checked_at: snapshot.captured_at,
        };
        self.store.update_domain_state(domain, &record).await?;
        self.store.append_check_log(&record).await?;

        log::info!(
            "Check complete: {} - {}% similarity ({})",
            domain,
            record.result.composite,
            record.result.threat_level
        );
        Ok(record)
    }

    fn domain_lock(&self, domain: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.domain_locks
            .lock()
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn screenshot_name(&self, domain: &str, snapshot: &Snapshot) -> String {
        let seq = self.check_seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}_{}_{}",
            sanitize_domain(domain),
            snapshot.captured_at.timestamp_millis(),
            seq
        )
    }
}

/// Watched entries may be bare domains or full URLs; bare domains get the
/// https scheme.
fn target_url(domain: &str) -> String {
    if let Ok(url) = Url::parse(domain) {
        if url.scheme() == "http" || url.scheme() == "https" {
            return domain.to_string();
        }
    }
    format!("https://{}", domain)
}

fn sanitize_domain(domain: &str) -> String {
    domain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
