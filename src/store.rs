//! Store boundary and in-memory reference implementation.
//!
//! Durable storage mechanics (database, static-file hosting) live outside
//! this crate; the engine persists through this trait and treats any failure
//! as fatal only for the single operation in progress. `MemoryStore` backs
//! tests and single-process embeddings.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::EngineResult;
use crate::types::{Baseline, CheckRecord, Screenshot, WatchedDomain};

/// Persistence boundary consumed by the engine.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the persisted baseline, if any.
    async fn get_baseline(&self) -> EngineResult<Option<Baseline>>;

    /// Persist the baseline, replacing any previous one.
    async fn put_baseline(&self, baseline: &Baseline) -> EngineResult<()>;

    /// The full watchlist, in storage order.
    async fn list_watched_domains(&self) -> EngineResult<Vec<String>>;

    /// Update a domain's current state from a completed check.
    async fn update_domain_state(&self, domain: &str, record: &CheckRecord) -> EngineResult<()>;

    /// Append a completed check to the history log.
    async fn append_check_log(&self, record: &CheckRecord) -> EngineResult<()>;

    /// Persist a screenshot artifact under an opaque name the external
    /// static-file layer can resolve.
    async fn put_screenshot(&self, name: &str, screenshot: &Screenshot) -> EngineResult<()>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Default)]
struct MemoryStoreInner {
    baseline: Option<Baseline>,
    domains: Vec<WatchedDomain>,
    check_log: Vec<CheckRecord>,
    screenshots: HashMap<String, Screenshot>,
}

/// In-memory `Store` for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a domain to the watchlist; duplicates are ignored.
    pub fn add_domain(&self, domain: &str) {
        let mut inner = self.inner.write();
        if !inner.domains.iter().any(|d| d.domain == domain) {
            inner.domains.push(WatchedDomain::new(domain));
        }
    }

    pub fn remove_domain(&self, domain: &str) {
        self.inner.write().domains.retain(|d| d.domain != domain);
    }

    pub fn domain_state(&self, domain: &str) -> Option<WatchedDomain> {
        self.inner
            .read()
            .domains
            .iter()
            .find(|d| d.domain == domain)
            .cloned()
    }

    pub fn check_log(&self) -> Vec<CheckRecord> {
        self.inner.read().check_log.clone()
    }

    pub fn screenshot(&self, name: &str) -> Option<Screenshot> {
        self.inner.read().screenshots.get(name).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_baseline(&self) -> EngineResult<Option<Baseline>> {
        Ok(self.inner.read().baseline.clone())
    }

    async fn put_baseline(&self, baseline: &Baseline) -> EngineResult<()> {
        self.inner.write().baseline = Some(baseline.clone());
        Ok(())
    }

    async fn list_watched_domains(&self) -> EngineResult<Vec<String>> {
        Ok(self
            .inner
            .read()
            .domains
            .iter()
            .map(|d| d.domain.clone())
            .collect())
    }

    async fn update_domain_state(&self, domain: &str, record: &CheckRecord) -> EngineResult<()> {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.domains.iter_mut().find(|d| d.domain == domain) {
            entry.current_similarity = record.result.composite;
            entry.last_checked_at = Some(record.checked_at);
            entry.current_screenshot_ref = Some(record.screenshot_ref.clone());
        }
        Ok(())
    }

    async fn append_check_log(&self, record: &CheckRecord) -> EngineResult<()> {
        self.inner.write().check_log.push(record.clone());
        Ok(())
    }

    async fn put_screenshot(&self, name: &str, screenshot: &Screenshot) -> EngineResult<()> {
        self.inner
            .write()
            .screenshots
            .insert(name.to_string(), screenshot.clone());
        Ok(())
    }
}
