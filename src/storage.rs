//! File-backed Store - persistent storage under a single data directory.
//!
//! Layout mirrors the production deployment:
//! `baseline/baseline.json`, `domains.json`, `logs/checks.jsonl` and
//! `screenshots/<name>.rgba`. Screenshot artifacts carry an 8-byte
//! little-endian width/height header followed by raw RGBA pixels, so the
//! static-file layer can serve them without this crate decoding anything.
//!
//! Suitable for single-process deployments; larger installations put a
//! database behind the `Store` trait instead.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};
use crate::store::Store;
use crate::types::{Baseline, CheckRecord, Screenshot, WatchedDomain};

const BASELINE_FILE: &str = "baseline/baseline.json";
const DOMAINS_FILE: &str = "domains.json";
const CHECK_LOG_FILE: &str = "logs/checks.jsonl";
const SCREENSHOTS_DIR: &str = "screenshots";

pub struct FileStore {
    base_dir: PathBuf,
    /// Serializes read-modify-write cycles on domains.json.
    domains_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and lay out) the data directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let base_dir = base_dir.into();
        for dir in ["baseline", "logs", SCREENSHOTS_DIR] {
            fs::create_dir_all(base_dir.join(dir))?;
        }
        Ok(Self {
            base_dir,
            domains_lock: Mutex::new(()),
        })
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    /// Add a domain to the watchlist; duplicates are ignored.
    pub fn add_domain(&self, domain: &str) -> EngineResult<()> {
        let _guard = self.domains_lock.lock();
        let mut domains = self.read_domains()?;
        if !domains.iter().any(|d| d.domain == domain) {
            domains.push(WatchedDomain::new(domain));
            self.write_domains(&domains)?;
        }
        Ok(())
    }

    pub fn remove_domain(&self, domain: &str) -> EngineResult<()> {
        let _guard = self.domains_lock.lock();
        let mut domains = self.read_domains()?;
        domains.retain(|d| d.domain != domain);
        self.write_domains(&domains)
    }

    pub fn domain_state(&self, domain: &str) -> EngineResult<Option<WatchedDomain>> {
        let _guard = self.domains_lock.lock();
        Ok(self.read_domains()?.into_iter().find(|d| d.domain == domain))
    }

    fn read_domains(&self) -> EngineResult<Vec<WatchedDomain>> {
        let path = self.path(DOMAINS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn write_domains(&self, domains: &[WatchedDomain]) -> EngineResult<()> {
        write_atomically(&self.path(DOMAINS_FILE), &serde_json::to_vec_pretty(domains)?)
    }
}

/// Write via a temporary sibling so readers never observe a torn file.
fn write_atomically(path: &Path, data: &[u8]) -> EngineResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn get_baseline(&self) -> EngineResult<Option<Baseline>> {
        let path = self.path(BASELINE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        let baseline = serde_json::from_slice(&data)
            .map_err(|e| EngineError::Storage(format!("corrupt baseline file: {}", e)))?;
        Ok(Some(baseline))
    }

    async fn put_baseline(&self, baseline: &Baseline) -> EngineResult<()> {
        write_atomically(
            &self.path(BASELINE_FILE),
            &serde_json::to_vec_pretty(baseline)?,
        )
    }

    async fn list_watched_domains(&self) -> EngineResult<Vec<String>> {
        let _guard = self.domains_lock.lock();
        Ok(self
            .read_domains()?
            .into_iter()
            .map(|d| d.domain)
            .collect())
    }

    async fn update_domain_state(&self, domain: &str, record: &CheckRecord) -> EngineResult<()> {
        let _guard = self.domains_lock.lock();
        let mut domains = self.read_domains()?;
        if let Some(entry) = domains.iter_mut().find(|d| d.domain == domain) {
            entry.current_similarity = record.result.composite;
            entry.last_checked_at = Some(record.checked_at);
            entry.current_screenshot_ref = Some(record.screenshot_ref.clone());
            self.write_domains(&domains)?;
        }
        Ok(())
    }

    async fn append_check_log(&self, record: &CheckRecord) -> EngineResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(CHECK_LOG_FILE))?;
        file.write_all(&line)?;
        Ok(())
    }

    async fn put_screenshot(&self, name: &str, screenshot: &Screenshot) -> EngineResult<()> {
        let mut data = Vec::with_capacity(8 + screenshot.pixels.len());
        data.extend_from_slice(&screenshot.width.to_le_bytes());
        data.extend_from_slice(&screenshot.height.to_le_bytes());
        data.extend_from_slice(&screenshot.pixels);
        let path = self
            .path(SCREENSHOTS_DIR)
            .join(format!("{}.rgba", name));
        fs::write(path, data)?;
        Ok(())
    }
}
