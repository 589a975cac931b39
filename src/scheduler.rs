//! Monitoring Scheduler - recurring checks over the watchlist.
//!
//! Two states, Idle and Running. `start` is idempotent; `stop` cancels
//! future cycles cooperatively and never interrupts a cycle already in
//! progress. A failure on one domain is logged and isolated: it aborts
//! neither the rest of the cycle nor future cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::baseline::BaselineManager;
use crate::checker::DomainChecker;
use crate::store::Store;
use crate::types::MonitoringStatus;

/// Result of a `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Monitoring was already active; the call was a no-op.
    AlreadyActive,
}

pub struct MonitorScheduler {
    checker: Arc<DomainChecker>,
    store: Arc<dyn Store>,
    baseline: Arc<BaselineManager>,
    interval: Duration,
    running: AtomicBool,
    cancel: parking_lot::Mutex<Option<watch::Sender<bool>>>,
}

impl MonitorScheduler {
    pub fn new(
        checker: Arc<DomainChecker>,
        store: Arc<dyn Store>,
        baseline: Arc<BaselineManager>,
        interval: Duration,
    ) -> Self {
        Self {
            checker,
            store,
            baseline,
            interval,
            running: AtomicBool::new(false),
            cancel: parking_lot::Mutex::new(None),
        }
    }

    /// Transition to Running and schedule recurring cycles. Calling while
    /// already Running is a no-op.
    pub fn start(&self) -> StartOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::info!("Monitoring already active");
            return StartOutcome::AlreadyActive;
        }

        let (tx, mut rx) = watch::channel(false);
        *self.cancel.lock() = Some(tx);

        let checker = self.checker.clone();
        let store = self.store.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            log::info!("Monitoring started (interval {:?})", interval);
            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        // A dropped sender means the scheduler is gone.
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
                // Cancellation is checked before scheduling each cycle; a
                // cycle that already began always runs to completion.
                if *rx.borrow() {
                    break;
                }
                run_cycle(&checker, &store).await;
            }
            log::info!("Monitoring loop exited");
        });

        StartOutcome::Started
    }

    /// Cancel future cycles. An in-flight cycle finishes on its own.
    pub fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        if let Some(tx) = self.cancel.lock().take() {
            let _ = tx.send(true);
        }
        log::info!("Monitoring stopped");
    }

    pub fn status(&self) -> MonitoringStatus {
        MonitoringStatus {
            running: self.running.load(Ordering::SeqCst),
            baseline_loaded: self.baseline.is_loaded(),
        }
    }
}

/// One monitoring cycle: check every watched domain, isolating failures.
async fn run_cycle(checker: &Arc<DomainChecker>, store: &Arc<dyn Store>) {
    log::info!("Running scheduled monitoring cycle");

    let domains = match store.list_watched_domains().await {
        Ok(domains) => domains,
        Err(e) => {
            // Fatal for this cycle only; the next one retries.
            log::error!("Could not read watchlist: {}", e);
            return;
        }
    };

    let mut handles = Vec::with_capacity(domains.len());
    for domain in domains {
        let checker = checker.clone();
        handles.push(tokio::spawn(async move {
            (domain.clone(), checker.check(&domain).await)
        }));
    }

    let mut failures = 0usize;
    for handle in handles {
        match handle.await {
            Ok((_, Ok(_))) => {}
            Ok((domain, Err(e))) => {
                failures += 1;
                log::warn!("Monitoring check failed for {}: {}", domain, e);
            }
            Err(e) => {
                failures += 1;
                log::error!("Monitoring task panicked: {}", e);
            }
        }
    }

    if failures > 0 {
        log::warn!("Monitoring cycle finished with {} failed domain(s)", failures);
    } else {
        log::info!("Monitoring cycle finished");
    }
}
