//! Export counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one controller; each increment also emits a debug event
#[derive(Debug, Default)]
pub struct ExportMetrics {
    exports_started: AtomicU64,
    polls: AtomicU64,
    poll_failures: AtomicU64,
    exports_completed: AtomicU64,
    exports_failed: AtomicU64,
    downloads: AtomicU64,
}

impl ExportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export_started(&self) {
        self.exports_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "exports_started", "Metric incremented");
    }

    pub fn poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "polls", "Metric incremented");
    }

    pub fn poll_failed(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "poll_failures", "Metric incremented");
    }

    pub fn export_completed(&self) {
        self.exports_completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "exports_completed", "Metric incremented");
    }

    pub fn export_failed(&self) {
        self.exports_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "exports_failed", "Metric incremented");
    }

    pub fn download(&self) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "downloads", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            exports_started: self.exports_started.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            exports_completed: self.exports_completed.load(Ordering::Relaxed),
            exports_failed: self.exports_failed.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub exports_started: u64,
    pub polls: u64,
    pub poll_failures: u64,
    pub exports_completed: u64,
    pub exports_failed: u64,
    pub downloads: u64,
}
