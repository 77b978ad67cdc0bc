//! Lock-free observability counters shared by the crawler, detectors and
//! auditor. Recoverable failures never surface as findings; they land here.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering::Relaxed};

#[derive(Debug, Default)]
pub struct ScanStats {
    requests: AtomicU64,
    network_errors: AtomicU64,
    timeouts: AtomicU64,
    parse_errors: AtomicU64,
    non_html_pages: AtomicU64,
    cancelled_requests: AtomicU64,
}

/// Point-in-time copy of [`ScanStats`], embedded in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub network_errors: u64,
    pub timeouts: u64,
    pub parse_errors: u64,
    pub non_html_pages: u64,
    pub cancelled_requests: u64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Relaxed);
    }

    pub fn record_non_html(&self) {
        self.non_html_pages.fetch_add(1, Relaxed);
    }

    pub fn record_error(&self, err: &ScanError) {
        let counter = match err {
            ScanError::Network(_) => &self.network_errors,
            ScanError::Timeout(_) => &self.timeouts,
            ScanError::Parse(_) => &self.parse_errors,
            ScanError::Cancelled => &self.cancelled_requests,
            ScanError::Config(_) | ScanError::Join(_) => return,
        };
        counter.fetch_add(1, Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Relaxed),
            network_errors: self.network_errors.load(Relaxed),
            timeouts: self.timeouts.load(Relaxed),
            parse_errors: self.parse_errors.load(Relaxed),
            non_html_pages: self.non_html_pages.load(Relaxed),
            cancelled_requests: self.cancelled_requests.load(Relaxed),
        }
    }
}

/// Cloneable cancellation flag. Once set, no new fetches are issued.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_buckets() {
        let stats = ScanStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_error(&ScanError::Network("refused".to_string()));
        stats.record_error(&ScanError::Timeout("slow".to_string()));
        stats.record_error(&ScanError::Timeout("slow".to_string()));
        stats.record_error(&ScanError::Config("ignored".to_string()));

        let snap = stats.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.network_errors, 1);
        assert_eq!(snap.timeouts, 2);
        assert_eq!(snap.parse_errors, 0);
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let cancel = Cancellation::new();
        let other = cancel.clone();
        assert!(!other.is_cancelled());
        cancel.cancel();
        assert!(other.is_cancelled());
    }
}
