use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Counters for one invocation's traffic against the metrics provider.
#[derive(Debug, Default)]
pub struct ApiMetrics {
    pub total_requests: AtomicU64,
    pub pages_fetched: AtomicU64,
    pub transport_errors: AtomicU64,
    pub malformed_records: AtomicU64,
    pub auxiliary_failures: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self, count: u64) {
        if count > 0 {
            self.malformed_records.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn record_auxiliary_failure(&self) {
        self.auxiliary_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ApiStats {
        ApiStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            auxiliary_failures: self.auxiliary_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            requests = stats.total_requests,
            pages = stats.pages_fetched,
            transport_errors = stats.transport_errors,
            malformed_records = stats.malformed_records,
            auxiliary_failures = stats.auxiliary_failures,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            "GitHub API usage"
        );
        if stats.malformed_records > 0 {
            warn!(
                count = stats.malformed_records,
                "Discarded records that could not be decoded"
            );
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiStats {
    pub total_requests: u64,
    pub pages_fetched: u64,
    pub transport_errors: u64,
    pub malformed_records: u64,
    pub auxiliary_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Span covering all work for one repository.
pub fn create_repository_span(
    repository: &str,
    family: &str,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "repository",
        repo = repository,
        metrics.family = family,
        correlation.id = correlation_id
    )
}

/// Time an operation and log its duration when finished.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ApiMetrics::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_page();
        metrics.record_malformed(0);
        metrics.record_malformed(3);
        metrics.record_auxiliary_failure();
        metrics.record_cache_miss();
        metrics.record_cache_hit();

        let stats = metrics.get_stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.malformed_records, 3);
        assert_eq!(stats.auxiliary_failures, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.transport_errors, 0);
    }
}
