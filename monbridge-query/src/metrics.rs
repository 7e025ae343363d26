//! Metrics collection and reporting for the query service

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Thread-safe metrics collector for query service
#[derive(Debug)]
pub struct QueryMetricsCollector {
    /// Total query requests handled
    pub requests_total: AtomicU64,

    /// Total failed requests
    pub errors_total: AtomicU64,

    /// Concrete queries produced by normalization
    pub expanded_queries_total: AtomicU64,

    /// Total frames returned
    pub frames_returned_total: AtomicU64,

    /// Validity checks answered from the cache
    pub validity_cache_hits_total: AtomicU64,

    /// Validity checks that had to ask the server
    pub validity_checks_total: AtomicU64,

    /// Total request execution time
    pub query_time_total_ms: AtomicU64,

    /// Slow requests (above threshold)
    pub slow_queries_total: AtomicU64,

    /// Service start time
    start_time: Instant,
}

impl Default for QueryMetricsCollector {
    fn default() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            expanded_queries_total: AtomicU64::new(0),
            frames_returned_total: AtomicU64::new(0),
            validity_cache_hits_total: AtomicU64::new(0),
            validity_checks_total: AtomicU64::new(0),
            query_time_total_ms: AtomicU64::new(0),
            slow_queries_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl QueryMetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request
    pub fn record_query(
        &self,
        duration: Duration,
        expanded_queries: usize,
        frames_returned: usize,
        slow_query_threshold_ms: u64,
    ) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.expanded_queries_total
            .fetch_add(expanded_queries as u64, Ordering::Relaxed);
        self.frames_returned_total
            .fetch_add(frames_returned as u64, Ordering::Relaxed);

        let duration_ms = duration.as_millis() as u64;
        self.query_time_total_ms
            .fetch_add(duration_ms, Ordering::Relaxed);

        if duration_ms > slow_query_threshold_ms {
            self.slow_queries_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a failed request
    pub fn record_error(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a validity check, `cached` when no server round trip was needed
    pub fn record_validity_check(&self, cached: bool) {
        if cached {
            self.validity_cache_hits_total
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.validity_checks_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> QueryMetricsSnapshot {
        let uptime = self.start_time.elapsed();
        let requests = self.requests_total.load(Ordering::Relaxed);
        let errors = self.errors_total.load(Ordering::Relaxed);
        let total_time = self.query_time_total_ms.load(Ordering::Relaxed);
        let successful = requests.saturating_sub(errors);

        QueryMetricsSnapshot {
            requests_total: requests,
            errors_total: errors,
            expanded_queries_total: self.expanded_queries_total.load(Ordering::Relaxed),
            frames_returned_total: self.frames_returned_total.load(Ordering::Relaxed),
            validity_cache_hits_total: self.validity_cache_hits_total.load(Ordering::Relaxed),
            validity_checks_total: self.validity_checks_total.load(Ordering::Relaxed),
            query_time_total_ms: total_time,
            slow_queries_total: self.slow_queries_total.load(Ordering::Relaxed),
            uptime_seconds: uptime.as_secs(),
            avg_query_time_ms: if successful > 0 {
                total_time as f64 / successful as f64
            } else {
                0.0
            },
        }
    }

    /// Generate Prometheus format metrics
    pub fn prometheus_format(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            "# HELP monbridge_query_requests_total Total number of query requests handled\n\
             # TYPE monbridge_query_requests_total counter\n\
             monbridge_query_requests_total {}\n\
             \n\
             # HELP monbridge_query_errors_total Total number of failed query requests\n\
             # TYPE monbridge_query_errors_total counter\n\
             monbridge_query_errors_total {}\n\
             \n\
             # HELP monbridge_query_expanded_queries_total Total number of concrete queries after normalization\n\
             # TYPE monbridge_query_expanded_queries_total counter\n\
             monbridge_query_expanded_queries_total {}\n\
             \n\
             # HELP monbridge_query_frames_returned_total Total number of frames returned\n\
             # TYPE monbridge_query_frames_returned_total counter\n\
             monbridge_query_frames_returned_total {}\n\
             \n\
             # HELP monbridge_validity_cache_hits_total Validity checks answered from cache\n\
             # TYPE monbridge_validity_cache_hits_total counter\n\
             monbridge_validity_cache_hits_total {}\n\
             \n\
             # HELP monbridge_validity_checks_total Validity checks sent to the monitoring server\n\
             # TYPE monbridge_validity_checks_total counter\n\
             monbridge_validity_checks_total {}\n\
             \n\
             # HELP monbridge_query_time_total_ms Total query execution time in milliseconds\n\
             # TYPE monbridge_query_time_total_ms counter\n\
             monbridge_query_time_total_ms {}\n\
             \n\
             # HELP monbridge_query_slow_queries_total Total number of slow query requests\n\
             # TYPE monbridge_query_slow_queries_total counter\n\
             monbridge_query_slow_queries_total {}\n\
             \n\
             # HELP monbridge_query_uptime_seconds Service uptime in seconds\n\
             # TYPE monbridge_query_uptime_seconds gauge\n\
             monbridge_query_uptime_seconds {}\n\
             \n\
             # HELP monbridge_query_avg_time_ms Average query execution time in milliseconds\n\
             # TYPE monbridge_query_avg_time_ms gauge\n\
             monbridge_query_avg_time_ms {}\n",
            snapshot.requests_total,
            snapshot.errors_total,
            snapshot.expanded_queries_total,
            snapshot.frames_returned_total,
            snapshot.validity_cache_hits_total,
            snapshot.validity_checks_total,
            snapshot.query_time_total_ms,
            snapshot.slow_queries_total,
            snapshot.uptime_seconds,
            snapshot.avg_query_time_ms
        )
    }
}

/// Snapshot of query metrics at a point in time
#[derive(Debug, Clone)]
pub struct QueryMetricsSnapshot {
    pub requests_total: u64,
    pub errors_total: u64,
    pub expanded_queries_total: u64,
    pub frames_returned_total: u64,
    pub validity_cache_hits_total: u64,
    pub validity_checks_total: u64,
    pub query_time_total_ms: u64,
    pub slow_queries_total: u64,
    pub uptime_seconds: u64,
    pub avg_query_time_ms: f64,
}

/// Helper for timing query operations
pub struct QueryTimer {
    start: Instant,
}

impl QueryTimer {
    /// Start a new query timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_query_metrics_collector() {
        let collector = QueryMetricsCollector::new();

        collector.record_query(Duration::from_millis(100), 3, 6, 500);
        collector.record_error();
        collector.record_validity_check(true);
        collector.record_validity_check(false);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.errors_total, 1);
        assert_eq!(snapshot.expanded_queries_total, 3);
        assert_eq!(snapshot.frames_returned_total, 6);
        assert_eq!(snapshot.validity_cache_hits_total, 1);
        assert_eq!(snapshot.validity_checks_total, 1);
        assert_eq!(snapshot.avg_query_time_ms, 100.0);
    }

    #[test]
    fn test_slow_query_counted() {
        let collector = QueryMetricsCollector::new();
        collector.record_query(Duration::from_millis(1500), 1, 1, 1000);
        collector.record_query(Duration::from_millis(10), 1, 1, 1000);

        assert_eq!(collector.snapshot().slow_queries_total, 1);
    }

    #[test]
    fn test_prometheus_format() {
        let collector = QueryMetricsCollector::new();
        collector.record_query(Duration::from_millis(250), 2, 5, 1000);

        let metrics = collector.prometheus_format();
        assert!(metrics.contains("monbridge_query_requests_total 1"));
        assert!(metrics.contains("monbridge_query_frames_returned_total 5"));
        assert!(metrics.contains("# HELP"));
        assert!(metrics.contains("# TYPE"));
    }

    #[test]
    fn test_query_timer() {
        let timer = QueryTimer::start();
        thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
    }
}
