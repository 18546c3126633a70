//! Lock-free counters for requests, latency, bytes, reconnects, and events.

use std::sync::atomic::{AtomicU64, Ordering};

const LATENCY_MIN_SENTINEL: u64 = u64::MAX;

pub struct Metrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_failed: AtomicU64,
    events_processed: AtomicU64,
    bytes_received: AtomicU64,
    ws_reconnects: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics {
            requests_total: AtomicU64::new(0),
            requests_success: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            ws_reconnects: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(LATENCY_MIN_SENTINEL),
            latency_max_us: AtomicU64::new(0),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool, latency_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.requests_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);

        let mut current_min = self.latency_min_us.load(Ordering::Relaxed);
        while latency_us < current_min {
            match self.latency_min_us.compare_exchange_weak(
                current_min,
                latency_us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current_min = observed,
            }
        }

        let mut current_max = self.latency_max_us.load(Ordering::Relaxed);
        while latency_us > current_max {
            match self.latency_max_us.compare_exchange_weak(
                current_max,
                latency_us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current_max = observed,
            }
        }
    }

    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ws_reconnect(&self) {
        self.ws_reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_us(&self) -> u64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0;
        }
        self.latency_sum_us.load(Ordering::Relaxed) / count
    }

    pub fn min_latency_us(&self) -> u64 {
        let min = self.latency_min_us.load(Ordering::Relaxed);
        if min == LATENCY_MIN_SENTINEL {
            0
        } else {
            min
        }
    }

    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn requests_success(&self) -> u64 {
        self.requests_success.load(Ordering::Relaxed)
    }

    pub fn requests_failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn ws_reconnects(&self) -> u64 {
        self.ws_reconnects.load(Ordering::Relaxed)
    }

    /// Emits the full summary at `info` level; called every 60s by the
    /// supervising loop.
    pub fn log_summary(&self) {
        let total = self.requests_total();
        let success = self.requests_success();
        let failed = self.requests_failed();
        let success_rate = if total > 0 {
            success as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let bytes_kb = self.bytes_received() as f64 / 1024.0;

        tracing::info!(
            requests_total = total,
            requests_success = success,
            requests_failed = failed,
            success_rate_pct = success_rate,
            latency_avg_us = self.avg_latency_us(),
            latency_min_us = self.min_latency_us(),
            latency_max_us = self.max_latency_us(),
            events_processed = self.events_processed(),
            bytes_received_kb = bytes_kb,
            ws_reconnects = self.ws_reconnects(),
            "metrics summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_add_up_at_quiescence() {
        let m = Metrics::new();
        m.record_request(true, 100);
        m.record_request(false, 200);
        m.record_request(true, 50);
        assert_eq!(m.requests_total(), m.requests_success() + m.requests_failed());
        assert_eq!(m.requests_total(), 3);
    }

    #[test]
    fn min_sentinel_suppressed_before_any_request() {
        let m = Metrics::new();
        assert_eq!(m.min_latency_us(), 0);
        assert_eq!(m.avg_latency_us(), 0);
    }

    #[test]
    fn min_and_max_track_extremes() {
        let m = Metrics::new();
        m.record_request(true, 500);
        m.record_request(true, 10);
        m.record_request(true, 9000);
        assert_eq!(m.min_latency_us(), 10);
        assert_eq!(m.max_latency_us(), 9000);
        assert_eq!(m.avg_latency_us(), (500 + 10 + 9000) / 3);
    }
}
