// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metrics collection for parking operations.
//!
//! In-process counters and latency histograms, printed on request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::parking::Money;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Timing per named operation (`parking.enter`, `store.json.save`, ...).
    operations: RwLock<BTreeMap<String, OperationMetrics>>,

    counters: ParkingCounters,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(BTreeMap::new()),
            counters: ParkingCounters::default(),
            start_time: Instant::now(),
        }
    }

    /// Record how long an operation took.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        let mut ops = self.operations.write().unwrap_or_else(PoisonError::into_inner);
        ops.entry(name.to_string()).or_default().record(duration);
    }

    pub fn record_entry(&self) {
        self.counters.entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exit(&self, payment: Money) {
        self.counters.exits.fetch_add(1, Ordering::Relaxed);
        self.counters
            .revenue_cents
            .fetch_add(payment.cents(), Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.counters.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: self
                .operations
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            entries: self.counters.entries.load(Ordering::Relaxed),
            exits: self.counters.exits.load(Ordering::Relaxed),
            rejections: self.counters.rejections.load(Ordering::Relaxed),
            revenue: Money::from_cents(self.counters.revenue_cents.load(Ordering::Relaxed)),
            uptime: self.uptime(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.counters.reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct ParkingCounters {
    entries: AtomicU64,
    exits: AtomicU64,
    rejections: AtomicU64,
    revenue_cents: AtomicI64,
}

impl ParkingCounters {
    fn reset(&self) {
        self.entries.store(0, Ordering::Relaxed);
        self.exits.store(0, Ordering::Relaxed);
        self.rejections.store(0, Ordering::Relaxed);
        self.revenue_cents.store(0, Ordering::Relaxed);
    }
}

/// Timing for one kind of operation.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-bucket latency histogram.
///
/// Buckets are upper bounds in microseconds; the last slot counts overflow.
#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_buckets(buckets: Vec<u64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self { buckets, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let idx = self
            .buckets
            .iter()
            .position(|&b| micros <= b)
            .unwrap_or(self.buckets.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Upper bound of the bucket holding the `p`th percentile.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let micros = match self.buckets.get(i) {
                    Some(&bound) => bound,
                    None => self.buckets.last().copied().unwrap_or(0) * 10,
                };
                return Duration::from_micros(micros);
            }
        }
        Duration::ZERO
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // 100us, 1ms, 10ms, 100ms, 1s
        Self::with_buckets(vec![100, 1_000, 10_000, 100_000, 1_000_000])
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub operations: BTreeMap<String, OperationMetrics>,
    pub entries: u64,
    pub exits: u64,
    pub rejections: u64,
    pub revenue: Money,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Metrics Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Entries: {}, exits: {}, rejected: {}, revenue: {}\n",
            self.entries, self.exits, self.rejections, self.revenue
        ));

        if !self.operations.is_empty() {
            report.push_str("\nOperation Metrics:\n");
            for (name, metrics) in &self.operations {
                report.push_str(&format!(
                    "  {}: {} ops, avg {:.2?}, p99 {:.2?}\n",
                    name,
                    metrics.count,
                    metrics.avg_duration(),
                    metrics.histogram.p99()
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_metrics() {
        let mut metrics = OperationMetrics::new();
        metrics.record(Duration::from_micros(50));
        metrics.record(Duration::from_millis(5));

        assert_eq!(metrics.count, 2);
        assert_eq!(metrics.min_duration, Duration::from_micros(50));
        assert_eq!(metrics.max_duration, Duration::from_millis(5));
    }

    #[test]
    fn test_histogram_buckets() {
        let mut hist = Histogram::default();
        hist.record(Duration::from_micros(50));
        hist.record(Duration::from_micros(500));
        hist.record(Duration::from_secs(5));

        assert_eq!(hist.counts(), &[1, 1, 0, 0, 0, 1]);
        assert_eq!(hist.percentile(10.0), Duration::from_micros(100));
        assert_eq!(hist.p99(), Duration::from_secs(10));
    }

    #[test]
    fn test_counters_and_snapshot() {
        let metrics = Metrics::new();
        metrics.record_entry();
        metrics.record_entry();
        metrics.record_exit(Money::from_cents(1000));
        metrics.record_rejection();
        metrics.record_operation("parking.enter", Duration::from_micros(20));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.entries, 2);
        assert_eq!(snapshot.exits, 1);
        assert_eq!(snapshot.rejections, 1);
        assert_eq!(snapshot.revenue, Money::from_cents(1000));
        assert!(metrics.operation_metrics("parking.enter").is_some());

        let report = snapshot.format_report();
        assert!(report.contains("revenue: $10.00"));
        assert!(report.contains("parking.enter"));

        metrics.reset();
        assert_eq!(metrics.snapshot().entries, 0);
        assert!(metrics.operation_metrics("parking.enter").is_none());
    }
}
