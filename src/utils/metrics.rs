//! Feed metrics collection

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metrics handle shared by the loader and the broadcaster
pub type SharedMetrics = Arc<RwLock<FeedMetrics>>;

/// Counters and publish latency for one feed process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedMetrics {
    /// Orders written to the order set
    orders_inserted: usize,

    /// Orders skipped (serialization or insert failure)
    orders_failed: usize,

    /// Ticks accepted by the store
    ticks_published: usize,

    /// Ticks lost to serialization or publish failure
    ticks_dropped: usize,

    /// Completed broadcast cycles
    cycles: usize,

    /// Sum of publish latencies (for average)
    total_publish_latency_ns: u64,

    min_publish_latency_ns: u64,

    max_publish_latency_ns: u64,

    /// Publish latency histogram (nanoseconds)
    latency_histogram: LatencyHistogram,
}

impl FeedMetrics {
    /// Create new metrics
    pub fn new() -> Self {
        Self {
            orders_inserted: 0,
            orders_failed: 0,
            ticks_published: 0,
            ticks_dropped: 0,
            cycles: 0,
            total_publish_latency_ns: 0,
            min_publish_latency_ns: u64::MAX,
            max_publish_latency_ns: 0,
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// Create a fresh shared handle
    pub fn shared() -> SharedMetrics {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn record_orders_inserted(&mut self, count: usize) {
        self.orders_inserted += count;
    }

    pub fn record_orders_failed(&mut self, count: usize) {
        self.orders_failed += count;
    }

    /// Record a successful publish and its round-trip latency
    pub fn record_publish(&mut self, latency_ns: u64) {
        self.ticks_published += 1;
        self.total_publish_latency_ns += latency_ns;
        self.min_publish_latency_ns = self.min_publish_latency_ns.min(latency_ns);
        self.max_publish_latency_ns = self.max_publish_latency_ns.max(latency_ns);
        self.latency_histogram.record(latency_ns);
    }

    pub fn record_tick_dropped(&mut self) {
        self.ticks_dropped += 1;
    }

    pub fn record_cycle(&mut self) {
        self.cycles += 1;
    }

    /// Get average publish latency (nanoseconds)
    pub fn avg_publish_latency_ns(&self) -> u64 {
        if self.ticks_published == 0 {
            0
        } else {
            self.total_publish_latency_ns / self.ticks_published as u64
        }
    }

    /// Get minimum publish latency (nanoseconds)
    pub fn min_publish_latency_ns(&self) -> u64 {
        if self.min_publish_latency_ns == u64::MAX {
            // No data recorded yet
            0
        } else {
            self.min_publish_latency_ns
        }
    }

    pub fn max_publish_latency_ns(&self) -> u64 {
        self.max_publish_latency_ns
    }

    pub fn orders_inserted(&self) -> usize {
        self.orders_inserted
    }

    pub fn orders_failed(&self) -> usize {
        self.orders_failed
    }

    pub fn ticks_published(&self) -> usize {
        self.ticks_published
    }

    pub fn ticks_dropped(&self) -> usize {
        self.ticks_dropped
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Get latency percentile
    pub fn latency_percentile(&self, percentile: f64) -> u64 {
        self.latency_histogram.percentile(percentile)
    }

    /// Reset metrics
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Get summary statistics
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            orders_inserted: self.orders_inserted,
            orders_failed: self.orders_failed,
            ticks_published: self.ticks_published,
            ticks_dropped: self.ticks_dropped,
            cycles: self.cycles,
            avg_latency_ns: self.avg_publish_latency_ns(),
            min_latency_ns: self.min_publish_latency_ns(),
            max_latency_ns: self.max_publish_latency_ns(),
            p50_latency_ns: self.latency_percentile(0.50),
            p99_latency_ns: self.latency_percentile(0.99),
        }
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics summary for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub orders_inserted: usize,
    pub orders_failed: usize,
    pub ticks_published: usize,
    pub ticks_dropped: usize,
    pub cycles: usize,
    pub avg_latency_ns: u64,
    pub min_latency_ns: u64,
    pub max_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p99_latency_ns: u64,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feed Metrics:")?;
        writeln!(f, "  Orders Inserted:  {}", self.orders_inserted)?;
        writeln!(f, "  Orders Failed:    {}", self.orders_failed)?;
        writeln!(f, "  Broadcast Cycles: {}", self.cycles)?;
        writeln!(f, "  Ticks Published:  {}", self.ticks_published)?;
        writeln!(f, "  Ticks Dropped:    {}", self.ticks_dropped)?;
        writeln!(f, "\nPublish Latency:")?;
        for (label, ns) in [
            ("Average", self.avg_latency_ns),
            ("Minimum", self.min_latency_ns),
            ("P50    ", self.p50_latency_ns),
            ("P99    ", self.p99_latency_ns),
            ("Maximum", self.max_latency_ns),
        ] {
            writeln!(f, "  {}:  {:.1} μs", label, ns as f64 / 1000.0)?;
        }
        Ok(())
    }
}

/// Latency histogram for percentile calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatencyHistogram {
    /// Buckets: [0-10μs, ..., 90-100μs, 100-200μs, ..., 1-2ms, ..., >10ms]
    buckets: Vec<usize>,
    bucket_boundaries: Vec<u64>,
}

impl LatencyHistogram {
    fn new() -> Self {
        let mut boundaries = vec![];

        // 0-100μs in 10μs increments
        for i in 1..=10 {
            boundaries.push(i * 10_000);
        }

        // 100μs-1ms in 100μs increments
        for i in 2..=10 {
            boundaries.push(i * 100_000);
        }

        // 1-10ms in 1ms increments
        for i in 2..=10 {
            boundaries.push(i * 1_000_000);
        }

        Self {
            buckets: vec![0; boundaries.len() + 1],
            bucket_boundaries: boundaries,
        }
    }

    fn record(&mut self, latency_ns: u64) {
        let bucket = self
            .bucket_boundaries
            .iter()
            .position(|&b| latency_ns < b)
            .unwrap_or(self.bucket_boundaries.len());

        self.buckets[bucket] += 1;
    }

    fn percentile(&self, p: f64) -> u64 {
        let total: usize = self.buckets.iter().sum();
        if total == 0 {
            return 0;
        }

        let target = ((total as f64 * p) as usize).max(1);
        let mut cumsum = 0;

        for (i, &count) in self.buckets.iter().enumerate() {
            cumsum += count;
            if cumsum >= target {
                return self.bucket_boundaries[i.min(self.bucket_boundaries.len() - 1)];
            }
        }

        0
    }
}
