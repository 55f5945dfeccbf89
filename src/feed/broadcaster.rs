use super::Shutdown;
use crate::config::BroadcastConfig;
use crate::model::TickEvent;
use crate::store::TickPublisher;
use crate::utils::{FeedMetrics, SharedMetrics, unix_seconds};
use log::{debug, error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{self, MissedTickBehavior};

/// Counters for one broadcaster run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Completed cycles
    pub cycles: u64,

    /// Ticks accepted by the store
    pub published: u64,

    /// Ticks lost to encode or publish errors
    pub dropped: u64,
}

impl BroadcastStats {
    /// Publish attempts (one per symbol per cycle)
    pub fn attempts(&self) -> u64 {
        self.published + self.dropped
    }
}

/// Fixed-cadence synthetic tick publisher
///
/// Every interval it emits one tick per tracked symbol, in configured
/// order, with a uniformly random price. A failed publish drops that tick
/// and the loop carries on.
pub struct TickBroadcaster<P> {
    publisher: Arc<P>,
    config: BroadcastConfig,
    rng: StdRng,
    metrics: SharedMetrics,
}

impl<P: TickPublisher> TickBroadcaster<P> {
    /// Create a new broadcaster
    pub fn new(publisher: Arc<P>, config: BroadcastConfig) -> crate::Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            publisher,
            config,
            rng,
            metrics: FeedMetrics::shared(),
        })
    }

    /// Record into an existing metrics handle
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Generate a tick for `symbol` stamped with the current time
    pub fn generate_tick(&mut self, symbol: &str) -> TickEvent {
        let price = self.config.price_range.sample(&mut self.rng);
        TickEvent::new(symbol, price, unix_seconds())
    }

    /// Publish one tick per symbol, in configured order
    pub async fn cycle(&mut self, stats: &mut BroadcastStats) {
        for i in 0..self.config.symbols.len() {
            let symbol = self.config.symbols[i].clone();
            let tick = self.generate_tick(&symbol);

            let payload = match tick.to_json() {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to marshal tick event: {}", e);
                    stats.dropped += 1;
                    self.metrics.write().record_tick_dropped();
                    continue;
                }
            };

            let started = Instant::now();
            match self.publisher.publish(&self.config.channel, payload).await {
                Ok(receivers) => {
                    stats.published += 1;
                    self.metrics
                        .write()
                        .record_publish(started.elapsed().as_nanos() as u64);
                    debug!("Published {} to {} subscriber(s)", tick, receivers);
                }
                Err(e) => {
                    error!("Failed to publish tick event for {}: {}", tick.symbol, e);
                    stats.dropped += 1;
                    self.metrics.write().record_tick_dropped();
                }
            }
        }

        stats.cycles += 1;
        self.metrics.write().record_cycle();
    }

    /// Broadcast until shutdown is triggered
    pub async fn run(&mut self, shutdown: &Shutdown) -> BroadcastStats {
        self.run_until(None, shutdown).await
    }

    /// Broadcast exactly `cycles` cycles, or fewer if shutdown comes first
    pub async fn run_cycles(&mut self, cycles: u64, shutdown: &Shutdown) -> BroadcastStats {
        self.run_until(Some(cycles), shutdown).await
    }

    async fn run_until(&mut self, limit: Option<u64>, shutdown: &Shutdown) -> BroadcastStats {
        let period = self.config.interval();
        let mut stats = BroadcastStats::default();

        // First cycle fires one period from now, not immediately
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Broadcasting ticks for {} symbol(s) every {:?} on {}",
            self.config.symbols.len(),
            period,
            self.config.channel
        );

        loop {
            if limit.is_some_and(|max| stats.cycles >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("Tick broadcaster stopping after {} cycles", stats.cycles);
                    break;
                }
                _ = ticker.tick() => self.cycle(&mut stats).await,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records every publish and fails the ones listed in `fail_on`
    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, TickEvent)>>,
        fail_on: Vec<usize>,
    }

    impl TickPublisher for RecordingPublisher {
        async fn publish(&self, channel: &str, payload: String) -> crate::Result<usize> {
            let mut sent = self.sent.lock();
            let attempt = sent.len();
            sent.push((channel.to_string(), TickEvent::from_json(&payload)?));

            if self.fail_on.contains(&attempt) {
                return Err(Error::Store("injected".to_string()));
            }
            Ok(1)
        }
    }

    fn broadcaster(
        publisher: &Arc<RecordingPublisher>,
        symbols: &[&str],
    ) -> TickBroadcaster<RecordingPublisher> {
        let config = BroadcastConfig {
            seed: Some(9),
            ..BroadcastConfig::simple(symbols)
        };
        TickBroadcaster::new(Arc::clone(publisher), config).unwrap()
    }

    fn symbols(publisher: &RecordingPublisher) -> Vec<String> {
        publisher
            .sent
            .lock()
            .iter()
            .map(|(_, tick)| tick.symbol.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_cycles_two_symbols() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut b = broadcaster(&publisher, &["AAPL", "GOOG"]);

        let stats = b.run_cycles(3, &Shutdown::new()).await;

        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.published, 6);
        assert_eq!(
            symbols(&publisher),
            vec!["AAPL", "GOOG", "AAPL", "GOOG", "AAPL", "GOOG"]
        );
        assert!(
            publisher
                .sent
                .lock()
                .iter()
                .all(|(channel, tick)| channel == "tick_events"
                    && (50.0..150.0).contains(&tick.price))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_drops_single_tick() {
        let publisher = Arc::new(RecordingPublisher {
            fail_on: vec![1],
            ..Default::default()
        });
        let mut b = broadcaster(&publisher, &["AAPL", "GOOG", "TSLA"]);

        let stats = b.run_cycles(2, &Shutdown::new()).await;

        assert_eq!(stats.attempts(), 6);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.published, 5);
        assert_eq!(publisher.sent.lock().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut b = broadcaster(&publisher, &["AAPL"]);

        let start = time::Instant::now();
        b.run_cycles(5, &Shutdown::new()).await;

        // First cycle waits one full period
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut b = broadcaster(&publisher, &["AAPL", "GOOG"]);
        let shutdown = Shutdown::new();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(35)).await;
            trigger.trigger();
        });

        let stats = b.run(&shutdown).await;

        assert_eq!(stats.cycles, 3);
        assert_eq!(publisher.sent.lock().len(), 6);
    }

    #[tokio::test]
    async fn test_already_stopped() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut b = broadcaster(&publisher, &["AAPL"]);
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let stats = b.run(&shutdown).await;

        assert_eq!(stats, BroadcastStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_publishes_generated_ticks() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut b = broadcaster(&publisher, &["AAPL", "GOOG"]);
        let mut twin = broadcaster(&Arc::new(RecordingPublisher::default()), &["AAPL", "GOOG"]);

        b.run_cycles(2, &Shutdown::new()).await;

        let expected: Vec<(String, f64)> = ["AAPL", "GOOG", "AAPL", "GOOG"]
            .iter()
            .map(|symbol| {
                let tick = twin.generate_tick(symbol);
                (tick.symbol, tick.price)
            })
            .collect();
        let sent: Vec<(String, f64)> = publisher
            .sent
            .lock()
            .iter()
            .map(|(_, tick)| (tick.symbol.clone(), tick.price))
            .collect();

        assert_eq!(sent, expected);
    }

    #[test]
    fn test_generated_tick_price_in_range() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut b = broadcaster(&publisher, &["AAPL"]);

        for _ in 0..1_000 {
            let tick = b.generate_tick("AAPL");
            assert!((50.0..150.0).contains(&tick.price));
        }
    }
}
