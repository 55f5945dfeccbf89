use super::Shutdown;
use crate::config::LoaderConfig;
use crate::model::StopLossOrder;
use crate::store::OrderStore;
use crate::utils::{FeedMetrics, SharedMetrics, unix_seconds_after};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Turns an order into the member stored in the sorted set
pub type OrderEncoder = Box<dyn Fn(&StopLossOrder) -> crate::Result<String> + Send + Sync>;

/// Outcome of one bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Orders the load was asked to create
    pub requested: usize,

    /// Orders accepted by the store
    pub inserted: usize,

    /// Orders skipped because they could not be encoded
    pub serialize_failures: usize,

    /// Orders skipped because the store rejected them
    pub insert_failures: usize,

    /// Load stopped early on shutdown
    pub cancelled: bool,

    /// Inserted totals at which progress was reported
    pub progress: Vec<usize>,
}

impl LoadReport {
    fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Default::default()
        }
    }

    /// Orders that were generated but did not make it into the store
    pub fn failed(&self) -> usize {
        self.serialize_failures + self.insert_failures
    }

    /// Every requested order was attempted
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.inserted + self.failed() == self.requested
    }
}

/// Orders encoded and waiting for the next store request
struct PendingBatch {
    ids: Vec<u64>,
    entries: Vec<(f64, String)>,
}

impl PendingBatch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, id: u64, score: f64, member: String) {
        self.ids.push(id);
        self.entries.push((score, member));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bulk loader for the stop-loss order set
///
/// Generates orders `1..=order_count` with random symbols and trigger
/// prices and writes each one into the sorted set, scored by trigger
/// price. The load is best effort: an order that fails to encode or is
/// rejected by the store is logged and skipped. Losing the connection to
/// the store ends the load with an error.
pub struct BulkLoader<S> {
    store: Arc<S>,
    config: LoaderConfig,
    rng: StdRng,
    encoder: OrderEncoder,
    metrics: SharedMetrics,
}

impl<S: OrderStore> BulkLoader<S> {
    /// Create a new loader
    pub fn new(store: Arc<S>, config: LoaderConfig) -> crate::Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            store,
            config,
            rng,
            encoder: Box::new(|order| order.to_json()),
            metrics: FeedMetrics::shared(),
        })
    }

    /// Record into an existing metrics handle
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the JSON encoder
    pub fn with_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(&StopLossOrder) -> crate::Result<String> + Send + Sync + 'static,
    {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Generate order `id` expiring at `expiry`
    pub fn generate_order(&mut self, id: u64, expiry: i64) -> StopLossOrder {
        let symbols = &self.config.symbols;
        let symbol = &symbols[self.rng.gen_range(0..symbols.len())];
        let trigger_price = self.config.price_range.sample(&mut self.rng);

        StopLossOrder::new(id, symbol.as_str(), trigger_price, expiry)
    }

    /// Run the load
    ///
    /// Shutdown is checked between store requests, so at most one batch is
    /// still written after it is triggered.
    pub async fn preload(&mut self, shutdown: &Shutdown) -> crate::Result<LoadReport> {
        let count = self.config.order_count;
        let batch_size = self.config.batch_size;
        let horizon = self.config.expiry_horizon();

        info!(
            "Preloading {} orders into {} (batch size {})...",
            count, self.config.order_set_key, batch_size
        );

        let mut report = LoadReport::new(count);
        let mut batch = PendingBatch::with_capacity(batch_size);

        for id in 1..=count as u64 {
            if batch.is_empty() && shutdown.is_triggered() {
                warn!(
                    "Preload cancelled after {} of {} orders",
                    id - 1,
                    count
                );
                report.cancelled = true;
                break;
            }

            let order = self.generate_order(id, unix_seconds_after(horizon));
            match (self.encoder)(&order) {
                Ok(member) => batch.push(id, order.trigger_price, member),
                Err(e) => {
                    error!("Failed to marshal order {}: {}", id, e);
                    report.serialize_failures += 1;
                    self.metrics.write().record_orders_failed(1);
                }
            }

            if batch.len() >= batch_size {
                self.flush(&mut batch, &mut report).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut report).await?;
        }

        info!(
            "Order preloading complete: {} inserted, {} failed",
            report.inserted,
            report.failed()
        );

        Ok(report)
    }

    /// Write the pending batch and account for the outcome
    async fn flush(
        &self,
        batch: &mut PendingBatch,
        report: &mut LoadReport,
    ) -> crate::Result<()> {
        let ids = std::mem::take(&mut batch.ids);
        let entries = std::mem::take(&mut batch.entries);
        let n = entries.len();

        let store = &self.store;
        let key = self.config.order_set_key.as_str();
        let retry = &self.config.retry;

        let result = if n == 1 {
            let (score, member) = entries
                .into_iter()
                .next()
                .unwrap_or_default();
            retry
                .run("order insert", move || store.insert(key, score, member.clone()))
                .await
        } else {
            retry
                .run("order batch insert", move || {
                    store.insert_batch(key, entries.clone())
                })
                .await
        };

        match result {
            Ok(()) => {
                let before = report.inserted;
                report.inserted += n;
                self.metrics.write().record_orders_inserted(n);

                // One report per flush, however many multiples it crossed
                let every = self.config.progress_every;
                if report.inserted / every > before / every {
                    info!("Loaded {} orders...", report.inserted);
                    report.progress.push(report.inserted);
                }
                Ok(())
            }
            Err(e) => {
                report.insert_failures += n;
                self.metrics.write().record_orders_failed(n);

                match ids.as_slice() {
                    [id] => error!("Failed to add order {} to store: {}", id, e),
                    [first, .., last] => error!(
                        "Failed to add orders {}..={} ({} orders) to store: {}",
                        first, last, n, e
                    ),
                    [] => {}
                }

                if e.is_transient() {
                    error!(
                        "Store connection lost, aborting preload ({} inserted so far)",
                        report.inserted
                    );
                    return Err(e);
                }

                Ok(())
            }
        }
    }
}
