use super::{BroadcastStats, BulkLoader, LoadReport, Shutdown, TickBroadcaster};
use crate::config::FeedConfig;
use crate::index::OrderIndex;
use crate::store::{OrderStore, TickPublisher};
use crate::utils::{FeedMetrics, SharedMetrics};
use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a feed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// Order set is being filled; it is not complete yet
    Loading,
    /// Load finished; ticks are flowing
    Broadcasting,
    /// Run ended (shutdown, cancelled load or fatal store error)
    Stopped,
}

impl fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedPhase::Loading => "LOADING",
            FeedPhase::Broadcasting => "BROADCASTING",
            FeedPhase::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Two-phase feed: bulk load the order set, then broadcast ticks
///
/// The store handle is shared by both phases. Consumers that need a
/// complete order set should wait for [`FeedPhase::Broadcasting`] on
/// [`FeedSimulator::phase`] before querying [`FeedSimulator::index`].
pub struct FeedSimulator<S> {
    store: Arc<S>,
    config: FeedConfig,
    metrics: SharedMetrics,
    phase: watch::Sender<FeedPhase>,
}

impl<S: OrderStore + TickPublisher> FeedSimulator<S> {
    /// Create a new simulator
    pub fn new(store: Arc<S>, config: FeedConfig) -> crate::Result<Self> {
        config.validate()?;

        let (phase, _) = watch::channel(FeedPhase::Loading);

        Ok(Self {
            store,
            config,
            metrics: FeedMetrics::shared(),
            phase,
        })
    }

    /// Watch phase transitions
    pub fn phase(&self) -> watch::Receiver<FeedPhase> {
        self.phase.subscribe()
    }

    pub fn current_phase(&self) -> FeedPhase {
        *self.phase.borrow()
    }

    pub fn metrics(&self) -> SharedMetrics {
        Arc::clone(&self.metrics)
    }

    /// Read view over the order set this feed loads
    pub fn index(&self) -> OrderIndex<S> {
        OrderIndex::new(
            Arc::clone(&self.store),
            self.config.loader.order_set_key.as_str(),
        )
    }

    /// Run both phases until shutdown
    ///
    /// Returns the load report and the broadcast counters. A lost store
    /// connection during the load is returned as an error.
    pub async fn run(&self, shutdown: &Shutdown) -> crate::Result<(LoadReport, BroadcastStats)> {
        self.set_phase(FeedPhase::Loading);

        let mut loader = BulkLoader::new(Arc::clone(&self.store), self.config.loader.clone())?
            .with_metrics(self.metrics());

        let report = match loader.preload(shutdown).await {
            Ok(report) => report,
            Err(e) => {
                self.set_phase(FeedPhase::Stopped);
                return Err(e);
            }
        };

        if report.cancelled {
            warn!("Shutdown during preload, skipping broadcast");
            self.set_phase(FeedPhase::Stopped);
            return Ok((report, BroadcastStats::default()));
        }

        let mut broadcaster =
            TickBroadcaster::new(Arc::clone(&self.store), self.config.broadcast.clone())?
                .with_metrics(self.metrics());

        self.set_phase(FeedPhase::Broadcasting);
        let stats = broadcaster.run(shutdown).await;
        self.set_phase(FeedPhase::Stopped);

        Ok((report, stats))
    }

    fn set_phase(&self, phase: FeedPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            info!("Feed phase {} -> {}", previous, phase);
        }
    }
}
