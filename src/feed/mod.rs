//! Feed pipeline: bulk load, then broadcast
//!
//! [`BulkLoader`] fills the order set, [`TickBroadcaster`] publishes ticks,
//! and [`FeedSimulator`] runs the two phases in order and reports the
//! current [`FeedPhase`].

mod broadcaster;
mod loader;
mod simulator;

use std::sync::Arc;
use tokio::sync::watch;

pub use broadcaster::{BroadcastStats, TickBroadcaster};
pub use loader::{BulkLoader, LoadReport, OrderEncoder};
pub use simulator::{FeedPhase, FeedSimulator};

/// Cooperative shutdown signal
///
/// Clones share the same flag; triggering any clone stops every task
/// waiting on it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_shared() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();

        assert!(!shutdown.is_triggered());
        clone.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_triggered_wakes_waiter() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();

        let handle = tokio::spawn(async move { waiter.triggered().await });
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_triggered_after_the_fact() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        // Already set: resolves immediately
        shutdown.triggered().await;
    }
}
