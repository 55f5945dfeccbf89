//! # Stop-Loss Feed
//!
//! Data plane of a stop-loss order book feed.
//!
//! ## Features
//!
//! - Bulk loading of pending stop-loss orders into a sorted set keyed by trigger price
//! - Range queries over the loaded index (`orders_at_or_below`)
//! - Fixed-cadence synthetic tick broadcaster over pub/sub
//! - Redis and in-memory store backends
//! - Cooperative shutdown and a load-finished phase signal
//!
//! ## Quick Start
//!
//! ```
//! use stoploss_feed::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> stoploss_feed::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let config = LoaderConfig::simple(100, &["AAPL", "GOOG"]);
//!
//! let report = BulkLoader::new(Arc::clone(&store), config)?
//!     .preload(&Shutdown::new())
//!     .await?;
//! assert_eq!(report.inserted, 100);
//!
//! let index = OrderIndex::new(store, ORDER_SET_KEY);
//! let fired = index.orders_at_or_below(75.0).await?;
//! assert!(fired.iter().all(|o| o.trigger_price <= 75.0));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod feed;
pub mod index;
pub mod model;
pub mod store;
pub mod utils;

// Re-exports
pub use config::{BroadcastConfig, FeedConfig, LoaderConfig};
pub use feed::{
    BroadcastStats, BulkLoader, FeedPhase, FeedSimulator, LoadReport, Shutdown, TickBroadcaster,
};
pub use index::OrderIndex;
pub use model::{PriceRange, StopLossOrder, TickEvent};
pub use store::{
    MemoryStore, ORDER_SET_KEY, OrderStore, RedisStore, StoreConfig, TICK_CHANNEL, TickPublisher,
};
pub use utils::{FeedMetrics, RetryPolicy, SharedMetrics, unix_seconds};

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl Error {
    /// Whether retrying the same operation could succeed.
    ///
    /// Only connection-level failures qualify; a rejected command or a
    /// malformed payload fails the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            Error::Connection(err.to_string())
        } else {
            Error::Store(err.to_string())
        }
    }
}
