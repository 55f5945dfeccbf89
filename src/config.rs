//! Feed configuration

use crate::model::PriceRange;
use crate::store::{ORDER_SET_KEY, StoreConfig, TICK_CHANNEL};
use crate::utils::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Instruments tracked by default
pub const DEFAULT_SYMBOLS: [&str; 5] = ["AAPL", "GOOG", "TSLA", "AMZN", "MSFT"];

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn to_symbols(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

fn validate_symbols(symbols: &[String]) -> crate::Result<()> {
    if symbols.is_empty() {
        return Err(crate::Error::Config(
            "At least one symbol is required".to_string(),
        ));
    }

    if symbols.iter().any(|s| s.trim().is_empty()) {
        return Err(crate::Error::Config("Symbols must not be blank".to_string()));
    }

    Ok(())
}

/// Bulk loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Orders to generate (ids `1..=order_count`)
    pub order_count: usize,

    /// Symbols drawn uniformly per order
    pub symbols: Vec<String>,

    /// Trigger price range
    pub price_range: PriceRange,

    /// Order expiry, relative to generation time (seconds)
    pub expiry_horizon_secs: u64,

    /// Log progress every N inserted orders
    pub progress_every: usize,

    /// Orders per store request; 1 inserts one at a time
    pub batch_size: usize,

    /// Retry policy for transient store failures
    pub retry: RetryPolicy,

    /// Sorted set receiving the orders
    pub order_set_key: String,

    /// RNG seed for reproducible loads
    pub seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            order_count: 1_000_000,
            symbols: default_symbols(),
            price_range: PriceRange::default(),
            expiry_horizon_secs: 5 * 60,
            progress_every: 10_000,
            batch_size: 1,
            retry: RetryPolicy::none(),
            order_set_key: ORDER_SET_KEY.to_string(),
            seed: None,
        }
    }
}

impl LoaderConfig {
    /// Create a simple configuration
    pub fn simple(order_count: usize, symbols: &[&str]) -> Self {
        Self {
            order_count,
            symbols: to_symbols(symbols),
            ..Default::default()
        }
    }

    pub fn expiry_horizon(&self) -> Duration {
        Duration::from_secs(self.expiry_horizon_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        validate_symbols(&self.symbols)?;
        self.price_range.validate()?;
        self.retry.validate()?;

        if self.progress_every == 0 {
            return Err(crate::Error::Config(
                "Progress interval must be positive".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(crate::Error::Config(
                "Batch size must be positive".to_string(),
            ));
        }

        if self.order_set_key.is_empty() {
            return Err(crate::Error::Config(
                "Order set key must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Tick broadcaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Tracked symbols, published in this order every cycle
    pub symbols: Vec<String>,

    /// Tick price range
    pub price_range: PriceRange,

    /// Cycle cadence (milliseconds)
    pub interval_ms: u64,

    /// Pub/sub channel
    pub channel: String,

    /// RNG seed for reproducible prices
    pub seed: Option<u64>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            price_range: PriceRange::default(),
            interval_ms: 10,
            channel: TICK_CHANNEL.to_string(),
            seed: None,
        }
    }
}

impl BroadcastConfig {
    /// Create a simple configuration
    pub fn simple(symbols: &[&str]) -> Self {
        Self {
            symbols: to_symbols(symbols),
            ..Default::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        validate_symbols(&self.symbols)?;
        self.price_range.validate()?;

        if self.interval_ms == 0 {
            return Err(crate::Error::Config(
                "Broadcast interval must be positive".to_string(),
            ));
        }

        if self.channel.is_empty() {
            return Err(crate::Error::Config(
                "Channel name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Complete feed configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub store: StoreConfig,
    pub loader: LoaderConfig,
    pub broadcast: BroadcastConfig,
}

impl FeedConfig {
    /// Build from process arguments
    ///
    /// The first argument is the program name; the optional second one
    /// overrides the store address. Anything after it is ignored.
    pub fn from_args<I>(args: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();

        if let Some(addr) = args.into_iter().nth(1) {
            config.store = StoreConfig::with_addr(addr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        self.store.validate()?;
        self.loader.validate()?;
        self.broadcast.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = FeedConfig::default();

        assert_eq!(config.store.addr, "localhost:6379");
        assert_eq!(config.loader.order_count, 1_000_000);
        assert_eq!(config.loader.expiry_horizon(), Duration::from_secs(300));
        assert_eq!(config.loader.progress_every, 10_000);
        assert_eq!(config.loader.order_set_key, "orderset");
        assert_eq!(config.broadcast.interval(), Duration::from_millis(10));
        assert_eq!(config.broadcast.channel, "tick_events");
        assert_eq!(config.broadcast.symbols, DEFAULT_SYMBOLS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args_without_override() {
        let config = FeedConfig::from_args(args(&["stoploss-feed"])).unwrap();
        assert_eq!(config.store.addr, "localhost:6379");
    }

    #[test]
    fn test_from_args_with_address() {
        let config = FeedConfig::from_args(args(&["stoploss-feed", "redis-1:6390"])).unwrap();
        assert_eq!(config.store.addr, "redis-1:6390");
        assert_eq!(config.store.db, 0);
    }

    #[test]
    fn test_from_args_rejects_bad_address() {
        assert!(FeedConfig::from_args(args(&["stoploss-feed", "redis-1"])).is_err());
    }

    #[test]
    fn test_loader_validation() {
        assert!(LoaderConfig::simple(10, &[]).validate().is_err());
        assert!(LoaderConfig::simple(10, &["AAPL", " "]).validate().is_err());

        let config = LoaderConfig {
            batch_size: 0,
            ..LoaderConfig::simple(10, &["AAPL"])
        };
        assert!(config.validate().is_err());

        let config = LoaderConfig {
            progress_every: 0,
            ..LoaderConfig::simple(10, &["AAPL"])
        };
        assert!(config.validate().is_err());

        // An empty load is allowed
        assert!(LoaderConfig::simple(0, &["AAPL"]).validate().is_ok());
    }

    #[test]
    fn test_broadcast_validation() {
        let config = BroadcastConfig {
            interval_ms: 0,
            ..BroadcastConfig::simple(&["AAPL"])
        };
        assert!(config.validate().is_err());

        let config = BroadcastConfig {
            price_range: PriceRange::new(10.0, 5.0),
            ..BroadcastConfig::simple(&["AAPL"])
        };
        assert!(config.validate().is_err());
    }
}
