//! Ordered store backends
//!
//! The order index and the tick channel live in one backing store that
//! offers sorted sets (score-ordered members) and publish/subscribe.
//! [`RedisStore`] talks to a Redis server; [`MemoryStore`] keeps the same
//! semantics in process.

mod memory;
mod redis_store;

use serde::{Deserialize, Serialize};
use std::future::Future;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Sorted set holding the serialized stop-loss orders
pub const ORDER_SET_KEY: &str = "orderset";

/// Pub/sub channel carrying serialized ticks
pub const TICK_CHANNEL: &str = "tick_events";

/// Write and range-read access to score-ordered sets
pub trait OrderStore: Send + Sync {
    /// Add `member` with `score`, updating the score if the member exists
    fn insert(
        &self,
        key: &str,
        score: f64,
        member: String,
    ) -> impl Future<Output = crate::Result<()>> + Send;

    /// Add several members in one request
    ///
    /// A failed request inserts nothing.
    fn insert_batch(
        &self,
        key: &str,
        entries: Vec<(f64, String)>,
    ) -> impl Future<Output = crate::Result<()>> + Send;

    /// Members with `min <= score <= max`, ascending by score
    fn range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> impl Future<Output = crate::Result<Vec<String>>> + Send;

    /// Number of members in the set
    fn cardinality(&self, key: &str) -> impl Future<Output = crate::Result<usize>> + Send;
}

/// Fire-and-forget broadcast to a named channel
pub trait TickPublisher: Send + Sync {
    /// Publish `payload`, returning how many subscribers received it
    fn publish(
        &self,
        channel: &str,
        payload: String,
    ) -> impl Future<Output = crate::Result<usize>> + Send;
}

/// Backing store connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `host:port`
    pub addr: String,
    pub password: Option<String>,
    pub db: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:6379".to_string(),
            password: None,
            db: 0,
        }
    }
}

impl StoreConfig {
    /// Default settings pointed at `addr`
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Connection URL in `redis://[:password@]host:port/db` form
    pub fn url(&self) -> String {
        match self.password.as_deref() {
            Some(password) if !password.is_empty() => {
                format!("redis://:{}@{}/{}", password, self.addr, self.db)
            }
            _ => format!("redis://{}/{}", self.addr, self.db),
        }
    }

    /// Validate settings
    pub fn validate(&self) -> crate::Result<()> {
        let Some((host, port)) = self.addr.rsplit_once(':') else {
            return Err(crate::Error::Config(format!(
                "Store address must be host:port, got {:?}",
                self.addr
            )));
        };

        if host.is_empty() {
            return Err(crate::Error::Config("Store host is empty".to_string()));
        }

        port.parse::<u16>().map_err(|_| {
            crate::Error::Config(format!("Invalid store port {:?}", port))
        })?;

        if self.db < 0 {
            return Err(crate::Error::Config(
                "Database index must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url() {
        assert_eq!(StoreConfig::default().url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_url_with_password_and_db() {
        let config = StoreConfig {
            addr: "cache:6380".to_string(),
            password: Some("s3cret".to_string()),
            db: 2,
        };

        assert_eq!(config.url(), "redis://:s3cret@cache:6380/2");
    }

    #[test]
    fn test_validate() {
        assert!(StoreConfig::default().validate().is_ok());
        assert!(StoreConfig::with_addr("10.0.0.5:7000").validate().is_ok());
        assert!(StoreConfig::with_addr("localhost").validate().is_err());
        assert!(StoreConfig::with_addr(":6379").validate().is_err());
        assert!(StoreConfig::with_addr("localhost:99999").validate().is_err());
    }
}
