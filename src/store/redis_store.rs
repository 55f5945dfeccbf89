//! Redis backend

use super::{OrderStore, StoreConfig, TickPublisher};
use crate::Error;
use log::info;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

/// Redis-backed order set and tick channel
///
/// Wraps one multiplexed connection. Clones share it, so the loader and
/// the broadcaster can run off the same socket.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    addr: String,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`
    pub async fn connect(config: &StoreConfig) -> crate::Result<Self> {
        config.validate()?;

        let client = redis::Client::open(config.url())
            .map_err(|e| Error::Config(format!("Invalid store URL: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Connection(format!("Failed to connect to {}: {}", config.addr, e)))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Connection(format!("PING to {} failed: {}", config.addr, e)))?;

        info!("Connected to {} (db {}): {}", config.addr, config.db, pong);

        Ok(Self {
            conn,
            addr: config.addr.clone(),
        })
    }

    /// Address this store is connected to
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

/// Render a score bound the way `ZRANGEBYSCORE` expects it
fn score_bound(score: f64) -> String {
    if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if score == f64::INFINITY {
        "+inf".to_string()
    } else {
        score.to_string()
    }
}

impl OrderStore for RedisStore {
    async fn insert(&self, key: &str, score: f64, member: String) -> crate::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn insert_batch(&self, key: &str, entries: Vec<(f64, String)>) -> crate::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        // One ZADD with many score/member pairs: a single round trip, applied atomically
        let mut conn = self.conn.clone();
        let _: () = conn.zadd_multiple(key, entries.as_slice()).await?;
        Ok(())
    }

    async fn range_by_score(&self, key: &str, min: f64, max: f64) -> crate::Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrangebyscore(key, score_bound(min), score_bound(max))
            .await?;
        Ok(members)
    }

    async fn cardinality(&self, key: &str) -> crate::Result<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn.zcard(key).await?;
        Ok(count)
    }
}

impl TickPublisher for RedisStore {
    async fn publish(&self, channel: &str, payload: String) -> crate::Result<usize> {
        let mut conn = self.conn.clone();
        let receivers: usize = conn.publish(channel, payload).await?;
        Ok(receivers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert_eq!(score_bound(f64::NEG_INFINITY), "-inf");
        assert_eq!(score_bound(f64::INFINITY), "+inf");
        assert_eq!(score_bound(99.5), "99.5");
        assert_eq!(score_bound(150.0), "150");
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_address() {
        let result = RedisStore::connect(&StoreConfig::with_addr("no-port")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
