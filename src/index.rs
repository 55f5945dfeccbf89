//! Read side of the order set
//!
//! Trigger price is the sort score, so "every order whose trigger price has
//! been crossed" is one range read. The feed itself never queries the
//! index; this is the seam a matching consumer plugs into.

use crate::model::StopLossOrder;
use crate::store::OrderStore;
use log::warn;
use std::sync::Arc;

/// Price-ordered view over the stop-loss order set
pub struct OrderIndex<S> {
    store: Arc<S>,
    key: String,
}

impl<S> Clone for OrderIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
        }
    }
}

impl<S: OrderStore> OrderIndex<S> {
    /// Create an index over sorted set `key`
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Orders with `trigger_price <= price`, lowest trigger first
    pub async fn orders_at_or_below(&self, price: f64) -> crate::Result<Vec<StopLossOrder>> {
        self.orders_between(f64::NEG_INFINITY, price).await
    }

    /// Orders with `min <= trigger_price <= max`, lowest trigger first
    ///
    /// Members that do not decode as orders are skipped with a warning;
    /// the set may be shared with other writers.
    pub async fn orders_between(&self, min: f64, max: f64) -> crate::Result<Vec<StopLossOrder>> {
        let members = self.store.range_by_score(&self.key, min, max).await?;

        Ok(members
            .iter()
            .filter_map(|member| match StopLossOrder::from_json(member) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!("Skipping undecodable member of {}: {}", self.key, e);
                    None
                }
            })
            .collect())
    }

    /// Number of entries in the set
    pub async fn len(&self) -> crate::Result<usize> {
        self.store.cardinality(&self.key).await
    }

    pub async fn is_empty(&self) -> crate::Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ORDER_SET_KEY};

    async fn seeded_index() -> OrderIndex<MemoryStore> {
        let store = Arc::new(MemoryStore::new());

        for (id, price) in [(1, 120.0), (2, 55.5), (3, 99.0), (4, 99.0), (5, 149.9)] {
            let order = StopLossOrder::new(id, "AAPL", price, 1_700_000_300);
            store
                .insert(ORDER_SET_KEY, price, order.to_json().unwrap())
                .await
                .unwrap();
        }

        OrderIndex::new(store, ORDER_SET_KEY)
    }

    #[tokio::test]
    async fn test_orders_at_or_below() {
        let index = seeded_index().await;

        let orders = index.orders_at_or_below(99.0).await.unwrap();
        let ids: Vec<u64> = orders.iter().map(|o| o.id).collect();

        // Ties on score fall back to member order, which starts with the id
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(orders.windows(2).all(|w| w[0].trigger_price <= w[1].trigger_price));
    }

    #[tokio::test]
    async fn test_nothing_below_floor() {
        let index = seeded_index().await;

        assert!(index.orders_at_or_below(50.0).await.unwrap().is_empty());
        assert_eq!(index.orders_at_or_below(150.0).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_orders_between() {
        let index = seeded_index().await;

        let orders = index.orders_between(100.0, 130.0).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, 1);
    }

    #[tokio::test]
    async fn test_foreign_members_skipped() {
        let index = seeded_index().await;
        index
            .store
            .insert(ORDER_SET_KEY, 60.0, "not json".to_string())
            .await
            .unwrap();

        assert_eq!(index.len().await.unwrap(), 6);
        assert_eq!(index.orders_at_or_below(60.0).await.unwrap().len(), 1);
    }
}
