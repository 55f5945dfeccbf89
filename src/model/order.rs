use serde::{Deserialize, Serialize};
use std::fmt;

/// A pending stop-loss instruction
///
/// Serialized as `{"order_id", "stop_loss_price", "expiry", "symbol"}`;
/// the field names are the wire contract shared with consumers of the
/// order set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossOrder {
    /// Sequential id, starting at 1
    #[serde(rename = "order_id")]
    pub id: u64,

    /// Trigger price, also the sort score in the order index
    #[serde(rename = "stop_loss_price")]
    pub trigger_price: f64,

    /// Unix seconds after which the order is stale
    pub expiry: i64,

    pub symbol: String,
}

impl StopLossOrder {
    /// Create a new order
    pub fn new(id: u64, symbol: impl Into<String>, trigger_price: f64, expiry: i64) -> Self {
        Self {
            id,
            trigger_price,
            expiry,
            symbol: symbol.into(),
        }
    }

    /// Encode as the JSON wire payload
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON wire payload
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| crate::Error::InvalidPayload(format!("order: {}", e)))
    }

    /// Check whether the order is stale at `now` (unix seconds)
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expiry
    }
}

impl fmt::Display for StopLossOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} stop @ {:>8.4} (expires {})",
            self.id, self.symbol, self.trigger_price, self.expiry
        )
    }
}
