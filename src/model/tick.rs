use serde::{Deserialize, Serialize};
use std::fmt;

/// One synthetic market price observation
///
/// Ticks carry no sequence number; ordering is publish order on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    pub symbol: String,

    pub price: f64,

    /// Unix seconds at emission
    pub timestamp: i64,
}

impl TickEvent {
    /// Create a new tick
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }

    /// Encode as the JSON wire payload
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON wire payload
    pub fn from_json(payload: &str) -> crate::Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| crate::Error::InvalidPayload(format!("tick: {}", e)))
    }
}

impl fmt::Display for TickEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<5} {:>8.4} ({})",
            self.symbol, self.price, self.timestamp
        )
    }
}
