//! Wire message definitions.
//!
//! Inbound traffic is one JSON object per line:
//!
//! ```text
//! {"side":"buy","price":100.50,"quantity":10}
//! ```
//!
//! Key order is irrelevant, whitespace is tolerated, and unknown keys are
//! ignored. Outbound responses are single ASCII lines.

use osprey_core::{Price, Quantity, Side, Trade};
use serde::{Deserialize, Serialize};

/// Side as it appears on the wire. Exactly `buy`/`BUY`/`sell`/`SELL`;
/// anything else fails deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireSide {
    #[serde(rename = "buy", alias = "BUY")]
    Buy,
    #[serde(rename = "sell", alias = "SELL")]
    Sell,
}

impl From<WireSide> for Side {
    fn from(side: WireSide) -> Self {
        match side {
            WireSide::Buy => Side::Buy,
            WireSide::Sell => Side::Sell,
        }
    }
}

impl From<Side> for WireSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => WireSide::Buy,
            Side::Sell => WireSide::Sell,
        }
    }
}

/// One inbound order line, as decoded JSON.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: WireSide,
    pub price: f64,
    pub quantity: u32,
}

impl OrderRequest {
    /// Build a request from core values, for clients and tests.
    pub fn new(side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            side: side.into(),
            price: price.to_decimal(),
            quantity: quantity.lots(),
        }
    }
}

/// Encode a request as one JSON line (no trailing newline).
pub fn encode_request(request: &OrderRequest) -> String {
    // OrderRequest serialization cannot fail: no maps, no non-string keys.
    serde_json::to_string(request).expect("order request serialization")
}

/// Response line for an accepted order.
pub const ACK_LINE: &str = "ACK: Order received\n";

/// Console line announcing an execution.
pub fn trade_line(trade: &Trade) -> String {
    format!(
        "TRADE: Buy Order {} matched with Sell Order {} at price {} for quantity {}",
        trade.buy_order_id.0, trade.sell_order_id.0, trade.price, trade.quantity
    )
}
