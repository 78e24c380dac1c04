//! Trade record: the observable result of a cross.

use crate::fixed::{Price, Quantity};
use crate::order::OrderId;

/// One execution between a buy and a sell order.
///
/// The price is the maker's price: whichever of the two orders arrived
/// first sets the level the trade prints at. Both identifiers always refer
/// to opposite-side orders and the quantity is strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Trade {
    /// Buy-side order identifier.
    pub buy_order_id: OrderId,
    /// Sell-side order identifier.
    pub sell_order_id: OrderId,
    /// Execution price in ticks.
    pub price: Price,
    /// Executed quantity.
    pub quantity: Quantity,
    /// Monotonic execution timestamp in nanoseconds.
    pub timestamp: u64,
}

impl Trade {
    /// Create a trade record.
    #[inline(always)]
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
        timestamp: u64,
    ) -> Self {
        debug_assert!(!quantity.is_zero(), "trade quantity must be positive");
        Self {
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            timestamp,
        }
    }
}
