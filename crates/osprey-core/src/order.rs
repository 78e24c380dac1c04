//! Order type and identifier allocation.
//!
//! The Order struct is exactly 64 bytes so a resting order occupies a
//! single cache line in the pool.

use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fixed::{Price, Quantity};

/// Side of the book an order belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid side (buyers).
    Buy = 0,
    /// Ask side (sellers).
    Sell = 1,
}

impl Side {
    /// The side an order matches against.
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    #[inline(always)]
    pub const fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }
}

/// Unique order identifier, assigned once at decode time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OrderId(pub u64);

/// Session-wide monotonic id allocator.
///
/// Shared between all ingress decoders so identifiers stay unique no
/// matter which connection an order arrived on.
pub struct OrderIdSource {
    next: AtomicU64,
}

impl OrderIdSource {
    /// Start allocating from 1; 0 is never a valid id.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next identifier.
    #[inline]
    pub fn next_id(&self) -> OrderId {
        OrderId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for OrderIdSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A limit order. Exactly one cache line.
///
/// Hot fields (touched during matching) come first.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(64))]
pub struct Order {
    /// Limit price in ticks.
    pub price: Price,
    /// Monotonic capture timestamp in nanoseconds. Never rewritten; used
    /// only as the price-time tie-breaker and for diagnostics.
    pub timestamp: u64,
    /// Unique identifier.
    pub id: OrderId,
    /// Remaining quantity. Positive at submission, non-negative at rest.
    pub remaining_qty: Quantity,
    /// Buy or sell.
    pub side: Side,
    _padding: [u8; 35],
}

const _: () = assert!(size_of::<Order>() == 64, "Order must be exactly 64 bytes");

impl Order {
    /// Create a new order.
    #[inline(always)]
    pub fn new(id: OrderId, side: Side, price: Price, qty: Quantity, timestamp: u64) -> Self {
        Self {
            price,
            timestamp,
            id,
            remaining_qty: qty,
            side,
            _padding: [0; 35],
        }
    }

    /// Whether the order has been fully consumed.
    #[inline(always)]
    pub const fn is_filled(&self) -> bool {
        self.remaining_qty.is_zero()
    }

    /// Consume `qty` from the remaining quantity.
    #[inline(always)]
    pub fn fill(&mut self, qty: Quantity) {
        debug_assert!(
            qty.0 <= self.remaining_qty.0,
            "fill quantity exceeds remaining"
        );
        self.remaining_qty = self.remaining_qty.saturating_sub(qty);
    }
}
