//! Continuous price-time priority matching.
//!
//! This is THE hot path. One matcher instance is owned by the matching
//! worker; nothing here is shared or locked.

use osprey_metrics::Clock;

use crate::book::OrderBook;
use crate::fixed::Price;
use crate::order::Order;
use crate::pool::OrderPool;
use crate::trade::Trade;

/// Default number of preallocated pool slots.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Single-threaded matcher: both books plus the order arena.
pub struct Matcher {
    book: OrderBook,
    pool: OrderPool,
}

impl Matcher {
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_pool_capacity(capacity: usize) -> Self {
        Self {
            book: OrderBook::new(),
            pool: OrderPool::with_capacity(capacity),
        }
    }

    /// Process one incoming order: rest it in its own book, then cross
    /// against the opposite side until no match remains. Every execution
    /// is pushed through `emit` in the order it was produced (best price
    /// outward, FIFO within a level).
    ///
    /// Matching is total: inputs are validated upstream and every branch
    /// here terminates.
    pub fn process(&mut self, order: Order, clock: &Clock, emit: &mut dyn FnMut(Trade)) {
        debug_assert!(!order.price.is_zero(), "unvalidated price reached matcher");
        debug_assert!(
            !order.remaining_qty.is_zero(),
            "unvalidated quantity reached matcher"
        );

        // Insert first, then cross: the incoming order joins the tail of
        // its price level so time priority is already settled before any
        // execution happens.
        let handle = self.pool.acquire(order);
        self.book.side_mut(order.side).add_order(handle, &order);

        self.cross(clock, emit);
    }

    /// Match head-vs-head while the books cross.
    fn cross(&mut self, clock: &Clock, emit: &mut dyn FnMut(Trade)) {
        loop {
            let (Some(bid_price), Some(ask_price)) =
                (self.book.bids.best_price(), self.book.asks.best_price())
            else {
                break;
            };
            if bid_price < ask_price {
                break;
            }

            let (Some(buy_handle), Some(sell_handle)) =
                (self.book.bids.best_front(), self.book.asks.best_front())
            else {
                break;
            };

            let buy = *self.pool.get(buy_handle);
            let sell = *self.pool.get(sell_handle);

            let qty = buy.remaining_qty.min(sell.remaining_qty);
            let price = maker_price(&buy, &sell);
            emit(Trade::new(buy.id, sell.id, price, qty, clock.now_nanos()));

            self.pool.get_mut(buy_handle).fill(qty);
            self.pool.get_mut(sell_handle).fill(qty);
            self.book.bids.reduce_at_best(qty);
            self.book.asks.reduce_at_best(qty);

            if self.pool.get(buy_handle).is_filled() {
                self.book.bids.pop_best_front();
                self.pool.release(buy_handle);
            }
            if self.pool.get(sell_handle).is_filled() {
                self.book.asks.pop_best_front();
                self.pool.release(sell_handle);
            }
        }
    }

    /// Read access to both books.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Read access to the order arena.
    pub fn pool(&self) -> &OrderPool {
        &self.pool
    }

    /// Count of resting buy orders.
    #[inline(always)]
    pub fn buy_depth(&self) -> u64 {
        self.book.bids.order_count()
    }

    /// Count of resting sell orders.
    #[inline(always)]
    pub fn sell_depth(&self) -> u64 {
        self.book.asks.order_count()
    }

    /// (live orders, slot capacity) of the arena.
    pub fn pool_stats(&self) -> (usize, usize) {
        (self.pool.active(), self.pool.capacity())
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution price under price-time priority: the order that arrived
/// first (the maker) sets the level the trade prints at. Capture
/// timestamps decide; the monotonic id breaks exact ties.
#[inline]
fn maker_price(buy: &Order, sell: &Order) -> Price {
    if (buy.timestamp, buy.id) <= (sell.timestamp, sell.id) {
        buy.price
    } else {
        sell.price
    }
}
