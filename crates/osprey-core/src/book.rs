//! Order book data structures.
//!
//! Each side keys price levels in an ordered map: O(log P) level lookup,
//! ordered iteration from the best price outward. Bids treat the highest
//! key as best, asks the lowest. Orders themselves live in the pool; the
//! book holds handles.

use std::collections::BTreeMap;

use crate::fixed::{Price, Quantity};
use crate::level::PriceLevel;
use crate::order::{Order, Side};
use crate::pool::OrderHandle;

/// One side of the book (bids or asks).
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
    order_count: u64,
    total_qty: u64,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            order_count: 0,
            total_qty: 0,
        }
    }

    /// Append a resting order at the tail of its price level.
    pub fn add_order(&mut self, handle: OrderHandle, order: &Order) {
        debug_assert_eq!(order.side, self.side, "order on wrong side");

        self.levels
            .entry(order.price)
            .or_default()
            .push_back(handle, order.remaining_qty);

        self.order_count += 1;
        self.total_qty += order.remaining_qty.0 as u64;
    }

    /// Best price: highest bid, lowest ask.
    #[inline]
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(price, _)| *price),
            Side::Sell => self.levels.first_key_value().map(|(price, _)| *price),
        }
    }

    /// Head order of the best level (next to match on this side).
    #[inline]
    pub fn best_front(&self) -> Option<OrderHandle> {
        self.best_level().and_then(PriceLevel::front)
    }

    /// Account for quantity consumed from the best level.
    pub fn reduce_at_best(&mut self, qty: Quantity) {
        if let Some(level) = self.best_level_mut() {
            level.reduce_qty(qty);
        }
        debug_assert!(qty.0 as u64 <= self.total_qty, "side quantity underflow");
        self.total_qty -= qty.0 as u64;
    }

    /// Remove the head order of the best level, erasing the level's key
    /// once its FIFO empties.
    pub fn pop_best_front(&mut self) -> Option<OrderHandle> {
        let best = self.best_price()?;
        let level = self.levels.get_mut(&best)?;
        let handle = level.pop_front()?;

        if level.is_empty() {
            self.levels.remove(&best);
        }
        self.order_count -= 1;
        Some(handle)
    }

    /// Count of resting orders on this side.
    #[inline(always)]
    pub fn order_count(&self) -> u64 {
        self.order_count
    }

    /// Aggregate resting quantity on this side.
    #[inline(always)]
    pub fn total_qty(&self) -> u64 {
        self.total_qty
    }

    /// Number of distinct price levels.
    #[inline(always)]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at an exact price, for observability and tests.
    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// All levels in ascending price order, for snapshots and tests.
    pub fn levels(&self) -> impl Iterator<Item = (Price, &PriceLevel)> {
        self.levels.iter().map(|(price, level)| (*price, level))
    }

    #[inline]
    fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(_, level)| level),
            Side::Sell => self.levels.first_key_value().map(|(_, level)| level),
        }
    }

    #[inline]
    fn best_level_mut(&mut self) -> Option<&mut PriceLevel> {
        // BTreeMap has no last_value_mut; go through the key.
        let best = self.best_price()?;
        self.levels.get_mut(&best)
    }
}

/// Both sides of the book for a single instrument.
pub struct OrderBook {
    pub bids: BookSide,
    pub asks: BookSide,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
        }
    }

    /// Highest resting bid.
    #[inline(always)]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Lowest resting ask.
    #[inline(always)]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Best ask minus best bid; `None` when either side is empty or the
    /// book is crossed.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask.saturating_sub(bid)),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// The side an order rests on.
    #[inline(always)]
    pub fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderId;

    fn order(id: u64, side: Side, price_ticks: u64, qty: u32) -> Order {
        Order::new(
            OrderId(id),
            side,
            Price::from_ticks(price_ticks),
            Quantity(qty),
            id,
        )
    }

    #[test]
    fn test_add_order_tracks_counts() {
        let mut side = BookSide::new(Side::Buy);
        side.add_order(OrderHandle(0), &order(1, Side::Buy, 10_000, 10));

        assert_eq!(side.order_count(), 1);
        assert_eq!(side.total_qty(), 10);
        assert_eq!(side.best_price(), Some(Price::from_ticks(10_000)));
    }

    #[test]
    fn test_bid_best_is_highest() {
        let mut side = BookSide::new(Side::Buy);
        side.add_order(OrderHandle(0), &order(1, Side::Buy, 10_000, 10));
        side.add_order(OrderHandle(1), &order(2, Side::Buy, 11_000, 10));
        side.add_order(OrderHandle(2), &order(3, Side::Buy, 9_000, 10));

        assert_eq!(side.best_price(), Some(Price::from_ticks(11_000)));
        assert_eq!(side.level_count(), 3);
    }

    #[test]
    fn test_ask_best_is_lowest() {
        let mut side = BookSide::new(Side::Sell);
        side.add_order(OrderHandle(0), &order(1, Side::Sell, 10_000, 10));
        side.add_order(OrderHandle(1), &order(2, Side::Sell, 9_500, 10));
        side.add_order(OrderHandle(2), &order(3, Side::Sell, 10_500, 10));

        assert_eq!(side.best_price(), Some(Price::from_ticks(9_500)));
    }

    #[test]
    fn test_pop_best_front_erases_empty_level() {
        let mut side = BookSide::new(Side::Sell);
        side.add_order(OrderHandle(0), &order(1, Side::Sell, 10_000, 10));
        side.add_order(OrderHandle(1), &order(2, Side::Sell, 10_100, 5));

        side.reduce_at_best(Quantity(10));
        assert_eq!(side.pop_best_front(), Some(OrderHandle(0)));

        // 10_000 level is gone; next best is 10_100.
        assert_eq!(side.best_price(), Some(Price::from_ticks(10_100)));
        assert_eq!(side.order_count(), 1);
        assert_eq!(side.total_qty(), 5);
    }

    #[test]
    fn test_fifo_within_level() {
        let mut side = BookSide::new(Side::Buy);
        side.add_order(OrderHandle(7), &order(1, Side::Buy, 10_000, 10));
        side.add_order(OrderHandle(8), &order(2, Side::Buy, 10_000, 10));

        assert_eq!(side.level_count(), 1);
        assert_eq!(side.best_front(), Some(OrderHandle(7)));

        side.reduce_at_best(Quantity(10));
        side.pop_best_front();
        assert_eq!(side.best_front(), Some(OrderHandle(8)));
    }

    #[test]
    fn test_book_spread() {
        let mut book = OrderBook::new();
        assert_eq!(book.spread(), None);

        book.bids
            .add_order(OrderHandle(0), &order(1, Side::Buy, 10_000, 10));
        book.asks
            .add_order(OrderHandle(1), &order(2, Side::Sell, 10_100, 10));

        assert_eq!(book.best_bid(), Some(Price::from_ticks(10_000)));
        assert_eq!(book.best_ask(), Some(Price::from_ticks(10_100)));
        assert_eq!(book.spread(), Some(Price::from_ticks(100)));
    }
}
