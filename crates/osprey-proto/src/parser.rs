//! Line decoder: JSON text in, validated `Order` out.
//!
//! The decoder is the validation boundary. Everything it hands to the
//! engine carries a fresh session-unique id, a positive tick price, a
//! positive quantity, and a capture timestamp; matching never re-checks.

use std::sync::Arc;

use osprey_core::{Order, OrderIdSource, Price, Quantity};
use osprey_metrics::Clock;
use thiserror::Error;

use crate::messages::OrderRequest;

/// Why an input line was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed order line: {0}")]
    Json(#[from] serde_json::Error),
    #[error("price {0} is not a valid quotation")]
    InvalidPrice(f64),
    #[error("quantity must be positive")]
    InvalidQuantity,
}

/// Stateful decoder shared by every ingress path.
///
/// Cheap to clone; clones share the id allocator and the clock so orders
/// from different connections stay in one id and time domain.
#[derive(Clone)]
pub struct OrderDecoder {
    ids: Arc<OrderIdSource>,
    clock: Clock,
}

impl OrderDecoder {
    pub fn new(ids: Arc<OrderIdSource>, clock: Clock) -> Self {
        Self { ids, clock }
    }

    /// Decode one newline-stripped input line.
    pub fn decode_line(&self, line: &str) -> Result<Order, DecodeError> {
        let request: OrderRequest = serde_json::from_str(line.trim())?;
        self.order_from_request(&request)
    }

    /// Validate a parsed request and stamp it into an owned `Order`.
    pub fn order_from_request(&self, request: &OrderRequest) -> Result<Order, DecodeError> {
        let price =
            Price::from_decimal(request.price).ok_or(DecodeError::InvalidPrice(request.price))?;
        if request.quantity == 0 {
            return Err(DecodeError::InvalidQuantity);
        }

        Ok(Order::new(
            self.ids.next_id(),
            request.side.into(),
            price,
            Quantity(request.quantity),
            self.clock.now_nanos(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::encode_request;
    use osprey_core::{OrderId, Side};

    fn decoder() -> OrderDecoder {
        OrderDecoder::new(Arc::new(OrderIdSource::new()), Clock::new())
    }

    #[test]
    fn test_decode_valid_line() {
        let decoder = decoder();
        let order = decoder
            .decode_line(r#"{"side":"buy","price":100.50,"quantity":10}"#)
            .unwrap();

        assert_eq!(order.id, OrderId(1));
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.price, Price::from_ticks(10_050));
        assert_eq!(order.remaining_qty, Quantity(10));
    }

    #[test]
    fn test_decode_tolerates_whitespace_and_key_order() {
        let decoder = decoder();
        let order = decoder
            .decode_line("  { \"quantity\": 5 , \"side\" : \"SELL\", \"price\": 99.0 }  ")
            .unwrap();

        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.price, Price::from_units(99));
        assert_eq!(order.remaining_qty, Quantity(5));
    }

    #[test]
    fn test_decode_ignores_extra_keys() {
        let decoder = decoder();
        let order = decoder
            .decode_line(r#"{"side":"buy","price":1.0,"quantity":1,"venue":"x","ts":0}"#)
            .unwrap();
        assert_eq!(order.price, Price::from_units(1));
    }

    #[test]
    fn test_ids_are_sequential_across_lines() {
        let decoder = decoder();
        let a = decoder
            .decode_line(r#"{"side":"buy","price":1.0,"quantity":1}"#)
            .unwrap();
        let b = decoder
            .decode_line(r#"{"side":"sell","price":1.0,"quantity":1}"#)
            .unwrap();
        assert_eq!(a.id, OrderId(1));
        assert_eq!(b.id, OrderId(2));
        assert!(a.timestamp <= b.timestamp);
    }

    #[test]
    fn test_decode_rejects_malformed_lines() {
        let decoder = decoder();
        let rejected = [
            "",
            "not json",
            r#"{"side":"buy","price":100.0}"#,               // missing quantity
            r#"{"price":100.0,"quantity":10}"#,              // missing side
            r#"{"side":"hold","price":100.0,"quantity":1}"#, // bad side
            r#"{"side":"Buy","price":100.0,"quantity":1}"#,  // mixed case side
            r#"{"side":"buy","price":"abc","quantity":1}"#,  // non-numeric price
            r#"{"side":"buy","price":100.0,"quantity":2.5}"#, // fractional qty
            r#"{"side":"buy","price":100.0,"quantity":-3}"#, // negative qty
        ];
        for line in rejected {
            assert!(decoder.decode_line(line).is_err(), "accepted: {:?}", line);
        }
    }

    #[test]
    fn test_decode_rejects_invalid_values() {
        let decoder = decoder();

        let err = decoder
            .decode_line(r#"{"side":"buy","price":0.0,"quantity":1}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPrice(_)));

        let err = decoder
            .decode_line(r#"{"side":"buy","price":-5.0,"quantity":1}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPrice(_)));

        let err = decoder
            .decode_line(r#"{"side":"buy","price":100.0,"quantity":0}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidQuantity));
    }

    #[test]
    fn test_encode_then_decode_preserves_fields() {
        let decoder = decoder();
        let request = OrderRequest::new(Side::Sell, Price::from_ticks(10_099), Quantity(42));

        let order = decoder.decode_line(&encode_request(&request)).unwrap();
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.price, Price::from_ticks(10_099));
        assert_eq!(order.remaining_qty, Quantity(42));
    }
}
