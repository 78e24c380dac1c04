//! Trade persistence.
//!
//! Consumes `Trade` events from the matching worker's sink and writes
//! them to a CSV file from a dedicated drain worker.

pub mod sink;

pub use sink::{TradeLogHandle, TradeLogger, CSV_HEADER};
