//! # Osprey Core
//!
//! Limit-order matching engine for a single instrument.
//!
//! ## Architecture
//!
//! - **Types**: fixed-point `Price`/`Quantity`, `Order`, `Trade`
//! - **Pool**: growable arena owning every resting order
//! - **Book**: two price-ordered sides of handle FIFOs
//! - **Matcher**: continuous price-time priority crossing, single-threaded
//! - **Engine**: submission queue + matching worker + trade sink
//!
//! ## Design Principles
//!
//! 1. **No floats in the core**: prices are integer ticks end to end
//! 2. **No allocator calls while matching**: resting orders live in a
//!    preallocated arena addressed by handles
//! 3. **One writer**: books and arena are owned by the matching worker;
//!    the outside world sees atomic counters and the trade sink

pub mod book;
pub mod engine;
pub mod fixed;
pub mod level;
pub mod matcher;
pub mod order;
pub mod pool;
pub mod trade;

pub use book::{BookSide, OrderBook};
pub use engine::{Engine, EngineError, StatsView, SubmitHandle, TradeSink};
pub use fixed::{Price, Quantity};
pub use level::PriceLevel;
pub use matcher::{Matcher, DEFAULT_POOL_CAPACITY};
pub use order::{Order, OrderId, OrderIdSource, Side};
pub use pool::{OrderHandle, OrderPool};
pub use trade::Trade;
