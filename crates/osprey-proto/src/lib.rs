//! JSON line protocol.
//!
//! One order per line in, one ASCII response line out. The decoder here
//! is the only place input is validated; rejected lines never reach the
//! matching engine.

pub mod messages;
pub mod parser;

pub use messages::{encode_request, trade_line, OrderRequest, WireSide, ACK_LINE};
pub use parser::{DecodeError, OrderDecoder};
