//! Network ingress for the matching engine.
//!
//! Uses mio for non-blocking event-driven TCP with newline framing.

pub mod gateway;

pub use gateway::Gateway;
