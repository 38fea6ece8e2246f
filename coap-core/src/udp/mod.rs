//! The RFC 7252 datagram exchange engine.

/// The bounded, lifetime-expiring response cache used for request deduplication.
pub mod cache;
/// The UDP exchange engine itself.
pub mod engine;
/// The list of in-flight confirmable messages.
pub mod exchange;
/// The FIFO tracking sent notifications for Reset-driven cancellation.
pub mod notify_cache;

pub use engine::UdpContext;
pub use exchange::{UnconfirmedList, UnconfirmedMessage};
