//! The RFC 8323 stream framing engine.

/// The TCP exchange engine itself.
pub mod engine;
/// The incremental header/token/options/payload decoder.
pub mod parser;
/// The token-keyed, expiry-ordered pending-request registry.
pub mod pending;
/// CSM negotiation and the Ping/Pong/Release/Abort signaling messages.
pub mod signaling;

pub use engine::TcpContext;
pub use signaling::PeerCsm;
