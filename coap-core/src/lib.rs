//! UDP and TCP CoAP exchange engines built on the wire codec in `coap-msg`.
//!
//! `udp::UdpContext` implements the confirmable/non-confirmable exchange
//! model of RFC 7252 (retransmission, NSTART admission, deduplication,
//! observe cancellation). `tcp::TcpContext` implements the framed,
//! connection-oriented model of RFC 8323 (CSM negotiation, signaling,
//! incremental parsing tolerant of arbitrary fragmentation).
//!
//! Neither context owns a socket: every operation that would put bytes on
//! the wire returns them instead, and the caller's own recv loop feeds
//! received bytes back in. This keeps both engines synchronous, free of
//! internal blocking, and easy to drive from tests with a fake clock.

#![deny(missing_debug_implementations)]

/// Runtime-tunable transmission parameters.
pub mod config;
/// The operations shared by both transport contexts.
pub mod context;
/// The error taxonomy surfaced at the boundary.
pub mod error;
/// The remote-endpoint wrapper and the UDP socket contract.
pub mod net;
/// A source of random bytes for tokens and message ids.
pub mod prng;
/// Jittered exponential-backoff retransmission timing.
pub mod retry;
/// A monotonic millisecond clock abstraction.
pub mod time;
/// The RFC 7252 datagram exchange engine.
pub mod udp;
/// The RFC 8323 stream framing engine.
pub mod tcp;
/// The callback contract the core invokes on the application layer.
pub mod upper;

pub use context::Context;
pub use error::Error;
pub use net::{Addrd, DatagramSocket};
pub use prng::{ChaCha8Prng, Prng};
pub use tcp::TcpContext;
pub use time::{Clock, Instant, SystemClock};
pub use udp::UdpContext;
pub use upper::{Disposition, ResponseStatus, Upper};
