//! The operations shared by both transport contexts.

use coap_msg::{Code, Token};

use crate::error::Error;
use crate::time::Instant;
use crate::upper::Upper;

/// The common surface `UdpContext` and `TcpContext` both implement.
///
/// Rust's ownership model folds the distilled source's explicit
/// `cleanup`/`setsock` lifecycle operations into ordinary construction and
/// `Drop`, so this trait only names the operations that have no such
/// free equivalent. Neither context owns a socket (see the module docs on
/// `udp::engine`/`tcp::engine`): every operation that would send bytes
/// instead returns them, so the trait never needs a generic or trait-object
/// transport parameter.
pub trait Context {
  /// The maximum payload size this context could currently send for a
  /// message with the given token length, options size, and code (after
  /// accounting for header overhead and, for TCP, the peer's advertised
  /// Max-Message-Size). Returns 0 if nothing would fit.
  fn max_outgoing_payload_size(&self, token_len: usize, options_size: usize, code: Code) -> usize;

  /// The maximum payload size this context will accept on an incoming
  /// message.
  fn max_incoming_payload_size(&self) -> usize;

  /// Cancel a pending/unconfirmed exchange, delivering `result` to its
  /// callback as a terminal outcome.
  fn abort_delivery(&mut self, token: Token, result: Error, upper: &mut dyn Upper);

  /// Stop tracking the exchange currently being processed as a request
  /// (i.e. do not generate a piggybacked ACK for it).
  fn ignore_current_request(&mut self);

  /// The next instant at which a timeout handler should be called, if any.
  fn next_timeout_due(&self) -> Option<Instant>;
}
