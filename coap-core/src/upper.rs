//! The callback contract the core invokes on the application layer.

use std::net::SocketAddr;

use coap_msg::{Message, Token};

use crate::error::Error;

/// Outcome of delivering a response to a pending exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
  /// the exchange completed successfully
  Ok,
  /// a chunk of a larger response body (TCP streaming, or a BLOCK2 sequence)
  PartialContent,
  /// the exchange failed
  Fail(Error),
  /// the exchange was cancelled by the local side
  Cancel,
}

/// Whether the upper layer wants the exchange kept open for further
/// responses (used for RFC 7641 observe notifications, where a single
/// request produces many responses over the request's lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
  /// close the exchange; no further responses are expected
  Accepted,
  /// keep the exchange open
  NotAccepted,
}

/// The collaborator both contexts invoke to hand work to the application.
///
/// Grouped as a single trait the way `toad::Platform` groups its callback
/// surface, but limited to the three events this engine layer produces.
pub trait Upper {
  /// A fully-assembled request arrived.
  fn on_request(&mut self, from: SocketAddr, message: &Message);

  /// A response (or a chunk of one) arrived for a pending exchange.
  fn on_response(&mut self,
                  from: SocketAddr,
                  token: Token,
                  message: Option<&Message>,
                  status: ResponseStatus)
                  -> Disposition;

  /// The peer reset an exchange that was tracked as a sent observe
  /// notification; the observation should be cancelled.
  fn on_observe_cancel(&mut self, token: Token) {
    let _ = token;
  }
}
