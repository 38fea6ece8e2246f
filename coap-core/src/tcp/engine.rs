//! The RFC 8323 exchange engine: CSM handshake, signaling, chunked
//! send/receive, and per-request expiry.
//!
//! Like `udp::UdpContext`, this context never owns the socket. The caller
//! owns the `TcpStream`, forwards received bytes into [`TcpContext::receive`],
//! and writes whatever bytes come back out (from [`TcpContext::handshake`],
//! `receive`, or an explicit `send_*` call) onto the stream itself.

use std::net::SocketAddr;

use coap_msg::option::OptionList;
use coap_msg::{Code, CodeKind, Message, TcpMessage, Token};

use super::parser::Parser;
use super::pending::PendingRequests;
use super::signaling::{self, PeerCsm};
use crate::config::Tcp as TcpConfig;
use crate::context::Context;
use crate::error::Error;
use crate::time::Instant;
use crate::upper::{Disposition, ResponseStatus, Upper};

struct Assembling {
  code: Code,
  token: Token,
  options: OptionList,
  payload: Vec<u8>,
}

/// One CoAP-over-TCP connection's worth of exchange state.
#[derive(Debug)]
pub struct TcpContext {
  config: TcpConfig,
  peer_addr: SocketAddr,
  parser: Parser,
  pending: PendingRequests,
  peer_csm: PeerCsm,
  csm_sent: bool,
  handshake_deadline: Instant,
  aborted: bool,
  assembling: Option<Assembling>,
}

impl std::fmt::Debug for Assembling {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Assembling").field("code", &self.code).field("token", &self.token).finish()
  }
}

impl TcpContext {
  /// Build a context for a freshly-connected peer. `now` seeds the CSM
  /// handshake deadline; call [`Self::handshake`] immediately afterward to
  /// get the bytes of this endpoint's own CSM to write to the stream.
  pub fn new(config: TcpConfig, peer_addr: SocketAddr, now: Instant) -> Self {
    Self { handshake_deadline: now.saturating_add(config.csm_timeout),
           parser: Parser::with_max_region_len(config.max_message_size as usize),
           config,
           peer_addr,
           pending: PendingRequests::new(),
           peer_csm: PeerCsm::default(),
           csm_sent: false,
           aborted: false,
           assembling: None }
  }

  /// This endpoint's own CSM, to be sent once at connection start.
  pub fn handshake(&mut self) -> Result<Vec<u8>, Error> {
    self.csm_sent = true;
    let msg = signaling::build_csm(&self.config);
    Ok(TcpMessage { message: msg }.to_bytes(self.config.max_message_size as usize)?)
  }

  /// Whether the peer's CSM has been received yet.
  pub fn csm_negotiated(&self) -> bool {
    self.peer_csm.received
  }

  /// Send a request, registering it as pending until a response or timeout.
  pub fn send_request(&mut self,
                       now: Instant,
                       code: Code,
                       token: Token,
                       options: OptionList,
                       payload: Vec<u8>)
                       -> Result<Vec<u8>, Error> {
    if self.aborted {
      return Err(Error::TcpAbortSent);
    }
    let bytes = self.encode(code, token, options, payload)?;
    self.pending.insert(token, now.saturating_add(self.config.request_timeout));
    Ok(bytes)
  }

  /// Send a response (or a chunk of an observe notification) for a
  /// previously-received request. Does not register any pending state;
  /// the request side owns that bookkeeping.
  pub fn send_response(&mut self,
                        code: Code,
                        token: Token,
                        options: OptionList,
                        payload: Vec<u8>)
                        -> Result<Vec<u8>, Error> {
    if self.aborted {
      return Err(Error::TcpAbortSent);
    }
    self.encode(code, token, options, payload)
  }

  fn encode(&self, code: Code, token: Token, options: OptionList, payload: Vec<u8>) -> Result<Vec<u8>, Error> {
    let message = Message { code, token, options, payload };
    let capacity = (self.config.max_message_size as usize).min(self.peer_csm.max_message_size as usize);
    Ok(TcpMessage { message }.to_bytes(capacity)?)
  }

  /// Feed newly-received bytes. Returns protocol-level frames this context
  /// needs written back (Pong replies, an Abort if something was fatally
  /// malformed); application response/request delivery happens through the
  /// `upper` callbacks.
  pub fn receive(&mut self, now: Instant, bytes: &[u8], upper: &mut dyn Upper) -> Result<Vec<Vec<u8>>, Error> {
    if self.aborted {
      return Err(Error::TcpAbortSent);
    }

    let mut outgoing = Vec::new();

    for event in self.parser.feed(bytes) {
      let chunk = match event {
        | Ok(chunk) => chunk,
        | Err(Error::TcpFrameTooLarge { code, token }) => {
          log::warn!("tcp frame with code {code:?} exceeded the negotiated max message size, discarding");
          if code.kind() == CodeKind::Request {
            let reply = Message::new(Code::INTERNAL_SERVER_ERROR, token);
            let frame_msg = TcpMessage { message: reply };
            if let Ok(frame) = frame_msg.to_bytes(self.config.max_message_size as usize) {
              outgoing.push(frame);
            }
          }
          continue;
        },
        | Err(e) => {
          log::warn!("malformed tcp frame: {e}");
          let abort = signaling::build_abort(&e.to_string());
          let frame_msg = TcpMessage { message: abort };
          if let Ok(frame) = frame_msg.to_bytes(self.config.max_message_size as usize) {
            outgoing.push(frame);
          }
          self.aborted = true;
          return Ok(outgoing);
        },
      };

      match chunk.code.kind() {
        | CodeKind::Response => {
          self.deliver_response(now, chunk, upper);
        },
        | CodeKind::Request | CodeKind::Signaling => {
          if chunk.payload_offset == 0 {
            self.assembling = Some(Assembling { code: chunk.code,
                                                 token: chunk.token,
                                                 options: chunk.options,
                                                 payload: Vec::new() });
          }
          if let Some(a) = self.assembling.as_mut() {
            a.payload.extend_from_slice(&chunk.chunk);
          }
          if chunk.is_final {
            if let Some(a) = self.assembling.take() {
              let msg = Message { code: a.code,
                                   token: a.token,
                                   options: a.options,
                                   payload: a.payload };
              if msg.code.kind() == CodeKind::Signaling {
                match self.handle_signaling(&msg) {
                  | Ok(Some(frame)) => outgoing.push(frame),
                  | Ok(None) => {},
                  | Err(Error::TcpUnknownCsmCriticalOptionReceived(n)) => {
                    let abort = signaling::build_abort(&format!("unknown critical csm option {n}"));
                    let frame_msg = TcpMessage { message: abort };
                    if let Ok(frame) = frame_msg.to_bytes(self.config.max_message_size as usize) {
                      outgoing.push(frame);
                    }
                    self.aborted = true;
                    return Err(Error::TcpUnknownCsmCriticalOptionReceived(n));
                  },
                  | Err(e) => return Err(e),
                }
              } else {
                upper.on_request(self.peer_addr, &msg);
              }
            }
          }
        },
        | CodeKind::Empty => log::warn!("unexpected empty message on a tcp connection"),
      }
    }

    Ok(outgoing)
  }

  fn deliver_response(&mut self, now: Instant, chunk: super::parser::PayloadChunk, upper: &mut dyn Upper) {
    if !self.pending.contains(chunk.token) {
      log::debug!("tcp response for unknown token {:?}, ignoring", chunk.token);
      return;
    }

    let partial = Message { code: chunk.code,
                             token: chunk.token,
                             options: chunk.options,
                             payload: chunk.chunk };
    let status = if chunk.is_final { ResponseStatus::Ok } else { ResponseStatus::PartialContent };
    let disposition = upper.on_response(self.peer_addr, chunk.token, Some(&partial), status);

    if chunk.is_final {
      if disposition == Disposition::Accepted {
        self.pending.remove(chunk.token);
      }
    } else {
      self.pending.refresh(chunk.token, now.saturating_add(self.config.request_timeout));
    }
  }

  fn handle_signaling(&mut self, msg: &Message) -> Result<Option<Vec<u8>>, Error> {
    if msg.code == Code::CSM {
      signaling::apply_csm(&mut self.peer_csm, msg)?;
      Ok(None)
    } else if msg.code == Code::PING {
      let pong = signaling::build_pong(msg.token);
      let frame = TcpMessage { message: pong }.to_bytes(self.config.max_message_size as usize)?;
      Ok(Some(frame))
    } else if msg.code == Code::PONG {
      log::debug!("pong received");
      Ok(None)
    } else if msg.code == Code::RELEASE {
      Err(Error::TcpReleaseReceived)
    } else if msg.code == Code::ABORT {
      log::warn!("peer sent abort: {}", String::from_utf8_lossy(&msg.payload));
      Err(Error::TcpAbortReceived)
    } else {
      Ok(None)
    }
  }

  /// Sweep the handshake deadline and the pending-request list, failing
  /// whatever has timed out. Returns no bytes: TCP has nothing to resend.
  pub fn on_timeout(&mut self, now: Instant, upper: &mut dyn Upper) -> Result<(), Error> {
    if self.csm_sent && !self.peer_csm.received && now >= self.handshake_deadline {
      self.aborted = true;
      return Err(Error::TcpCsmNotReceived);
    }

    for token in self.pending.drain_expired(now) {
      upper.on_response(self.peer_addr, token, None, ResponseStatus::Fail(Error::Timeout));
    }
    Ok(())
  }
}

impl Context for TcpContext {
  fn max_outgoing_payload_size(&self, token_len: usize, options_size: usize, _code: Code) -> usize {
    let header_overhead = 5 + token_len + options_size + 1;
    let capacity = (self.config.max_message_size as usize).min(self.peer_csm.max_message_size as usize);
    capacity.saturating_sub(header_overhead)
  }

  fn max_incoming_payload_size(&self) -> usize {
    self.config.max_message_size as usize
  }

  fn abort_delivery(&mut self, token: Token, result: Error, upper: &mut dyn Upper) {
    if self.pending.remove(token) {
      upper.on_response(self.peer_addr, token, None, ResponseStatus::Fail(result));
    }
  }

  fn ignore_current_request(&mut self) {
    self.assembling = None;
  }

  fn next_timeout_due(&self) -> Option<Instant> {
    let handshake = (self.csm_sent && !self.peer_csm.received).then_some(self.handshake_deadline);
    match (handshake, self.pending.next_expiry()) {
      | (Some(a), Some(b)) => Some(a.min(b)),
      | (Some(a), None) => Some(a),
      | (None, Some(b)) => Some(b),
      | (None, None) => None,
    }
  }
}
