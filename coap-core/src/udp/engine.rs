//! The UDP exchange engine: NSTART admission, retransmission, deduplication,
//! and observe-cancellation, built on the datagram codec in `coap-msg`.
//!
//! Like the TCP engine, this context owns no socket. Every method that
//! would put bytes on the wire instead returns them (or `None` when NSTART
//! admission defers the send); the caller owns the actual `UdpSocket` and
//! is expected to call [`UdpContext::receive`] with whatever bytes arrive.

use std::net::SocketAddr;

use coap_msg::option::OptionList;
use coap_msg::{Code, CodeKind, Token, Type, UdpMessage};

use crate::config::Udp as UdpConfig;
use crate::context::Context;
use crate::error::Error;
use crate::prng::Prng;
use crate::time::Instant;
use crate::udp::cache::ResponseCache;
use crate::udp::exchange::{UnconfirmedList, UnconfirmedMessage};
use crate::udp::notify_cache::NotifyCache;
use crate::upper::{ResponseStatus, Upper};

/// The identity of the request this context is currently replying to
/// (set by `receive` when a request arrives, cleared once a response is sent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CurrentRequest {
  addr: SocketAddr,
  msg_id: u16,
}

/// The UDP-transport half of the engine.
#[derive(Debug)]
pub struct UdpContext<P> {
  config: UdpConfig,
  prng: P,
  next_msg_id: u16,
  unconfirmed: UnconfirmedList,
  response_cache: ResponseCache,
  notify_cache: NotifyCache,
  current_request: Option<CurrentRequest>,
}

impl<P: Prng> UdpContext<P> {
  /// Build a context with the given configuration and random source. The
  /// outbound message-id counter is seeded once from `prng` here, then
  /// incremented monotonically for every datagram sent afterward.
  pub fn new(config: UdpConfig, mut prng: P) -> Self {
    let response_cache = ResponseCache::new(config.response_cache_capacity);
    let notify_cache = NotifyCache::new(config.notify_cache_capacity);
    let next_msg_id = prng.next_message_id_seed();
    Self { config,
           prng,
           next_msg_id,
           unconfirmed: UnconfirmedList::new(),
           response_cache,
           notify_cache,
           current_request: None }
  }

  /// The next outbound message id, post-incrementing the counter.
  fn next_message_id(&mut self) -> u16 {
    let id = self.next_msg_id;
    self.next_msg_id = self.next_msg_id.wrapping_add(1);
    id
  }

  /// Send a new request. Returns the token to correlate the eventual
  /// response, and the bytes to transmit now, or `None` if NSTART
  /// admission deferred the send (it will appear from a later
  /// [`UdpContext::on_timeout`] call once a slot frees up).
  pub fn send_request(&mut self,
                       now: Instant,
                       to: SocketAddr,
                       code: Code,
                       options: OptionList,
                       payload: Vec<u8>,
                       confirmable: bool)
                       -> Result<(Token, Option<Vec<u8>>), Error> {
    let token = self.prng.next_token(8);
    let msg_id = self.next_message_id();
    let ty = if confirmable { Type::Con } else { Type::Non };

    let message = coap_msg::Message { code,
                                       token,
                                       options,
                                       payload };
    let bytes = UdpMessage { ty,
                             id: msg_id,
                             message }.to_bytes(self.max_incoming_payload_size())?;

    if !confirmable {
      return Ok((token, Some(bytes)));
    }

    let was_held_slot_full = self.unconfirmed.active_count() >= self.config.nstart;
    let entry = UnconfirmedMessage::new(token,
                                        msg_id,
                                        to,
                                        bytes.clone(),
                                        now,
                                        self.config.con.unacked_retry_strategy,
                                        self.config.con.max_attempts,
                                        was_held_slot_full);
    self.unconfirmed.insert(entry, self.config.nstart);

    Ok((token, if was_held_slot_full { None } else { Some(bytes) }))
  }

  /// Send a piggybacked ACK response to the request currently being
  /// processed (set by the most recent [`UdpContext::receive`] call that
  /// delivered a request). Consumes the "current request" marker.
  pub fn send_piggybacked_response(&mut self,
                                    now: Instant,
                                    code: Code,
                                    token: Token,
                                    options: OptionList,
                                    payload: Vec<u8>,
                                    observe: bool)
                                    -> Result<Vec<u8>, Error> {
    let current = self.current_request
                      .take()
                      .ok_or_else(|| Error::Transport("no request currently in flight to piggyback onto".into()))?;
    let (to, id) = (current.addr, current.msg_id);

    let message = coap_msg::Message { code,
                                       token,
                                       options,
                                       payload };
    let bytes = UdpMessage { ty: Type::Ack,
                             id,
                             message }.to_bytes(self.max_incoming_payload_size())?;

    self.response_cache
        .insert(to, id, bytes.clone(), now, self.config.exchange_lifetime());

    if observe {
      self.notify_cache.insert(id, token);
    }

    Ok(bytes)
  }

  /// Send a response not piggybacked on a request's ACK: a fresh CON/NON
  /// datagram with its own message id (used for separate responses and for
  /// observe notifications, which are not replies to any specific request).
  #[allow(clippy::too_many_arguments)]
  pub fn send_separate_response(&mut self,
                                 now: Instant,
                                 to: SocketAddr,
                                 code: Code,
                                 token: Token,
                                 options: OptionList,
                                 payload: Vec<u8>,
                                 observe: bool,
                                 confirmable: bool)
                                 -> Result<(u16, Vec<u8>), Error> {
    let msg_id = self.next_message_id();
    let ty = if confirmable { Type::Con } else { Type::Non };
    let message = coap_msg::Message { code,
                                       token,
                                       options,
                                       payload };
    let bytes = UdpMessage { ty,
                             id: msg_id,
                             message }.to_bytes(self.max_incoming_payload_size())?;

    self.response_cache
        .insert(to, msg_id, bytes.clone(), now, self.config.exchange_lifetime());

    if observe {
      self.notify_cache.insert(msg_id, token);
    }

    if confirmable {
      let entry = UnconfirmedMessage::new(token,
                                          msg_id,
                                          to,
                                          bytes.clone(),
                                          now,
                                          self.config.con.acked_retry_strategy,
                                          self.config.con.max_attempts,
                                          false);
      self.unconfirmed.insert(entry, self.config.nstart);
    }

    Ok((msg_id, bytes))
  }

  /// Feed a received datagram through the engine. Returns bytes to send
  /// back to `from` (an ACK, RST, or cached duplicate reply), if any.
  pub fn receive(&mut self,
                 now: Instant,
                 from: SocketAddr,
                 datagram: &[u8],
                 upper: &mut dyn Upper)
                 -> Result<Option<Vec<u8>>, Error> {
    let msg = UdpMessage::parse(datagram)?;

    match msg.message.code.kind() {
      | CodeKind::Request => self.receive_request(now, from, msg, upper),
      | CodeKind::Response => self.receive_response(now, from, msg, upper),
      | CodeKind::Empty => self.receive_empty(now, from, msg, upper),
      | CodeKind::Signaling => {
        log::warn!("ignoring signaling code on udp transport from {from}");
        Ok(None)
      },
    }
  }

  /// Handle a datagram the transport reported as truncated in flight.
  pub fn receive_truncated(&mut self,
                            _now: Instant,
                            from: SocketAddr,
                            partial: coap_msg::TruncatedUdpMessage,
                            upper: &mut dyn Upper)
                            -> Option<Vec<u8>> {
    let header = partial.header?;
    let token = partial.token?;
    if !partial.options_and_payload_present {
      return None;
    }

    match header.code.kind() {
      | CodeKind::Request => {
        let message = coap_msg::Message::new(Code::REQUEST_ENTITY_TOO_LARGE, token);
        UdpMessage { ty: Type::Ack,
                     id: header.id,
                     message }.to_bytes(self.max_incoming_payload_size())
                              .ok()
      },
      | CodeKind::Response => {
        if let Some(entry) = self.unconfirmed.remove_by_token(token) {
          upper.on_response(from,
                            token,
                            None,
                            ResponseStatus::Fail(Error::TruncatedMessageReceived));
          let _ = entry;
        }
        None
      },
      | _ => None,
    }
  }

  fn receive_request(&mut self,
                      _now: Instant,
                      from: SocketAddr,
                      msg: UdpMessage,
                      upper: &mut dyn Upper)
                      -> Result<Option<Vec<u8>>, Error> {
    self.current_request = Some(CurrentRequest { addr: from,
                                                  msg_id: msg.id });

    if let Some(cached) = self.response_cache.get(from, msg.id) {
      return Ok(Some(cached.to_vec()));
    }

    upper.on_request(from, &msg.message);
    Ok(None)
  }

  fn receive_response(&mut self,
                       now: Instant,
                       from: SocketAddr,
                       msg: UdpMessage,
                       upper: &mut dyn Upper)
                       -> Result<Option<Vec<u8>>, Error> {
    let token = msg.message.token;

    let matched = match msg.ty {
      | Type::Ack => self.unconfirmed.find_by_addr_and_id(from, msg.id).is_some(),
      | _ => self.unconfirmed.find_by_token(token).is_some(),
    };

    if !matched {
      return Ok(if msg.ty == Type::Con {
        let reset = coap_msg::Message::new(Code::EMPTY, Token::EMPTY);
        Some(UdpMessage { ty: Type::Reset,
                          id: msg.id,
                          message: reset }.to_bytes(self.max_incoming_payload_size())?)
      } else {
        None
      });
    }

    match msg.ty {
      | Type::Con => {
        // A separate response carried as CON: ACK it, but keep the
        // exchange open (frozen, like an empty-ACK defer) so further
        // content for this token - another block, another notification -
        // still matches instead of being treated as unsolicited.
        if let Some(entry) = self.unconfirmed.find_by_token_mut(token) {
          entry.freeze(now + self.config.exchange_lifetime());
        }
        upper.on_response(from, token, Some(&msg.message), ResponseStatus::PartialContent);
        let ack = coap_msg::Message::new(Code::EMPTY, Token::EMPTY);
        Ok(Some(UdpMessage { ty: Type::Ack,
                             id: msg.id,
                             message: ack }.to_bytes(self.max_incoming_payload_size())?))
      },
      | Type::Ack | Type::Non => {
        self.unconfirmed.remove_by_token(token);
        let disposition =
          upper.on_response(from, token, Some(&msg.message), ResponseStatus::Ok);
        let _ = disposition;
        let _ = now;
        Ok(None)
      },
      | Type::Reset => unreachable!("reset carries code 0.00, handled in receive_empty"),
    }
  }

  fn receive_empty(&mut self,
                    now: Instant,
                    from: SocketAddr,
                    msg: UdpMessage,
                    upper: &mut dyn Upper)
                    -> Result<Option<Vec<u8>>, Error> {
    match msg.ty {
      | Type::Con => {
        let reset = coap_msg::Message::new(Code::EMPTY, Token::EMPTY);
        Ok(Some(UdpMessage { ty: Type::Reset,
                             id: msg.id,
                             message: reset }.to_bytes(self.max_incoming_payload_size())?))
      },
      | Type::Ack => {
        if let Some(entry) = self.unconfirmed.iter_mut().find(|e| e.addr == from && e.msg_id == msg.id) {
          entry.freeze(now + self.config.exchange_lifetime());
        }
        Ok(None)
      },
      | Type::Reset => {
        if let Some(entry) = self.unconfirmed.remove_by_addr_and_id(from, msg.id) {
          upper.on_response(from, entry.token, None, ResponseStatus::Fail(Error::ResetReceived));
        }
        if let Some(token) = self.notify_cache.take(msg.id) {
          upper.on_observe_cancel(token);
        }
        Ok(None)
      },
      | Type::Non => {
        log::warn!("ignoring unexpected non-confirmable empty message from {from}");
        Ok(None)
      },
    }
  }

  /// Process a retransmission sweep. Returns `(addr, bytes)` pairs to
  /// (re)transmit. Entries that exhaust `MAX_RETRANSMIT` are removed and
  /// failed via `upper`.
  pub fn on_timeout(&mut self, now: Instant, upper: &mut dyn Upper) -> Vec<(SocketAddr, Vec<u8>)> {
    let mut to_send = Vec::new();
    let mut timed_out = Vec::new();

    for entry in self.unconfirmed.iter_mut() {
      if entry.hold {
        continue;
      }
      match entry.poll(now) {
        | crate::retry::YouShould::Retry => to_send.push((entry.addr, entry.bytes.clone())),
        | crate::retry::YouShould::GiveUp => timed_out.push(entry.token),
        | crate::retry::YouShould::Wait => {},
      }
    }

    for token in timed_out {
      if let Some(entry) = self.unconfirmed.remove_by_token(token) {
        upper.on_response(entry.addr, token, None, ResponseStatus::Fail(Error::Timeout));
        if let Some(promoted) = self.unconfirmed.promote_one_held(now) {
          to_send.push((promoted.addr, promoted.bytes.clone()));
        }
      }
    }

    to_send
  }
}

impl<P: Prng> Context for UdpContext<P> {
  fn max_outgoing_payload_size(&self, token_len: usize, options_size: usize, _code: Code) -> usize {
    let header = 4;
    let marker = 1;
    let overhead = header + token_len + options_size + marker;
    self.max_incoming_payload_size().saturating_sub(overhead)
  }

  fn max_incoming_payload_size(&self) -> usize {
    1152
  }

  fn abort_delivery(&mut self, token: Token, result: Error, upper: &mut dyn Upper) {
    if let Some(entry) = self.unconfirmed.remove_by_token(token) {
      upper.on_response(entry.addr, token, None, ResponseStatus::Fail(result));
    }
  }

  fn ignore_current_request(&mut self) {
    self.current_request = None;
  }

  fn next_timeout_due(&self) -> Option<Instant> {
    self.unconfirmed.next_due()
  }
}

#[cfg(test)]
mod tests {
  use coap_msg::option::Opt;

  use super::*;
  use crate::prng::ChaCha8Prng;
  use crate::retry::Attempts;
  use crate::upper::Disposition;

  struct RecordingUpper {
    requests: Vec<coap_msg::Message>,
    responses: Vec<(Token, ResponseStatus)>,
    cancelled: Vec<Token>,
  }

  impl RecordingUpper {
    fn new() -> Self {
      Self { requests: Vec::new(),
             responses: Vec::new(),
             cancelled: Vec::new() }
    }
  }

  impl Upper for RecordingUpper {
    fn on_request(&mut self, _from: SocketAddr, message: &coap_msg::Message) {
      self.requests.push(message.clone());
    }

    fn on_response(&mut self,
                    _from: SocketAddr,
                    token: Token,
                    _message: Option<&coap_msg::Message>,
                    status: ResponseStatus)
                    -> Disposition {
      self.responses.push((token, status));
      Disposition::Accepted
    }

    fn on_observe_cancel(&mut self, token: Token) {
      self.cancelled.push(token);
    }
  }

  fn addr() -> SocketAddr {
    "127.0.0.1:5683".parse().unwrap()
  }

  fn ctx() -> UdpContext<ChaCha8Prng> {
    UdpContext::new(UdpConfig::default(), ChaCha8Prng::from_seed(1))
  }

  #[test]
  fn con_get_then_piggybacked_content() {
    let mut client = ctx();
    let mut server = ctx();
    let now = Instant::from_millis(0);

    let mut opts = OptionList::new();
    opts.insert(Opt::new(11, b"1".to_vec()));
    let (token, bytes) = client.send_request(now, addr(), Code::GET, opts, vec![], true).unwrap();
    let bytes = bytes.unwrap();

    let mut server_upper = RecordingUpper::new();
    let reply = server.receive(now, addr(), &bytes, &mut server_upper).unwrap();
    assert!(reply.is_none());
    assert_eq!(server_upper.requests.len(), 1);

    let ack = server.send_piggybacked_response(now,
                                               Code::CONTENT,
                                               token,
                                               OptionList::new(),
                                               b"hi".to_vec(),
                                               false)
                    .unwrap();

    let mut client_upper = RecordingUpper::new();
    let reply = client.receive(now, addr(), &ack, &mut client_upper).unwrap();
    assert!(reply.is_none());
    assert_eq!(client_upper.responses.len(), 1);
    assert_eq!(client_upper.responses[0].0, token);
  }

  #[test]
  fn duplicate_request_returns_cached_response_without_reinvoking_upper() {
    let mut server = ctx();
    let now = Instant::from_millis(0);

    let message = coap_msg::Message::new(Code::PUT, Token::new(b"T"));
    let datagram = UdpMessage { ty: Type::Con,
                               id: 0x1111,
                               message }.to_bytes(1152)
                                        .unwrap();

    let mut upper = RecordingUpper::new();
    server.receive(now, addr(), &datagram, &mut upper).unwrap();
    assert_eq!(upper.requests.len(), 1);

    server.send_piggybacked_response(now,
                                     Code::CHANGED,
                                     Token::new(b"T"),
                                     OptionList::new(),
                                     vec![],
                                     false)
          .unwrap();

    let reply = server.receive(now, addr(), &datagram, &mut upper).unwrap();
    assert!(reply.is_some());
    assert_eq!(upper.requests.len(), 1, "upper must not see the duplicate");
  }

  #[test]
  fn reset_cancels_tracked_notification() {
    let mut server = ctx();
    let now = Instant::from_millis(0);
    let token = Token::new(b"N");

    let (msg_id, _) = server.send_separate_response(now,
                                                     addr(),
                                                     Code::CONTENT,
                                                     token,
                                                     OptionList::new(),
                                                     vec![],
                                                     true,
                                                     true)
                             .unwrap();

    let rst = coap_msg::Message::new(Code::EMPTY, Token::EMPTY);
    let datagram = UdpMessage { ty: Type::Reset,
                               id: msg_id,
                               message: rst }.to_bytes(1152)
                                             .unwrap();

    let mut upper = RecordingUpper::new();
    server.receive(now, addr(), &datagram, &mut upper).unwrap();
    assert_eq!(upper.cancelled, vec![token]);
  }

  #[test]
  fn nstart_defers_second_request_until_first_completes() {
    let mut client = ctx();
    let now = Instant::from_millis(0);

    let (_t1, b1) = client.send_request(now, addr(), Code::GET, OptionList::new(), vec![], true).unwrap();
    assert!(b1.is_some());

    let (_t2, b2) = client.send_request(now, addr(), Code::GET, OptionList::new(), vec![], true).unwrap();
    assert!(b2.is_none(), "second CON should be held under NSTART=1");
  }

  #[test]
  fn block1_upload_echoes_block_option_and_retransmit_keeps_id_and_token() {
    use coap_msg::{option::number::BLOCK1, Block};

    let mut client = ctx();
    let mut server = ctx();
    let now = Instant::from_millis(0);

    let blocks = [Block::new(1024, 0, true).unwrap(),
                  Block::new(1024, 1, true).unwrap(),
                  Block::new(1024, 2, false).unwrap()];
    let expected_replies = [Code::CONTINUE, Code::CONTINUE, Code::CHANGED];

    let mut server_upper = RecordingUpper::new();
    let mut sent_ids = Vec::new();
    let mut sent_tokens = Vec::new();

    for (block, expect_code) in blocks.iter().zip(expected_replies) {
      let mut opts = OptionList::new();
      opts.insert(Opt::new(BLOCK1, block.to_value()));
      let (token, bytes) =
        client.send_request(now, addr(), Code::POST, opts, vec![7u8; 1024], true).unwrap();
      let bytes = bytes.unwrap();

      server.receive(now, addr(), &bytes, &mut server_upper).unwrap();
      let request = server_upper.requests.last().unwrap();
      let echoed = Block::parse(request.options.get(BLOCK1).unwrap().as_bytes(), false).unwrap();
      assert_eq!(echoed.num(), block.num());

      let mut reply_opts = OptionList::new();
      reply_opts.insert(Opt::new(BLOCK1, block.to_value()));
      let ack = server.send_piggybacked_response(now, expect_code, token, reply_opts, vec![], false)
                      .unwrap();

      let mut client_upper = RecordingUpper::new();
      client.receive(now, addr(), &ack, &mut client_upper).unwrap();
      assert_eq!(client_upper.responses.last().unwrap().0, token);

      sent_tokens.push(token);
      sent_ids.push(UdpMessage::parse(&bytes).unwrap().id);
    }

    // Retransmitting the middle request (NUM=1) must reuse the same id/token.
    let mut opts = OptionList::new();
    opts.insert(Opt::new(BLOCK1, blocks[1].to_value()));
    let mut client2 = ctx();
    let (token, bytes) =
      client2.send_request(now, addr(), Code::POST, opts, vec![7u8; 1024], true).unwrap();
    let first_send_id = UdpMessage::parse(&bytes.unwrap()).unwrap().id;

    let resends = client2.on_timeout(now + client2.config.con.unacked_retry_strategy.max_time(Attempts(1)),
                                     &mut server_upper);
    assert_eq!(resends.len(), 1);
    let resent_id = UdpMessage::parse(&resends[0].1).unwrap().id;
    assert_eq!(resent_id, first_send_id);
    let resent_token = UdpMessage::parse(&resends[0].1).unwrap().message.token;
    assert_eq!(resent_token, token);
  }

  #[test]
  fn empty_ack_freezes_retransmission_until_separate_response() {
    let mut cfg = UdpConfig::default();
    cfg.con.max_attempts = Attempts(2);
    cfg.con.unacked_retry_strategy =
      crate::retry::Strategy::Delay { min: std::time::Duration::from_millis(100),
                                      max: std::time::Duration::from_millis(100) };
    let mut client = UdpContext::new(cfg, ChaCha8Prng::from_seed(1));
    let now = Instant::from_millis(0);
    let (token, bytes) =
      client.send_request(now, addr(), Code::GET, OptionList::new(), vec![], true).unwrap();
    let request_id = UdpMessage::parse(&bytes.unwrap()).unwrap().id;

    let empty_ack = UdpMessage { ty: Type::Ack,
                                 id: request_id,
                                 message: coap_msg::Message::new(Code::EMPTY, Token::EMPTY) }
      .to_bytes(1152)
      .unwrap();
    let mut upper = RecordingUpper::new();
    client.receive(now, addr(), &empty_ack, &mut upper).unwrap();

    // Well past the retry interval: without the freeze this would resend
    // the request and eventually time it out. Frozen, it must do neither
    // until exchange lifetime elapses.
    let resends = client.on_timeout(Instant::from_millis(500), &mut upper);
    assert!(resends.is_empty(), "frozen exchange must not retransmit");
    assert!(upper.responses.is_empty(), "frozen exchange must not time out early");

    let separate = UdpMessage { ty: Type::Con,
                                id: request_id.wrapping_add(1),
                                message: coap_msg::Message::new(Code::CONTENT, token) }
      .to_bytes(1152)
      .unwrap();
    let reply = client.receive(Instant::from_millis(600), addr(), &separate, &mut upper).unwrap();
    assert!(reply.is_some(), "separate response must be ACKed");
    assert_eq!(upper.responses.last().unwrap().0, token);
    assert!(matches!(upper.responses.last().unwrap().1, ResponseStatus::PartialContent));
  }

  #[test]
  fn con_response_leaves_exchange_open_for_further_content() {
    let mut client = ctx();
    let now = Instant::from_millis(0);
    let (token, _) =
      client.send_request(now, addr(), Code::GET, OptionList::new(), vec![], true).unwrap();

    let mut upper = RecordingUpper::new();
    let first = UdpMessage { ty: Type::Con,
                             id: 900,
                             message: coap_msg::Message::new(Code::CONTENT, token) }.to_bytes(1152)
                                                                                    .unwrap();
    let reply = client.receive(now, addr(), &first, &mut upper).unwrap();
    assert!(reply.is_some(), "first separate response must be ACKed, not RST");
    assert_eq!(upper.responses.len(), 1);

    // Further content for the same token must still match the (still
    // open) exchange instead of being treated as unsolicited and reset.
    let second = UdpMessage { ty: Type::Con,
                              id: 901,
                              message: coap_msg::Message::new(Code::CONTENT, token) }.to_bytes(1152)
                                                                                     .unwrap();
    let reply = client.receive(now, addr(), &second, &mut upper).unwrap();
    assert!(reply.is_some());
    let reply = UdpMessage::parse(&reply.unwrap()).unwrap();
    assert_eq!(reply.ty, Type::Ack, "must ACK, not RST, since the exchange is still open");
    assert_eq!(upper.responses.len(), 2);
  }

  #[test]
  fn timeout_exhausts_retransmits_and_fails_exchange() {
    let mut cfg = UdpConfig::default();
    cfg.con.max_attempts = Attempts(2);
    cfg.con.unacked_retry_strategy =
      crate::retry::Strategy::Delay { min: std::time::Duration::from_millis(100),
                                      max: std::time::Duration::from_millis(100) };
    let mut client = UdpContext::new(cfg, ChaCha8Prng::from_seed(1));
    let now = Instant::from_millis(0);
    let (token, _) = client.send_request(now, addr(), Code::GET, OptionList::new(), vec![], true).unwrap();

    let mut upper = RecordingUpper::new();
    let resends = client.on_timeout(Instant::from_millis(100), &mut upper);
    assert_eq!(resends.len(), 1);
    assert!(upper.responses.is_empty());

    let resends = client.on_timeout(Instant::from_millis(10_000), &mut upper);
    assert!(resends.is_empty());
    assert_eq!(upper.responses.len(), 1);
    assert_eq!(upper.responses[0].0, token);
    assert!(matches!(upper.responses[0].1, ResponseStatus::Fail(Error::Timeout)));
  }
}
