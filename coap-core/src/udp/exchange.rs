//! The list of in-flight confirmable messages awaiting ACK/RST, ordered so
//! the head is always the next one due for action.

use std::net::SocketAddr;

use coap_msg::Token;

use crate::retry::{Attempts, RetryTimer, Strategy, YouShould};
use crate::time::Instant;

/// A confirmable message this context is tracking until it's ACKed, RST,
/// or exhausts its retransmissions.
#[derive(Debug, Clone)]
pub struct UnconfirmedMessage {
  /// the token the caller used, for correlating with the response
  pub token: Token,
  /// the message id stamped on the wire bytes
  pub msg_id: u16,
  /// where the datagram was sent
  pub addr: SocketAddr,
  /// the serialized datagram, kept for resending
  pub bytes: Vec<u8>,
  retry: RetryTimer,
  /// true once NSTART admission has deferred this entry's first send
  pub hold: bool,
  /// when this entry is next due for action (send, if held and just
  /// promoted; retransmit, otherwise). Kept in sync with the retry
  /// timer's own notion of "next due" so callers that only inspect the
  /// data model (rather than calling `poll`) still see an accurate time.
  pub next_due: Instant,
  /// set while retransmission is frozen awaiting a separate response
  /// (RFC 7252 § 4.2 empty ACK, or an ongoing block-wise/observe
  /// exchange): `poll` neither retries nor gives up before this instant,
  /// and gives up once it passes.
  frozen_until: Option<Instant>,
}

impl UnconfirmedMessage {
  /// Build a new unconfirmed entry. `hold` entries are not yet sent.
  #[allow(clippy::too_many_arguments)]
  pub fn new(token: Token,
             msg_id: u16,
             addr: SocketAddr,
             bytes: Vec<u8>,
             now: Instant,
             strategy: Strategy,
             max_attempts: Attempts,
             hold: bool)
             -> Self {
    let retry = RetryTimer::new(now, strategy, max_attempts);
    let next_due = retry.next_due();
    Self { token,
           msg_id,
           addr,
           bytes,
           retry,
           hold,
           next_due,
           frozen_until: None }
  }

  /// Number of attempts made so far.
  pub fn attempts(&self) -> Attempts {
    self.retry.attempts()
  }

  /// Ask the retry timer whether it's time to retransmit, given `now`.
  /// While frozen, retransmission is suppressed entirely: the exchange
  /// waits for the frozen deadline and then gives up, rather than
  /// resuming retries.
  pub fn poll(&mut self, now: Instant) -> YouShould {
    if let Some(until) = self.frozen_until {
      self.next_due = until;
      return if now >= until { YouShould::GiveUp } else { YouShould::Wait };
    }
    let result = self.retry.poll(now);
    self.next_due = self.retry.next_due();
    result
  }

  /// Freeze retransmission until `until`: no more retries are sent, and
  /// the exchange is given up on only once `until` passes (RFC 7252
  /// § 4.2's "freeze retransmission and extend next_retransmit by
  /// EXCHANGE_LIFETIME").
  pub fn freeze(&mut self, until: Instant) {
    self.frozen_until = Some(until);
    self.next_due = until;
  }

  /// Release a held entry: it becomes eligible for immediate send.
  pub fn release_hold(&mut self, now: Instant) {
    self.hold = false;
    self.next_due = now;
  }
}

/// The ordered collection of unconfirmed exchanges. Invariant: at most
/// `nstart` entries have `hold == false`; among those, ordering is by
/// ascending `next_due`.
#[derive(Debug, Default)]
pub struct UnconfirmedList {
  entries: Vec<UnconfirmedMessage>,
}

impl UnconfirmedList {
  /// An empty list.
  pub fn new() -> Self {
    Self { entries: Vec::new() }
  }

  /// Count of entries that are not on hold.
  pub fn active_count(&self) -> usize {
    self.entries.iter().filter(|e| !e.hold).count()
  }

  /// Insert a new entry, respecting NSTART admission: if `nstart` active
  /// entries already exist, the new one starts on hold.
  pub fn insert(&mut self, mut entry: UnconfirmedMessage, nstart: usize) {
    entry.hold = self.active_count() >= nstart;
    self.entries.push(entry);
  }

  /// Find an entry by token.
  pub fn find_by_token(&self, token: Token) -> Option<&UnconfirmedMessage> {
    self.entries.iter().find(|e| e.token == token)
  }

  /// Find an entry by token, mutably.
  pub fn find_by_token_mut(&mut self, token: Token) -> Option<&mut UnconfirmedMessage> {
    self.entries.iter_mut().find(|e| e.token == token)
  }

  /// Find an entry by (addr, msg_id) pair, used to correlate ACK/RST.
  pub fn find_by_addr_and_id(&self, addr: SocketAddr, msg_id: u16) -> Option<&UnconfirmedMessage> {
    self.entries.iter().find(|e| e.addr == addr && e.msg_id == msg_id)
  }

  /// Remove and return the entry with the given token.
  pub fn remove_by_token(&mut self, token: Token) -> Option<UnconfirmedMessage> {
    let pos = self.entries.iter().position(|e| e.token == token)?;
    Some(self.entries.remove(pos))
  }

  /// Remove and return the entry matching (addr, msg_id).
  pub fn remove_by_addr_and_id(&mut self,
                                addr: SocketAddr,
                                msg_id: u16)
                                -> Option<UnconfirmedMessage> {
    let pos = self.entries
                  .iter()
                  .position(|e| e.addr == addr && e.msg_id == msg_id)?;
    Some(self.entries.remove(pos))
  }

  /// The next instant any active entry is due for a retransmission check,
  /// or promotion of a held entry (only meaningful once a slot frees up).
  pub fn next_due(&self) -> Option<Instant> {
    self.entries.iter().filter(|e| !e.hold).map(|e| e.next_due).min()
  }

  /// Promote the oldest held entry (if any) to active, given a free slot.
  pub fn promote_one_held(&mut self, now: Instant) -> Option<&mut UnconfirmedMessage> {
    let pos = self.entries.iter().position(|e| e.hold)?;
    let entry = &mut self.entries[pos];
    entry.release_hold(now);
    Some(entry)
  }

  /// Iterate mutably over all entries (used by the timeout sweep).
  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UnconfirmedMessage> {
    self.entries.iter_mut()
  }

  /// Drain entries for which `f` returns true.
  pub fn retain(&mut self, mut f: impl FnMut(&UnconfirmedMessage) -> bool) {
    self.entries.retain(|e| f(e));
  }
}
