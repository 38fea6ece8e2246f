//! The token-keyed, expiry-ordered registry of requests awaiting a response.

use coap_msg::Token;

use crate::time::Instant;

/// A request this context is waiting on a response for.
#[derive(Debug, Clone, Copy)]
struct Entry {
  token: Token,
  expires_at: Instant,
}

/// The registry of pending TCP requests.
#[derive(Debug, Default)]
pub struct PendingRequests {
  entries: Vec<Entry>,
}

impl PendingRequests {
  /// An empty registry.
  pub fn new() -> Self {
    Self { entries: Vec::new() }
  }

  /// Register a new pending request.
  pub fn insert(&mut self, token: Token, expires_at: Instant) {
    self.entries.push(Entry { token, expires_at });
    self.entries.sort_by_key(|e| e.expires_at);
  }

  /// Whether a request with this token is currently pending.
  pub fn contains(&self, token: Token) -> bool {
    self.entries.iter().any(|e| e.token == token)
  }

  /// Refresh a pending request's expiry (used when a partial-content chunk
  /// arrives and the caller wants to keep waiting for the rest).
  pub fn refresh(&mut self, token: Token, expires_at: Instant) {
    if let Some(e) = self.entries.iter_mut().find(|e| e.token == token) {
      e.expires_at = expires_at;
      self.entries.sort_by_key(|e| e.expires_at);
    }
  }

  /// Remove a pending request by token, if present.
  pub fn remove(&mut self, token: Token) -> bool {
    let before = self.entries.len();
    self.entries.retain(|e| e.token != token);
    self.entries.len() != before
  }

  /// The earliest expiry among pending requests, if any.
  pub fn next_expiry(&self) -> Option<Instant> {
    self.entries.first().map(|e| e.expires_at)
  }

  /// Remove and return the tokens of all requests that expired at or
  /// before `now`.
  pub fn drain_expired(&mut self, now: Instant) -> Vec<Token> {
    let split = self.entries.partition_point(|e| e.expires_at <= now);
    self.entries.drain(..split).map(|e| e.token).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn orders_by_expiry() {
    let mut reg = PendingRequests::new();
    reg.insert(Token::new(b"b"), Instant::from_millis(20));
    reg.insert(Token::new(b"a"), Instant::from_millis(10));
    assert_eq!(reg.next_expiry(), Some(Instant::from_millis(10)));
  }

  #[test]
  fn drain_expired_only_removes_due_entries() {
    let mut reg = PendingRequests::new();
    reg.insert(Token::new(b"a"), Instant::from_millis(10));
    reg.insert(Token::new(b"b"), Instant::from_millis(20));
    let expired = reg.drain_expired(Instant::from_millis(10));
    assert_eq!(expired, vec![Token::new(b"a")]);
    assert!(reg.contains(Token::new(b"b")));
  }

  #[test]
  fn refresh_reorders() {
    let mut reg = PendingRequests::new();
    reg.insert(Token::new(b"a"), Instant::from_millis(10));
    reg.insert(Token::new(b"b"), Instant::from_millis(20));
    reg.refresh(Token::new(b"a"), Instant::from_millis(30));
    assert_eq!(reg.next_expiry(), Some(Instant::from_millis(20)));
  }
}
