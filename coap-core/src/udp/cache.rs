//! Response cache: lets a duplicate request within `EXCHANGE_LIFETIME` get
//! the byte-identical reply without re-invoking the upper layer.

use std::net::SocketAddr;
use std::time::Duration;

use crate::time::Instant;

/// A previously-sent response, kept around so a retried request gets the
/// same bytes back instead of being processed twice.
#[derive(Debug, Clone)]
struct Entry {
  addr: SocketAddr,
  msg_id: u16,
  expires_at: Instant,
  bytes: Vec<u8>,
}

/// A bounded FIFO cache of recently sent responses, keyed by `(addr, msg_id)`.
#[derive(Debug)]
pub struct ResponseCache {
  capacity: usize,
  entries: Vec<Entry>,
}

impl ResponseCache {
  /// Build a cache holding at most `capacity` entries.
  pub fn new(capacity: usize) -> Self {
    Self { capacity,
           entries: Vec::new() }
  }

  /// Drop any entries whose lifetime has elapsed.
  pub fn evict_expired(&mut self, now: Instant) {
    self.entries.retain(|e| e.expires_at > now);
  }

  /// Store a response, evicting the oldest entries first if at capacity.
  pub fn insert(&mut self, addr: SocketAddr, msg_id: u16, bytes: Vec<u8>, now: Instant, lifetime: Duration) {
    self.evict_expired(now);
    while self.entries.len() >= self.capacity {
      self.entries.remove(0);
    }
    self.entries.push(Entry { addr,
                              msg_id,
                              expires_at: now + lifetime,
                              bytes });
  }

  /// Look up a cached response by `(addr, msg_id)`.
  pub fn get(&self, addr: SocketAddr, msg_id: u16) -> Option<&[u8]> {
    self.entries
        .iter()
        .find(|e| e.addr == addr && e.msg_id == msg_id)
        .map(|e| e.bytes.as_slice())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr() -> SocketAddr {
    "127.0.0.1:5683".parse().unwrap()
  }

  #[test]
  fn caches_and_retrieves() {
    let mut cache = ResponseCache::new(4);
    let now = Instant::from_millis(0);
    cache.insert(addr(), 1, vec![1, 2, 3], now, Duration::from_secs(60));
    assert_eq!(cache.get(addr(), 1), Some([1, 2, 3].as_slice()));
  }

  #[test]
  fn evicts_oldest_when_full() {
    let mut cache = ResponseCache::new(2);
    let now = Instant::from_millis(0);
    cache.insert(addr(), 1, vec![1], now, Duration::from_secs(60));
    cache.insert(addr(), 2, vec![2], now, Duration::from_secs(60));
    cache.insert(addr(), 3, vec![3], now, Duration::from_secs(60));
    assert_eq!(cache.get(addr(), 1), None);
    assert_eq!(cache.get(addr(), 3), Some([3].as_slice()));
  }

  #[test]
  fn expires_after_lifetime() {
    let mut cache = ResponseCache::new(4);
    let now = Instant::from_millis(0);
    cache.insert(addr(), 1, vec![1], now, Duration::from_millis(500));
    cache.evict_expired(Instant::from_millis(1000));
    assert_eq!(cache.get(addr(), 1), None);
  }
}
