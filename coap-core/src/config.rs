//! Runtime-tunable transmission parameters (RFC 7252 § 4.8, RFC 8323 § 4.3).

use std::time::Duration;

use crate::retry::{Attempts, Strategy};

/// Transmission parameters governing confirmable (CON) exchanges.
#[derive(Debug, Clone, Copy)]
pub struct Con {
  /// retry strategy while the exchange has not yet been ACKed
  pub unacked_retry_strategy: Strategy,
  /// retry strategy for a notification after the original request was ACKed
  /// (used for RFC 7641 observe re-registration)
  pub acked_retry_strategy: Strategy,
  /// `MAX_RETRANSMIT`
  pub max_attempts: Attempts,
}

impl Default for Con {
  fn default() -> Self {
    Self { unacked_retry_strategy: Strategy::Exponential { init_min: Duration::from_millis(2000),
                                                            init_max: Duration::from_millis(3000) },
           acked_retry_strategy: Strategy::Exponential { init_min: Duration::from_millis(2000),
                                                          init_max: Duration::from_millis(3000) },
           max_attempts: Attempts(4) }
  }
}

/// Transmission parameters governing non-confirmable (NON) exchanges.
#[derive(Debug, Clone, Copy)]
pub struct Non {
  /// retry strategy (NON messages are not ACKed, but may still be retried
  /// at the application's discretion, e.g. for observe notifications)
  pub retry_strategy: Strategy,
  /// maximum number of attempts
  pub max_attempts: Attempts,
}

impl Default for Non {
  fn default() -> Self {
    Self { retry_strategy: Strategy::Exponential { init_min: Duration::from_millis(2000),
                                                    init_max: Duration::from_millis(3000) },
           max_attempts: Attempts(4) }
  }
}

/// UDP-specific transmission parameters.
#[derive(Debug, Clone, Copy)]
pub struct Udp {
  /// confirmable-exchange parameters
  pub con: Con,
  /// non-confirmable-exchange parameters
  pub non: Non,
  /// `NSTART`: max number of simultaneous outstanding (non-held) exchanges
  /// to a single endpoint
  pub nstart: usize,
  /// `ACK_RANDOM_FACTOR` used to compute `max_transmit_span`/`max_transmit_wait`
  pub ack_random_factor: f32,
  /// `MAX_LATENCY`: assumed maximum round-trip time across the network
  pub max_latency: Duration,
  /// `PROCESSING_DELAY`: assumed time a node takes to generate a response
  pub processing_delay: Duration,
  /// capacity of the response cache (deduplication of retried requests)
  pub response_cache_capacity: usize,
  /// capacity of the notify cache (Reset-driven observe cancellation)
  pub notify_cache_capacity: usize,
}

impl Default for Udp {
  fn default() -> Self {
    Self { con: Con::default(),
           non: Non::default(),
           nstart: 1,
           ack_random_factor: 1.5,
           max_latency: Duration::from_secs(100),
           processing_delay: Duration::from_millis(200),
           response_cache_capacity: 16,
           notify_cache_capacity: 16 }
  }
}

impl Udp {
  /// `ACK_TIMEOUT`, the minimum of the CON retry strategy's initial range.
  fn ack_timeout(&self) -> Duration {
    match self.con.unacked_retry_strategy {
      | Strategy::Exponential { init_min, .. } => init_min,
      | Strategy::Delay { min, .. } => min,
    }
  }

  /// `MAX_TRANSMIT_SPAN`: time from first transmission to the last allowed
  /// retransmission of a CON message.
  pub fn max_transmit_span(&self) -> Duration {
    let ack_timeout_ms = self.ack_timeout().as_millis() as f64;
    let factor = self.ack_random_factor as f64;
    let exponent = 2u32.pow((self.con.max_attempts.0 as u32).saturating_sub(1));
    Duration::from_millis((ack_timeout_ms * factor * (exponent as f64 - 1.0)) as u64)
  }

  /// `MAX_TRANSMIT_WAIT`: worst-case time a sender waits for an ACK/RST
  /// before giving up, across all retransmissions.
  pub fn max_transmit_wait(&self) -> Duration {
    let ack_timeout_ms = self.ack_timeout().as_millis() as f64;
    let factor = self.ack_random_factor as f64;
    let exponent = 2u32.pow(self.con.max_attempts.0 as u32);
    Duration::from_millis((ack_timeout_ms * factor * (exponent as f64 - 1.0)) as u64)
  }

  /// `EXCHANGE_LIFETIME = MAX_TRANSMIT_SPAN + 2*MAX_LATENCY + PROCESSING_DELAY`
  /// (RFC 7252 § 4.8.2): how long a response cache entry or a duplicate-
  /// suppression record must be retained.
  pub fn exchange_lifetime(&self) -> Duration {
    self.max_transmit_span() + 2 * self.max_latency + self.processing_delay
  }
}

/// TCP-specific transmission parameters (RFC 8323 has no retransmission
/// timers, but does define request and CSM-handshake timeouts).
#[derive(Debug, Clone, Copy)]
pub struct Tcp {
  /// how long a pending request may go unanswered before it is failed
  /// with `Timeout`
  pub request_timeout: Duration,
  /// how long to wait for the peer's CSM after connecting before failing
  /// the handshake
  pub csm_timeout: Duration,
  /// the Max-Message-Size this endpoint advertises in its own CSM
  pub max_message_size: u32,
  /// whether this endpoint advertises block-wise-transfer capability
  pub block_wise_transfer: bool,
}

impl Default for Tcp {
  fn default() -> Self {
    Self { request_timeout: Duration::from_secs(247),
           csm_timeout: Duration::from_secs(30),
           max_message_size: 1152,
           block_wise_transfer: false }
  }
}

/// Top-level runtime configuration shared by both transports.
#[derive(Debug, Clone, Copy)]
pub struct Config {
  /// UDP transmission parameters
  pub udp: Udp,
  /// TCP transmission parameters
  pub tcp: Tcp,
  /// maximum datagram/frame size this endpoint will construct or accept
  pub max_message_size: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self { udp: Udp::default(),
           tcp: Tcp::default(),
           max_message_size: 1152 }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exchange_lifetime_matches_rfc7252_defaults() {
    let udp = Udp::default();
    // ACK_TIMEOUT=2s, ACK_RANDOM_FACTOR=1.5, MAX_RETRANSMIT=4
    // MAX_TRANSMIT_SPAN = 2 * 1.5 * (2^3 - 1) = 21s
    assert_eq!(udp.max_transmit_span(), Duration::from_millis(21000));
    // EXCHANGE_LIFETIME = 21 + 2*100 + 0.2 = 221.2s
    assert_eq!(udp.exchange_lifetime(), Duration::from_millis(221_200));
  }

  #[test]
  fn max_transmit_wait_exceeds_span() {
    let udp = Udp::default();
    assert!(udp.max_transmit_wait() > udp.max_transmit_span());
  }
}
