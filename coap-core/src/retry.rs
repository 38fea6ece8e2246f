//! Jittered exponential-backoff retransmission timing (RFC 7252 § 4.2).

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::{Rng, SeedableRng};

use crate::time::Instant;

/// A number of send attempts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer::poll`]: whether it's time to retry, or whether
/// attempts have been exhausted and the caller should give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YouShould {
  /// Attempts are exhausted; the exchange should fail with a timeout.
  GiveUp,
  /// Enough time has passed; retransmit now.
  Retry,
  /// Not yet time to retransmit.
  Wait,
}

/// The delay strategy used between retransmission attempts.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
  /// Pick a random initial delay in `[init_min, init_max]`, then double it
  /// after every failed attempt (RFC 7252's CON retransmission algorithm).
  Exponential {
    /// minimum initial delay
    init_min: Duration,
    /// maximum initial delay
    init_max: Duration,
  },
  /// Pick a random delay in `[min, max]` and wait that long between every
  /// attempt, without backoff (used for NON retransmission-less sends that
  /// still want jittered pacing).
  Delay {
    /// minimum delay
    min: Duration,
    /// maximum delay
    max: Duration,
  },
}

impl Strategy {
  fn range(&self) -> RangeInclusive<u64> {
    match *self {
      | Self::Delay { min, max } => min.as_millis() as u64..=max.as_millis() as u64,
      | Self::Exponential { init_min, init_max } => {
        init_min.as_millis() as u64..=init_max.as_millis() as u64
      },
    }
  }

  fn has_jitter(&self) -> bool {
    let r = self.range();
    r.start() != r.end()
  }

  /// The total elapsed time by which all `max_attempts` retries would have
  /// been exhausted, given the strategy's maximum delay.
  pub fn max_time(&self, max_attempts: Attempts) -> Duration {
    match *self {
      | Self::Exponential { init_max, .. } => {
        Duration::from_millis(Self::total_delay_exp(init_max.as_millis() as u64, max_attempts.0))
      },
      | Self::Delay { max, .. } => max * max_attempts.0 as u32,
    }
  }

  const fn total_delay_exp(init_ms: u64, attempt: u16) -> u64 {
    // attempt 1 -> init, attempt 2 -> init*2, attempt 3 -> init*4, ...
    let attempt = if attempt > 1 { attempt } else { 1 };
    init_ms * 2u64.pow((attempt - 1) as u32)
  }
}

/// A non-blocking timer tracking retransmission attempts for a single
/// in-flight exchange.
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer {
  start: Instant,
  init_delay: Duration,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

impl RetryTimer {
  /// Start a new retry timer as of `start`.
  pub fn new(start: Instant, strategy: Strategy, max_attempts: Attempts) -> Self {
    let init_delay = if strategy.has_jitter() {
      let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(start.as_millis());
      Duration::from_millis(rng.gen_range(strategy.range()))
    } else {
      Duration::from_millis(*strategy.range().start())
    };

    Self { start,
           init_delay,
           strategy,
           max_attempts,
           attempts: Attempts(1) }
  }

  /// Number of attempts made so far, including the initial send.
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }

  /// Ask whether, as of `now`, the caller should retry, wait, or give up.
  /// Transitions the internal attempt counter when it returns `Retry`.
  pub fn poll(&mut self, now: Instant) -> YouShould {
    if self.attempts >= self.max_attempts {
      return YouShould::GiveUp;
    }
    if self.is_ready(now - self.start, self.attempts.0) {
      self.attempts.0 += 1;
      YouShould::Retry
    } else {
      YouShould::Wait
    }
  }

  /// The instant at which the next [`RetryTimer::poll`] would return
  /// `Retry` (or `start`, if attempts are already exhausted).
  pub fn next_due(&self) -> Instant {
    if self.attempts >= self.max_attempts {
      self.start
    } else {
      self.start + self.delay_threshold(self.attempts.0)
    }
  }

  fn is_ready(&self, elapsed: Duration, attempts: u16) -> bool {
    if attempts == 0 {
      return true;
    }
    elapsed >= self.delay_threshold(attempts)
  }

  fn delay_threshold(&self, attempts: u16) -> Duration {
    match self.strategy {
      | Strategy::Delay { .. } => self.init_delay * attempts as u32,
      | Strategy::Exponential { .. } => {
        Duration::from_millis(Strategy::total_delay_exp(self.init_delay.as_millis() as u64, attempts))
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::time::Clock;

  struct FakeClock(std::cell::Cell<u64>);
  impl Clock for FakeClock {
    fn now(&self) -> Instant {
      Instant::from_millis(self.0.get())
    }
  }

  #[test]
  fn delay_retrier() {
    let clock = FakeClock(std::cell::Cell::new(0));
    let mut retry = RetryTimer::new(clock.now(),
                                    Strategy::Delay { min: Duration::from_millis(1000),
                                                      max: Duration::from_millis(1000) },
                                    Attempts(3));

    clock.0.set(999);
    assert_eq!(retry.poll(clock.now()), YouShould::Wait);

    clock.0.set(1000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    clock.0.set(1999);
    assert_eq!(retry.poll(clock.now()), YouShould::Wait);

    clock.0.set(2000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    assert_eq!(retry.poll(clock.now()), YouShould::GiveUp);
  }

  #[test]
  fn exponential_retrier() {
    let clock = FakeClock(std::cell::Cell::new(0));
    let mut retry = RetryTimer::new(clock.now(),
                                    Strategy::Exponential { init_min: Duration::from_millis(1000),
                                                            init_max: Duration::from_millis(1000) },
                                    Attempts(6));

    clock.0.set(999);
    assert_eq!(retry.poll(clock.now()), YouShould::Wait);
    clock.0.set(1000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    clock.0.set(1999);
    assert_eq!(retry.poll(clock.now()), YouShould::Wait);
    clock.0.set(2000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    clock.0.set(3999);
    assert_eq!(retry.poll(clock.now()), YouShould::Wait);
    clock.0.set(4000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    clock.0.set(8000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    clock.0.set(16000);
    assert_eq!(retry.poll(clock.now()), YouShould::Retry);

    assert_eq!(retry.poll(clock.now()), YouShould::GiveUp);
  }

  #[test]
  fn exp_calculation() {
    assert_eq!(Strategy::total_delay_exp(100, 1), 100);
    assert_eq!(Strategy::total_delay_exp(100, 2), 200);
    assert_eq!(Strategy::total_delay_exp(100, 3), 400);
  }

  #[test]
  fn max_time_exponential() {
    let s = Strategy::Exponential { init_min: Duration::from_millis(100),
                                    init_max: Duration::from_millis(100) };
    assert_eq!(s.max_time(Attempts(3)), Duration::from_millis(400));
  }
}
