//! A monotonic millisecond clock abstraction, so contexts never call `Instant::now()` directly.

use core::fmt;
use core::ops::{Add, Sub};
use std::time::Duration;

/// A point in time, measured in milliseconds since some arbitrary epoch.
///
/// Saturating arithmetic: a context that subtracts an earlier instant
/// from a later one never panics on underflow, since due-by computations
/// are compared, not relied on for precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(u64);

impl Instant {
  /// A sentinel representing "never" / "not yet set".
  pub const INVALID: Instant = Instant(u64::MAX);

  /// Construct from a millisecond count.
  pub const fn from_millis(ms: u64) -> Self {
    Self(ms)
  }

  /// The millisecond count since epoch.
  pub const fn as_millis(&self) -> u64 {
    self.0
  }

  /// Add a duration, saturating at `u64::MAX`.
  pub fn saturating_add(&self, d: Duration) -> Self {
    Self(self.0.saturating_add(d.as_millis() as u64))
  }

  /// Subtract, saturating at zero rather than underflowing.
  pub fn saturating_sub(&self, other: Self) -> Duration {
    Duration::from_millis(self.0.saturating_sub(other.0))
  }
}

impl fmt::Display for Instant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}ms", self.0)
  }
}

impl Add<Duration> for Instant {
  type Output = Instant;

  fn add(self, rhs: Duration) -> Instant {
    self.saturating_add(rhs)
  }
}

impl Sub<Instant> for Instant {
  type Output = Duration;

  fn sub(self, rhs: Instant) -> Duration {
    self.saturating_sub(rhs)
  }
}

/// A source of the current time.
///
/// Abstracted so tests can supply a fake, deterministic clock, the way
/// the retransmission timer tests do.
pub trait Clock {
  /// The current time.
  fn now(&self) -> Instant;
}

/// A [`Clock`] backed by `std::time::Instant`, anchored at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
  epoch: std::time::Instant,
}

impl SystemClock {
  /// Create a clock anchored to the current moment.
  pub fn new() -> Self {
    Self { epoch: std::time::Instant::now() }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::from_millis(self.epoch.elapsed().as_millis() as u64)
  }
}
