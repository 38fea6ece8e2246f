//! A pseudo-random byte source, used for token and message-id generation.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A source of random bytes.
pub trait Prng {
  /// Fill `out` with random bytes.
  fn fill(&mut self, out: &mut [u8]);

  /// Generate a random 16-bit seed, used once to initialize a context's
  /// monotonic message-id counter.
  fn next_message_id_seed(&mut self) -> u16 {
    let mut buf = [0u8; 2];
    self.fill(&mut buf);
    u16::from_be_bytes(buf)
  }

  /// Generate a random token of up to 8 bytes.
  fn next_token(&mut self, len: usize) -> coap_msg::Token {
    let mut buf = [0u8; 8];
    let len = len.min(8);
    self.fill(&mut buf[..len]);
    coap_msg::Token::new(&buf[..len])
  }
}

/// A [`Prng`] backed by `ChaCha8`, matching the generator the retry timer
/// uses for jittered delays.
#[derive(Debug, Clone)]
pub struct ChaCha8Prng(ChaCha8Rng);

impl ChaCha8Prng {
  /// Seed from the OS entropy source.
  pub fn from_entropy() -> Self {
    Self(ChaCha8Rng::from_entropy())
  }

  /// Seed deterministically, for reproducible tests.
  pub fn from_seed(seed: u64) -> Self {
    Self(ChaCha8Rng::seed_from_u64(seed))
  }
}

impl Prng for ChaCha8Prng {
  fn fill(&mut self, out: &mut [u8]) {
    self.0.fill_bytes(out);
  }
}
