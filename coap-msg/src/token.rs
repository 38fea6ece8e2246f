use core::fmt;

/// The maximum length, in bytes, of a CoAP token (RFC 7252 § 3).
pub const MAX_LEN: usize = 8;

/// An opaque token used to correlate requests with responses.
///
/// Tokens are generated by the sender of a request and echoed verbatim
/// by the peer; equality is byte-for-byte, including length.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
  bytes: [u8; MAX_LEN],
  len: u8,
}

impl Token {
  /// An empty token.
  pub const EMPTY: Token = Token { bytes: [0; MAX_LEN],
                                   len: 0 };

  /// Build a token from a byte slice, truncating to [`MAX_LEN`] bytes.
  pub fn new(data: &[u8]) -> Self {
    let len = data.len().min(MAX_LEN);
    let mut bytes = [0u8; MAX_LEN];
    bytes[..len].copy_from_slice(&data[..len]);
    Self { bytes,
           len: len as u8 }
  }

  /// View the token's bytes.
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes[..self.len as usize]
  }

  /// Number of bytes in this token.
  pub fn len(&self) -> usize {
    self.len as usize
  }

  /// Whether this token is empty.
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

impl Default for Token {
  fn default() -> Self {
    Self::EMPTY
  }
}

impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Token(")?;
    for b in self.as_bytes() {
      write!(f, "{b:02x}")?;
    }
    write!(f, ")")
  }
}

impl From<&[u8]> for Token {
  fn from(data: &[u8]) -> Self {
    Self::new(data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncates_to_max_len() {
    let t = Token::new(&[1; 16]);
    assert_eq!(t.len(), MAX_LEN);
  }

  #[test]
  fn equality_is_length_sensitive() {
    assert_ne!(Token::new(&[1]), Token::new(&[1, 0]));
  }

  #[test]
  fn empty_is_default() {
    assert_eq!(Token::default(), Token::EMPTY);
    assert!(Token::EMPTY.is_empty());
  }
}
