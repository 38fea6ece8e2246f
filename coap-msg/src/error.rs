use core::fmt;

/// Errors encountered while parsing bytes into a [`crate::Message`] or its pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageParseError {
  /// The version nibble was not 1.
  UnsupportedVersion,
  /// Token length nibble exceeded 8.
  TokenLengthTooLong,
  /// Buffer ended before the declared structure did.
  UnexpectedEndOfStream,
  /// A message with code 0.00 (Empty) carried a token, options, or payload.
  NonEmptyEmptyMessage,
  /// An ACK carried a request code.
  AckWithRequestCode,
  /// A RST carried a non-empty code.
  ResetWithNonEmptyCode,
  /// An option's delta or length nibble was the reserved value 15
  /// outside of the payload marker position.
  ReservedOptionNibble,
  /// Options were not encoded in ascending numeric order.
  OptionsOutOfOrder,
  /// Parsing consumed the buffer but more data was expected to complete the message.
  Truncated,
}

impl fmt::Display for MessageParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::UnsupportedVersion => write!(f, "unsupported CoAP version"),
      | Self::TokenLengthTooLong => write!(f, "token length exceeds 8 bytes"),
      | Self::UnexpectedEndOfStream => write!(f, "unexpected end of buffer"),
      | Self::NonEmptyEmptyMessage => write!(f, "empty message code carried a body"),
      | Self::AckWithRequestCode => write!(f, "ack carried a request code"),
      | Self::ResetWithNonEmptyCode => write!(f, "reset carried a non-empty code"),
      | Self::ReservedOptionNibble => write!(f, "reserved option nibble 15"),
      | Self::OptionsOutOfOrder => write!(f, "options not in ascending order"),
      | Self::Truncated => write!(f, "message truncated"),
    }
  }
}

impl std::error::Error for MessageParseError {}

/// Errors encountered serializing a [`crate::Message`] to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageToBytesError {
  /// The serialized message would not fit in the given capacity.
  TooLong {
    /// bytes available
    capacity: usize,
    /// bytes required
    size: usize,
  },
}

impl fmt::Display for MessageToBytesError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::TooLong { capacity, size } => {
        write!(f, "message size {size} exceeds capacity {capacity}")
      },
    }
  }
}

impl std::error::Error for MessageToBytesError {}

/// Errors encountered decoding the variable-length TCP framing header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpHeaderParseError {
  /// The buffer ended before the header's extended-length bytes were read.
  MoreDataRequired,
  /// Token length nibble exceeded 8.
  TokenLengthTooLong,
}

impl fmt::Display for TcpHeaderParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::MoreDataRequired => write!(f, "more bytes required to decode header"),
      | Self::TokenLengthTooLong => write!(f, "token length exceeds 8 bytes"),
    }
  }
}

impl std::error::Error for TcpHeaderParseError {}
