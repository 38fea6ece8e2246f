//! The error taxonomy surfaced at the boundary of both contexts.

use core::fmt;

use coap_msg::{Code, MessageParseError, MessageToBytesError, TcpHeaderParseError, Token};

/// Errors that can arise sending, receiving, or timing out an exchange on
/// either transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// the peer's bytes did not decode as a well-formed message
  Malformed(MessageParseError),
  /// the TCP framing header could not be decoded
  MalformedTcpHeader(TcpHeaderParseError),
  /// an outbound message did not fit in the available buffer/peer limit
  MessageTooBig(MessageToBytesError),
  /// a UDP datagram arrived truncated (the transport reported partial delivery)
  TruncatedMessageReceived,
  /// a TCP frame's options-and-payload region exceeded the negotiated
  /// maximum message size; its body was discarded without being parsed
  TcpFrameTooLarge {
    /// the oversized frame's code, read from the header before the region was skipped
    code: Code,
    /// the oversized frame's token, read from the header before the region was skipped
    token: Token,
  },
  /// all retransmissions (UDP) or the request timeout (TCP) elapsed with no response
  Timeout,
  /// the peer reset a confirmable exchange
  ResetReceived,
  /// the underlying transport returned an error
  Transport(String),
  /// the TCP peer sent RELEASE; the connection should be torn down
  TcpReleaseReceived,
  /// the TCP peer sent ABORT
  TcpAbortReceived,
  /// this endpoint sent ABORT and is refusing further traffic on the connection
  TcpAbortSent,
  /// the TCP peer never sent its CSM within the handshake timeout
  TcpCsmNotReceived,
  /// the TCP peer's CSM carried an option this endpoint doesn't know,
  /// critical per RFC 7252 § 5.4.1
  TcpUnknownCsmCriticalOptionReceived(u16),
  /// an observe/notify operation was attempted on a build without observe support
  FeatureDisabled,
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Malformed(e) => write!(f, "malformed message: {e}"),
      | Self::MalformedTcpHeader(e) => write!(f, "malformed tcp header: {e}"),
      | Self::MessageTooBig(e) => write!(f, "message too big: {e}"),
      | Self::TruncatedMessageReceived => write!(f, "datagram truncated in transit"),
      | Self::TcpFrameTooLarge { code, .. } => write!(f, "tcp frame with code {code:?} exceeded the negotiated max message size"),
      | Self::Timeout => write!(f, "exchange timed out"),
      | Self::ResetReceived => write!(f, "peer reset the exchange"),
      | Self::Transport(e) => write!(f, "transport error: {e}"),
      | Self::TcpReleaseReceived => write!(f, "peer released the connection"),
      | Self::TcpAbortReceived => write!(f, "peer aborted the connection"),
      | Self::TcpAbortSent => write!(f, "connection aborted by this endpoint"),
      | Self::TcpCsmNotReceived => write!(f, "peer did not send csm within the handshake window"),
      | Self::TcpUnknownCsmCriticalOptionReceived(n) => {
        write!(f, "peer csm carried unknown critical option {n}")
      },
      | Self::FeatureDisabled => write!(f, "feature disabled in this build"),
    }
  }
}

impl std::error::Error for Error {}

impl From<MessageParseError> for Error {
  fn from(e: MessageParseError) -> Self {
    Self::Malformed(e)
  }
}

impl From<TcpHeaderParseError> for Error {
  fn from(e: TcpHeaderParseError) -> Self {
    Self::MalformedTcpHeader(e)
  }
}

impl From<MessageToBytesError> for Error {
  fn from(e: MessageToBytesError) -> Self {
    Self::MessageTooBig(e)
  }
}
