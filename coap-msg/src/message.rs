//! Transport-agnostic message body plus the two transport-specific envelopes.

use crate::code::Code;
use crate::error::{MessageParseError, MessageToBytesError};
use crate::option::OptionList;
use crate::token::Token;
use crate::tcp_header::TcpHeader;
use crate::udp_header::{Type, UdpHeader};

/// The code/token/options/payload common to both transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  /// the message code
  pub code: Code,
  /// the correlating token
  pub token: Token,
  /// the option list
  pub options: OptionList,
  /// the message body
  pub payload: Vec<u8>,
}

impl Message {
  /// Construct a message with no options and no payload.
  pub fn new(code: Code, token: Token) -> Self {
    Self { code,
           token,
           options: OptionList::new(),
           payload: Vec::new() }
  }

  fn extend_body_bytes(&self, out: &mut Vec<u8>) {
    out.extend_from_slice(self.token.as_bytes());
    self.options.extend_bytes(out);
    if !self.payload.is_empty() {
      out.push(0xFF);
      out.extend_from_slice(&self.payload);
    }
  }

  fn body_len(&self) -> usize {
    let payload_marker = usize::from(!self.payload.is_empty());
    self.token.len() + self.options.encoded_len() + payload_marker + self.payload.len()
  }
}

/// A complete UDP datagram: fixed header plus message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpMessage {
  /// message type
  pub ty: Type,
  /// 16-bit message id
  pub id: u16,
  /// the message body
  pub message: Message,
}

impl UdpMessage {
  /// Serialize to bytes, failing if the result would exceed `capacity`.
  pub fn to_bytes(&self, capacity: usize) -> Result<Vec<u8>, MessageToBytesError> {
    let size = 4 + self.message.body_len();
    if size > capacity {
      return Err(MessageToBytesError::TooLong { capacity, size });
    }
    let mut out = Vec::with_capacity(size);
    UdpHeader { ty: self.ty,
                tkl: self.message.token.len() as u8,
                code: self.message.code,
                id: self.id }.extend_bytes(&mut out);
    self.message.extend_body_bytes(&mut out);
    Ok(out)
  }

  /// Parse a complete, untruncated datagram.
  pub fn parse(bytes: &[u8]) -> Result<Self, MessageParseError> {
    let header = UdpHeader::parse(bytes)?;
    let mut pos = 4usize;

    let tkl = header.tkl as usize;
    if pos + tkl > bytes.len() {
      return Err(MessageParseError::UnexpectedEndOfStream);
    }
    let token = Token::new(&bytes[pos..pos + tkl]);
    pos += tkl;

    let (options, consumed) = OptionList::parse(&bytes[pos..])?;
    pos += consumed;

    let payload = if pos < bytes.len() && bytes[pos] == 0xFF {
      bytes[pos + 1..].to_vec()
    } else {
      Vec::new()
    };

    Ok(Self { ty: header.ty,
              id: header.id,
              message: Message { code: header.code,
                                  token,
                                  options,
                                  payload } })
  }

  /// Parse as much of a datagram as is present, for the case where the
  /// transport reports the datagram was truncated in flight (RFC 7252
  /// does not define behavior for this; this crate recovers whatever
  /// prefix parses and reports which parts are missing).
  pub fn parse_truncated(bytes: &[u8]) -> TruncatedUdpMessage {
    let header = match UdpHeader::parse(bytes) {
      | Ok(h) => h,
      | Err(_) => return TruncatedUdpMessage { header: None,
                                                token: None,
                                                options_and_payload_present: false },
    };

    let mut pos = 4usize;
    let tkl = header.tkl as usize;
    if pos + tkl > bytes.len() {
      return TruncatedUdpMessage { header: Some(header),
                                    token: None,
                                    options_and_payload_present: false };
    }
    let token = Token::new(&bytes[pos..pos + tkl]);
    pos += tkl;

    TruncatedUdpMessage { header: Some(header),
                          token: Some(token),
                          options_and_payload_present: pos < bytes.len() }
  }
}

/// The recoverable prefix of a datagram the transport reported as truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedUdpMessage {
  /// the fixed header, if it parsed
  pub header: Option<UdpHeader>,
  /// the token, if present and the header parsed
  pub token: Option<Token>,
  /// whether any option/payload bytes survived
  pub options_and_payload_present: bool,
}

/// A complete CoAP-over-TCP frame: variable header plus message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpMessage {
  /// the message body
  pub message: Message,
}

impl TcpMessage {
  /// Serialize to bytes, failing if the result would exceed `capacity`.
  pub fn to_bytes(&self, capacity: usize) -> Result<Vec<u8>, MessageToBytesError> {
    let options_and_payload_len =
      self.message.options.encoded_len()
      + usize::from(!self.message.payload.is_empty())
      + self.message.payload.len();
    let header = TcpHeader { tkl: self.message.token.len() as u8,
                              len: options_and_payload_len as u32,
                              code: self.message.code };
    let mut header_bytes = Vec::new();
    header.extend_bytes(&mut header_bytes);

    let size = header_bytes.len() + self.message.token.len() + options_and_payload_len;
    if size > capacity {
      return Err(MessageToBytesError::TooLong { capacity, size });
    }

    let mut out = header_bytes;
    self.message.extend_body_bytes(&mut out);
    Ok(out)
  }

  /// Parse a complete, unfragmented frame (tests and simple embeddings; the
  /// production receive path uses the incremental parser in `coap-core`).
  pub fn parse(bytes: &[u8]) -> Result<(Self, usize), MessageParseError> {
    let (header, header_len) =
      TcpHeader::try_parse(bytes).map_err(|_| MessageParseError::UnexpectedEndOfStream)?
                                 .ok_or(MessageParseError::Truncated)?;

    let mut pos = header_len;
    let tkl = header.tkl as usize;
    if pos + tkl > bytes.len() {
      return Err(MessageParseError::UnexpectedEndOfStream);
    }
    let token = Token::new(&bytes[pos..pos + tkl]);
    pos += tkl;

    let body_end = pos + header.len as usize;
    if body_end > bytes.len() {
      return Err(MessageParseError::UnexpectedEndOfStream);
    }
    let (options, consumed) = OptionList::parse(&bytes[pos..body_end])?;
    pos += consumed;

    let payload = if pos < body_end && bytes[pos] == 0xFF {
      bytes[pos + 1..body_end].to_vec()
    } else {
      Vec::new()
    };

    Ok((Self { message: Message { code: header.code,
                                  token,
                                  options,
                                  payload } },
        body_end))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::option::Opt;

  #[test]
  fn udp_round_trip() {
    let mut message = Message::new(Code::GET, Token::new(b"T"));
    message.options.insert(Opt::new(11, b"0".to_vec()));
    message.options.insert(Opt::new(11, b"1".to_vec()));
    let udp = UdpMessage { ty: Type::Con,
                           id: 0xFA3E,
                           message };
    let bytes = udp.to_bytes(1152).unwrap();
    assert_eq!(UdpMessage::parse(&bytes).unwrap(), udp);
  }

  #[test]
  fn udp_piggybacked_response() {
    let mut message = Message::new(Code::CONTENT, Token::new(b"T"));
    message.payload = b"hello".to_vec();
    let udp = UdpMessage { ty: Type::Ack,
                           id: 0xFA3E,
                           message };
    let bytes = udp.to_bytes(1152).unwrap();
    let decoded = UdpMessage::parse(&bytes).unwrap();
    assert_eq!(decoded.message.payload, b"hello");
  }

  #[test]
  fn udp_capacity_exceeded() {
    let message = Message::new(Code::GET, Token::EMPTY);
    let udp = UdpMessage { ty: Type::Con,
                           id: 0,
                           message };
    assert_eq!(udp.to_bytes(3).unwrap_err(),
               MessageToBytesError::TooLong { capacity: 3,
                                               size: 4 });
  }

  #[test]
  fn tcp_round_trip() {
    let mut message = Message::new(Code::POST, Token::new(b"abcdefgh"));
    message.options.insert(Opt::new(11, b"rd".to_vec()));
    message.payload = vec![9; 50];
    let tcp = TcpMessage { message };
    let bytes = tcp.to_bytes(1024).unwrap();
    let (decoded, consumed) = TcpMessage::parse(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(decoded, tcp);
  }

  #[test]
  fn truncated_recovers_header_and_token() {
    let message = Message::new(Code::GET, Token::new(b"TT"));
    let udp = UdpMessage { ty: Type::Con,
                           id: 7,
                           message };
    let bytes = udp.to_bytes(1152).unwrap();
    let truncated = UdpMessage::parse_truncated(&bytes[..5]);
    assert!(truncated.header.is_some());
    assert!(truncated.token.is_none());
  }
}
