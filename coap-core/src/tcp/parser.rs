//! Incremental decode of CoAP-over-TCP frames from arbitrarily fragmented
//! byte chunks (RFC 8323 § 3.2).
//!
//! A single logical frame can arrive split across many `feed` calls (or
//! several frames can arrive in one call); this only ever buffers the
//! frame's header, token, and option bytes, which are small. The payload,
//! which can be large, is handed to the caller as it arrives rather than
//! assembled in memory here.

use coap_msg::option::OptionList;
use coap_msg::{Code, MessageParseError, TcpHeader, Token};

use crate::error::Error;

/// One delivered slice of a frame's payload.
///
/// `options` is populated only on the chunk where `payload_offset == 0`;
/// later chunks of the same message carry an empty list, since the caller
/// already has the options from the first chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadChunk {
  /// the message's code
  pub code: Code,
  /// the message's token
  pub token: Token,
  /// the message's options (only on the first chunk of a message)
  pub options: OptionList,
  /// offset of this chunk within the message's payload
  pub payload_offset: usize,
  /// the chunk's bytes
  pub chunk: Vec<u8>,
  /// total payload size of the message this chunk belongs to
  pub total_payload_size: usize,
  /// whether this is the last chunk of the message
  pub is_final: bool,
}

enum State {
  Header { buf: Vec<u8> },
  Token { header: TcpHeader, buf: Vec<u8> },
  Options { header: TcpHeader, token: Token, buf: Vec<u8>, region_len: usize },
  Payload { code: Code, token: Token, remaining: usize, total_payload_size: usize, delivered: usize },
  Ignoring { remaining: usize },
}

impl std::fmt::Debug for State {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      | Self::Header { .. } => write!(f, "Header"),
      | Self::Token { .. } => write!(f, "Token"),
      | Self::Options { .. } => write!(f, "Options"),
      | Self::Payload { .. } => write!(f, "Payload"),
      | Self::Ignoring { .. } => write!(f, "Ignoring"),
    }
  }
}

/// The incremental frame decoder. One instance per TCP connection.
#[derive(Debug)]
pub struct Parser {
  state: State,
  max_region_len: usize,
}

impl Default for Parser {
  fn default() -> Self {
    Self::new()
  }
}

impl Parser {
  /// A parser ready to decode the start of a new frame, with no limit on
  /// a frame's options-and-payload region.
  pub fn new() -> Self {
    Self { state: State::Header { buf: Vec::new() },
           max_region_len: usize::MAX }
  }

  /// A parser that discards (rather than buffers) any frame whose
  /// options-and-payload region exceeds `max_region_len`, emitting
  /// [`Error::TcpFrameTooLarge`] for it instead.
  pub fn with_max_region_len(max_region_len: usize) -> Self {
    Self { state: State::Header { buf: Vec::new() },
           max_region_len }
  }

  /// Feed newly-received bytes, advancing the state machine and returning
  /// whatever payload chunks (or fatal parse errors) completed as a result.
  ///
  /// On `Err`, the parser has entered `Ignoring` and will silently drain
  /// the rest of the malformed frame; the caller decides whether to abort
  /// the connection.
  pub fn feed(&mut self, mut bytes: &[u8]) -> Vec<Result<PayloadChunk, Error>> {
    let mut events = Vec::new();

    loop {
      if bytes.is_empty() && !Self::can_complete_without_more_input(&self.state) {
        break;
      }
      match &mut self.state {
        | State::Header { buf } => {
          buf.push(bytes[0]);
          bytes = &bytes[1..];
          match TcpHeader::try_parse(buf) {
            | Ok(Some((header, _))) => {
              self.state = State::Token { header, buf: Vec::new() };
            },
            | Ok(None) => {},
            | Err(e) => {
              events.push(Err(Error::from(e)));
              self.state = State::Ignoring { remaining: 0 };
            },
          }
        },
        | State::Token { header, buf } => {
          let need = header.tkl as usize - buf.len();
          let take = need.min(bytes.len());
          buf.extend_from_slice(&bytes[..take]);
          bytes = &bytes[take..];
          if buf.len() == header.tkl as usize {
            let token = Token::new(buf);
            let region_len = header.len as usize;
            if region_len > self.max_region_len {
              events.push(Err(Error::TcpFrameTooLarge { code: header.code, token }));
              self.state = State::Ignoring { remaining: region_len };
            } else {
              self.state = State::Options { header: *header,
                                             token,
                                             buf: Vec::new(),
                                             region_len };
            }
          }
        },
        | State::Options { header, token, buf, region_len } => {
          let take = (*region_len - buf.len()).min(bytes.len());
          buf.extend_from_slice(&bytes[..take]);
          bytes = &bytes[take..];

          match OptionList::parse(buf) {
            | Ok((options, consumed)) if consumed < buf.len() => {
              // a 0xFF payload marker sits at buf[consumed]
              let total_payload_size = *region_len - consumed - 1;
              let already = buf[consumed + 1..].to_vec();
              let code = header.code;
              let tok = *token;
              events.push(Ok(Self::start_payload(&mut self.state,
                                                   code,
                                                   tok,
                                                   options,
                                                   already,
                                                   total_payload_size)));
            },
            | Ok((options, consumed)) if consumed == *region_len => {
              // no marker: the region was exactly the option list, no payload
              let code = header.code;
              let tok = *token;
              events.push(Ok(PayloadChunk { code,
                                             token: tok,
                                             options,
                                             payload_offset: 0,
                                             chunk: Vec::new(),
                                             total_payload_size: 0,
                                             is_final: true }));
              self.state = State::Header { buf: Vec::new() };
            },
            | Ok(_) => { /* need more bytes before the boundary is unambiguous */ },
            | Err(MessageParseError::UnexpectedEndOfStream) if buf.len() < *region_len => {
              /* legitimately need more bytes */
            },
            | Err(e) => {
              let remaining = region_len.saturating_sub(buf.len());
              events.push(Err(Error::from(e)));
              self.state = State::Ignoring { remaining };
            },
          }
        },
        | State::Payload { code, token, remaining, total_payload_size, delivered } => {
          let take = (*remaining).min(bytes.len());
          let chunk = bytes[..take].to_vec();
          bytes = &bytes[take..];
          *remaining -= take;
          let offset = *delivered;
          *delivered += take;
          let is_final = *remaining == 0;
          events.push(Ok(PayloadChunk { code: *code,
                                         token: *token,
                                         options: OptionList::new(),
                                         payload_offset: offset,
                                         chunk,
                                         total_payload_size: *total_payload_size,
                                         is_final }));
          if is_final {
            self.state = State::Header { buf: Vec::new() };
          }
        },
        | State::Ignoring { remaining } => {
          let take = (*remaining).min(bytes.len());
          bytes = &bytes[take..];
          *remaining -= take;
          if *remaining == 0 {
            self.state = State::Header { buf: Vec::new() };
          }
        },
      }
    }

    events
  }

  /// Whether `state` can advance (or finish) even if no further bytes are
  /// fed in — true exactly when everything it's still waiting on is
  /// already buffered (a zero-length token, an empty options-and-payload
  /// region).
  fn can_complete_without_more_input(state: &State) -> bool {
    match state {
      | State::Header { .. } => false,
      | State::Token { header, buf } => buf.len() >= header.tkl as usize,
      | State::Options { buf, region_len, .. } => buf.len() >= *region_len,
      | State::Payload { remaining, .. } => *remaining == 0,
      | State::Ignoring { remaining } => *remaining == 0,
    }
  }

  fn start_payload(state: &mut State,
                    code: Code,
                    token: Token,
                    options: OptionList,
                    already_buffered: Vec<u8>,
                    total_payload_size: usize)
                    -> PayloadChunk {
    if total_payload_size == 0 {
      *state = State::Header { buf: Vec::new() };
      return PayloadChunk { code,
                             token,
                             options,
                             payload_offset: 0,
                             chunk: Vec::new(),
                             total_payload_size: 0,
                             is_final: true };
    }

    let delivered = already_buffered.len();
    let is_final = delivered == total_payload_size;
    *state = if is_final {
      State::Header { buf: Vec::new() }
    } else {
      State::Payload { code,
                        token,
                        remaining: total_payload_size - delivered,
                        total_payload_size,
                        delivered }
    };

    PayloadChunk { code,
                   token,
                   options,
                   payload_offset: 0,
                   chunk: already_buffered,
                   total_payload_size,
                   is_final }
  }
}
