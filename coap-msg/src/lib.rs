//! Byte-level CoAP message parsing & serialization.
//!
//! This crate implements the wire formats of [RFC 7252](https://www.rfc-editor.org/rfc/rfc7252)
//! (CoAP over UDP), [RFC 7959](https://www.rfc-editor.org/rfc/rfc7959) (block-wise transfer),
//! and [RFC 8323](https://www.rfc-editor.org/rfc/rfc8323) (CoAP over TCP framing). It has no
//! opinions about sockets, retransmission, or scheduling — see `coap-core` for the exchange
//! engines built on top of it.

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

/// BLOCK1/BLOCK2 option value.
pub mod block;
/// Message code (class.detail).
pub mod code;
/// Parse/serialize errors.
pub mod error;
/// Transport-agnostic message body and the UDP/TCP envelopes.
pub mod message;
/// Option list codec.
pub mod option;
/// CoAP-over-TCP variable-length framing header.
pub mod tcp_header;
/// Message correlation token.
pub mod token;
/// Fixed 4-byte UDP header.
pub mod udp_header;

pub use block::{Block, BlockError};
pub use code::{Code, Kind as CodeKind};
pub use error::{MessageParseError, MessageToBytesError, TcpHeaderParseError};
pub use message::{Message, TcpMessage, TruncatedUdpMessage, UdpMessage};
pub use option::{Opt, OptionList};
pub use tcp_header::TcpHeader;
pub use token::Token;
pub use udp_header::{Type, UdpHeader};
