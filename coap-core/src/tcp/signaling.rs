//! CSM negotiation and the Ping/Pong/Release/Abort signaling messages (RFC 8323 § 5).

use coap_msg::option::Opt;
use coap_msg::{Code, Message, Token};

use crate::config::Tcp;
use crate::error::Error;

/// Option numbers carried by a CSM (7.01) message.
pub mod csm_option {
  /// the sender's advertised Max-Message-Size, a uint option (default 1152)
  pub const MAX_MESSAGE_SIZE: u16 = 2;
  /// present (empty value) if the sender supports block-wise transfer
  pub const BLOCK_WISE_TRANSFER: u16 = 4;
}

/// Option numbers carried by a Ping/Pong (7.02/7.03) message.
pub mod ping_option {
  /// present on a Pong to indicate the peer took custody of the Ping
  pub const CUSTODY: u16 = 2;
}

/// The peer's advertised TCP capabilities.
///
/// Named `PeerCsm` rather than after the message that carries it (`Csm`),
/// since what's tracked here is the remote endpoint's settings, not any
/// particular message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCsm {
  /// whether a CSM has been received from the peer yet
  pub received: bool,
  /// the peer's advertised Max-Message-Size (1152 until a CSM updates it)
  pub max_message_size: u32,
  /// whether the peer advertised block-wise-transfer support
  pub block_wise_transfer_capable: bool,
}

impl Default for PeerCsm {
  fn default() -> Self {
    Self { received: false,
           max_message_size: 1152,
           block_wise_transfer_capable: false }
  }
}

fn encode_uint(value: u32) -> Vec<u8> {
  let bytes = value.to_be_bytes();
  let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
  bytes[first_nonzero..].to_vec()
}

/// Build this endpoint's own CSM, advertising its configured capabilities.
pub fn build_csm(config: &Tcp) -> Message {
  let mut msg = Message::new(Code::CSM, Token::EMPTY);
  msg.options
     .insert(Opt::new(csm_option::MAX_MESSAGE_SIZE, encode_uint(config.max_message_size)));
  if config.block_wise_transfer {
    msg.options.insert(Opt::new(csm_option::BLOCK_WISE_TRANSFER, Vec::new()));
  }
  msg
}

/// Fold a received CSM into the tracked peer capabilities.
///
/// Rejects the CSM if it carries a critical option this endpoint doesn't
/// recognize (RFC 7252 § 5.4.1: critical options are the odd-numbered ones).
pub fn apply_csm(peer: &mut PeerCsm, msg: &Message) -> Result<(), Error> {
  if let Some(unknown) =
    msg.options
       .all_critical_known(|n| matches!(n, csm_option::MAX_MESSAGE_SIZE | csm_option::BLOCK_WISE_TRANSFER))
  {
    return Err(Error::TcpUnknownCsmCriticalOptionReceived(unknown));
  }

  if let Some(opt) = msg.options.get(csm_option::MAX_MESSAGE_SIZE) {
    peer.max_message_size = opt.as_uint() as u32;
  }
  peer.block_wise_transfer_capable = msg.options.get(csm_option::BLOCK_WISE_TRANSFER).is_some();
  peer.received = true;
  Ok(())
}

/// Reply to a received Ping, taking custody and echoing its token.
pub fn build_pong(token: Token) -> Message {
  let mut msg = Message::new(Code::PONG, token);
  msg.options.insert(Opt::new(ping_option::CUSTODY, Vec::new()));
  msg
}

/// Build an Abort carrying a human-readable diagnostic payload.
pub fn build_abort(diagnostic: &str) -> Message {
  let mut msg = Message::new(Code::ABORT, Token::EMPTY);
  msg.payload = diagnostic.as_bytes().to_vec();
  msg
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn csm_round_trip_updates_peer() {
    let config = Tcp { max_message_size: 4096,
                       block_wise_transfer: true,
                       ..Tcp::default() };
    let msg = build_csm(&config);
    let mut peer = PeerCsm::default();
    apply_csm(&mut peer, &msg).unwrap();
    assert_eq!(peer.max_message_size, 4096);
    assert!(peer.block_wise_transfer_capable);
    assert!(peer.received);
  }

  #[test]
  fn unknown_critical_csm_option_rejected() {
    let mut msg = build_csm(&Tcp::default());
    msg.options.insert(Opt::new(21, vec![1]));
    let mut peer = PeerCsm::default();
    assert_eq!(apply_csm(&mut peer, &msg).unwrap_err(),
               Error::TcpUnknownCsmCriticalOptionReceived(21));
  }

  #[test]
  fn pong_echoes_token_and_carries_custody() {
    let pong = build_pong(Token::new(b"ping"));
    assert_eq!(pong.token, Token::new(b"ping"));
    assert!(pong.options.get(ping_option::CUSTODY).is_some());
  }
}
