//! Wire packet codec
//!
//! Wire format (all fields big-endian):
//! ```text
//! [magic:4][sender_id:4][action:4][payload_size:4][payload:N]
//! ```
//! Every field is copied out of the buffer individually and `payload_size`
//! must account for exactly the bytes that follow the header.

use std::fmt;

use thiserror::Error;

use super::constants::{HEADER_SIZE, MAGIC, MAX_PAYLOAD_SIZE};

/// Errors produced while framing or unframing a packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Fewer bytes than a full header.
    #[error("truncated packet: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The datagram belongs to some other protocol.
    #[error("bad magic: 0x{0:08X}")]
    BadMagic(u32),

    /// Declared payload size disagrees with the bytes actually received.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    LengthMismatch { declared: usize, available: usize },

    /// Action tag not known to this version.
    #[error("unknown action: {0}")]
    UnknownAction(u32),

    /// Payload too large for a single datagram.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Packet action tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Action {
    None = 0,
    ClipData = 1,
}

impl Action {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Action::None),
            1 => Some(Action::ClipData),
            _ => None,
        }
    }
}

/// Per-process sender identity used to recognise our own looped-back packets.
///
/// Not an authentication token: anyone on the group can forge it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SenderId(u32);

impl SenderId {
    /// Draw a fresh id from the positive range of a 32-bit signed integer
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen_range(1..=i32::MAX as u32))
    }

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// A decoded packet borrowing its payload from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<'a> {
    pub sender_id: SenderId,
    pub action: Action,
    pub payload: &'a [u8],
}

/// Frame `payload` behind a header.
///
/// # Errors
///
/// Returns [`PacketError::PayloadTooLarge`] if the payload cannot fit in a
/// single datagram.
pub fn encode(action: Action, sender_id: SenderId, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(PacketError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&MAGIC.to_be_bytes());
    buf.extend_from_slice(&sender_id.get().to_be_bytes());
    buf.extend_from_slice(&(action as u32).to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Parse one datagram.
///
/// # Errors
///
/// Returns a [`PacketError`] for anything that is not a well-formed packet of
/// this protocol. Never reads outside `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Packet<'_>, PacketError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PacketError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let (header, payload) = bytes.split_at(HEADER_SIZE);

    let magic = read_u32(header, 0);
    if magic != MAGIC {
        return Err(PacketError::BadMagic(magic));
    }

    let sender_id = SenderId(read_u32(header, 4));
    let action_tag = read_u32(header, 8);
    let declared = read_u32(header, 12) as usize;

    if declared != payload.len() {
        return Err(PacketError::LengthMismatch {
            declared,
            available: payload.len(),
        });
    }

    let action = Action::from_wire(action_tag).ok_or(PacketError::UnknownAction(action_tag))?;

    Ok(Packet {
        sender_id,
        action,
        payload,
    })
}

// `header` is always exactly HEADER_SIZE bytes here.
fn read_u32(header: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&header[offset..offset + 4]);
    u32::from_be_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_roundtrip() {
        let payload = br#"{"host":"a","text":"hi","html":""}"#;
        let bytes = encode(Action::ClipData, SenderId::new(111), payload).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + payload.len());

        let packet = decode(&bytes).unwrap();
        assert_eq!(packet.action, Action::ClipData);
        assert_eq!(packet.sender_id, SenderId::new(111));
        assert_eq!(packet.payload, payload);
    }

    #[test]
    fn test_empty_payload() {
        let bytes = encode(Action::None, SenderId::new(7), &[]).unwrap();
        let packet = decode(&bytes).unwrap();
        assert_eq!(packet.action, Action::None);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_header_is_network_order() {
        let bytes = encode(Action::ClipData, SenderId::new(0x0102_0304), b"xy").unwrap();
        assert_eq!(&bytes[0..4], b"NTCL");
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 1]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_short_buffers_are_truncated() {
        let full = encode(Action::ClipData, SenderId::new(1), b"payload").unwrap();
        for len in 0..HEADER_SIZE {
            assert_eq!(
                decode(&full[..len]),
                Err(PacketError::Truncated { needed: HEADER_SIZE, available: len })
            );
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(Action::ClipData, SenderId::new(1), b"x").unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(PacketError::BadMagic(_))));
    }

    #[test]
    fn test_forged_size_rejected() {
        let mut bytes = encode(Action::ClipData, SenderId::new(1), b"abc").unwrap();
        bytes[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_eq!(
            decode(&bytes),
            Err(PacketError::LengthMismatch { declared: u32::MAX as usize, available: 3 })
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(Action::ClipData, SenderId::new(1), b"abc").unwrap();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(PacketError::LengthMismatch { declared: 3, available: 4 })));
    }

    #[test]
    fn test_unknown_action() {
        let mut bytes = encode(Action::ClipData, SenderId::new(1), b"").unwrap();
        bytes[8..12].copy_from_slice(&9u32.to_be_bytes());
        assert_eq!(decode(&bytes), Err(PacketError::UnknownAction(9)));
    }

    #[test]
    fn test_oversized_payload_refused() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            encode(Action::ClipData, SenderId::new(1), &payload),
            Err(PacketError::PayloadTooLarge { .. })
        ));
        assert!(encode(Action::ClipData, SenderId::new(1), &payload[..MAX_PAYLOAD_SIZE]).is_ok());
    }

    #[test]
    fn test_random_sender_id_is_positive() {
        for _ in 0..64 {
            let id = SenderId::random().get();
            assert!(id >= 1 && id <= i32::MAX as u32);
        }
    }
}
