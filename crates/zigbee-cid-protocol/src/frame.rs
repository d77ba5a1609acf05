//! Frame encoding/decoding.
//!
//! Every message on the CID link, in both directions, uses the same frame:
//!
//! ```text
//! +------+--------+--------+-----+-------------------+-----+
//! | 0x02 | cmd_hi | cmd_lo | len | payload[0..len]   | fcs |
//! +------+--------+--------+-----+-------------------+-----+
//! ```
//!
//! `fcs` is the XOR of `cmd_hi`, `cmd_lo`, `len` and every payload byte.

use std::fmt;

use bytes::BufMut;

use crate::bits::xor_checksum;
use crate::constants::*;
use crate::error::ProtocolError;

/// A 16-bit CID command word.
///
/// The raw word is preserved; the flag bits are exposed through accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandCode(pub u16);

impl CommandCode {
    /// The raw 16-bit word.
    pub fn raw(self) -> u16 {
        self.0
    }

    /// Bit 15: the coordinator rejected the command.
    pub fn is_nack(self) -> bool {
        self.0 & CMD_FLAG_NACK != 0
    }

    /// Bit 14: the coordinator acknowledged the command.
    pub fn is_ack(self) -> bool {
        self.0 & CMD_FLAG_ACK != 0
    }

    /// Bit 12: coordinator → host response.
    pub fn is_response(self) -> bool {
        self.0 & CMD_FLAG_RESPONSE != 0
    }

    /// Bits 11..0: the command number.
    pub fn number(self) -> u16 {
        self.0 & CMD_NUMBER_MASK
    }
}

impl From<u16> for CommandCode {
    fn from(code: u16) -> Self {
        CommandCode(code)
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// A validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: CommandCode,
    payload: Vec<u8>,
}

impl Frame {
    /// Build a frame. Fails if the payload does not fit the length byte.
    pub fn new(command: impl Into<CommandCode>, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::InvalidArgument(format!(
                "payload of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        Ok(Frame {
            command: command.into(),
            payload,
        })
    }

    /// The command word.
    pub fn command(&self) -> CommandCode {
        self.command
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the frame, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// The FCS this frame carries on the wire.
    pub fn checksum(&self) -> u8 {
        let [hi, lo] = self.command.0.to_be_bytes();
        hi ^ lo ^ (self.payload.len() as u8) ^ xor_checksum(&self.payload)
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.put_u8(SOP);
        buf.put_u16(self.command.0);
        buf.put_u8(self.payload.len() as u8);
        buf.extend_from_slice(&self.payload);
        buf.put_u8(self.checksum());
        buf
    }
}

/// Encode a frame for `command` with an optional body.
///
/// An empty body is sent with a zero length byte.
pub fn encode_frame(command: u16, body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    Ok(Frame::new(command, body.to_vec())?.encode())
}

/// Try to decode one frame from the front of `buf`.
///
/// Returns `Ok(Some((frame, consumed)))` on success, `Ok(None)` when more
/// bytes are needed (nothing consumed), or an error when the buffer does not
/// start with SOP or the checksum does not match. Bytes past the frame are
/// never inspected.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    if first != SOP {
        return Err(ProtocolError::Framing { found: first });
    }
    if buf.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }

    let command = u16::from_be_bytes([buf[1], buf[2]]);
    let len = buf[3] as usize;
    let total = FRAME_OVERHEAD + len;
    if buf.len() < total {
        return Ok(None);
    }

    let expected = xor_checksum(&buf[1..FRAME_HEADER_SIZE + len]);
    let actual = buf[FRAME_HEADER_SIZE + len];
    if expected != actual {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    let frame = Frame {
        command: CommandCode(command),
        payload: buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + len].to_vec(),
    };
    Ok(Some((frame, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_ping_layout() {
        let encoded = encode_frame(CMD_SYS_PING, &[]).unwrap();
        assert_eq!(encoded, vec![0x02, 0x00, 0x00, 0x00, 0x00]);

        let encoded = encode_frame(0x1234, &[0xAA, 0x55]).unwrap();
        assert_eq!(encoded[0], SOP);
        assert_eq!(encoded[1], 0x12);
        assert_eq!(encoded[2], 0x34);
        assert_eq!(encoded[3], 2);
        assert_eq!(&encoded[4..6], &[0xAA, 0x55]);
        assert_eq!(encoded[6], 0x12 ^ 0x34 ^ 0x02 ^ 0xAA ^ 0x55);
    }

    #[test]
    fn test_encode_decode_all_lengths() {
        for len in 0..=MAX_PAYLOAD_SIZE {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
            let encoded = encode_frame(0x1031, &payload).unwrap();
            let (frame, consumed) = decode_frame(&encoded).unwrap().expect("complete frame");
            assert_eq!(consumed, FRAME_OVERHEAD + len);
            assert_eq!(frame.command().raw(), 0x1031);
            assert_eq!(frame.payload(), &payload[..]);
        }
    }

    #[test]
    fn test_encode_rejects_oversized_body() {
        let body = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(
            encode_frame(0x0031, &body),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_decode_needs_more_data() {
        let encoded = encode_frame(0x1002, &[0, 0, 0, 1]).unwrap();
        assert_eq!(decode_frame(&[]).unwrap(), None);
        for cut in 1..encoded.len() {
            assert_eq!(decode_frame(&encoded[..cut]).unwrap(), None, "cut at {}", cut);
        }
    }

    #[test]
    fn test_decode_bad_sop() {
        assert_eq!(
            decode_frame(&[0x7E, 0x10, 0x00]),
            Err(ProtocolError::Framing { found: 0x7E })
        );
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let mut buf = encode_frame(0x1010, &[0x3C]).unwrap();
        let frame_len = buf.len();
        buf.extend_from_slice(&[0x02, 0x10]);
        let (frame, consumed) = decode_frame(&buf).unwrap().unwrap();
        assert_eq!(consumed, frame_len);
        assert_eq!(frame.payload(), &[0x3C]);
    }

    #[test]
    fn test_decode_payload_bit_flip_is_checksum_error() {
        let payload = [0x10, 0x20, 0x30, 0x40];
        let encoded = encode_frame(0x1031, &payload).unwrap();
        for byte in FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + payload.len() {
            for bit in 0..8 {
                let mut corrupt = encoded.clone();
                corrupt[byte] ^= 1 << bit;
                assert!(matches!(
                    decode_frame(&corrupt),
                    Err(ProtocolError::ChecksumMismatch { .. })
                ));
            }
        }
    }

    #[test]
    fn test_decode_shortened_length_is_checksum_error() {
        // len 4 -> 2: the byte read as FCS is now payload[2]
        let encoded = encode_frame(0x1031, &[0x10, 0x20, 0x30, 0x40]).unwrap();
        let mut corrupt = encoded.clone();
        corrupt[3] ^= 0x06;
        assert!(matches!(
            decode_frame(&corrupt),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_length_bit_flip_never_yields_frame() {
        let encoded = encode_frame(0x1031, &[0x10, 0x20, 0x30, 0x40]).unwrap();
        for bit in 0..8 {
            let mut corrupt = encoded.clone();
            corrupt[3] ^= 1 << bit;
            match decode_frame(&corrupt) {
                // a longer length waits for bytes that never belonged to it
                Ok(None) => assert!(corrupt[3] > 4),
                Err(ProtocolError::ChecksumMismatch { .. }) => {}
                other => panic!("bit {}: unexpected {:?}", bit, other),
            }
        }
    }

    #[test]
    fn test_command_code_flags() {
        let code = CommandCode(0x1031);
        assert!(code.is_response());
        assert!(!code.is_ack());
        assert!(!code.is_nack());
        assert_eq!(code.number(), 0x031);

        let code = CommandCode(0xD002);
        assert!(code.is_nack());
        assert!(code.is_ack());
        assert!(code.is_response());
        assert_eq!(code.number(), 0x002);
        assert_eq!(code.raw(), 0xD002);
        assert_eq!(code.to_string(), "0xD002");
    }
}
