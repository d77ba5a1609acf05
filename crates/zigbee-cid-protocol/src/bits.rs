//! Big-endian field access and bit tests.
//!
//! Every multi-byte field on the CID link is sent high byte first. These
//! helpers read such fields out of a payload at a given offset and report
//! [`ProtocolError::Truncated`] instead of panicking when the payload is too
//! short.

use crate::error::ProtocolError;

/// Test bit `pos` (0 = least significant) of `byte`.
pub fn bit(byte: u8, pos: u8) -> bool {
    byte & (1 << pos) != 0
}

/// Borrow `len` bytes starting at `offset`.
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8], ProtocolError> {
    let end = offset.checked_add(len).ok_or(ProtocolError::Truncated {
        needed: usize::MAX,
        available: data.len(),
    })?;
    data.get(offset..end).ok_or(ProtocolError::Truncated {
        needed: end,
        available: data.len(),
    })
}

/// Read one byte at `offset`.
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, ProtocolError> {
    data.get(offset).copied().ok_or(ProtocolError::Truncated {
        needed: offset + 1,
        available: data.len(),
    })
}

/// Read a big-endian `u16` at `offset`.
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    let b = slice_at(data, offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

/// Read a big-endian `u32` at `offset`.
pub fn read_u32(data: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    let b = slice_at(data, offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read a big-endian `u64` at `offset`.
pub fn read_u64(data: &[u8], offset: usize) -> Result<u64, ProtocolError> {
    read_uint(data, offset, 8)
}

/// Read an unsigned big-endian integer of `width` bytes (1..=8).
pub fn read_uint(data: &[u8], offset: usize, width: usize) -> Result<u64, ProtocolError> {
    debug_assert!((1..=8).contains(&width));
    let b = slice_at(data, offset, width)?;
    Ok(b.iter().fold(0u64, |acc, &x| (acc << 8) | x as u64))
}

/// Read a signed big-endian integer of `width` bytes (1..=8), sign-extended.
pub fn read_int(data: &[u8], offset: usize, width: usize) -> Result<i64, ProtocolError> {
    let raw = read_uint(data, offset, width)?;
    let shift = 64 - 8 * width as u32;
    Ok(((raw << shift) as i64) >> shift)
}

/// XOR-reduce a byte slice. Used for the frame check sequence.
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}
