//! Stream reassembly.
//!
//! A serial link delivers bytes in arbitrary chunks. [`StreamReassembler`]
//! buffers them, cuts complete frames off the front and decodes each into a
//! [`Response`]. Corrupt input is skipped:
//!
//! - a byte other than SOP where a frame should start is discarded along with
//!   everything up to the next SOP;
//! - a frame whose FCS does not match loses only its SOP byte, and scanning
//!   resumes from the byte after it, so a real frame hidden inside the bad
//!   one is still found;
//! - a frame whose length byte points past the end of the buffer while a
//!   complete, valid frame already starts at a later SOP is treated as a
//!   corrupted length: its SOP byte is dropped and scanning resumes. Without
//!   this a single flipped length bit would hold back every later response
//!   until enough unrelated bytes arrived to fail the checksum.

use bytes::{Buf, BytesMut};

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::{decode_frame, Frame};
use crate::responses::Response;

/// Counters kept by a [`StreamReassembler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    /// Frames decoded.
    pub frames: u64,
    /// Frames dropped because their FCS did not match.
    pub checksum_errors: u64,
    /// Times the buffer did not start with SOP.
    pub framing_errors: u64,
    /// Frames dropped because a valid frame started inside their claimed
    /// length.
    pub length_errors: u64,
    /// Bytes thrown away while resynchronizing.
    pub discarded_bytes: u64,
}

/// Turns a byte stream into responses.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    buffer: BytesMut,
    stats: ReassemblerStats,
}

impl StreamReassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        StreamReassembler {
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
            stats: ReassemblerStats::default(),
        }
    }

    /// Append `bytes` and call `emit` once for every complete frame, in
    /// arrival order.
    ///
    /// A trailing partial frame stays buffered for the next call.
    pub fn on_bytes_received(&mut self, bytes: &[u8], mut emit: impl FnMut(Response)) {
        self.buffer.extend_from_slice(bytes);
        while let Some(frame) = self.next_frame() {
            emit(Response::from_frame(&frame));
        }
    }

    /// Cut the next valid frame off the buffer.
    ///
    /// Returns `None` when the buffer holds no complete frame. Corrupt bytes
    /// in front of the frame are dropped on the way.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match decode_frame(&self.buffer) {
                Ok(Some((frame, consumed))) => {
                    self.buffer.advance(consumed);
                    self.stats.frames += 1;
                    log::trace!(
                        "frame {} with {} byte payload",
                        frame.command(),
                        frame.payload().len()
                    );
                    return Some(frame);
                }
                Ok(None) => {
                    if !self.later_frame_complete() {
                        return None;
                    }
                    log::warn!("length overruns a later valid frame, dropping SOP and rescanning");
                    self.discard(1);
                    self.stats.length_errors += 1;
                }
                Err(ProtocolError::Framing { found }) => {
                    let skip = self
                        .buffer
                        .iter()
                        .position(|&b| b == SOP)
                        .unwrap_or(self.buffer.len());
                    log::warn!(
                        "framing error (found 0x{:02X}), discarding {} bytes",
                        found,
                        skip
                    );
                    self.discard(skip);
                    self.stats.framing_errors += 1;
                }
                Err(e) => {
                    log::warn!("{}, dropping SOP and rescanning", e);
                    self.discard(1);
                    self.stats.checksum_errors += 1;
                }
            }
        }
    }

    /// Whether a complete frame with a good FCS starts at some SOP past the
    /// head of the buffer.
    fn later_frame_complete(&self) -> bool {
        self.buffer
            .iter()
            .enumerate()
            .skip(1)
            .filter(|&(_, &b)| b == SOP)
            .any(|(at, _)| matches!(decode_frame(&self.buffer[at..]), Ok(Some(_))))
    }

    fn discard(&mut self, count: usize) {
        self.buffer.advance(count);
        self.stats.discarded_bytes += count as u64;
    }

    /// Number of bytes waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Counters since creation.
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;
    use crate::responses::ResponseKind;

    fn collect(r: &mut StreamReassembler, bytes: &[u8]) -> Vec<Response> {
        let mut out = Vec::new();
        r.on_bytes_received(bytes, |resp| out.push(resp));
        out
    }

    fn permit_join(secs: u8) -> Vec<u8> {
        encode_frame(RESP_SYS_PERMIT_JOIN, &[secs]).unwrap()
    }

    #[test]
    fn test_two_frames_one_delivery() {
        let mut bytes = permit_join(60);
        bytes.extend(encode_frame(RESP_SYS_SET_TIME, &[0x00]).unwrap());

        let mut r = StreamReassembler::new();
        let out = collect(&mut r, &bytes);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Response::PermitJoin { permit_time: 60 });
        assert_eq!(out[1].kind(), ResponseKind::SetSystemTime);
        assert_eq!(r.buffered_len(), 0);
        assert_eq!(r.stats().frames, 2);
    }

    #[test]
    fn test_split_at_every_boundary() {
        let mut bytes = permit_join(1);
        bytes.extend(encode_frame(RESP_SYS_GET_TIME, &[0, 0, 0, 5]).unwrap());
        bytes.extend(permit_join(2));

        for cut in 0..=bytes.len() {
            let mut r = StreamReassembler::new();
            let mut out = collect(&mut r, &bytes[..cut]);
            out.extend(collect(&mut r, &bytes[cut..]));
            let kinds: Vec<_> = out.iter().map(Response::kind).collect();
            assert_eq!(
                kinds,
                vec![
                    ResponseKind::PermitJoin,
                    ResponseKind::SystemTime,
                    ResponseKind::PermitJoin
                ],
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = encode_frame(RESP_BIND, &[0x00, 0x12, 0x34]).unwrap();
        let mut r = StreamReassembler::new();
        let mut out = Vec::new();
        for b in &bytes {
            out.extend(collect(&mut r, std::slice::from_ref(b)));
        }
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code(), RESP_BIND);
    }

    #[test]
    fn test_leading_garbage_is_discarded() {
        let mut bytes = vec![0xFF, 0x13, 0x37];
        bytes.extend(permit_join(9));

        let mut r = StreamReassembler::new();
        let out = collect(&mut r, &bytes);
        assert_eq!(out, vec![Response::PermitJoin { permit_time: 9 }]);
        let stats = r.stats();
        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.discarded_bytes, 3);
    }

    #[test]
    fn test_corrupt_frame_emits_nothing_then_resyncs() {
        let mut corrupt = permit_join(30);
        let fcs = corrupt.len() - 1;
        corrupt[fcs] ^= 0x01;

        let mut r = StreamReassembler::new();
        assert!(collect(&mut r, &corrupt).is_empty());
        assert_eq!(r.stats().checksum_errors, 1);

        let out = collect(&mut r, &permit_join(31));
        assert_eq!(out, vec![Response::PermitJoin { permit_time: 31 }]);
        assert_eq!(r.buffered_len(), 0);
    }

    #[test]
    fn test_frame_hidden_after_false_sop() {
        // A stray SOP whose length swallows the real frame. The checksum
        // fails and the real frame is found by rescanning.
        let real = permit_join(5);
        let mut bytes = vec![SOP, 0x10, 0x10, real.len() as u8 - 1];
        bytes.extend(&real);

        let mut r = StreamReassembler::new();
        let out = collect(&mut r, &bytes);
        assert_eq!(out, vec![Response::PermitJoin { permit_time: 5 }]);
        assert!(r.stats().checksum_errors >= 1);
    }

    #[test]
    fn test_overlong_length_does_not_stall_later_frames() {
        let mut bad = encode_frame(RESP_SYS_PERMIT_JOIN, &[0x10, 0x20, 0x30, 0x40]).unwrap();
        bad[3] ^= 0x80;

        let mut r = StreamReassembler::new();
        assert!(collect(&mut r, &bad).is_empty());

        let mut out = Vec::new();
        for secs in 1..=5 {
            out.extend(collect(&mut r, &permit_join(secs)));
        }
        let expected: Vec<_> = (1..=5)
            .map(|secs| Response::PermitJoin { permit_time: secs })
            .collect();
        assert_eq!(out, expected);
        assert_eq!(r.buffered_len(), 0);
        let stats = r.stats();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.length_errors, 1);
        assert_eq!(stats.discarded_bytes, bad.len() as u64);
    }

    #[test]
    fn test_partial_frame_waits_without_later_frame() {
        // A SOP in the payload of a partial frame does not start a valid
        // frame, so the partial frame keeps waiting.
        let bytes = encode_frame(RESP_SYS_GET_TIME, &[0x02, 0x00, 0x00, 0x05]).unwrap();
        let mut r = StreamReassembler::new();
        assert!(collect(&mut r, &bytes[..6]).is_empty());
        assert_eq!(r.buffered_len(), 6);
        let out = collect(&mut r, &bytes[6..]);
        assert_eq!(out.len(), 1);
        assert_eq!(r.stats().length_errors, 0);
    }

    #[test]
    fn test_incomplete_frame_stays_buffered() {
        let bytes = permit_join(7);
        let mut r = StreamReassembler::new();
        assert!(collect(&mut r, &bytes[..3]).is_empty());
        assert_eq!(r.buffered_len(), 3);
        r.clear();
        assert_eq!(r.buffered_len(), 0);
    }

    #[test]
    fn test_unknown_code_is_emitted() {
        let bytes = encode_frame(0x0ABC, &[0x01, 0x02]).unwrap();
        let mut r = StreamReassembler::new();
        let out = collect(&mut r, &bytes);
        assert_eq!(
            out,
            vec![Response::Unknown {
                code: 0x0ABC,
                payload: vec![0x01, 0x02]
            }]
        );
    }
}
