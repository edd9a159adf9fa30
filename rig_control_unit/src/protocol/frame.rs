//! Frame header codec and frame construction.
//!
//! Everything is encoded byte-by-byte in little-endian order — no reliance
//! on native struct layout — so the format is bit-exact across hosts.

use crc::{CRC_16_IBM_3740, Crc};
use heapless::Vec;

/// Frame start marker.
pub const MAGIC: u32 = 0xA5C3_F00D;
/// Protocol version carried in every header.
pub const VERSION: u8 = 1;
/// Maximum payload length.
pub const MAX_PAYLOAD: usize = 64;
/// Encoded header length.
pub const HEADER_LEN: usize = 12;
/// Trailing checksum length.
pub const CRC_LEN: usize = 2;
/// Largest possible encoded frame.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD + CRC_LEN;

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF), shared with the profile
/// blob.
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Known frame types. The header carries the raw byte so unknown types can
/// pass through the parser and be ignored at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Host liveness beacon.
    Heartbeat = 0x01,
    /// Axis setpoint command.
    Command = 0x02,
    /// Manual jog override.
    Jog = 0x03,
    /// Update flow / profile maintenance operations.
    Maintenance = 0x04,
    /// Diagnostic request/response.
    Diagnostic = 0x05,
    /// Periodic controller status.
    Status = 0x10,
    /// Debounced input event (PTT).
    InputEvent = 0x11,
}

impl FrameType {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Heartbeat),
            0x02 => Some(Self::Command),
            0x03 => Some(Self::Jog),
            0x04 => Some(Self::Maintenance),
            0x05 => Some(Self::Diagnostic),
            0x10 => Some(Self::Status),
            0x11 => Some(Self::InputEvent),
            _ => None,
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u32,
    pub version: u8,
    /// Raw frame type byte.
    pub frame_type: u8,
    /// Payload length [bytes].
    pub length: u16,
    /// Sender sequence number.
    pub seq: u32,
}

impl FrameHeader {
    /// Decode from exactly [`HEADER_LEN`] bytes. No validation — the parser
    /// decides what to do with a bad header.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            version: bytes[4],
            frame_type: bytes[5],
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
            seq: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }

    /// Encode into [`HEADER_LEN`] bytes.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4] = self.version;
        out[5] = self.frame_type;
        out[6..8].copy_from_slice(&self.length.to_le_bytes());
        out[8..12].copy_from_slice(&self.seq.to_le_bytes());
        out
    }

    /// Header/payload checksum as carried on the wire.
    pub fn crc(&self, payload: &[u8]) -> u16 {
        let mut digest = CRC16.digest();
        digest.update(&self.encode());
        digest.update(payload);
        digest.finalize()
    }
}

/// A parsed frame: header, payload, and the validated checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8, MAX_PAYLOAD>,
    pub crc: u16,
}

impl Frame {
    /// Typed frame type, `None` for unknown bytes.
    #[inline]
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_u8(self.header.frame_type)
    }
}

/// Build a complete wire frame. Returns `None` when the payload exceeds
/// [`MAX_PAYLOAD`].
pub fn build_frame(
    frame_type: FrameType,
    seq: u32,
    payload: &[u8],
) -> Option<Vec<u8, MAX_FRAME_LEN>> {
    if payload.len() > MAX_PAYLOAD {
        return None;
    }
    let header = FrameHeader {
        magic: MAGIC,
        version: VERSION,
        frame_type: frame_type as u8,
        length: payload.len() as u16,
        seq,
    };
    let mut out: Vec<u8, MAX_FRAME_LEN> = Vec::new();
    out.extend_from_slice(&header.encode()).ok()?;
    out.extend_from_slice(payload).ok()?;
    out.extend_from_slice(&header.crc(payload).to_le_bytes()).ok()?;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_encode_decode_roundtrip() {
        let header = FrameHeader {
            magic: MAGIC,
            version: VERSION,
            frame_type: FrameType::Command as u8,
            length: 16,
            seq: 0xDEAD_BEEF,
        };
        assert_eq!(FrameHeader::decode(&header.encode()), header);
    }

    #[test]
    fn header_layout_is_little_endian() {
        let header = FrameHeader {
            magic: MAGIC,
            version: 1,
            frame_type: 0x02,
            length: 0x0102,
            seq: 0x0A0B_0C0D,
        };
        let bytes = header.encode();
        assert_eq!(&bytes[0..4], &[0x0D, 0xF0, 0xC3, 0xA5]);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[5], 0x02);
        assert_eq!(&bytes[6..8], &[0x02, 0x01]);
        assert_eq!(&bytes[8..12], &[0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn build_frame_layout() {
        let frame = build_frame(FrameType::Heartbeat, 7, &[]).unwrap();
        assert_eq!(frame.len(), HEADER_LEN + CRC_LEN);
        let header = FrameHeader::decode(frame[..HEADER_LEN].try_into().unwrap());
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.frame_type, FrameType::Heartbeat as u8);
        assert_eq!(header.length, 0);
        assert_eq!(header.seq, 7);
    }

    #[test]
    fn build_frame_rejects_oversize_payload() {
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert!(build_frame(FrameType::Command, 0, &payload).is_none());
    }

    #[test]
    fn frame_type_roundtrip() {
        for t in [
            FrameType::Heartbeat,
            FrameType::Command,
            FrameType::Jog,
            FrameType::Maintenance,
            FrameType::Diagnostic,
            FrameType::Status,
            FrameType::InputEvent,
        ] {
            assert_eq!(FrameType::from_u8(t as u8), Some(t));
        }
        assert!(FrameType::from_u8(0xFF).is_none());
    }

    #[test]
    fn crc_covers_header_and_payload() {
        let header = FrameHeader {
            magic: MAGIC,
            version: VERSION,
            frame_type: FrameType::Command as u8,
            length: 2,
            seq: 1,
        };
        let a = header.crc(&[1, 2]);
        let b = header.crc(&[1, 3]);
        assert_ne!(a, b);
        let mut other = header;
        other.seq = 2;
        assert_ne!(a, other.crc(&[1, 2]));
    }
}
