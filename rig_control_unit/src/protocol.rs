//! Framed binary command/telemetry protocol.
//!
//! Wire format (little-endian):
//! `magic:u32 | version:u8 | type:u8 | length:u16 | seq:u32 | payload | crc:u16`
//! with the CRC computed over header + payload. The parser reads from a
//! [`ring::RingBuffer`] and self-resynchronizes on stream corruption.

pub mod frame;
pub mod messages;
pub mod parser;
pub mod ring;

pub use frame::{Frame, FrameHeader, FrameType};
pub use parser::try_parse;
pub use ring::RingBuffer;
