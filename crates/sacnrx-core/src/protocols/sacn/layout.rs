//! E1.31 data packet byte layout (ANSI E1.31 root/framing/DMP layering).

use std::ops::Range;

pub const PREAMBLE_SIZE_RANGE: Range<usize> = 0..2;
pub const POSTAMBLE_SIZE_RANGE: Range<usize> = 2..4;
pub const ACN_PID_RANGE: Range<usize> = 4..16;

pub const ROOT_FLAGS_LENGTH_RANGE: Range<usize> = 16..18;
pub const ROOT_VECTOR_RANGE: Range<usize> = 18..22;
pub const CID_RANGE: Range<usize> = 22..38;

pub const FRAMING_FLAGS_LENGTH_RANGE: Range<usize> = 38..40;
pub const FRAMING_VECTOR_RANGE: Range<usize> = 40..44;
pub const SOURCE_NAME_RANGE: Range<usize> = 44..108;
pub const PRIORITY_OFFSET: usize = 108;
pub const SEQUENCE_OFFSET: usize = 111;
pub const OPTIONS_OFFSET: usize = 112;
pub const UNIVERSE_RANGE: Range<usize> = 113..115;

pub const DMP_FLAGS_LENGTH_RANGE: Range<usize> = 115..117;
pub const DMP_VECTOR_OFFSET: usize = 117;
pub const DMP_PROPERTY_VALUE_COUNT_RANGE: Range<usize> = 123..125;
pub const START_CODE_OFFSET: usize = 125;
pub const DMX_DATA_OFFSET: usize = 126;
pub const DMX_MAX_SLOTS: usize = 512;

pub const ACN_PID: &[u8; 12] = b"ASC-E1.17\0\0\0";
pub const PREAMBLE_SIZE: u16 = 0x0010;
pub const POSTAMBLE_SIZE: u16 = 0x0000;
pub const ROOT_VECTOR_DATA: u32 = 0x0000_0004;
pub const FRAMING_VECTOR_DMX: u32 = 0x0000_0002;
pub const DMP_VECTOR_SET_PROPERTY: u8 = 0x02;
pub const START_CODE_DIMMER: u8 = 0x00;

pub const OPTION_PREVIEW_DATA: u8 = 0b1000_0000;
pub const OPTION_STREAM_TERMINATED: u8 = 0b0100_0000;

/// Low 12 bits of a flags-and-length field carry the PDU length.
pub const PDU_LENGTH_MASK: u16 = 0x0fff;

/// Root, framing and DMP headers up to and including the start code.
pub const MIN_LEN: usize = DMX_DATA_OFFSET;

/// Largest property value count: start code plus a full universe.
pub const MAX_PROPERTY_VALUE_COUNT: u16 = (DMX_MAX_SLOTS + 1) as u16;

pub const DEFAULT_PORT: u16 = 5568;
pub const MIN_UNIVERSE: u16 = 1;
pub const MAX_UNIVERSE: u16 = 63999;
