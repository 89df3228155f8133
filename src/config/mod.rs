//! Build-time constants and runtime configuration.
//!
//! The embedding constants (`BITS_PER_BLOCK`, `COEFFICIENT_STRENGTH`,
//! `EMBED_POSITIONS`) are fixed at build time: the DCT tables derived from
//! them must be bit-identical on the encoding and decoding side.

use crate::video::frame::CodecError;

pub const MAGIC: u32 = 0x3154_4344; // "DCT1" on the wire
pub const VERSION_V1: u8 = 0x01;
pub const VERSION_V2: u8 = 0x02;

// Video parameters
pub const DEFAULT_FRAME_WIDTH: u32 = 3840;
pub const DEFAULT_FRAME_HEIGHT: u32 = 2160;
pub const DEFAULT_FPS: u32 = 30;
pub const BLOCK_SIZE: usize = 8;

/// Bits embedded per 8x8 block. Must divide 8 and cannot exceed the number
/// of embedding positions.
pub const BITS_PER_BLOCK: usize = 4;

/// Magnitude applied to each modulated DCT coefficient. Larger values
/// survive recompression better at the cost of visible texture.
pub const COEFFICIENT_STRENGTH: f32 = 80.0;

/// DCT coefficient positions whose sign carries one bit each, ordered MSB
/// first within a block. Low-frequency but non-DC.
pub const EMBED_POSITIONS: [(usize, usize); 4] = [(0, 1), (1, 0), (1, 1), (0, 2)];

const _: () = assert!(8 % BITS_PER_BLOCK == 0);
const _: () = assert!(BITS_PER_BLOCK >= 1 && BITS_PER_BLOCK <= EMBED_POSITIONS.len());

/// 8x8 blocks consumed per payload byte.
pub const BLOCKS_PER_BYTE: usize = 8 / BITS_PER_BLOCK;

// Packet layout
pub const HEADER_SIZE_V1: usize = 24;
pub const HEADER_SIZE_V2: usize = 40;
/// Fixed payload region length; every packet is header + symbol bytes long.
pub const SYMBOL_SIZE_BYTES: usize = 256;

// Packet flag bits
pub const FLAG_LAST_PACKET: u8 = 0x01;

/// Stream id size in the V2 header.
pub const STREAM_ID_SIZE: usize = 16;

/// Compute the number of 8x8 blocks in a frame.
pub fn blocks_per_frame(width: u32, height: u32) -> usize {
    (width as usize / BLOCK_SIZE) * (height as usize / BLOCK_SIZE)
}

/// Compute how many data bytes fit in a single frame.
pub fn bytes_per_frame(width: u32, height: u32) -> usize {
    blocks_per_frame(width, height) / BLOCKS_PER_BYTE
}

/// Runtime configuration for an encode/decode operation.
///
/// Only frame geometry is configurable at runtime; the embedding constants
/// live above as build-time constants.
#[derive(Debug, Clone)]
pub struct DctapeConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: u32,
}

impl DctapeConfig {
    /// Validate frame geometry: both dimensions must be multiples of 8.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.frame_width == 0
            || self.frame_height == 0
            || self.frame_width as usize % BLOCK_SIZE != 0
            || self.frame_height as usize % BLOCK_SIZE != 0
        {
            return Err(CodecError::Geometry {
                width: self.frame_width as usize,
                height: self.frame_height as usize,
            });
        }
        Ok(())
    }
}

impl Default for DctapeConfig {
    fn default() -> Self {
        Self {
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}
