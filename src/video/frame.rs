//! The data-to-pixels frame codec.
//!
//! A frame is tiled into non-overlapping 8x8 blocks in raster order. Each
//! payload byte occupies [`BLOCKS_PER_BYTE`] consecutive blocks, high-order
//! bits first; within a block the earliest embedding position carries the
//! most significant bit of the sub-pattern. Extraction is data-parallel
//! over output byte indices.

use rayon::prelude::*;
use thiserror::Error;

use crate::config::{BITS_PER_BLOCK, BLOCKS_PER_BYTE, BLOCK_SIZE};
use crate::video::dct;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("frame dimensions {width}x{height} must be non-zero multiples of 8")]
    Geometry { width: usize, height: usize },
    #[error("row stride {stride} is shorter than frame width {width}")]
    Stride { stride: usize, width: usize },
    #[error("frame buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },
    #[error("payload is {got} bytes but the frame carries exactly {expected}")]
    PayloadLength { expected: usize, got: usize },
}

/// Block tiling of a validated frame geometry.
#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    pub blocks_per_row: usize,
    pub blocks_per_col: usize,
    pub total_blocks: usize,
    /// Payload capacity of one frame in bytes.
    pub bytes_per_frame: usize,
}

impl FrameLayout {
    pub fn new(width: usize, height: usize) -> Result<Self, CodecError> {
        check_geometry(width, height)?;
        Ok(Self::from_validated(width, height))
    }

    fn from_validated(width: usize, height: usize) -> Self {
        let blocks_per_row = width / BLOCK_SIZE;
        let blocks_per_col = height / BLOCK_SIZE;
        let total_blocks = blocks_per_row * blocks_per_col;
        Self {
            blocks_per_row,
            blocks_per_col,
            total_blocks,
            bytes_per_frame: total_blocks / BLOCKS_PER_BYTE,
        }
    }

    /// Pixel offset of block `block_idx` within a plane of the given stride.
    fn block_origin(&self, block_idx: usize, stride: usize) -> usize {
        let row = block_idx / self.blocks_per_row;
        let col = block_idx % self.blocks_per_row;
        row * BLOCK_SIZE * stride + col * BLOCK_SIZE
    }
}

fn check_geometry(width: usize, height: usize) -> Result<(), CodecError> {
    if width == 0 || height == 0 || width % BLOCK_SIZE != 0 || height % BLOCK_SIZE != 0 {
        return Err(CodecError::Geometry { width, height });
    }
    Ok(())
}

fn check_plane(
    len: usize,
    width: usize,
    height: usize,
    stride: usize,
) -> Result<(), CodecError> {
    check_geometry(width, height)?;
    if stride < width {
        return Err(CodecError::Stride { stride, width });
    }
    let need = stride * (height - 1) + width;
    if len < need {
        return Err(CodecError::BufferTooShort { need, have: len });
    }
    Ok(())
}

/// Read-only borrow of an 8-bit luminance plane.
pub struct FrameView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> FrameView<'a> {
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, CodecError> {
        check_plane(data.len(), width, height, stride)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn layout(&self) -> FrameLayout {
        FrameLayout::from_validated(self.width, self.height)
    }

    fn read_block(&self, block_idx: usize, layout: &FrameLayout) -> [u8; 64] {
        let origin = layout.block_origin(block_idx, self.stride);
        let mut block = [0u8; 64];
        for y in 0..BLOCK_SIZE {
            let src = origin + y * self.stride;
            block[y * BLOCK_SIZE..(y + 1) * BLOCK_SIZE]
                .copy_from_slice(&self.data[src..src + BLOCK_SIZE]);
        }
        block
    }
}

/// Mutable borrow of an 8-bit luminance plane.
pub struct FrameViewMut<'a> {
    data: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> FrameViewMut<'a> {
    pub fn new(
        data: &'a mut [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, CodecError> {
        check_plane(data.len(), width, height, stride)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn layout(&self) -> FrameLayout {
        FrameLayout::from_validated(self.width, self.height)
    }

    fn write_block(&mut self, block_idx: usize, layout: &FrameLayout, block: &[u8; 64]) {
        let origin = layout.block_origin(block_idx, self.stride);
        for y in 0..BLOCK_SIZE {
            let dst = origin + y * self.stride;
            self.data[dst..dst + BLOCK_SIZE]
                .copy_from_slice(&block[y * BLOCK_SIZE..(y + 1) * BLOCK_SIZE]);
        }
    }
}

/// Embed `data` into the frame. `data` must be exactly the frame capacity;
/// nothing is written on a length mismatch.
pub fn embed_data_into_frame(
    data: &[u8],
    frame: &mut FrameViewMut<'_>,
) -> Result<(), CodecError> {
    let layout = frame.layout();
    if data.len() != layout.bytes_per_frame {
        return Err(CodecError::PayloadLength {
            expected: layout.bytes_per_frame,
            got: data.len(),
        });
    }

    let mask = (dct::PATTERN_COUNT - 1) as u8;
    for (byte_idx, &byte) in data.iter().enumerate() {
        for sub in 0..BLOCKS_PER_BYTE {
            let pattern = (byte >> (BITS_PER_BLOCK * (BLOCKS_PER_BYTE - 1 - sub))) & mask;
            let block = dct::block_for_pattern(pattern);
            frame.write_block(byte_idx * BLOCKS_PER_BYTE + sub, &layout, block);
        }
    }
    Ok(())
}

/// Recover the frame's payload bytes. Output length is exactly the frame
/// capacity; byte order follows the block raster order.
pub fn extract_data_from_frame(frame: &FrameView<'_>) -> Vec<u8> {
    let layout = frame.layout();
    (0..layout.bytes_per_frame)
        .into_par_iter()
        .map(|byte_idx| {
            let mut byte = 0u8;
            for sub in 0..BLOCKS_PER_BYTE {
                let block = frame.read_block(byte_idx * BLOCKS_PER_BYTE + sub, &layout);
                byte = (byte << BITS_PER_BLOCK) | dct::extract_pattern(&block);
            }
            byte
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], width: usize, height: usize, stride: usize) -> Vec<u8> {
        let mut pixels = vec![128u8; stride * height];
        let mut frame = FrameViewMut::new(&mut pixels, width, height, stride).unwrap();
        embed_data_into_frame(data, &mut frame).unwrap();
        let view = FrameView::new(&pixels, width, height, stride).unwrap();
        extract_data_from_frame(&view)
    }

    #[test]
    fn test_two_byte_frame_roundtrip() {
        // 16x16 frame: four blocks carrying two bytes.
        assert_eq!(roundtrip(&[0xA5, 0x3C], 16, 16, 16), vec![0xA5, 0x3C]);
    }

    #[test]
    fn test_zero_buffer_roundtrip_and_dc_neutrality() {
        let width = 32;
        let height = 16;
        let mut pixels = vec![128u8; width * height];
        let mut frame = FrameViewMut::new(&mut pixels, width, height, width).unwrap();
        let layout = frame.layout();
        let zeros = vec![0u8; layout.bytes_per_frame];
        embed_data_into_frame(&zeros, &mut frame).unwrap();

        // Every block still averages to mid-gray.
        let view = FrameView::new(&pixels, width, height, width).unwrap();
        for block_idx in 0..layout.total_blocks {
            let block = view.read_block(block_idx, &layout);
            let sum: u32 = block.iter().map(|&px| px as u32).sum();
            assert!((sum as f32 / 64.0 - 128.0).abs() < 1.0, "block {block_idx}");
        }

        assert_eq!(extract_data_from_frame(&view), zeros);
    }

    #[test]
    fn test_uniform_luminance_shift_is_harmless() {
        let width = 24;
        let height = 16;
        let capacity = FrameLayout::new(width, height).unwrap().bytes_per_frame;
        let data: Vec<u8> = (0u8..).take(capacity).collect();

        let mut pixels = vec![128u8; width * height];
        let mut frame = FrameViewMut::new(&mut pixels, width, height, width).unwrap();
        embed_data_into_frame(&data, &mut frame).unwrap();

        for px in pixels.iter_mut() {
            *px = px.saturating_add(3);
        }

        let view = FrameView::new(&pixels, width, height, width).unwrap();
        assert_eq!(extract_data_from_frame(&view), data);
    }

    #[test]
    fn test_roundtrip_with_padded_stride() {
        let data: Vec<u8> = vec![0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(roundtrip(&data, 32, 16, 41), data);
    }

    #[test]
    fn test_payload_length_mismatch() {
        let mut pixels = vec![0u8; 16 * 16];
        let mut frame = FrameViewMut::new(&mut pixels, 16, 16, 16).unwrap();
        let err = embed_data_into_frame(&[0u8; 3], &mut frame).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PayloadLength {
                expected: 2,
                got: 3
            }
        ));
        // Nothing was written.
        assert!(pixels.iter().all(|&px| px == 0));
    }

    #[test]
    fn test_rejects_bad_geometry_and_stride() {
        let pixels = vec![0u8; 12 * 16];
        assert!(matches!(
            FrameView::new(&pixels, 12, 16, 12),
            Err(CodecError::Geometry { .. })
        ));
        assert!(matches!(
            FrameView::new(&pixels, 16, 8, 8),
            Err(CodecError::Stride { .. })
        ));
        assert!(matches!(
            FrameView::new(&pixels, 16, 16, 16),
            Err(CodecError::BufferTooShort { .. })
        ));
    }
}
