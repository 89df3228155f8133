//! Precomputed DCT tables for block synthesis and extraction.
//!
//! Every 8x8 block carries [`BITS_PER_BLOCK`] bits in the signs of a few
//! low-frequency DCT coefficients. The synthesis side is a lookup table of
//! `2^BITS_PER_BLOCK` pixel blocks built once per process; the extraction
//! side projects an observed block onto one vector per bit and takes the
//! sign. All tables are pure functions of the build-time constants and are
//! initialised lazily behind [`OnceLock`]s.

use std::sync::OnceLock;

use crate::config::{BITS_PER_BLOCK, COEFFICIENT_STRENGTH, EMBED_POSITIONS};

/// Number of distinct bit patterns a block can carry.
pub const PATTERN_COUNT: usize = 1 << BITS_PER_BLOCK;

/// `COSINE[i][j] = cos((2*i + 1) * j * PI / 16)`
static COSINE: OnceLock<[[f32; 8]; 8]> = OnceLock::new();

static PATTERNS: OnceLock<[[u8; 64]; PATTERN_COUNT]> = OnceLock::new();

static PROJECTIONS: OnceLock<[[f32; 64]; BITS_PER_BLOCK]> = OnceLock::new();

fn cosine_table() -> &'static [[f32; 8]; 8] {
    COSINE.get_or_init(|| {
        let mut table = [[0.0f32; 8]; 8];
        for i in 0..8 {
            for j in 0..8 {
                table[i][j] =
                    ((2 * i + 1) as f32 * j as f32 * std::f32::consts::PI / 16.0).cos();
            }
        }
        table
    })
}

/// DCT-II normalization factor.
fn alpha(u: usize) -> f32 {
    if u == 0 {
        std::f32::consts::FRAC_1_SQRT_2
    } else {
        1.0
    }
}

/// One precomputed 8x8 pixel block per bit pattern, flattened row-major.
fn pattern_blocks() -> &'static [[u8; 64]; PATTERN_COUNT] {
    PATTERNS.get_or_init(|| {
        let cos = cosine_table();

        // Inverse DCT of a DC-only spectrum: a plane at mid-gray 128.
        let dc_value = 0.25 * alpha(0) * alpha(0) * 64.0 * 128.0;
        let mut dc_image = [0.0f32; 64];
        for row in 0..8 {
            for col in 0..8 {
                dc_image[row * 8 + col] =
                    0.25 * alpha(0) * alpha(0) * dc_value * cos[row][0] * cos[col][0];
            }
        }

        // Contribution of a unit coefficient at each embedding position,
        // scaled to the configured strength.
        let mut embed_basis = [[0.0f32; 64]; BITS_PER_BLOCK];
        for (b, basis) in embed_basis.iter_mut().enumerate() {
            let (u, v) = EMBED_POSITIONS[b];
            let scale = 0.25 * alpha(u) * alpha(v) * COEFFICIENT_STRENGTH;
            for row in 0..8 {
                for col in 0..8 {
                    basis[row * 8 + col] = scale * cos[row][u] * cos[col][v];
                }
            }
        }

        let mut blocks = [[0u8; 64]; PATTERN_COUNT];
        for (pattern, block) in blocks.iter_mut().enumerate() {
            for k in 0..64 {
                let mut val = dc_image[k];
                for (b, basis) in embed_basis.iter().enumerate() {
                    // Pattern bit BITS_PER_BLOCK-1 maps to basis 0 (MSB first).
                    let bit = (pattern >> (BITS_PER_BLOCK - 1 - b)) & 1;
                    val += if bit == 1 { basis[k] } else { -basis[k] };
                }
                block[k] = val.clamp(0.0, 255.0) as u8;
            }
        }
        blocks
    })
}

/// Projection vectors recovering one bit each: the cosine product at the
/// embedding position, flattened row-major. Each vector is orthogonal to
/// the DC subspace, so extraction needs no mean removal.
fn projections() -> &'static [[f32; 64]; BITS_PER_BLOCK] {
    PROJECTIONS.get_or_init(|| {
        let cos = cosine_table();
        let mut vectors = [[0.0f32; 64]; BITS_PER_BLOCK];
        for (b, vector) in vectors.iter_mut().enumerate() {
            let (u, v) = EMBED_POSITIONS[b];
            for row in 0..8 {
                for col in 0..8 {
                    vector[row * 8 + col] = cos[row][u] * cos[col][v];
                }
            }
        }
        vectors
    })
}

/// The 8x8 pixel block carrying `pattern`.
pub fn block_for_pattern(pattern: u8) -> &'static [u8; 64] {
    debug_assert!((pattern as usize) < PATTERN_COUNT);
    &pattern_blocks()[pattern as usize]
}

/// Recover the bit pattern from an observed 8x8 block (flattened row-major).
///
/// A zero projection sum reads as bit 0.
pub fn extract_pattern(block: &[u8; 64]) -> u8 {
    let mut block_f = [0.0f32; 64];
    for (dst, &src) in block_f.iter_mut().zip(block.iter()) {
        *dst = src as f32;
    }

    let mut pattern = 0u8;
    for vector in projections().iter() {
        let sum: f32 = block_f
            .iter()
            .zip(vector.iter())
            .map(|(&px, &w)| px * w)
            .sum();
        pattern = (pattern << 1) | (sum > 0.0) as u8;
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_roundtrip_all_patterns() {
        for p in 0..PATTERN_COUNT as u8 {
            assert_eq!(extract_pattern(block_for_pattern(p)), p, "pattern {p:#06b}");
        }
    }

    #[test]
    fn test_block_mean_stays_at_mid_gray() {
        // The embedding bases carry no DC component, so every pattern block
        // averages to 128 up to rounding.
        for p in 0..PATTERN_COUNT as u8 {
            let sum: u32 = block_for_pattern(p).iter().map(|&px| px as u32).sum();
            let mean = sum as f32 / 64.0;
            assert!((mean - 128.0).abs() < 1.0, "pattern {p}: mean {mean}");
        }
    }

    #[test]
    fn test_projections_are_mutually_orthogonal() {
        let proj = projections();
        for b in 0..BITS_PER_BLOCK {
            let norm: f32 = proj[b].iter().map(|w| w * w).sum();
            for other in 0..BITS_PER_BLOCK {
                if other == b {
                    continue;
                }
                let dot: f32 = proj[b]
                    .iter()
                    .zip(proj[other].iter())
                    .map(|(x, y)| x * y)
                    .sum();
                assert!(
                    dot.abs() / norm < 1e-5,
                    "projections {b} and {other} not orthogonal: {dot}"
                );
            }
        }
    }

    #[test]
    fn test_projections_ignore_uniform_shift() {
        // Each vector sums to zero, so a flat luminance offset cannot flip
        // any recovered bit.
        for vector in projections().iter() {
            let total: f32 = vector.iter().sum();
            assert!(total.abs() < 1e-3, "projection has DC leakage: {total}");
        }

        let mut shifted = *block_for_pattern(0b1010);
        for px in shifted.iter_mut() {
            *px += 3;
        }
        assert_eq!(extract_pattern(&shifted), 0b1010);
    }

    #[test]
    fn test_pattern_blocks_keep_clamp_headroom() {
        // No pixel reaches the clamp rails at the configured strength.
        for p in 0..PATTERN_COUNT as u8 {
            let block = block_for_pattern(p);
            assert!(block.iter().all(|&px| px > 0 && px < 255), "pattern {p}");
        }
    }

    #[test]
    fn test_flat_block_reads_as_zero() {
        // All projections tie at exactly zero on a flat block.
        assert_eq!(extract_pattern(&[128u8; 64]), 0);
        assert_eq!(extract_pattern(&[0u8; 64]), 0);
    }

    #[test]
    fn test_cosine_table_zero_frequency_column() {
        let cos = cosine_table();
        for i in 0..8 {
            assert!((cos[i][0] - 1.0).abs() < 1e-6);
        }
    }
}
