//! Integrity primitives: SHA-256 digests and the CRC-32/MPEG-2 checksum
//! used in packet headers.
//!
//! The CRC function is named `crc32c` for historical reasons; it is the
//! MPEG-2 variant (polynomial 0x04C11DB7, init 0xFFFFFFFF, no reflection,
//! no final xor), not Castagnoli.

use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_32_MPEG_2};
use sha2::{Digest, Sha256};

const CRC_MPEG2: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Digits used for hex rendering of digests.
pub const SHA_CHARACTERS: &[u8; 16] = b"0123456789abcdef";

/// SHA-256 digest type.
pub type Sha256Digest = [u8; 32];

/// Compute the SHA-256 hash of a byte slice.
pub fn sha256(data: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Render bytes as lowercase hex.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(SHA_CHARACTERS[(byte >> 4) as usize] as char);
        out.push(SHA_CHARACTERS[(byte & 0x0F) as usize] as char);
    }
    out
}

/// Compute CRC-32/MPEG-2 over `data`.
///
/// A nonzero `seed` is prepended to the input as four little-endian bytes;
/// it is not folded into the CRC register.
pub fn crc32c(data: &[u8], seed: u32) -> u32 {
    if seed != 0 {
        let mut digest = CRC_MPEG2.digest();
        digest.update(&seed.to_le_bytes());
        digest.update(data);
        return digest.finalize();
    }
    CRC_MPEG2.checksum(data)
}

/// Packet checksum: CRC over the header with its `crc_size`-byte checksum
/// field (at `crc_offset`) replaced by zeros, followed by the payload.
pub fn packet_crc32c(header: &[u8], payload: &[u8], crc_offset: usize, crc_size: usize) -> u32 {
    let mut digest = CRC_MPEG2.digest();
    digest.update(&header[..crc_offset]);
    if crc_size == 4 {
        digest.update(&[0u8; 4]);
    }
    let after_crc = crc_offset + crc_size;
    if after_crc < header.len() {
        digest.update(&header[after_crc..]);
    }
    digest.update(payload);
    digest.finalize()
}

/// Check the little-endian checksum field inside `header` against the
/// computed packet CRC. Only a 4-byte field is supported.
pub fn verify_packet_crc32c(
    header: &[u8],
    payload: &[u8],
    crc_offset: usize,
    crc_size: usize,
) -> bool {
    if crc_size != 4 || crc_offset + 4 > header.len() {
        return false;
    }
    let stored = LittleEndian::read_u32(&header[crc_offset..crc_offset + 4]);
    stored == packet_crc32c(header, payload, crc_offset, crc_size)
}
