//! Packet wire format and frame-level packet framing.
//!
//! A packet is a fixed-size unit: a versioned header followed by a
//! [`SYMBOL_SIZE_BYTES`]-byte payload region (zero-padded past the used
//! length). The framer recovers whole packets from the byte stream
//! extracted out of a single video frame.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::config::{
    self, HEADER_SIZE_V1, HEADER_SIZE_V2, MAGIC, STREAM_ID_SIZE, SYMBOL_SIZE_BYTES, VERSION_V2,
};
use crate::integrity;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("invalid magic: expected 0x{expected:08X}, got 0x{got:08X}")]
    InvalidMagic { expected: u32, got: u32 },
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("CRC mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    CrcMismatch { stored: u32, computed: u32 },
    #[error("buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },
    #[error("payload is {len} bytes, the payload region holds {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("header claims {claimed} payload bytes, region holds {max}")]
    PayloadLengthMismatch { claimed: usize, max: usize },
}

/// Parsed V2 packet header fields.
#[derive(Debug, Clone)]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u8,
    pub flags: u8,
    pub stream_id: [u8; STREAM_ID_SIZE],
    pub seq: u32,
    pub total: u32,
    pub file_size: u32,
    pub payload_len: u16,
    pub crc: u32,
}

/// A parsed packet: header plus the used portion of the payload region.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Vec<u8>,
}

// V2 header field offsets (40 bytes total)
const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_FLAGS: usize = 5;
const OFF_STREAM_ID: usize = 6;
const OFF_SEQ: usize = 22;
const OFF_TOTAL: usize = 26;
const OFF_FILE_SIZE: usize = 30;
const OFF_PAYLOAD_LEN: usize = 34;
const OFF_CRC: usize = 36;

impl PacketHeader {
    pub fn is_last(&self) -> bool {
        self.flags & config::FLAG_LAST_PACKET != 0
    }
}

/// Total wire size of a packet for a given header version byte. Unknown
/// versions fall back to the V1 size.
pub fn packet_size_for_version(version: u8) -> usize {
    if version == VERSION_V2 {
        HEADER_SIZE_V2 + SYMBOL_SIZE_BYTES
    } else {
        HEADER_SIZE_V1 + SYMBOL_SIZE_BYTES
    }
}

/// Serialize a V2 packet. The payload is padded with zeros up to the fixed
/// payload region; the CRC covers the header (checksum field zeroed) and
/// the padded region.
pub fn serialize_packet(
    stream_id: &[u8; STREAM_ID_SIZE],
    seq: u32,
    total: u32,
    file_size: u32,
    flags: u8,
    payload: &[u8],
) -> Result<Vec<u8>, PacketError> {
    if payload.len() > SYMBOL_SIZE_BYTES {
        return Err(PacketError::PayloadTooLarge {
            len: payload.len(),
            max: SYMBOL_SIZE_BYTES,
        });
    }

    let mut padded = vec![0u8; SYMBOL_SIZE_BYTES];
    padded[..payload.len()].copy_from_slice(payload);

    let mut header = vec![0u8; HEADER_SIZE_V2];
    LittleEndian::write_u32(&mut header[OFF_MAGIC..], MAGIC);
    header[OFF_VERSION] = VERSION_V2;
    header[OFF_FLAGS] = flags;
    header[OFF_STREAM_ID..OFF_STREAM_ID + STREAM_ID_SIZE].copy_from_slice(stream_id);
    LittleEndian::write_u32(&mut header[OFF_SEQ..], seq);
    LittleEndian::write_u32(&mut header[OFF_TOTAL..], total);
    LittleEndian::write_u32(&mut header[OFF_FILE_SIZE..], file_size);
    LittleEndian::write_u16(&mut header[OFF_PAYLOAD_LEN..], payload.len() as u16);

    let crc = integrity::packet_crc32c(&header, &padded, OFF_CRC, 4);
    LittleEndian::write_u32(&mut header[OFF_CRC..], crc);

    let mut packet = Vec::with_capacity(HEADER_SIZE_V2 + SYMBOL_SIZE_BYTES);
    packet.extend_from_slice(&header);
    packet.extend_from_slice(&padded);
    Ok(packet)
}

/// Parse and CRC-verify one whole packet.
pub fn deserialize_packet(data: &[u8]) -> Result<Packet, PacketError> {
    let packet_size = HEADER_SIZE_V2 + SYMBOL_SIZE_BYTES;
    if data.len() < packet_size {
        return Err(PacketError::BufferTooShort {
            need: packet_size,
            have: data.len(),
        });
    }

    let header = &data[..HEADER_SIZE_V2];
    let magic = LittleEndian::read_u32(&header[OFF_MAGIC..]);
    if magic != MAGIC {
        return Err(PacketError::InvalidMagic {
            expected: MAGIC,
            got: magic,
        });
    }

    let version = header[OFF_VERSION];
    if version != VERSION_V2 {
        return Err(PacketError::UnsupportedVersion(version));
    }

    let padded = &data[HEADER_SIZE_V2..packet_size];
    let stored = LittleEndian::read_u32(&header[OFF_CRC..]);
    let computed = integrity::packet_crc32c(header, padded, OFF_CRC, 4);
    if stored != computed {
        return Err(PacketError::CrcMismatch { stored, computed });
    }

    let payload_len = LittleEndian::read_u16(&header[OFF_PAYLOAD_LEN..]);
    if payload_len as usize > SYMBOL_SIZE_BYTES {
        return Err(PacketError::PayloadLengthMismatch {
            claimed: payload_len as usize,
            max: SYMBOL_SIZE_BYTES,
        });
    }

    let mut stream_id = [0u8; STREAM_ID_SIZE];
    stream_id.copy_from_slice(&header[OFF_STREAM_ID..OFF_STREAM_ID + STREAM_ID_SIZE]);

    Ok(Packet {
        header: PacketHeader {
            magic,
            version,
            flags: header[OFF_FLAGS],
            stream_id,
            seq: LittleEndian::read_u32(&header[OFF_SEQ..]),
            total: LittleEndian::read_u32(&header[OFF_TOTAL..]),
            file_size: LittleEndian::read_u32(&header[OFF_FILE_SIZE..]),
            payload_len,
            crc: stored,
        },
        payload: padded[..payload_len as usize].to_vec(),
    })
}

/// Split the byte stream recovered from one frame into whole packets.
///
/// The sender writes packets contiguously from offset 0, so framing walks
/// aligned offsets and stops at the first one not starting with the magic.
/// There is no resynchronisation after a gap: a corrupted packet truncates
/// the frame's output. The packet size is sniffed from the version byte of
/// the first packet; unknown versions select the V1 size, which then fails
/// the magic check and yields zero packets rather than an error.
pub fn extract_packets(raw: &[u8]) -> Vec<Vec<u8>> {
    let mut packet_size = HEADER_SIZE_V1 + SYMBOL_SIZE_BYTES;
    if raw.len() >= 5 && raw[4] == VERSION_V2 {
        packet_size = HEADER_SIZE_V2 + SYMBOL_SIZE_BYTES;
    }

    let mut packets = Vec::new();
    let mut offset = 0;
    while offset + packet_size <= raw.len() {
        if LittleEndian::read_u32(&raw[offset..offset + 4]) != MAGIC {
            break;
        }
        packets.push(raw[offset..offset + packet_size].to_vec());
        offset += packet_size;
    }
    packets
}
