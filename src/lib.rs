mod chunker;
pub mod config;
pub mod integrity;
pub mod packet;
pub mod pipeline;
pub mod video;

pub use config::DctapeConfig;
pub use integrity::{crc32c, hex, packet_crc32c, sha256, verify_packet_crc32c};
pub use packet::extract_packets;
pub use pipeline::decode::decode_file;
pub use pipeline::encode::encode_file;
pub use pipeline::{roundtrip, RoundtripResult};
pub use video::frame::{
    embed_data_into_frame, extract_data_from_frame, CodecError, FrameView, FrameViewMut,
};
