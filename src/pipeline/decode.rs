use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::DctapeConfig;
use crate::packet;
use crate::video::decoder::VideoDecoder;

/// Full decode pipeline: video -> verified packets -> reassembled file.
pub fn decode_file(input_path: &str, output_path: &Path, cfg: &DctapeConfig) -> Result<()> {
    cfg.validate()?;

    // Step 1: recover framed packets from the video.
    let decoder = VideoDecoder::new(cfg)?;
    let raw_packets = decoder.decode_from_file(input_path)?;

    // Step 2: parse and CRC-verify. Duplicates (a packet repeated across
    // frames) collapse onto the first valid copy; packets from a foreign
    // stream id are dropped.
    let mut by_seq: HashMap<u32, packet::Packet> = HashMap::new();
    let mut stream_id: Option<[u8; crate::config::STREAM_ID_SIZE]> = None;
    for bytes in &raw_packets {
        match packet::deserialize_packet(bytes) {
            Ok(pkt) => {
                match stream_id {
                    None => stream_id = Some(pkt.header.stream_id),
                    Some(id) if id != pkt.header.stream_id => {
                        warn!("skipping packet from foreign stream");
                        continue;
                    }
                    Some(_) => {}
                }
                by_seq.entry(pkt.header.seq).or_insert(pkt);
            }
            Err(e) => warn!("skipping corrupt packet: {}", e),
        }
    }
    info!("{} distinct valid packets", by_seq.len());

    let (total, file_size) = match by_seq.values().next() {
        Some(any) => (any.header.total, any.header.file_size),
        None => anyhow::bail!("no valid packets found in video"),
    };

    // Step 3: reassemble in sequence order; every packet must be present.
    let mut outfile = File::create(output_path).context("failed to create output file")?;
    let mut written = 0u64;
    for seq in 0..total {
        let pkt = by_seq
            .get(&seq)
            .ok_or_else(|| anyhow::anyhow!("missing packet {} of {}", seq, total))?;
        outfile
            .write_all(&pkt.payload)
            .context("failed to write output data")?;
        written += pkt.payload.len() as u64;
    }
    outfile.flush()?;

    if written != file_size as u64 {
        anyhow::bail!(
            "reassembled {} bytes but headers claim {}",
            written,
            file_size
        );
    }

    info!("decode complete! output: {}", output_path.display());
    Ok(())
}
