use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::RngCore;
use rayon::prelude::*;

use crate::chunker;
use crate::config::{self, DctapeConfig};
use crate::packet;
use crate::video::encoder::VideoEncoder;

/// Full encode pipeline: file -> chunks -> packets -> video.
pub fn encode_file(input_path: &Path, output_path: &str, cfg: &DctapeConfig) -> Result<()> {
    cfg.validate()?;

    let mut stream_id = [0u8; config::STREAM_ID_SIZE];
    rand::thread_rng().fill_bytes(&mut stream_id);

    let file_len = std::fs::metadata(input_path)
        .with_context(|| format!("failed to stat {}", input_path.display()))?
        .len();
    let file_size = u32::try_from(file_len)
        .map_err(|_| anyhow::anyhow!("input is {} bytes; files beyond 4 GiB are not supported", file_len))?;

    // Step 1: split the file into one chunk per packet payload.
    info!("chunking input file: {}", input_path.display());
    let chunks = chunker::split_file(input_path).context("failed to chunk input file")?;
    let total = chunks.len() as u32;
    info!("split into {} packets", total);

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} packets ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    // Step 2: serialize packets in parallel. Sequence numbers equal chunk
    // indices, so byte order is recoverable from headers alone.
    let packets: Vec<Vec<u8>> = chunks
        .par_iter()
        .map(|chunk| {
            let mut flags = 0u8;
            if chunk.is_last {
                flags |= config::FLAG_LAST_PACKET;
            }
            let pkt = packet::serialize_packet(
                &stream_id,
                chunk.seq,
                total,
                file_size,
                flags,
                &chunk.data,
            )?;
            progress.inc(1);
            Ok(pkt)
        })
        .collect::<Result<_, packet::PacketError>>()?;
    progress.finish_with_message("packetising complete");

    // Step 3: embed packets into video frames.
    info!("encoding to video: {}", output_path);
    let packet_size = packet::packet_size_for_version(config::VERSION_V2);
    let encoder = VideoEncoder::new(cfg, packet_size)?;
    encoder.encode_to_file(output_path, &packets)?;

    info!("encode complete!");
    Ok(())
}
