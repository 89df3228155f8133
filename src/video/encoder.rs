//! Packet stream to lossless video, via the ffmpeg CLI.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use log::info;

use crate::config::DctapeConfig;
use crate::video::frame::{embed_data_into_frame, FrameLayout, FrameViewMut};

/// Encode a sequence of wire packets into an FFV1/MKV video file.
///
/// Each frame is a grayscale 8-bit image holding a whole number of packets
/// starting at byte 0, with the remaining capacity zero-padded. Uses the
/// ffmpeg CLI to produce the final video.
pub struct VideoEncoder {
    width: u32,
    height: u32,
    fps: u32,
    layout: FrameLayout,
    packet_size: usize,
    packets_per_frame: usize,
}

impl VideoEncoder {
    pub fn new(cfg: &DctapeConfig, packet_size: usize) -> Result<Self> {
        let layout = FrameLayout::new(cfg.frame_width as usize, cfg.frame_height as usize)?;
        let packets_per_frame = layout.bytes_per_frame / packet_size;
        if packets_per_frame == 0 {
            anyhow::bail!(
                "frame capacity of {} bytes cannot hold a {} byte packet",
                layout.bytes_per_frame,
                packet_size
            );
        }
        Ok(Self {
            width: cfg.frame_width,
            height: cfg.frame_height,
            fps: cfg.fps,
            layout,
            packet_size,
            packets_per_frame,
        })
    }

    pub fn packets_per_frame(&self) -> usize {
        self.packets_per_frame
    }

    /// Encode all packets into a video file.
    pub fn encode_to_file(&self, output_path: &str, packets: &[Vec<u8>]) -> Result<()> {
        let num_frames = packets.len().div_ceil(self.packets_per_frame);
        info!(
            "encoding {} packets into {} frames ({}x{} @ {} fps, {} packets/frame)",
            packets.len(),
            num_frames,
            self.width,
            self.height,
            self.fps,
            self.packets_per_frame
        );

        let mut child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pixel_format",
                "gray",
                "-video_size",
                &format!("{}x{}", self.width, self.height),
                "-framerate",
                &self.fps.to_string(),
                "-i",
                "pipe:0",
                "-c:v",
                "ffv1",
                "-level",
                "3",
                "-slices",
                "4",
                "-slicecrc",
                "1",
                output_path,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn ffmpeg process — is ffmpeg installed?")?;

        let stdin = child.stdin.as_mut().unwrap();

        for chunk in packets.chunks(self.packets_per_frame) {
            let frame_pixels = self.render_frame(chunk)?;
            stdin
                .write_all(&frame_pixels)
                .context("failed to write frame data to ffmpeg")?;
        }

        drop(child.stdin.take());
        let status = child.wait().context("ffmpeg process failed")?;
        if !status.success() {
            anyhow::bail!("ffmpeg exited with status: {}", status);
        }

        info!("video encoding complete: {}", output_path);
        Ok(())
    }

    /// Lay the frame's packets out contiguously from byte 0 and embed the
    /// padded buffer. Returns the flat grayscale pixel plane.
    fn render_frame(&self, packets: &[Vec<u8>]) -> Result<Vec<u8>> {
        let mut frame_bytes = vec![0u8; self.layout.bytes_per_frame];
        let mut offset = 0;
        for packet in packets {
            if packet.len() != self.packet_size {
                anyhow::bail!(
                    "packet is {} bytes, expected {}",
                    packet.len(),
                    self.packet_size
                );
            }
            frame_bytes[offset..offset + self.packet_size].copy_from_slice(packet);
            offset += self.packet_size;
        }

        let width = self.width as usize;
        let height = self.height as usize;
        let mut pixels = vec![128u8; width * height];
        let mut frame = FrameViewMut::new(&mut pixels, width, height, width)?;
        embed_data_into_frame(&frame_bytes, &mut frame)?;
        Ok(pixels)
    }
}
