pub mod decode;
pub mod encode;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::config::DctapeConfig;
use crate::integrity;

/// Result of a full encode → transfer → decode roundtrip.
pub struct RoundtripResult {
    /// SHA-256 hex digest of the original input file.
    pub original_hash: String,
    /// SHA-256 hex digest of the decoded output file.
    pub decoded_hash: String,
    /// `true` if the hashes match (lossless round-trip).
    pub matched: bool,
}

/// Run a full encode → transfer → decode verification pass.
///
/// `transfer` stands in for whatever moves the encoded video between the
/// two ends: a plain copy, or an upload to a remote host followed by a
/// download. It receives the path of the freshly written video and returns
/// the path the decoder should read. Decode then reassembles the stream
/// from scratch (CRC verification, seq completeness), so a passing
/// roundtrip exercises the whole wire path, and the hashes prove the
/// recovered bytes are the original ones.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use dctape::{roundtrip, DctapeConfig};
///
/// // Decode the local file in place; a real deployment would upload and
/// // re-download between these two steps.
/// let result = roundtrip(
///     Path::new("input.bin"),
///     "encoded.mkv",
///     Path::new("output.bin"),
///     &DctapeConfig::default(),
///     |encoded| Ok(encoded.to_path_buf()),
/// ).unwrap();
///
/// assert!(result.matched, "round-trip failed: {} != {}", result.original_hash, result.decoded_hash);
/// ```
pub fn roundtrip(
    input: &Path,
    encoded_path: &str,
    output: &Path,
    cfg: &DctapeConfig,
    transfer: impl FnOnce(&Path) -> Result<PathBuf>,
) -> Result<RoundtripResult> {
    let original_hash = sha256_file(input)?;

    encode::encode_file(input, encoded_path, cfg)?;

    let decode_from = transfer(Path::new(encoded_path))?;
    let decode_from = decode_from
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("transfer returned a non-UTF-8 path"))?;

    decode::decode_file(decode_from, output, cfg)?;

    let decoded_hash = sha256_file(output)?;
    let matched = original_hash == decoded_hash;

    Ok(RoundtripResult {
        original_hash,
        decoded_hash,
        matched,
    })
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(integrity::hex(&hasher.finalize()))
}
