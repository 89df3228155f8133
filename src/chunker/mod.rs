//! Splits input into packet payloads.
//!
//! Every chunk is exactly one packet payload region of
//! [`SYMBOL_SIZE_BYTES`]; only the final chunk may be shorter. The chunk
//! count is determined up front from the input length and becomes the
//! `total` field carried in every packet header.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::config::SYMBOL_SIZE_BYTES;

/// One packet payload worth of input data.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Packet sequence number this chunk becomes.
    pub seq: u32,
    pub data: Vec<u8>,
    pub is_last: bool,
}

/// Number of payload chunks a byte length splits into.
///
/// An empty input still produces one empty chunk, so a header exists to
/// carry the file length.
pub fn chunk_count(len: u64) -> u64 {
    len.div_ceil(SYMBOL_SIZE_BYTES as u64).max(1)
}

/// Split a file into payload chunks with buffered reads.
pub fn split_file(path: &Path) -> io::Result<Vec<Chunk>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let count = chunk_count(len);

    let mut reader = BufReader::new(file);
    let mut chunks = Vec::with_capacity(count as usize);
    let mut remaining = len;
    for seq in 0..count {
        let take = remaining.min(SYMBOL_SIZE_BYTES as u64) as usize;
        let mut data = vec![0u8; take];
        reader.read_exact(&mut data)?;
        remaining -= take as u64;
        chunks.push(Chunk {
            seq: seq as u32,
            data,
            is_last: seq + 1 == count,
        });
    }
    Ok(chunks)
}

/// Split an in-memory buffer into payload chunks.
pub fn split_bytes(data: &[u8]) -> Vec<Chunk> {
    let count = chunk_count(data.len() as u64) as usize;
    (0..count)
        .map(|seq| {
            let start = seq * SYMBOL_SIZE_BYTES;
            let end = (start + SYMBOL_SIZE_BYTES).min(data.len());
            Chunk {
                seq: seq as u32,
                data: data[start..end].to_vec(),
                is_last: seq + 1 == count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_chunk_count() {
        let symbol = SYMBOL_SIZE_BYTES as u64;
        assert_eq!(chunk_count(0), 1);
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(symbol), 1);
        assert_eq!(chunk_count(symbol + 1), 2);
        assert_eq!(chunk_count(3 * symbol), 3);
    }

    #[test]
    fn test_split_bytes_sizes_and_last_flag() {
        let data = vec![0xABu8; 2 * SYMBOL_SIZE_BYTES + 77];
        let chunks = split_bytes(&data);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.len(), SYMBOL_SIZE_BYTES);
        assert_eq!(chunks[1].data.len(), SYMBOL_SIZE_BYTES);
        assert_eq!(chunks[2].data.len(), 77);
        assert_eq!(chunks.iter().filter(|c| c.is_last).count(), 1);
        assert!(chunks[2].is_last);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i as u32);
        }
    }

    #[test]
    fn test_split_bytes_exact_multiple_has_no_empty_tail() {
        let chunks = split_bytes(&vec![0u8; 2 * SYMBOL_SIZE_BYTES]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].data.len(), SYMBOL_SIZE_BYTES);
        assert!(chunks[1].is_last);
    }

    #[test]
    fn test_split_bytes_empty_input_yields_one_empty_chunk() {
        let chunks = split_bytes(&[]);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].data.is_empty());
        assert!(chunks[0].is_last);
    }

    #[test]
    fn test_split_file_matches_split_bytes() {
        let dir = std::env::temp_dir().join("dctape_test_chunker");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test_input.bin");

        let data: Vec<u8> = (0..SYMBOL_SIZE_BYTES * 2 + 100)
            .map(|i| (i % 256) as u8)
            .collect();
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(&data).unwrap();
        }

        let from_file = split_file(&path).unwrap();
        let from_bytes = split_bytes(&data);
        assert_eq!(from_file.len(), from_bytes.len());
        for (a, b) in from_file.iter().zip(from_bytes.iter()) {
            assert_eq!(a.seq, b.seq);
            assert_eq!(a.data, b.data);
            assert_eq!(a.is_last, b.is_last);
        }

        let reassembled: Vec<u8> = from_file.into_iter().flat_map(|c| c.data).collect();
        assert_eq!(reassembled, data);
        std::fs::remove_dir_all(&dir).ok();
    }
}
