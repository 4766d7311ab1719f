//! Wire encoding for snapshot chunks.
//!
//! Fixed field order, length-prefixed variable fields, big-endian
//! integers throughout:
//!
//! ```text
//! snapshot_id:      u32 len, utf8 bytes
//! total_count:      u32
//! chunk_name:       u32 len, utf8 bytes
//! checksum:         u64
//! snapshot_checksum:u64
//! content_len:      u32
//! content:          bytes[content_len]
//! ```

use super::checksum::checksum_of_content;
use super::errors::{ChunkError, ChunkResult};

/// A single chunk of a snapshot in flight between partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotChunk {
    /// Serialized form of the owning snapshot's id.
    pub snapshot_id: String,
    /// Total number of chunks that make up the snapshot.
    pub total_count: u32,
    /// File name of this chunk within the snapshot directory.
    pub chunk_name: String,
    /// Raw chunk content.
    pub content: Vec<u8>,
    /// Checksum of `content` alone.
    pub checksum: u64,
    /// Combined checksum of the whole snapshot; identical on every
    /// chunk belonging to the same snapshot.
    pub snapshot_checksum: u64,
}

impl SnapshotChunk {
    /// Build a chunk, computing its content checksum.
    pub fn new(
        snapshot_id: impl Into<String>,
        total_count: u32,
        chunk_name: impl Into<String>,
        content: Vec<u8>,
        snapshot_checksum: u64,
    ) -> Self {
        let checksum = checksum_of_content(&content);
        Self {
            snapshot_id: snapshot_id.into(),
            total_count,
            chunk_name: chunk_name.into(),
            content,
            checksum,
            snapshot_checksum,
        }
    }

    /// Whether the declared checksum matches the actual content.
    pub fn checksum_is_valid(&self) -> bool {
        checksum_of_content(&self.content) == self.checksum
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Encode a chunk to its wire representation.
pub fn encode_chunk(chunk: &SnapshotChunk) -> Vec<u8> {
    let mut buf = Vec::with_capacity(chunk.content.len() + 64);
    write_string(&mut buf, &chunk.snapshot_id);
    buf.extend_from_slice(&chunk.total_count.to_be_bytes());
    write_string(&mut buf, &chunk.chunk_name);
    buf.extend_from_slice(&chunk.checksum.to_be_bytes());
    buf.extend_from_slice(&chunk.snapshot_checksum.to_be_bytes());
    buf.extend_from_slice(&(chunk.content.len() as u32).to_be_bytes());
    buf.extend_from_slice(&chunk.content);
    buf
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> ChunkResult<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(ChunkError::truncated(format!(
                "need {} bytes at offset {}, only {} remain",
                len, self.pos, remaining
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u32(&mut self) -> ChunkResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn take_u64(&mut self) -> ChunkResult<u64> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn take_string(&mut self) -> ChunkResult<String> {
        let len = self.take_u32()? as usize;
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(ChunkError::length_overflow(format!(
                "string length {} exceeds remaining {} bytes",
                len, remaining
            )));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ChunkError::invalid_utf8(e.to_string()))
    }
}

/// Decode a chunk from its wire representation.
///
/// Never panics: truncated input, an over-long declared length, or
/// invalid UTF-8 in a string field all return a typed `ChunkError`.
pub fn decode_chunk(bytes: &[u8]) -> ChunkResult<SnapshotChunk> {
    let mut cursor = Cursor::new(bytes);
    let snapshot_id = cursor.take_string()?;
    let total_count = cursor.take_u32()?;
    let chunk_name = cursor.take_string()?;
    let checksum = cursor.take_u64()?;
    let snapshot_checksum = cursor.take_u64()?;
    let content_len = cursor.take_u32()? as usize;
    let remaining = cursor.data.len() - cursor.pos;
    if content_len > remaining {
        return Err(ChunkError::length_overflow(format!(
            "content length {} exceeds remaining {} bytes",
            content_len, remaining
        )));
    }
    let content = cursor.take(content_len)?.to_vec();

    Ok(SnapshotChunk {
        snapshot_id,
        total_count,
        chunk_name,
        content,
        checksum,
        snapshot_checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> SnapshotChunk {
        SnapshotChunk::new("100-2-50", 3, "0000000001", b"payload bytes".to_vec(), 0xDEAD_BEEF_CAFE_BABE)
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let chunk = sample_chunk();
        let encoded = encode_chunk(&chunk);
        let decoded = decode_chunk(&encoded).unwrap();
        assert_eq!(chunk, decoded);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let chunk = sample_chunk();
        let encoded = encode_chunk(&chunk);
        let truncated = &encoded[..encoded.len() - 5];
        let result = decode_chunk(truncated);
        assert!(result.is_err());
    }

    #[test]
    fn decode_rejects_oversized_declared_length() {
        // snapshot_id length field says 1000 bytes but none follow.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1000u32.to_be_bytes());
        let result = decode_chunk(&bytes);
        assert!(matches!(result, Err(_)));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        let result = decode_chunk(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn checksum_validity_detects_corruption() {
        let mut chunk = sample_chunk();
        assert!(chunk.checksum_is_valid());
        chunk.content[0] ^= 0xFF;
        assert!(!chunk.checksum_is_valid());
    }

    #[test]
    fn empty_content_round_trips() {
        let chunk = SnapshotChunk::new("1-1-1", 1, "empty", Vec::new(), 42);
        let encoded = encode_chunk(&chunk);
        let decoded = decode_chunk(&encoded).unwrap();
        assert_eq!(chunk, decoded);
        assert!(decoded.content.is_empty());
    }
}
