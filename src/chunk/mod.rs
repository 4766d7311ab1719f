//! Chunk wire codec and checksums for snapshot transfer.

mod checksum;
mod codec;
mod errors;

pub use checksum::{checksum_of_content, combined_checksum};
pub use codec::{decode_chunk, encode_chunk, SnapshotChunk};
pub use errors::{ChunkError, ChunkErrorCode, ChunkResult, Severity};
