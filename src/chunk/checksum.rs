//! 64-bit checksums for chunk content and whole-snapshot integrity.
//!
//! Uses XXH3-64, a non-cryptographic hash that operates on the byte
//! slice directly (not host word order), so identical byte sequences
//! checksum identically on every platform.

use xxhash_rust::xxh3::Xxh3;

/// Checksum of a single chunk's content bytes.
pub fn checksum_of_content(content: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(content)
}

/// Fold a sequence of per-file checksums into one combined checksum.
///
/// The fold is order-dependent: each checksum is fed into one running
/// XXH3 state as 8 big-endian bytes, in the order given by the caller.
/// Callers that need a deterministic whole-snapshot checksum must first
/// sort their file list (by name) before computing per-file checksums
/// and calling this function.
pub fn combined_checksum<I>(file_checksums: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    let mut hasher = Xxh3::new();
    for checksum in file_checksums {
        hasher.update(&checksum.to_be_bytes());
    }
    hasher.digest()
}
