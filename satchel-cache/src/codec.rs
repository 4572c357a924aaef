//! On-disk encoding for cached entries
//!
//! Entries are MessagePack-encoded; payloads over the threshold are LZ4
//! compressed when that actually makes them smaller. A one-byte tag in front
//! records which form was written.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::entry::CachedEntry;
use crate::{CacheError, CacheResult};

/// Minimum encoded size to attempt compression (bytes)
pub const COMPRESS_THRESHOLD: usize = 1024;

const TAG_RAW: u8 = 0;
const TAG_LZ4: u8 = 1;

/// Hash content using BLAKE3
pub fn hash_content(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}

/// Encode an entry for storage
pub fn encode_entry(entry: &CachedEntry) -> CacheResult<Vec<u8>> {
    let packed = rmp_serde::to_vec_named(entry)?;

    if packed.len() >= COMPRESS_THRESHOLD {
        let compressed = compress_prepend_size(&packed);
        // Only use compressed if it's smaller
        if compressed.len() < packed.len() {
            let mut out = Vec::with_capacity(compressed.len() + 1);
            out.push(TAG_LZ4);
            out.extend_from_slice(&compressed);
            return Ok(out);
        }
    }

    let mut out = Vec::with_capacity(packed.len() + 1);
    out.push(TAG_RAW);
    out.extend_from_slice(&packed);
    Ok(out)
}

/// Decode an entry written by [`encode_entry`]
pub fn decode_entry(data: &[u8]) -> CacheResult<CachedEntry> {
    let (tag, payload) = data
        .split_first()
        .ok_or_else(|| CacheError::CorruptedContent("empty record".into()))?;

    match *tag {
        TAG_RAW => Ok(rmp_serde::from_slice(payload)?),
        TAG_LZ4 => {
            let packed = decompress_size_prepended(payload)
                .map_err(|e| CacheError::CorruptedContent(e.to_string()))?;
            Ok(rmp_serde::from_slice(&packed)?)
        }
        other => Err(CacheError::CorruptedContent(format!(
            "unknown record tag {other}"
        ))),
    }
}
