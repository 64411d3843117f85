//! Hashing utilities.
//!
//! Every digest in the chain (block seals and record signatures) is SHA3-256.

use crate::core::Hash256;
use sha3::{Digest, Sha3_256};

/// Compute SHA3-256 hash of data.
pub fn sha3_256(data: &[u8]) -> Hash256 {
    sha3_256_multi(&[data])
}

/// Compute SHA3-256 hash of multiple data chunks.
///
/// Chunks are fed in order with no separator, so the digest equals the
/// hash of their concatenation.
pub fn sha3_256_multi(chunks: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    finish(hasher)
}

/// Compute SHA3-256 hash of a list of fields.
///
/// Each field is prefixed with its byte length as a big-endian u64, so
/// `["ab", "c"]` and `["a", "bc"]` produce different digests.
pub fn sha3_256_fields(fields: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    finish(hasher)
}

fn finish(hasher: Sha3_256) -> Hash256 {
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash256::new(bytes)
}

/// Hash a textual material string.
pub fn hash(material: &str) -> Hash256 {
    sha3_256(material.as_bytes())
}
