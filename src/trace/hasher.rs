//! BLAKE3 content fingerprints.
//!
//! Every fingerprint is prefixed with the algorithm so log readers can tell
//! what produced it.

/// Fingerprint a string as `blake3:<hex>`.
pub fn hash_string(content: &str) -> String {
    format!("blake3:{}", blake3::hash(content.as_bytes()).to_hex())
}
