// hasher.rs — SHA-256 helpers for the ledger hash chain.
//
// Hashes are lowercase hex so they read cleanly in the JSONL files.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash one serialized ledger line.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}
