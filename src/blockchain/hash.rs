use sha2::{Digest, Sha256};

use super::Block;

/// Hash a block over its canonical serialization.
///
/// The block is first lowered to a `serde_json::Value`, whose objects keep
/// their keys sorted, so the preimage does not depend on the order fields
/// were declared or received in. Nodes hashing the same block independently
/// therefore agree on the digest.
pub fn hash_block(block: &Block) -> String {
    let canonical = serde_json::to_value(block)
        .expect("block serializes to JSON")
        .to_string();
    sha256_hex(canonical.as_bytes())
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
