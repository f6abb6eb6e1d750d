//! Content hashing. Every digest in this codebase — transaction digests,
//! block ids, the witness secret hash-chain — is BLAKE3, chosen for speed
//! and because it is already the hash this workspace's ecosystem reaches
//! for elsewhere.

/// A 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

pub fn hash_bytes(data: &[u8]) -> Digest {
    *blake3::hash(data).as_bytes()
}

pub fn hash_many(parts: &[&[u8]]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}
