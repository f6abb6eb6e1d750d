//! Chain identity. Unlike [`crate::params::GlobalParameters`], the chain id
//! is fixed at genesis and never changes while the chain runs — it exists
//! purely to make a transaction signed for one network invalid on another
//! that happens to share object ids and operation encodings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 digest of the genesis state (initial accounts, assets, witnesses,
/// and parameters), computed once at genesis and carried by every node and
/// wallet that talks to this chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub [u8; 32]);

impl ChainId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        ChainId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derives a chain id from the canonical bytes of a genesis state. Takes
    /// already-serialized bytes rather than a generic type so this crate
    /// doesn't need to know the shape of genesis state.
    pub fn derive(genesis_bytes: &[u8]) -> Self {
        ChainId(*blake3::hash(genesis_bytes).as_bytes())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(ChainId::derive(b"genesis"), ChainId::derive(b"genesis"));
        assert_ne!(ChainId::derive(b"genesis"), ChainId::derive(b"other"));
    }

    #[test]
    fn displays_as_hex() {
        let id = ChainId::from_bytes([0xab; 32]);
        assert_eq!(id.to_string(), "ab".repeat(32));
    }
}
