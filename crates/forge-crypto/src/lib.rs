//! ─── ForgeChain Crypto ───────────────────────────────────────────────────
//!
//! Compact ECDSA (secp256k1) signing/verification and BLAKE3 content
//! hashing. Everything here is pure-Rust (RustCrypto `k256`), matching the
//! rest of this workspace's no-C-deps posture.

pub mod error;
pub mod hash;
pub mod keypair;

pub use error::CryptoError;
pub use hash::Digest;
pub use keypair::{CompactSignature, KeyPair, PublicKey};
