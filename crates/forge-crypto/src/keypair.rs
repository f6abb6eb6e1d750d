//! Compact ECDSA over secp256k1. Signatures are the fixed 64-byte
//! `r || s` compact encoding (no DER wrapper), signed over a pre-hashed
//! BLAKE3 digest supplied by the caller — the core never signs raw bytes,
//! only digests produced by [`crate::hash`].

use crate::error::CryptoError;
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use ecdsa::signature::rand_core::OsRng;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// A 33-byte SEC1-compressed public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 33]);

/// A 64-byte compact ECDSA signature (`r || s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactSignature(pub [u8; 64]);

impl PublicKey {
    pub fn from_verifying_key(vk: &VerifyingKey) -> Self {
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(vk.to_encoded_point(true).as_bytes());
        PublicKey(bytes)
    }

    pub fn to_verifying_key(self) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)
    }

    pub fn verify(&self, digest: &[u8; 32], sig: &CompactSignature) -> Result<(), CryptoError> {
        let vk = self.to_verifying_key()?;
        let signature =
            Signature::from_slice(&sig.0).map_err(|_| CryptoError::InvalidSignatureBytes)?;
        vk.verify_prehash(digest, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

/// A keypair held only long enough to sign. The underlying `SigningKey`
/// zeroizes its scalar on drop.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        KeyPair {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_bytes(bytes.into()).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(KeyPair { signing_key })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Signs a 32-byte pre-hashed digest, returning a compact signature.
    pub fn sign(&self, digest: &[u8; 32]) -> CompactSignature {
        let sig: Signature = self
            .signing_key
            .sign_prehash(digest)
            .expect("secp256k1 signing over a 32-byte digest cannot fail");
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&sig.to_bytes());
        CompactSignature(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = KeyPair::generate();
        let digest = hash_bytes(b"a transaction body");
        let sig = kp.sign(&digest);
        assert!(kp.public_key().verify(&digest, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_digest() {
        let kp = KeyPair::generate();
        let digest = hash_bytes(b"a transaction body");
        let sig = kp.sign(&digest);
        let other_digest = hash_bytes(b"a different body");
        assert!(kp.public_key().verify(&other_digest, &sig).is_err());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let digest = hash_bytes(b"a transaction body");
        let sig = kp1.sign(&digest);
        assert!(kp2.public_key().verify(&digest, &sig).is_err());
    }

    #[test]
    fn deterministic_secret_round_trip() {
        let secret = [7u8; 32];
        let kp = KeyPair::from_secret_bytes(&secret).expect("valid secret");
        let digest = hash_bytes(b"deterministic");
        let sig = kp.sign(&digest);
        assert!(kp.public_key().verify(&digest, &sig).is_ok());
    }
}
