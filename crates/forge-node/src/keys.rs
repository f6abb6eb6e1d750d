//! On-disk witness key material for the witnesses this node produces
//! blocks for. Stored as raw secret bytes in hex, never touched by the
//! validating core itself — `forge-chain`/`forge-consensus` only ever see
//! the resulting signatures and public keys.

use std::path::Path;

use forge_chain::model::WitnessId;
use forge_crypto::{CryptoError, KeyPair};
use serde::{Deserialize, Serialize};

/// One entry in a node's local witness key file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessKeyEntry {
    pub witness_id: u64,
    pub account_name: String,
    #[serde(with = "hex_bytes")]
    pub signing_secret: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub witness_secret: [u8; 32],
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(de)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

/// A witness key loaded and ready to sign, distinct from the hex-encoded
/// file representation so [`KeyPair`] can keep zeroizing its scalar on
/// drop without round-tripping through bytes on every use.
pub struct WitnessKey {
    pub witness_id: WitnessId,
    pub account_name: String,
    pub signing_key: KeyPair,
    pub witness_secret: [u8; 32],
}

#[derive(Debug, thiserror::Error)]
pub enum KeysError {
    #[error("reading witness key file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("parsing witness key file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("witness key entry for {account_name}: {0}")]
    InvalidSecret { account_name: String, source: CryptoError },
}

/// Loads every witness key this node holds from a JSON file of
/// [`WitnessKeyEntry`] records.
pub fn load_witness_keys(path: &Path) -> Result<Vec<WitnessKey>, KeysError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|source| KeysError::Read { path: path.display().to_string(), source })?;
    let entries: Vec<WitnessKeyEntry> = serde_json::from_str(&raw)?;
    entries
        .into_iter()
        .map(|entry| {
            let signing_key = KeyPair::from_secret_bytes(&entry.signing_secret)
                .map_err(|source| KeysError::InvalidSecret { account_name: entry.account_name.clone(), source })?;
            Ok(WitnessKey {
                witness_id: WitnessId::new(entry.witness_id),
                account_name: entry.account_name,
                signing_key,
                witness_secret: entry.witness_secret,
            })
        })
        .collect()
}
