//! Registered keys. Authorities reference raw public keys directly (see
//! `forge-auth::Authority`); a `Key` object exists only so a key can carry
//! an owner and a human label for wallets/explorers without that metadata
//! leaking into the consensus-critical authority check.

use crate::model::account::AccountId;
use forge_core::define_object;
use forge_crypto::PublicKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub id: KeyId,
    pub owner: AccountId,
    pub public_key: PublicKey,
    pub label: Option<String>,
}

define_object!(KeyMarker, KeyId, Key, space = 2u8, type_id = 4);
