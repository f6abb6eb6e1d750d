//! Witnesses (block producers) and the running secret hash-chain that
//! feeds the shuffle RNG used to order the active set each maintenance
//! interval. Graphene-era chains split "witness" (produces blocks) and
//! "delegate" (votes on parameters) into separate roles; this
//! implementation keeps them merged in one object, as spec'd, since every
//! witness is also a parameter-voting delegate here.

use crate::model::account::AccountId;
use forge_core::{define_object, GlobalParameters};
use forge_crypto::{Digest, PublicKey};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Witness {
    pub id: WitnessId,
    pub account: AccountId,
    pub signing_key: PublicKey,
    /// Hash of the secret this witness will reveal when it next produces a
    /// block. Committed one block in advance so the revealed secret can't
    /// be chosen to bias the shuffle after seeing other witnesses' reveals.
    pub next_secret_hash: Digest,
    /// The secret this witness revealed in its most recently produced
    /// block, folded into the running shuffle seed.
    pub last_secret: Option<Digest>,
    pub total_votes: u64,
    pub pay_rate_bps: u16,
    pub url: String,
    pub blocks_produced: u64,
    pub blocks_missed: u64,
    /// A parameter-change proposal this witness is voting for; when enough
    /// active witnesses converge on the same proposal, maintenance applies
    /// it.
    pub proposed_parameters: Option<GlobalParameters>,
}

define_object!(WitnessMarker, WitnessId, Witness, space = 1u8, type_id = 6);

impl Witness {
    /// Commits to a fresh secret, returning its hash for `next_secret_hash`.
    pub fn commit_secret(secret: &Digest) -> Digest {
        forge_crypto::hash::hash_bytes(secret)
    }

    /// `true` if `revealed` actually hashes to this witness's committed
    /// `next_secret_hash` — checked before folding it into the shuffle seed.
    pub fn verify_reveal(&self, revealed: &Digest) -> bool {
        Self::commit_secret(revealed) == self.next_secret_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_must_match_commitment() {
        let secret = [9u8; 32];
        let hash = Witness::commit_secret(&secret);
        let witness = Witness {
            id: WitnessId::new(0),
            account: crate::model::account::AccountId::new(0),
            signing_key: forge_crypto::KeyPair::generate().public_key(),
            next_secret_hash: hash,
            last_secret: None,
            total_votes: 0,
            pay_rate_bps: 0,
            url: String::new(),
            blocks_produced: 0,
            blocks_missed: 0,
            proposed_parameters: None,
        };
        assert!(witness.verify_reveal(&secret));
        assert!(!witness.verify_reveal(&[1u8; 32]));
    }
}
