//! Chain-wide dynamic state: the running shuffle seed, the active witness
//! schedule, and head-block bookkeeping. A singleton object (always
//! instance 0), mirroring the original's `dynamic_global_property_object` —
//! kept here rather than in `forge-consensus` since it is just another
//! database-resident object the maintenance and block-apply code mutates
//! through the same `forge_db::ops` entry points as everything else.

use crate::model::delegate::WitnessId;
use forge_core::{define_object, Timestamp};
use forge_crypto::Digest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicGlobalData {
    pub id: DynamicGlobalDataId,
    /// Running hash-chain seed folded from every revealed witness secret;
    /// reshuffled into the active witness order at each maintenance
    /// interval.
    pub random: Digest,
    pub head_block_id: Digest,
    pub head_block_number: u64,
    pub head_block_time: Timestamp,
    pub current_witness: Option<WitnessId>,
    /// The active, already-shuffled witness order this maintenance interval
    /// assigned. Slot assignment indexes into this, not into the raw
    /// registered-witness set.
    pub active_witnesses: Vec<WitnessId>,
    pub next_maintenance_time: Timestamp,
}

define_object!(
    DynamicGlobalDataMarker,
    DynamicGlobalDataId,
    DynamicGlobalData,
    space = 2u8,
    type_id = 5
);

impl DynamicGlobalData {
    /// Folds a freshly-revealed witness secret into the running seed, the
    /// same way each block's `previous_secret` updates it in the original.
    pub fn fold_secret(&mut self, revealed_secret: &Digest) {
        self.random = forge_crypto::hash::hash_many(&[&self.random, revealed_secret]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_a_secret_changes_the_seed_deterministically() {
        let mut a = DynamicGlobalData {
            id: DynamicGlobalDataId::new(0),
            random: [0u8; 32],
            head_block_id: [0u8; 32],
            head_block_number: 0,
            head_block_time: Timestamp::from_unix_secs(0),
            current_witness: None,
            active_witnesses: Vec::new(),
            next_maintenance_time: Timestamp::from_unix_secs(0),
        };
        let mut b = a.clone();
        let secret = [3u8; 32];
        a.fold_secret(&secret);
        b.fold_secret(&secret);
        assert_eq!(a.random, b.random);
        assert_ne!(a.random, [0u8; 32]);
    }
}
