use forge_core::{GlobalParameters, Timestamp};
use forge_crypto::{Digest, PublicKey};
use serde::{Deserialize, Serialize};

/// One witness seeded directly into genesis, each backed by its own account
/// and an initial core-asset balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessSeed {
    pub account_name: String,
    pub owner_key: PublicKey,
    pub active_key: PublicKey,
    pub memo_key: PublicKey,
    pub voting_key: PublicKey,
    pub signing_key: PublicKey,
    pub initial_balance: i64,
    /// Commitment to the first secret this witness will reveal when it
    /// produces its first block.
    pub next_secret_hash: Digest,
    pub pay_rate_bps: u16,
    pub url: String,
}

/// Everything needed to build the genesis state: the core asset, the
/// initial witness set, and the starting chain-wide parameters. Hashed in
/// its entirety (via `bincode`) to derive the chain id, so two genesis
/// configurations that differ in any field — even just a witness's pay
/// rate — produce different, mutually-incompatible chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisParams {
    pub network_name: String,
    pub genesis_time: Timestamp,
    pub core_asset_symbol: String,
    pub core_asset_precision: u8,
    pub core_asset_max_supply: i64,
    pub witnesses: Vec<WitnessSeed>,
    pub global_parameters: GlobalParameters,
}
