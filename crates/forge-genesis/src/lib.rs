//! ─── ForgeChain Genesis ──────────────────────────────────────────────────
//!
//! Builds the founding state for a new chain directly into a fresh
//! `ObjectDatabase` — no transactions, no signatures, no undo session: this
//! is the one place core supply is minted and the only place an object's
//! id can be assumed rather than looked up.

pub mod params;

pub use params::{GenesisParams, WitnessSeed};

use forge_auth::Authority;
use forge_chain::model::{
    Account, AccountBalance, Asset, AssetId, AssetPermissions, DynamicAssetData, DynamicGlobalData, Witness, WitnessId,
};
use forge_chain::ObjectDatabase;
use forge_core::id::InstanceId;
use forge_core::{ChainId, CoreError, CoreResult, GlobalParameters, ObjectId};
use forge_db::ops;
use forge_market::{Amount, Asset as MarketAsset, Price};
use tracing::info;

/// The database, chain id, and core asset produced by [`apply_genesis`],
/// everything `forge-node` needs to start a fresh chain.
pub struct GenesisResult {
    pub db: ObjectDatabase,
    pub chain_id: ChainId,
    pub core_asset_id: ObjectId,
    pub params: GlobalParameters,
}

/// Builds the genesis object database from `params`: the core asset, a
/// reserved issuer account nobody can ever sign for, one account and
/// balance per witness seed, the witness objects themselves (the entire
/// active set until the first maintenance interval re-tallies votes), and
/// the singleton [`DynamicGlobalData`].
pub fn apply_genesis(params: &GenesisParams) -> CoreResult<GenesisResult> {
    info!(network = %params.network_name, witnesses = params.witnesses.len(), "applying genesis state");

    params
        .global_parameters
        .validate()
        .map_err(CoreError::InvariantViolated)?;
    if params.witnesses.is_empty() {
        return Err(CoreError::InvariantViolated("genesis requires at least one witness".into()));
    }

    let mut db = ObjectDatabase::new();

    let committee = create_committee_account(&mut db);
    let core_asset_id = create_core_asset(&mut db, params, committee);
    info!(symbol = %params.core_asset_symbol, core_asset_id = %core_asset_id, "genesis: core asset created");

    let mut witness_ids = Vec::with_capacity(params.witnesses.len());
    for seed in &params.witnesses {
        let witness_id = seed_witness(&mut db, core_asset_id, seed)?;
        witness_ids.push(witness_id);
    }

    let total_supply: Amount = params.witnesses.iter().map(|w| w.initial_balance).sum();
    if total_supply > params.core_asset_max_supply {
        return Err(CoreError::InvariantViolated(format!(
            "genesis balances {} exceed core asset max supply {}",
            total_supply, params.core_asset_max_supply
        )));
    }

    let core_asset = ops::get(&db, AssetId::from_instance(core_asset_id.instance()))?.clone();
    ops::modify(&mut db, core_asset.dynamic_data_id, |data| {
        data.current_supply = total_supply;
    })?;

    ops::create(&mut db, |id: forge_chain::model::DynamicGlobalDataId| DynamicGlobalData {
        id,
        random: *blake3::hash(params.network_name.as_bytes()).as_bytes(),
        head_block_id: [0u8; 32],
        head_block_number: 0,
        head_block_time: params.genesis_time,
        current_witness: None,
        active_witnesses: witness_ids,
        next_maintenance_time: params
            .genesis_time
            .saturating_add_secs(i64::from(params.global_parameters.maintenance_interval_secs)),
    });

    let genesis_bytes = bincode::serialize(params).map_err(|e| CoreError::Serialization(e.to_string()))?;
    let chain_id = ChainId::derive(&genesis_bytes);

    Ok(GenesisResult { db, chain_id, core_asset_id, params: params.global_parameters.clone() })
}

/// A reserved account with an authority no key combination can ever
/// satisfy (threshold 1, zero keys). It issues the core asset so genesis
/// is the only place core supply is ever minted; nothing can issue more of
/// it afterward since no signature can ever authorize that account.
fn create_committee_account(db: &mut ObjectDatabase) -> forge_chain::model::AccountId {
    let impossible = Authority { weight_threshold: 1, key_auths: Vec::new(), account_auths: Vec::new() };
    let id = ops::create(db, |id| Account {
        id,
        name: "committee".into(),
        owner: impossible.clone(),
        active: impossible,
        memo_key: forge_crypto::PublicKey([0u8; 33]),
        voting_key: forge_crypto::PublicKey([0u8; 33]),
        vote_targets: Vec::new(),
        referrer: ObjectId::null(),
        referrer_percent: 0,
        is_prime: false,
        total_core_in_orders: 0,
    });
    db.register_account_name("committee".into(), id);
    id
}

fn create_core_asset(db: &mut ObjectDatabase, params: &GenesisParams, issuer: forge_chain::model::AccountId) -> ObjectId {
    let dynamic_data_id = ops::create(db, |id| DynamicAssetData { id, current_supply: 0, accumulated_fees: 0, fee_pool: 0 });
    let asset_id = ops::create(db, |id| {
        let object_id: ObjectId = id.into();
        Asset {
            id,
            symbol: params.core_asset_symbol.clone(),
            issuer,
            max_supply: params.core_asset_max_supply,
            precision: params.core_asset_precision,
            permissions: AssetPermissions::empty(),
            flags: AssetPermissions::empty(),
            core_exchange_rate: Price::new(MarketAsset::new(1, object_id), MarketAsset::new(1, object_id)),
            short_backing_asset: None,
            dynamic_data_id,
            bitasset_data_id: None,
            market_fee_bps: 0,
        }
    });
    db.register_asset_symbol(params.core_asset_symbol.clone(), asset_id);
    asset_id.into()
}

fn seed_witness(db: &mut ObjectDatabase, core_asset_id: ObjectId, seed: &WitnessSeed) -> CoreResult<WitnessId> {
    let account_id = ops::create(db, |id| Account {
        id,
        name: seed.account_name.clone(),
        owner: Authority::key_only(1, vec![(seed.owner_key, 1)]),
        active: Authority::key_only(1, vec![(seed.active_key, 1)]),
        memo_key: seed.memo_key,
        voting_key: seed.voting_key,
        vote_targets: Vec::new(),
        referrer: ObjectId::null(),
        referrer_percent: 0,
        is_prime: false,
        total_core_in_orders: 0,
    });
    db.register_account_name(seed.account_name.clone(), account_id);

    let balance_id = ops::create(db, |id| AccountBalance { id, owner: account_id, asset_id: core_asset_id, amount: seed.initial_balance });
    db.register_balance(account_id, core_asset_id, balance_id.into());

    let witness_id = ops::create(db, |id| Witness {
        id,
        account: account_id,
        signing_key: seed.signing_key,
        next_secret_hash: seed.next_secret_hash,
        last_secret: None,
        total_votes: 0,
        pay_rate_bps: seed.pay_rate_bps,
        url: seed.url.clone(),
        blocks_produced: 0,
        blocks_missed: 0,
        proposed_parameters: None,
    });
    Ok(witness_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::Timestamp;

    fn witness_seed(name: &str, balance: Amount) -> WitnessSeed {
        WitnessSeed {
            account_name: name.into(),
            owner_key: forge_crypto::KeyPair::generate().public_key(),
            active_key: forge_crypto::KeyPair::generate().public_key(),
            memo_key: forge_crypto::KeyPair::generate().public_key(),
            voting_key: forge_crypto::KeyPair::generate().public_key(),
            signing_key: forge_crypto::KeyPair::generate().public_key(),
            initial_balance: balance,
            next_secret_hash: Witness::commit_secret(&[7u8; 32]),
            pay_rate_bps: 100,
            url: String::new(),
        }
    }

    fn test_params() -> GenesisParams {
        GenesisParams {
            network_name: "forgechain-test".into(),
            genesis_time: Timestamp::from_unix_secs(1_700_000_000),
            core_asset_symbol: "CORE".into(),
            core_asset_precision: 5,
            core_asset_max_supply: 1_000_000_000,
            witnesses: vec![witness_seed("witness-a", 1_000), witness_seed("witness-b", 2_000)],
            global_parameters: GlobalParameters::default(),
        }
    }

    #[test]
    fn genesis_mints_exactly_the_sum_of_initial_balances() {
        let result = apply_genesis(&test_params()).expect("genesis must succeed");
        let core_asset = ops::get(&result.db, AssetId::from_instance(result.core_asset_id.instance())).unwrap();
        let dynamic = ops::get(&result.db, core_asset.dynamic_data_id).unwrap();
        assert_eq!(dynamic.current_supply, 3_000);
    }

    #[test]
    fn genesis_registers_every_witness_account_by_name() {
        let result = apply_genesis(&test_params()).expect("genesis must succeed");
        assert!(result.db.account_by_name("witness-a").is_some());
        assert!(result.db.account_by_name("witness-b").is_some());
    }

    #[test]
    fn genesis_seeds_the_active_witness_set_from_every_witness() {
        let result = apply_genesis(&test_params()).expect("genesis must succeed");
        let global = ops::get(&result.db, ObjectDatabase::dynamic_global_data_id()).unwrap();
        assert_eq!(global.active_witnesses.len(), 2);
    }

    #[test]
    fn identical_params_derive_the_same_chain_id() {
        let params = test_params();
        let a = apply_genesis(&params).unwrap();
        let b = apply_genesis(&params).unwrap();
        assert_eq!(a.chain_id, b.chain_id);
    }

    #[test]
    fn genesis_rejects_balances_over_max_supply() {
        let mut params = test_params();
        params.core_asset_max_supply = 100;
        assert!(apply_genesis(&params).is_err());
    }

    #[test]
    fn genesis_rejects_an_empty_witness_set() {
        let mut params = test_params();
        params.witnesses.clear();
        assert!(apply_genesis(&params).is_err());
    }
}
