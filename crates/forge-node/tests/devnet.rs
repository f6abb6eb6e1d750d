//! Integration tests driving genesis, block production, and fork
//! resolution the way `forge-node`'s main loop does, without spawning the
//! binary itself — there is no RPC surface here to poll for readiness.

use forge_chain::fee::FeeSchedule;
use forge_chain::model::Witness;
use forge_chain::ObjectDatabase;
use forge_consensus::{apply_block, produce_block, ForkDatabase};
use forge_core::{GlobalParameters, Timestamp};
use forge_crypto::hash::Digest;
use forge_crypto::KeyPair;
use forge_db::ops;
use forge_genesis::{apply_genesis, GenesisParams, WitnessSeed};

const GENESIS_TIME: i64 = 1_700_000_000;
const BLOCK_INTERVAL: u32 = 5;

fn build_params(signing_secret: [u8; 32], witness_secret: Digest) -> GenesisParams {
    let signing_key = KeyPair::from_secret_bytes(&signing_secret).unwrap().public_key();
    let seed = WitnessSeed {
        account_name: "solo".into(),
        owner_key: KeyPair::generate().public_key(),
        active_key: KeyPair::generate().public_key(),
        memo_key: KeyPair::generate().public_key(),
        voting_key: KeyPair::generate().public_key(),
        signing_key,
        initial_balance: 10_000,
        next_secret_hash: Witness::commit_secret(&witness_secret),
        pay_rate_bps: 0,
        url: String::new(),
    };
    let mut global_parameters = GlobalParameters::default();
    global_parameters.block_interval_secs = BLOCK_INTERVAL;
    GenesisParams {
        network_name: "forgechain-devnet-test".into(),
        genesis_time: Timestamp::from_unix_secs(GENESIS_TIME),
        core_asset_symbol: "CORE".into(),
        core_asset_precision: 5,
        core_asset_max_supply: 1_000_000_000,
        witnesses: vec![seed],
        global_parameters,
    }
}

#[test]
fn a_produced_block_advances_the_head() {
    let signing_secret = [11u8; 32];
    let witness_secret: Digest = [22u8; 32];
    let params_cfg = build_params(signing_secret, witness_secret);
    let signing_key = KeyPair::from_secret_bytes(&signing_secret).unwrap();

    let genesis = apply_genesis(&params_cfg).expect("genesis succeeds");
    let mut db = genesis.db;
    let mut params = genesis.params;
    let chain_id = genesis.chain_id;
    let core_asset_id = genesis.core_asset_id;
    let fee_schedule = FeeSchedule::with_defaults();

    let global = ops::get(&db, ObjectDatabase::dynamic_global_data_id()).unwrap();
    let witness_id = global.active_witnesses[0];

    let mut forks = ForkDatabase::new([0u8; 32]);
    let t1 = Timestamp::from_unix_secs(GENESIS_TIME + i64::from(BLOCK_INTERVAL));
    let block1 = produce_block(&db, chain_id, witness_id, &witness_secret, &signing_key, t1, Vec::new()).unwrap();
    forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, block1).unwrap();

    let global = ops::get(&db, ObjectDatabase::dynamic_global_data_id()).unwrap();
    assert_eq!(global.head_block_number, 1);
    let witness = ops::get(&db, witness_id).unwrap();
    assert_eq!(witness.blocks_produced, 1);
}

#[test]
fn a_wrong_witness_signature_is_rejected() {
    let signing_secret = [33u8; 32];
    let witness_secret: Digest = [44u8; 32];
    let params_cfg = build_params(signing_secret, witness_secret);

    let genesis = apply_genesis(&params_cfg).expect("genesis succeeds");
    let db = genesis.db;
    let chain_id = genesis.chain_id;

    let global = ops::get(&db, ObjectDatabase::dynamic_global_data_id()).unwrap();
    let witness_id = global.active_witnesses[0];

    // Sign with an unrelated key instead of the witness's own.
    let impostor = KeyPair::generate();
    let t1 = Timestamp::from_unix_secs(GENESIS_TIME + i64::from(BLOCK_INTERVAL));
    let block1 = produce_block(&db, chain_id, witness_id, &witness_secret, &impostor, t1, Vec::new()).unwrap();

    let mut db = db;
    let mut params = genesis.params;
    let fee_schedule = FeeSchedule::with_defaults();
    let result = apply_block(&mut db, chain_id, &mut params, &fee_schedule, genesis.core_asset_id, &block1);
    assert!(result.is_err());
}

/// A three-block alternate branch that diverges at genesis and overtakes a
/// shorter two-block applied chain should win via `ForkDatabase::push_block`.
#[test]
fn a_longer_fork_triggers_a_reorg() {
    let signing_secret = [55u8; 32];
    let witness_secret: Digest = [66u8; 32];
    let params_cfg = build_params(signing_secret, witness_secret);
    let signing_key = KeyPair::from_secret_bytes(&signing_secret).unwrap();
    let fee_schedule = FeeSchedule::with_defaults();

    // ── Original two-block chain ──────────────────────────────────────────
    let genesis = apply_genesis(&params_cfg).expect("genesis succeeds");
    let mut db = genesis.db;
    let mut params = genesis.params;
    let chain_id = genesis.chain_id;
    let core_asset_id = genesis.core_asset_id;
    let witness_id = ops::get(&db, ObjectDatabase::dynamic_global_data_id()).unwrap().active_witnesses[0];

    let mut forks = ForkDatabase::new([0u8; 32]);
    let t1 = Timestamp::from_unix_secs(GENESIS_TIME + i64::from(BLOCK_INTERVAL));
    let block1 = produce_block(&db, chain_id, witness_id, &witness_secret, &signing_key, t1, Vec::new()).unwrap();
    forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, block1).unwrap();

    let t2 = Timestamp::from_unix_secs(GENESIS_TIME + 2 * i64::from(BLOCK_INTERVAL));
    let block2 = produce_block(&db, chain_id, witness_id, &witness_secret, &signing_key, t2, Vec::new()).unwrap();
    forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, block2).unwrap();

    assert_eq!(ops::get(&db, ObjectDatabase::dynamic_global_data_id()).unwrap().head_block_number, 2);

    // ── Independent three-block alternate chain, same genesis, later
    // timestamps within the same slots so it diverges in header content ──
    let alt_genesis = apply_genesis(&params_cfg).expect("genesis succeeds");
    let mut alt_db = alt_genesis.db;
    let mut alt_params = alt_genesis.params;

    let alt_t1 = Timestamp::from_unix_secs(GENESIS_TIME + i64::from(BLOCK_INTERVAL) + 1);
    let alt_block1 = produce_block(&alt_db, chain_id, witness_id, &witness_secret, &signing_key, alt_t1, Vec::new()).unwrap();
    apply_block(&mut alt_db, chain_id, &mut alt_params, &fee_schedule, core_asset_id, &alt_block1).unwrap();

    let alt_t2 = Timestamp::from_unix_secs(GENESIS_TIME + 2 * i64::from(BLOCK_INTERVAL) + 1);
    let alt_block2 = produce_block(&alt_db, chain_id, witness_id, &witness_secret, &signing_key, alt_t2, Vec::new()).unwrap();
    apply_block(&mut alt_db, chain_id, &mut alt_params, &fee_schedule, core_asset_id, &alt_block2).unwrap();

    let alt_t3 = Timestamp::from_unix_secs(GENESIS_TIME + 3 * i64::from(BLOCK_INTERVAL) + 1);
    let alt_block3 = produce_block(&alt_db, chain_id, witness_id, &witness_secret, &signing_key, alt_t3, Vec::new()).unwrap();

    // ── Feed the alternate branch into the original fork database ────────
    forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, alt_block1).unwrap();
    forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, alt_block2).unwrap();
    forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, alt_block3).unwrap();

    let global = ops::get(&db, ObjectDatabase::dynamic_global_data_id()).unwrap();
    assert_eq!(global.head_block_number, 3, "the longer alternate branch should have won the reorg");
    assert_eq!(global.head_block_time, alt_t3);
}
