//! forge-node — a single-process ForgeChain devnet node.
//!
//! Startup sequence:
//!   1. Apply genesis from the supplied params file
//!   2. Load whichever witness keys this node holds
//!   3. Run the block-production loop: sleep until the next slot a local
//!      witness owns, produce a block, apply it, repeat
//!
//! There is no gossip and no RPC surface here — `forge-core::ports` defines
//! the seams (`BroadcastSink`, `DurableStore`, `BlockLogReader`) an embedder
//! would wire up to turn this into a networked node feeding real
//! transactions through `forge-consensus::PendingPool`; this binary
//! exercises the validating core and block production standalone.

mod clock;
mod keys;
mod replay;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use forge_chain::fee::FeeSchedule;
use forge_chain::ObjectDatabase;
use forge_consensus::{produce_block, witness_schedule, ForkDatabase};
use forge_core::ports::Clock;
use forge_core::{GlobalParameters, Timestamp};
use forge_db::ops;
use forge_genesis::{apply_genesis, GenesisParams};

use crate::clock::SystemClock;
use crate::keys::{load_witness_keys, WitnessKey};

#[derive(Parser, Debug)]
#[command(name = "forge-node", version, about = "ForgeChain devnet node")]
struct Args {
    /// Path to genesis parameters (JSON).
    #[arg(long)]
    genesis_params: PathBuf,

    /// Path to this node's witness key file (JSON list), if it produces
    /// blocks for any witness.
    #[arg(long)]
    witness_keys: Option<PathBuf>,

    /// Stop after applying this many blocks. Unbounded if omitted.
    #[arg(long)]
    max_blocks: Option<u64>,

    /// Directory holding a block log to replay on startup before producing
    /// any new blocks. Defaults to `<genesis-params dir>/block-log` if
    /// `--replay` is passed with no path.
    #[arg(long)]
    replay_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,forge=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("forge-node starting");

    let genesis_json = std::fs::read_to_string(&args.genesis_params)
        .with_context(|| format!("reading genesis params from {}", args.genesis_params.display()))?;
    let genesis_params: GenesisParams = serde_json::from_str(&genesis_json).context("parsing genesis params JSON")?;

    let genesis = apply_genesis(&genesis_params).context("applying genesis")?;
    info!(chain_id = %hex::encode(genesis.chain_id.as_bytes()), "genesis applied");

    let witness_keys = match &args.witness_keys {
        Some(path) => load_witness_keys(path).context("loading witness keys")?,
        None => Vec::new(),
    };
    if witness_keys.is_empty() {
        warn!("no witness keys loaded — this node will observe but never produce blocks");
    }

    let mut db = genesis.db;
    let mut params = genesis.params;
    let chain_id = genesis.chain_id;
    let core_asset_id = genesis.core_asset_id;
    let fee_schedule = FeeSchedule::with_defaults();

    let log_dir = args
        .replay_log
        .clone()
        .unwrap_or_else(|| replay::default_log_dir(&args.genesis_params));
    let block_log = replay::FileBlockLog::new(log_dir);
    let replayed = replay::replay_from_log(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, &block_log)
        .context("replaying block log")?;
    if replayed > 0 {
        info!(replayed, "replayed blocks from log");
    }

    let mut forks = ForkDatabase::new([0u8; 32]);
    let clock = SystemClock;

    let mut blocks_applied: u64 = 0;
    loop {
        if let Some(max) = args.max_blocks {
            if blocks_applied >= max {
                info!(blocks_applied, "reached --max-blocks, stopping");
                break;
            }
        }

        let Some((witness, when)) = next_local_slot(&db, &witness_keys, &params, clock.now())? else {
            tokio::time::sleep(Duration::from_millis(500)).await;
            continue;
        };

        let sleep_secs = (when.unix_secs() - clock.now().unix_secs()).max(0);
        if sleep_secs > 0 {
            tokio::time::sleep(Duration::from_secs(sleep_secs as u64)).await;
        }
        let now = clock.now();

        let block = match produce_block(&db, chain_id, witness.witness_id, &witness.witness_secret, &witness.signing_key, now, Vec::new()) {
            Ok(block) => block,
            Err(err) => {
                warn!(?err, witness = %witness.account_name, "failed to produce block for scheduled slot");
                continue;
            }
        };

        match forks.push_block(&mut db, chain_id, &mut params, &fee_schedule, core_asset_id, block.clone()) {
            Ok(()) => {
                blocks_applied += 1;
                if let Err(err) = block_log.append(&block) {
                    warn!(?err, "failed to append applied block to the log");
                }
                info!(witness = %witness.account_name, head = %hex::encode(forks.head()), blocks_applied, "block applied");
            }
            Err(err) => warn!(?err, "produced block was rejected"),
        }
    }

    Ok(())
}

/// The earliest upcoming slot owned by one of `keys`, among the database's
/// currently active witnesses. `None` if this node holds no witness in the
/// active set.
fn next_local_slot<'a>(
    db: &ObjectDatabase,
    keys: &'a [WitnessKey],
    params: &GlobalParameters,
    now: Timestamp,
) -> anyhow::Result<Option<(&'a WitnessKey, Timestamp)>> {
    if keys.is_empty() {
        return Ok(None);
    }
    let global = ops::get(db, ObjectDatabase::dynamic_global_data_id()).context("reading dynamic global data")?;
    let active = &global.active_witnesses;
    Ok(keys
        .iter()
        .filter_map(|key| {
            let when = witness_schedule::next_generation_time(key.witness_id, active, now, params.block_interval_secs)?;
            Some((key, when))
        })
        .min_by_key(|(_, when)| when.unix_secs()))
}
