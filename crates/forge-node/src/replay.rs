//! Block log replay: the `forge_core::ports::BlockLogReader` consumer that
//! reconstructs chain state from an append-only on-disk log instead of
//! (or before) producing new blocks.
//!
//! The log format is one file per block, named by its decimal block number,
//! each file the bincode encoding of a `SignedBlock`. A real embedder would
//! more likely back this with a single append-only file and an offset
//! index; the one-file-per-block layout keeps this devnet binary free of a
//! second persistence format to get wrong.

use std::fs;
use std::path::{Path, PathBuf};

use forge_chain::fee::FeeSchedule;
use forge_chain::ObjectDatabase;
use forge_consensus::{apply_block_with_options, ApplyOptions, SignedBlock};
use forge_core::ports::BlockLogReader;
use forge_core::{ChainId, CoreError, CoreResult, GlobalParameters, ObjectId};

pub struct FileBlockLog {
    dir: PathBuf,
}

impl FileBlockLog {
    pub fn new(dir: PathBuf) -> Self {
        FileBlockLog { dir }
    }

    fn path_for(&self, block_num: u64) -> PathBuf {
        self.dir.join(format!("{block_num:020}.block"))
    }

    /// Appends `block` to the log at the next block number. Not part of
    /// `BlockLogReader` (which is read-only); the production loop calls
    /// this directly after a block applies successfully.
    pub fn append(&self, block: &SignedBlock) -> CoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::Serialization(e.to_string()))?;
        let bytes = bincode::serialize(block).map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(self.path_for(block.header.block_num), bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

impl BlockLogReader for FileBlockLog {
    fn read_at(&self, block_num: u64) -> CoreResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(block_num)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Serialization(e.to_string())),
        }
    }

    fn head_block_num(&self) -> CoreResult<u64> {
        let mut head = 0u64;
        if !self.dir.exists() {
            return Ok(0);
        }
        for entry in fs::read_dir(&self.dir).map_err(|e| CoreError::Serialization(e.to_string()))? {
            let entry = entry.map_err(|e| CoreError::Serialization(e.to_string()))?;
            let stem = entry.path();
            let Some(stem) = stem.file_stem().and_then(|s| s.to_str()) else { continue };
            if let Ok(n) = stem.parse::<u64>() {
                head = head.max(n);
            }
        }
        Ok(head)
    }
}

/// Applies every block `reader` holds, from 1 through its head, in order.
/// Signature checks are skipped throughout: a log's contents were already
/// signature-checked the first time each block passed through
/// `apply_block`, and re-verifying every signature again on every replay is
/// wasted work a trusted local log doesn't need. Duplicate transaction
/// resubmission is not a concern here either, since a block log replay
/// never interleaves with live transaction intake.
///
/// Returns the number of blocks applied.
pub fn replay_from_log(
    db: &mut ObjectDatabase,
    chain_id: ChainId,
    params: &mut GlobalParameters,
    fee_schedule: &FeeSchedule,
    core_asset_id: ObjectId,
    reader: &dyn BlockLogReader,
) -> CoreResult<u64> {
    let head = reader.head_block_num()?;
    let options = ApplyOptions {
        skip_witness_signature: true,
        skip_transaction_signatures: true,
    };
    let mut applied = 0u64;
    for block_num in 1..=head {
        let Some(bytes) = reader.read_at(block_num)? else { continue };
        let block: SignedBlock =
            bincode::deserialize(&bytes).map_err(|e| CoreError::Serialization(e.to_string()))?;
        apply_block_with_options(db, chain_id, params, fee_schedule, core_asset_id, &block, options)?;
        applied += 1;
    }
    Ok(applied)
}

pub fn default_log_dir(genesis_params_path: &Path) -> PathBuf {
    genesis_params_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("block-log")
}
