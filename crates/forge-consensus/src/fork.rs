//! Fork-aware block application.
//!
//! Every block applied against the live database has its undo actions
//! retained here instead of discarded, so a later-arriving branch that
//! turns out to be longer can still win: the losing branch is unwound
//! block by block (in reverse application order, same as an ordinary
//! nested [`forge_db::UndoSession`] rollback) and the winning branch is
//! replayed forward from their common ancestor.
//!
//! Blocks are assumed to arrive with their parent already known — either
//! already applied, or already recorded here as an unapplied fork
//! candidate. A node missing an ancestor has to fetch it through whatever
//! sync mechanism feeds blocks in here before `push_block` can place it.

use std::collections::{HashMap, HashSet};

use forge_chain::fee::FeeSchedule;
use forge_chain::ObjectDatabase;
use forge_core::{ChainId, CoreError, CoreResult, GlobalParameters, ObjectId};
use forge_db::UndoAction;

use crate::block::{apply_block, block_digest, BlockId, SignedBlock};

struct ForkItem {
    block: SignedBlock,
    parent: BlockId,
    /// `Some` while this block is part of the currently-applied chain;
    /// `None` for a fork candidate that hasn't (or no longer) sits on it.
    undo: Option<Vec<UndoAction<ObjectDatabase>>>,
}

/// Keeps every block received since `genesis_block_id` around, applied or
/// not, so the chain can switch to a heavier branch without losing the
/// ability to unwind the one it's leaving.
pub struct ForkDatabase {
    items: HashMap<BlockId, ForkItem>,
    head: BlockId,
}

impl ForkDatabase {
    pub fn new(genesis_block_id: BlockId) -> Self {
        let mut items = HashMap::new();
        items.insert(
            genesis_block_id,
            ForkItem {
                block: SignedBlock {
                    header: crate::block::BlockHeader {
                        previous: genesis_block_id,
                        block_num: 0,
                        timestamp: forge_core::Timestamp::from_unix_secs(0),
                        witness: forge_chain::model::WitnessId::new(0),
                        previous_secret: [0u8; 32],
                        next_secret_hash: [0u8; 32],
                        transaction_merkle_root: [0u8; 32],
                    },
                    transactions: Vec::new(),
                    witness_signature: forge_crypto::CompactSignature([0u8; 64]),
                },
                parent: genesis_block_id,
                undo: Some(Vec::new()),
            },
        );
        ForkDatabase { items, head: genesis_block_id }
    }

    pub fn head(&self) -> BlockId {
        self.head
    }

    fn block_num(&self, id: BlockId) -> u64 {
        self.items.get(&id).map(|item| item.block.header.block_num).unwrap_or(0)
    }

    /// Applies `block`, or records it as a fork candidate and switches the
    /// chain over to it if doing so makes the active branch longer.
    pub fn push_block(
        &mut self,
        db: &mut ObjectDatabase,
        chain_id: ChainId,
        params: &mut GlobalParameters,
        fee_schedule: &FeeSchedule,
        core_asset_id: ObjectId,
        block: SignedBlock,
    ) -> CoreResult<()> {
        let id = block_digest(chain_id, &block.header)?;
        let parent = block.header.previous;
        if !self.items.contains_key(&parent) {
            return Err(CoreError::UnknownBlock(
                "block's parent has not been seen by this fork database".into(),
            ));
        }
        if self.items.contains_key(&id) {
            return Ok(());
        }

        let block_num = block.header.block_num;
        let is_direct_extension = parent == self.head;

        if is_direct_extension {
            let undo = apply_with_outer_session(db, chain_id, params, fee_schedule, core_asset_id, &block)?;
            self.items.insert(id, ForkItem { block, parent, undo: Some(undo) });
            self.head = id;
        } else {
            self.items.insert(id, ForkItem { block, parent, undo: None });
            if block_num > self.block_num(self.head) {
                self.reorganize(db, chain_id, params, fee_schedule, core_asset_id, id)?;
            }
        }

        self.prune(params.max_undo_history);
        Ok(())
    }

    /// Ancestors of `id` that are currently applied, nearest first.
    fn applied_ancestors(&self, mut id: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        loop {
            let Some(item) = self.items.get(&id) else { break };
            if item.undo.is_some() {
                chain.push(id);
            }
            if item.parent == id {
                break; // genesis, self-parented
            }
            id = item.parent;
        }
        chain
    }

    /// All ancestors of `id` (applied or not), nearest first, stopping once
    /// `stop_at` is reached.
    fn ancestors_until(&self, mut id: BlockId, stop_at: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        while id != stop_at {
            chain.push(id);
            let Some(item) = self.items.get(&id) else { break };
            if item.parent == id {
                break;
            }
            id = item.parent;
        }
        chain
    }

    fn reorganize(
        &mut self,
        db: &mut ObjectDatabase,
        chain_id: ChainId,
        params: &mut GlobalParameters,
        fee_schedule: &FeeSchedule,
        core_asset_id: ObjectId,
        new_tip: BlockId,
    ) -> CoreResult<()> {
        let applied: HashSet<BlockId> = self.applied_ancestors(self.head).into_iter().collect();

        let mut cursor = new_tip;
        let mut new_branch = Vec::new();
        let ancestor = loop {
            if applied.contains(&cursor) {
                break cursor;
            }
            new_branch.push(cursor);
            let Some(item) = self.items.get(&cursor) else {
                return Err(CoreError::ReorgFailed("candidate branch has no common ancestor with the active chain".into()));
            };
            if item.parent == cursor {
                return Err(CoreError::ReorgFailed("candidate branch never meets the active chain".into()));
            }
            cursor = item.parent;
        };
        new_branch.reverse(); // ancestor -> ... -> new_tip

        let old_branch = self.ancestors_until(self.head, ancestor); // head -> ... -> just-above-ancestor

        // Roll the losing branch back, most recent block first.
        for old_id in &old_branch {
            let undo = self
                .items
                .get_mut(old_id)
                .and_then(|item| item.undo.take())
                .unwrap_or_default();
            for action in undo.into_iter().rev() {
                action(db);
            }
        }

        // Replay the winning branch forward, from the ancestor up.
        let mut applied_so_far = Vec::new();
        let mut failure = None;
        for new_id in &new_branch {
            let block = self.items.get(new_id).expect("collected from this map").block.clone();
            match apply_with_outer_session(db, chain_id, params, fee_schedule, core_asset_id, &block) {
                Ok(undo) => {
                    self.items.get_mut(new_id).expect("exists").undo = Some(undo);
                    applied_so_far.push(*new_id);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            // Unwind whatever of the new branch did apply, then restore the
            // original branch so the database ends up exactly where it
            // started.
            for applied_id in applied_so_far.iter().rev() {
                let undo = self
                    .items
                    .get_mut(applied_id)
                    .and_then(|item| item.undo.take())
                    .unwrap_or_default();
                for action in undo.into_iter().rev() {
                    action(db);
                }
            }
            for old_id in old_branch.iter().rev() {
                let block = self.items.get(old_id).expect("collected from this map").block.clone();
                let undo = apply_with_outer_session(db, chain_id, params, fee_schedule, core_asset_id, &block)?;
                self.items.get_mut(old_id).expect("exists").undo = Some(undo);
            }
            return Err(err);
        }

        self.head = new_tip;
        Ok(())
    }

    /// Drops fork items too far behind the head to plausibly take part in
    /// a future reorg, bounding this structure's memory the same way
    /// `max_undo_history` bounds how far back an ordinary undo session can
    /// reach.
    fn prune(&mut self, max_undo_history: u32) {
        let head_num = self.block_num(self.head);
        let floor = head_num.saturating_sub(u64::from(max_undo_history));
        self.items.retain(|id, item| *id == self.head || item.block.header.block_num >= floor);
    }
}

/// Applies `block` wrapped in a session whose undo actions are retained
/// rather than discarded on commit, by nesting `apply_block`'s own
/// internal session inside this outer one.
fn apply_with_outer_session(
    db: &mut ObjectDatabase,
    chain_id: ChainId,
    params: &mut GlobalParameters,
    fee_schedule: &FeeSchedule,
    core_asset_id: ObjectId,
    block: &SignedBlock,
) -> CoreResult<Vec<UndoAction<ObjectDatabase>>> {
    let mut outer = db.begin_session();
    match apply_block(outer.db_mut(), chain_id, params, fee_schedule, core_asset_id, block) {
        Ok(()) => Ok(outer.into_retained_actions()),
        Err(err) => Err(err),
    }
}
