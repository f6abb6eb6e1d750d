//! Block structure, production, and application.
//!
//! A block carries no separate "id" field distinct from what its witness
//! signs: [`block_digest`] hashes the header (whose `transaction_merkle_root`
//! already commits every included transaction), and that digest is both the
//! signature's message and the value the next block's `previous` points at.

use std::collections::HashSet;

use forge_chain::eval::account::credit_balance;
use forge_chain::eval::transaction::{apply_operation, evaluate_operation};
use forge_chain::fee::FeeSchedule;
use forge_chain::model::{AssetId, CallOrderId, ForceSettlementId, ProposalId, Witness, WitnessId};
use forge_chain::{
    apply_transaction, transaction_digest, verify_transaction_signatures, EvalContext,
    ObjectDatabase, SignedTransaction,
};
use forge_core::id::InstanceId;
use forge_core::{ChainId, CoreError, CoreResult, GlobalParameters, ObjectId, Timestamp};
use forge_crypto::hash::{hash_many, Digest};
use forge_crypto::{CompactSignature, KeyPair, PublicKey};
use forge_db::ops;
use serde::{Deserialize, Serialize};

use crate::witness_schedule;

/// A block's identity is the digest its witness signed; there is no
/// separate notion of a block "hash" computed some other way.
pub type BlockId = Digest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub previous: BlockId,
    pub block_num: u64,
    pub timestamp: Timestamp,
    pub witness: WitnessId,
    /// The secret this witness committed to one block ago, revealed now and
    /// folded into the running shuffle seed.
    pub previous_secret: Digest,
    /// Hash of the secret this witness will reveal in its next block.
    pub next_secret_hash: Digest,
    pub transaction_merkle_root: Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedBlock {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
    pub witness_signature: CompactSignature,
}

/// Hashes `chain_id` together with the header's canonical encoding. Both
/// the block's identity and the message the witness signs.
pub fn block_digest(chain_id: ChainId, header: &BlockHeader) -> CoreResult<Digest> {
    let body = bincode::serialize(header).map_err(|e| CoreError::Serialization(e.to_string()))?;
    Ok(hash_many(&[chain_id.as_bytes(), &body]))
}

/// Binary Merkle root over `txs`' digests, duplicating the last node at any
/// odd-sized level — the usual fixup so a single stray transaction doesn't
/// collapse the tree to a degenerate shape.
pub fn transaction_merkle_root(chain_id: ChainId, txs: &[SignedTransaction]) -> CoreResult<Digest> {
    if txs.is_empty() {
        return Ok([0u8; 32]);
    }
    let mut level: Vec<Digest> = txs
        .iter()
        .map(|tx| transaction_digest(chain_id, &tx.transaction))
        .collect::<CoreResult<Vec<_>>>()?;
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        let mut i = 0;
        while i < level.len() {
            let left = level[i];
            let right = if i + 1 < level.len() { level[i + 1] } else { level[i] };
            next.push(hash_many(&[&left, &right]));
            i += 2;
        }
        level = next;
    }
    Ok(level[0])
}

/// Builds and signs the next block on top of the current head, advancing
/// `witness_id`'s own secret hash-chain by one link. Does not touch the
/// database — the caller feeds the result to [`apply_block`] like any other
/// block it might have received from the network.
pub fn produce_block(
    db: &ObjectDatabase,
    chain_id: ChainId,
    witness_id: WitnessId,
    witness_secret_key: &Digest,
    signing_key: &KeyPair,
    now: Timestamp,
    transactions: Vec<SignedTransaction>,
) -> CoreResult<SignedBlock> {
    let global = ops::get(db, ObjectDatabase::dynamic_global_data_id())?;
    let witness = ops::get(db, witness_id)?;

    let last_secret = witness.last_secret.unwrap_or([0u8; 32]);
    let previous_secret = witness_schedule::derive_secret(witness_secret_key, &last_secret);
    if !witness.verify_reveal(&previous_secret) {
        return Err(CoreError::InvariantViolated(
            "witness secret does not match its committed hash".into(),
        ));
    }
    let next_secret = witness_schedule::derive_secret(witness_secret_key, &previous_secret);
    let next_secret_hash = Witness::commit_secret(&next_secret);

    let transaction_merkle_root = transaction_merkle_root(chain_id, &transactions)?;
    let header = BlockHeader {
        previous: global.head_block_id,
        block_num: global.head_block_number + 1,
        timestamp: now,
        witness: witness_id,
        previous_secret,
        next_secret_hash,
        transaction_merkle_root,
    };
    let digest = block_digest(chain_id, &header)?;
    let witness_signature = signing_key.sign(&digest);

    Ok(SignedBlock {
        header,
        transactions,
        witness_signature,
    })
}

/// Which of `apply_block`'s per-block checks to skip. Every field defaults
/// to `false` (nothing skipped); replay sets the flags for work already
/// proven correct when the block was first applied to produce it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Skip the witness signature check over the block header.
    pub skip_witness_signature: bool,
    /// Skip per-transaction signature verification; the `signed` key set
    /// passed to each transaction's evaluators is then empty, so this is
    /// only sound for blocks a trusted log already validated once.
    pub skip_transaction_signatures: bool,
}

/// Validates and applies `block` against `db`, rolling back every mutation
/// it made if any step fails. `params` is mutated in place at maintenance
/// boundaries, same as every other piece of chain state. Equivalent to
/// [`apply_block_with_options`] with every check enabled.
pub fn apply_block(
    db: &mut ObjectDatabase,
    chain_id: ChainId,
    params: &mut GlobalParameters,
    fee_schedule: &FeeSchedule,
    core_asset_id: ObjectId,
    block: &SignedBlock,
) -> CoreResult<()> {
    apply_block_with_options(db, chain_id, params, fee_schedule, core_asset_id, block, ApplyOptions::default())
}

/// [`apply_block`] with [`ApplyOptions`] controlling which checks to skip —
/// used by block-log replay, where signatures were already checked the
/// first time a block was applied and re-checking every one again on every
/// node restart is pure wasted CPU.
pub fn apply_block_with_options(
    db: &mut ObjectDatabase,
    chain_id: ChainId,
    params: &mut GlobalParameters,
    fee_schedule: &FeeSchedule,
    core_asset_id: ObjectId,
    block: &SignedBlock,
    options: ApplyOptions,
) -> CoreResult<()> {
    let global = ops::get(db, ObjectDatabase::dynamic_global_data_id())?.clone();

    if block.header.previous != global.head_block_id {
        return Err(CoreError::InvariantViolated("block does not extend the current head".into()));
    }
    if block.header.block_num != global.head_block_number + 1 {
        return Err(CoreError::InvariantViolated("block number does not follow the head".into()));
    }
    if block.header.timestamp <= global.head_block_time {
        return Err(CoreError::InvariantViolated("block timestamp does not advance".into()));
    }

    let slot = witness_schedule::slot_for_time(block.header.timestamp, params.block_interval_secs);
    let expected_witness = witness_schedule::witness_for_slot(&global.active_witnesses, slot)
        .ok_or_else(|| CoreError::InvariantViolated("no active witness schedule".into()))?;
    if block.header.witness != expected_witness {
        return Err(CoreError::WrongWitness {
            expected: expected_witness.into(),
            got: block.header.witness.into(),
        });
    }

    let witness = ops::get(db, block.header.witness)?.clone();
    if !witness.verify_reveal(&block.header.previous_secret) {
        return Err(CoreError::InvariantViolated(
            "witness secret reveal does not match its commitment".into(),
        ));
    }

    let digest = block_digest(chain_id, &block.header)?;
    if !options.skip_witness_signature {
        witness
            .signing_key
            .verify(&digest, &block.witness_signature)
            .map_err(|_| CoreError::Malformed("invalid witness signature".into()))?;
    }

    let expected_root = transaction_merkle_root(chain_id, &block.transactions)?;
    if expected_root != block.header.transaction_merkle_root {
        return Err(CoreError::InvariantViolated("transaction merkle root mismatch".into()));
    }

    let missed = missed_slots(&global.active_witnesses, global.head_block_time, block.header.timestamp, params.block_interval_secs, block.header.witness);

    let mut session = db.begin_session();
    let result = (|| -> CoreResult<()> {
        for witness_id in &missed {
            ops::modify(session.db_mut(), *witness_id, |w| w.blocks_missed += 1)?;
        }

        for signed_tx in &block.transactions {
            let signed_keys = if options.skip_transaction_signatures {
                HashSet::new()
            } else {
                verify_transaction_signatures(chain_id, signed_tx)?
            };
            apply_transaction(
                session.db_mut(),
                block.header.timestamp,
                core_asset_id,
                params,
                fee_schedule,
                &signed_keys,
                &signed_tx.transaction,
            )?;
        }

        ops::modify(session.db_mut(), block.header.witness, |w| {
            w.last_secret = Some(block.header.previous_secret);
            w.next_secret_hash = block.header.next_secret_hash;
            w.blocks_produced += 1;
        })?;

        ops::modify(session.db_mut(), ObjectDatabase::dynamic_global_data_id(), |g| {
            g.fold_secret(&block.header.previous_secret);
            g.head_block_id = digest;
            g.head_block_number = block.header.block_num;
            g.head_block_time = block.header.timestamp;
            g.current_witness = Some(block.header.witness);
        })?;

        run_end_of_block_hooks(session.db_mut(), params, fee_schedule, core_asset_id, block.header.timestamp)?;

        let next_maintenance = ops::get(session.db(), ObjectDatabase::dynamic_global_data_id())?.next_maintenance_time;
        if block.header.timestamp >= next_maintenance {
            crate::maintenance::perform_maintenance(session.db_mut(), params, core_asset_id, block.header.timestamp)?;
        }

        Ok(())
    })();

    match result {
        Ok(()) => {
            session.commit();
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// The witnesses whose slot was skipped between the previous and current
/// block, in schedule order, excluding the slot the current block itself
/// fills. Empty for ordinary back-to-back production.
fn missed_slots(
    active_witnesses: &[WitnessId],
    previous_time: Timestamp,
    current_time: Timestamp,
    block_interval_secs: u32,
    producing_witness: WitnessId,
) -> Vec<WitnessId> {
    if active_witnesses.is_empty() {
        return Vec::new();
    }
    let previous_slot = witness_schedule::slot_for_time(previous_time, block_interval_secs);
    let current_slot = witness_schedule::slot_for_time(current_time, block_interval_secs);
    let mut missed = Vec::new();
    let mut slot = previous_slot + 1;
    while slot < current_slot {
        if let Some(w) = witness_schedule::witness_for_slot(active_witnesses, slot) {
            if w != producing_witness {
                missed.push(w);
            }
        }
        slot += 1;
        if missed.len() >= active_witnesses.len() * 4 {
            // Pathologically large gap (e.g. right after genesis, where
            // `previous_time` is epoch zero); cap the bookkeeping rather
            // than walk millions of empty slots.
            break;
        }
    }
    missed
}

fn run_end_of_block_hooks(
    db: &mut ObjectDatabase,
    params: &GlobalParameters,
    fee_schedule: &FeeSchedule,
    core_asset_id: ObjectId,
    now: Timestamp,
) -> CoreResult<()> {
    expire_limit_orders(db, now)?;
    expire_short_orders(db, now)?;
    expire_withdraw_permissions(db, now)?;
    execute_ready_proposals(db, params, fee_schedule, core_asset_id, now)?;
    retry_force_settlements(db, now)?;
    sweep_margin_calls(db, now)?;
    Ok(())
}

fn expire_limit_orders(db: &mut ObjectDatabase, now: Timestamp) -> CoreResult<()> {
    let now_secs = now.unix_secs();
    let expired: Vec<_> = db
        .limit_orders
        .iter()
        .filter(|(_, o)| o.expiration.unix_secs() <= now_secs)
        .map(|(_, o)| (o.id, o.seller, o.sell_price.quote.asset_id, o.for_sale))
        .collect();
    for (id, seller, asset_id, amount) in expired {
        ops::remove(db, id)?;
        credit_balance(db, seller, asset_id, amount)?;
    }
    Ok(())
}

fn expire_short_orders(db: &mut ObjectDatabase, now: Timestamp) -> CoreResult<()> {
    let now_secs = now.unix_secs();
    let expired: Vec<_> = db
        .short_orders
        .iter()
        .filter(|(_, o)| o.expiration.unix_secs() <= now_secs)
        .map(|(_, o)| (o.id, o.seller, o.sell_price.quote.asset_id, o.available_collateral))
        .collect();
    for (id, seller, asset_id, amount) in expired {
        ops::remove(db, id)?;
        credit_balance(db, seller, asset_id, amount)?;
    }
    Ok(())
}

fn expire_withdraw_permissions(db: &mut ObjectDatabase, now: Timestamp) -> CoreResult<()> {
    let expired: Vec<_> = db
        .withdraw_permissions
        .iter()
        .filter(|(_, p)| p.is_expired(now))
        .map(|(_, p)| p.id)
        .collect();
    for id in expired {
        ops::remove(db, id)?;
    }
    Ok(())
}

/// Auto-executes every proposal that has gathered full approval and passed
/// its review period, without waiting for a `ProposalUpdate` transaction to
/// trigger it — mirrors the approval-triggered execution path exactly,
/// just run proactively at the end of every block.
fn execute_ready_proposals(
    db: &mut ObjectDatabase,
    params: &GlobalParameters,
    fee_schedule: &FeeSchedule,
    core_asset_id: ObjectId,
    now: Timestamp,
) -> CoreResult<()> {
    let candidates: Vec<ProposalId> = db
        .proposals
        .iter()
        .filter(|(_, p)| p.is_ready_to_execute(now) || p.is_expired(now))
        .map(|(_, p)| p.id)
        .collect();

    for proposal_id in candidates {
        let proposal = ops::get(db, proposal_id)?.clone();
        if !proposal.is_ready_to_execute(now) {
            ops::remove(db, proposal_id)?;
            continue;
        }

        let mut approved_keys: HashSet<PublicKey> = HashSet::new();
        for account in proposal
            .available_active_approvals
            .iter()
            .chain(proposal.available_owner_approvals.iter())
        {
            if let Ok(acct) = ops::get(db, *account) {
                approved_keys.extend(acct.active.key_auths.iter().map(|(k, _)| *k));
                approved_keys.extend(acct.owner.key_auths.iter().map(|(k, _)| *k));
            }
        }

        let failed = {
            let mut ctx = EvalContext {
                db: &mut *db,
                now,
                core_asset_id,
                params,
                fee_schedule,
                signed: &approved_keys,
            };
            let mut failed = false;
            for wrapped in &proposal.proposed_ops {
                if evaluate_operation(&ctx, wrapped).is_err() || apply_operation(&mut ctx, wrapped).is_err() {
                    failed = true;
                    break;
                }
            }
            failed
        };

        if failed {
            tracing::warn!(?proposal_id, "ready proposal failed to auto-execute this block; retrying later");
        } else {
            ops::remove(db, proposal_id)?;
        }
    }
    Ok(())
}

/// Retries every pending [`forge_market::ForceSettlement`] request whose
/// mandatory delay has elapsed, against whichever call order is currently
/// least collateralized for its asset.
fn retry_force_settlements(db: &mut ObjectDatabase, now: Timestamp) -> CoreResult<()> {
    let due: Vec<_> = db
        .force_settlements
        .iter()
        .map(|(_, r)| r.to_dto())
        .collect();

    for request_dto in due {
        let Some(asset_id) = asset_id_for(db, request_dto.balance.asset_id) else { continue };
        let asset = ops::get(db, asset_id)?.clone();
        let Some(bitasset_id) = asset.bitasset_data_id else { continue };
        let bitasset = ops::get(db, bitasset_id)?.clone();
        let Some(feed) = bitasset.current_feed else { continue };
        if !forge_market::margin::settlement_is_due(&request_dto, now, bitasset.force_settlement_delay_secs) {
            continue;
        }

        let settlement_price = forge_chain::eval::orders::scale_price_base(
            feed.call_limit,
            10_000u32.saturating_sub(u32::from(bitasset.force_settlement_offset_bps)),
        );
        let best_call_id = db
            .call_orders
            .iter()
            .filter(|(_, c)| c.debt.asset_id == request_dto.balance.asset_id)
            .filter_map(|(_, c)| c.to_dto().collateral_ratio_bps(settlement_price).map(|r| (c.id, r)))
            .min_by_key(|(_, r)| *r)
            .map(|(id, _)| id);
        let Some(call_id) = best_call_id else { continue };

        let mut call_dto = ops::get(db, call_id)?.to_dto();
        let request_id: ForceSettlementId = ForceSettlementId::from_instance(request_dto.id.instance());
        let mut request_dto = request_dto;
        let Some((debt_settled, collateral_paid)) =
            forge_market::margin::apply_forced_settlement(&mut call_dto, &mut request_dto, settlement_price)
        else {
            continue;
        };

        ops::modify(db, call_id, |c| c.apply_dto(&call_dto))?;
        ops::modify(db, request_id, |r| r.balance = request_dto.balance)?;
        let owner = ops::get(db, request_id)?.owner;
        credit_balance(db, owner, collateral_paid.asset_id, collateral_paid.amount)?;
        ops::modify(db, asset.dynamic_data_id, |d| d.current_supply -= debt_settled.amount)?;

        if call_dto.debt.amount <= 0 {
            ops::remove(db, call_id)?;
        }
        if request_dto.balance.amount <= 0 {
            ops::remove(db, request_id)?;
        }
    }
    Ok(())
}

/// Scans every market-issued asset's call orders against its current feed
/// and margin-calls any that have fallen to or below the maintenance
/// collateral ratio. Each flagged position is settled as far as a
/// protocol-initiated forced settlement — sized to its full remaining
/// debt — can take it, reusing the exact settlement arithmetic a
/// user-submitted `ForceSettlementCreate` would run.
fn sweep_margin_calls(db: &mut ObjectDatabase, now: Timestamp) -> CoreResult<()> {
    let assets: Vec<forge_chain::model::Asset> = db
        .assets
        .iter()
        .map(|(_, a)| a.clone())
        .filter(|a| a.bitasset_data_id.is_some())
        .collect();

    for asset in assets {
        let bitasset_id = asset.bitasset_data_id.expect("filtered above");
        let bitasset = ops::get(db, bitasset_id)?.clone();
        if bitasset.globally_settled_price.is_some() {
            // Already frozen: no more margin calls or matching, only
            // redemption at the frozen price via force settlement.
            continue;
        }
        let Some(feed) = bitasset.current_feed else { continue };
        let settlement_price = forge_market::margin::margin_call_price_ceiling(feed.call_limit, bitasset.force_settlement_offset_bps);
        let asset_object_id: ObjectId = asset.id.into();

        let calls: Vec<forge_market::CallOrder> = db
            .call_orders
            .iter()
            .filter(|(_, c)| c.debt.asset_id == asset_object_id)
            .map(|(_, c)| c.to_dto())
            .collect();
        if calls.is_empty() {
            continue;
        }

        let least_ratio = calls.iter().filter_map(|c| c.collateral_ratio_bps(settlement_price)).min();
        if least_ratio.map(forge_market::margin::is_black_swan).unwrap_or(false) {
            global_settle_asset(db, &asset, bitasset_id, &calls)?;
            continue;
        }

        let flagged = forge_market::margin::scan_margin_calls(&calls, settlement_price, feed.required_maintenance_collateral_bps);

        for flagged_id in flagged {
            let call_id: CallOrderId = CallOrderId::from_instance(flagged_id.instance());
            let Some(call) = ops::try_get(db, call_id) else { continue };
            let mut call_dto = call.to_dto();
            let borrower = call.borrower;

            // No stored settlement request backs a margin call; synthesize
            // one sized to the full debt so the same arithmetic a
            // user-initiated force settlement would use applies here too.
            let mut synthetic_request = forge_market::ForceSettlement {
                id: flagged_id,
                owner: borrower.into(),
                balance: call_dto.debt,
                requested_at: now,
            };
            let Some((debt_settled, collateral_paid)) =
                forge_market::margin::apply_forced_settlement(&mut call_dto, &mut synthetic_request, settlement_price)
            else {
                continue;
            };

            ops::modify(db, call_id, |c| c.apply_dto(&call_dto))?;
            credit_balance(db, borrower, collateral_paid.asset_id, collateral_paid.amount)?;
            ops::modify(db, asset.dynamic_data_id, |d| d.current_supply -= debt_settled.amount)?;
            if call_dto.debt.amount <= 0 {
                ops::remove(db, call_id)?;
            }
        }
    }
    Ok(())
}

/// Freezes a market-issued asset at the aggregate collateral/debt ratio
/// across every open call order and closes every one of those orders out
/// at that price: the least-collateralized position falling below 100%
/// means the feed price can no longer be trusted to make any debt holder
/// whole, so every holder instead redeems pro-rata against whatever
/// collateral the book actually has.
fn global_settle_asset(
    db: &mut ObjectDatabase,
    asset: &forge_chain::model::Asset,
    bitasset_id: forge_chain::model::BitassetDataId,
    calls: &[forge_market::CallOrder],
) -> CoreResult<()> {
    let total_debt: forge_market::Amount = calls.iter().map(|c| c.debt.amount).sum();
    let total_collateral: forge_market::Amount = calls.iter().map(|c| c.collateral.amount).sum();
    let debt_asset_id = calls[0].debt.asset_id;
    let collateral_asset_id = calls[0].collateral.asset_id;

    let Some(global_price) = forge_market::margin::global_settlement_price(
        forge_market::Asset::new(total_collateral, collateral_asset_id),
        forge_market::Asset::new(total_debt, debt_asset_id),
    ) else {
        return Ok(());
    };

    ops::modify(db, bitasset_id, |b| b.globally_settled_price = Some(global_price))?;

    for call in calls {
        let call_id: CallOrderId = CallOrderId::from_instance(call.id.instance());
        let owed = global_price
            .multiply(call.debt)
            .map(|owed| owed.amount.min(call.collateral.amount))
            .unwrap_or(0);
        let borrower = forge_chain::model::AccountId::from_instance(call.borrower.instance());
        credit_balance(db, borrower, collateral_asset_id, owed)?;
        ops::modify(db, asset.dynamic_data_id, |d| d.current_supply -= call.debt.amount)?;
        ops::remove(db, call_id)?;
    }
    Ok(())
}

fn asset_id_for(db: &ObjectDatabase, asset_object_id: ObjectId) -> Option<AssetId> {
    let id: AssetId = AssetId::from_instance(asset_object_id.instance());
    ops::try_get(db, id).map(|_| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merkle_root_of_a_single_transaction_is_its_own_digest() {
        let chain_id = ChainId::from_bytes([1u8; 32]);
        let tx = forge_chain::Transaction {
            expiration: Timestamp::from_unix_secs(1_000),
            entries: vec![],
        };
        let signed_tx = SignedTransaction {
            transaction: tx,
            signatures: vec![],
        };
        let expected = transaction_digest(chain_id, &signed_tx.transaction).unwrap();
        let root = transaction_merkle_root(chain_id, std::slice::from_ref(&signed_tx)).unwrap();
        assert_eq!(root, expected);
    }

    #[test]
    fn merkle_root_duplicates_the_last_node_on_odd_levels() {
        let chain_id = ChainId::from_bytes([2u8; 32]);
        let make_tx = |secs: i64| SignedTransaction {
            transaction: forge_chain::Transaction {
                expiration: Timestamp::from_unix_secs(secs),
                entries: vec![],
            },
            signatures: vec![],
        };
        let txs = vec![make_tx(1), make_tx(2), make_tx(3)];
        let d0 = transaction_digest(chain_id, &txs[0].transaction).unwrap();
        let d1 = transaction_digest(chain_id, &txs[1].transaction).unwrap();
        let d2 = transaction_digest(chain_id, &txs[2].transaction).unwrap();
        let top_left = hash_many(&[&d0, &d1]);
        let top_right = hash_many(&[&d2, &d2]);
        let expected = hash_many(&[&top_left, &top_right]);
        assert_eq!(transaction_merkle_root(chain_id, &txs).unwrap(), expected);
    }

    #[test]
    fn empty_block_has_a_zero_merkle_root() {
        let chain_id = ChainId::from_bytes([3u8; 32]);
        assert_eq!(transaction_merkle_root(chain_id, &[]).unwrap(), [0u8; 32]);
    }

    #[test]
    fn block_digest_changes_with_the_header() {
        let chain_id = ChainId::from_bytes([4u8; 32]);
        let header = BlockHeader {
            previous: [0u8; 32],
            block_num: 1,
            timestamp: Timestamp::from_unix_secs(5),
            witness: WitnessId::new(0),
            previous_secret: [1u8; 32],
            next_secret_hash: [2u8; 32],
            transaction_merkle_root: [0u8; 32],
        };
        let mut other = header.clone();
        other.block_num = 2;
        assert_ne!(
            block_digest(chain_id, &header).unwrap(),
            block_digest(chain_id, &other).unwrap()
        );
    }
}
