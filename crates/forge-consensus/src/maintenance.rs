//! The maintenance interval: re-tallies witness votes, reshuffles the
//! active set, adopts a parameter change once enough witnesses converge on
//! it, and pays out accumulated network fees.

use forge_chain::model::{
    Account, AccountBalanceId, AssetId, DynamicAssetData, VestingBalance, VestingBalanceId, Witness, WitnessId,
};
use forge_chain::ObjectDatabase;
use forge_core::id::InstanceId;
use forge_core::{CoreResult, GlobalParameters, Object, ObjectId, Timestamp};
use forge_db::ops;

use crate::witness_schedule;

/// Re-tallies votes, reshuffles the active witness set, adopts a converged
/// parameter proposal, and pays witnesses out of accumulated core-asset
/// fees — all the bookkeeping the original chain ran once per maintenance
/// interval instead of every block.
pub fn perform_maintenance(
    db: &mut ObjectDatabase,
    params: &mut GlobalParameters,
    core_asset_id: ObjectId,
    now: Timestamp,
) -> CoreResult<()> {
    tally_votes(db, core_asset_id)?;

    let mut active = select_active_witnesses(db, usize::from(params.active_witness_count));
    let global = ops::get(db, ObjectDatabase::dynamic_global_data_id())?.clone();
    witness_schedule::shuffle(&mut active, global.random);

    adopt_converged_parameters(db, &active, params)?;
    pay_witnesses(db, core_asset_id, &active, now)?;

    ops::modify(db, ObjectDatabase::dynamic_global_data_id(), |g| {
        g.active_witnesses = active;
        g.next_maintenance_time = now.saturating_add_secs(i64::from(params.maintenance_interval_secs));
    })?;

    Ok(())
}

/// Recomputes every witness's `total_votes` from scratch: each account's
/// core balance plus whatever it has committed to open orders is added to
/// the tally of every witness it names in `vote_targets`.
fn tally_votes(db: &mut ObjectDatabase, core_asset_id: ObjectId) -> CoreResult<()> {
    let mut tallies: std::collections::HashMap<WitnessId, u64> = std::collections::HashMap::new();
    for (_, witness) in db.witnesses.iter() {
        tallies.insert(witness.id, 0);
    }

    let accounts: Vec<Account> = db.accounts.iter().map(|(_, a)| a.clone()).collect();
    for account in &accounts {
        let balance = db
            .balance_object_for(account.id, core_asset_id)
            .and_then(|id| ops::try_get(db, AccountBalanceId::from_instance(id.instance())))
            .map(|b| b.amount)
            .unwrap_or(0);
        let weight = balance.max(0) as u64 + account.total_core_in_orders.max(0) as u64;
        if weight == 0 {
            continue;
        }
        for target in &account.vote_targets {
            if target.space() != Witness::SPACE || target.type_id() != Witness::TYPE {
                continue;
            }
            let witness_id = WitnessId::from_instance(target.instance());
            if let Some(tally) = tallies.get_mut(&witness_id) {
                *tally += weight;
            }
        }
    }

    for (witness_id, total_votes) in tallies {
        ops::modify(db, witness_id, |w| w.total_votes = total_votes)?;
    }
    Ok(())
}

/// The top `count` witnesses by `total_votes`, ties broken by instance id
/// so the selection is deterministic across nodes.
fn select_active_witnesses(db: &ObjectDatabase, count: usize) -> Vec<WitnessId> {
    let mut witnesses: Vec<&Witness> = db.witnesses.iter().map(|(_, w)| w).collect();
    witnesses.sort_by(|a, b| b.total_votes.cmp(&a.total_votes).then(a.id.cmp(&b.id)));
    witnesses.into_iter().take(count).map(|w| w.id).collect()
}

/// Adopts the per-field median of every active witness's
/// `proposed_parameters`, but only once that median itself validates — a
/// witness proposing a nonsensical value can't drag the chain-wide
/// parameters somewhere invalid just by being in the active set.
fn adopt_converged_parameters(
    db: &ObjectDatabase,
    active: &[WitnessId],
    params: &mut GlobalParameters,
) -> CoreResult<()> {
    let proposals: Vec<GlobalParameters> = active
        .iter()
        .filter_map(|id| ops::try_get(db, *id))
        .filter_map(|w| w.proposed_parameters.clone())
        .collect();
    if proposals.is_empty() {
        return Ok(());
    }

    let candidate = GlobalParameters {
        block_interval_secs: median_u32(proposals.iter().map(|p| p.block_interval_secs).collect()),
        maintenance_interval_secs: median_u32(proposals.iter().map(|p| p.maintenance_interval_secs).collect()),
        max_block_size: median_u32(proposals.iter().map(|p| p.max_block_size).collect()),
        max_transaction_size: median_u32(proposals.iter().map(|p| p.max_transaction_size).collect()),
        max_transaction_expiration_secs: median_u32(
            proposals.iter().map(|p| p.max_transaction_expiration_secs).collect(),
        ),
        max_undo_history: median_u32(proposals.iter().map(|p| p.max_undo_history).collect()),
        max_feed_producers: median_u16(proposals.iter().map(|p| p.max_feed_producers).collect()),
        max_market_fee_bps: median_u16(proposals.iter().map(|p| p.max_market_fee_bps).collect()),
        max_sig_check_depth: median_u8(proposals.iter().map(|p| p.max_sig_check_depth).collect()),
        genesis_proposal_review_period_secs: median_u32(
            proposals.iter().map(|p| p.genesis_proposal_review_period_secs).collect(),
        ),
        active_witness_count: median_u16(proposals.iter().map(|p| p.active_witness_count).collect()),
        active_delegate_count: median_u16(proposals.iter().map(|p| p.active_delegate_count).collect()),
    };

    if candidate.validate().is_ok() {
        *params = candidate;
    }
    Ok(())
}

fn median_u32(mut values: Vec<u32>) -> u32 {
    values.sort_unstable();
    values[values.len() / 2]
}

fn median_u16(mut values: Vec<u16>) -> u16 {
    values.sort_unstable();
    values[values.len() / 2]
}

fn median_u8(mut values: Vec<u8>) -> u8 {
    values.sort_unstable();
    values[values.len() / 2]
}

/// Splits the core asset's accumulated fees across the active witness set
/// in proportion to each witness's `pay_rate_bps`, crediting each share as
/// a freshly created, linearly-vesting balance rather than a spendable
/// balance outright.
fn pay_witnesses(db: &mut ObjectDatabase, core_asset_id: ObjectId, active: &[WitnessId], now: Timestamp) -> CoreResult<()> {
    let core_asset = ops::get(db, AssetId::from_instance(core_asset_id.instance()))?.clone();
    let dynamic_data_id = core_asset.dynamic_data_id;
    let pool = ops::get(db, dynamic_data_id)?.accumulated_fees;
    if pool <= 0 || active.is_empty() {
        return Ok(());
    }

    let witnesses: Vec<Witness> = active
        .iter()
        .filter_map(|id| ops::try_get(db, *id))
        .cloned()
        .collect();
    let total_weight: u64 = witnesses.iter().map(|w| u64::from(w.pay_rate_bps)).sum();
    if total_weight == 0 {
        return Ok(());
    }

    let mut distributed: forge_market::Amount = 0;
    for witness in &witnesses {
        let share = (pool as i128 * i64::from(witness.pay_rate_bps) as i128 / total_weight as i128) as forge_market::Amount;
        if share <= 0 {
            continue;
        }
        distributed += share;
        create_vesting_pay(db, witness.account, core_asset_id, share, now)?;
    }

    ops::modify(db, dynamic_data_id, |d: &mut DynamicAssetData| {
        d.accumulated_fees -= distributed;
    })?;
    Ok(())
}

const WITNESS_PAY_VESTING_SECS: u32 = 86_400 * 7;

fn create_vesting_pay(
    db: &mut ObjectDatabase,
    owner: forge_chain::model::AccountId,
    asset_object_id: ObjectId,
    amount: forge_market::Amount,
    now: Timestamp,
) -> CoreResult<()> {
    let asset_id = AssetId::from_instance(asset_object_id.instance());
    ops::create(db, |id: VestingBalanceId| VestingBalance {
        id,
        owner,
        asset_id,
        original_amount: amount,
        balance: amount,
        policy: forge_chain::model::operation::VestingPolicy::Linear {
            vesting_secs: WITNESS_PAY_VESTING_SECS,
        },
        created_at: now,
        coin_seconds_earned: 0,
        coin_seconds_last_update: now,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_picks_the_middle_of_an_odd_count() {
        assert_eq!(median_u32(vec![10, 30, 20]), 20);
    }

    #[test]
    fn median_picks_the_upper_of_an_even_count() {
        assert_eq!(median_u16(vec![10, 20, 30, 40]), 30);
    }

    #[test]
    fn active_witness_selection_breaks_ties_by_instance() {
        let mut db = ObjectDatabase::new();
        let account = ops::create(&mut db, |id| Account {
            id,
            name: "w".into(),
            owner: forge_auth::Authority::key_only(0, vec![]),
            active: forge_auth::Authority::key_only(0, vec![]),
            memo_key: forge_crypto::KeyPair::generate().public_key(),
            voting_key: forge_crypto::KeyPair::generate().public_key(),
            vote_targets: Vec::new(),
            referrer: ObjectId::null(),
            referrer_percent: 0,
            is_prime: false,
            total_core_in_orders: 0,
        });
        for _ in 0..3 {
            ops::create(&mut db, |id| Witness {
                id,
                account,
                signing_key: forge_crypto::KeyPair::generate().public_key(),
                next_secret_hash: [0u8; 32],
                last_secret: None,
                total_votes: 0,
                pay_rate_bps: 0,
                url: String::new(),
                blocks_produced: 0,
                blocks_missed: 0,
                proposed_parameters: None,
            });
        }
        let active = select_active_witnesses(&db, 2);
        assert_eq!(active, vec![WitnessId::new(0), WitnessId::new(1)]);
    }
}
