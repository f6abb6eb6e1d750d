//! Deferred, multi-signature execution. `ProposalCreate` records the set of
//! accounts whose approval is still outstanding (derived from each wrapped
//! operation's own authority requirement); `ProposalUpdate` adds or removes
//! approvals and, once the proposal is fully approved and past any review
//! period, executes every wrapped operation in order as a side effect of the
//! same update.

use std::collections::BTreeSet;

use forge_auth::AuthClass;
use forge_core::id::InstanceId;
use forge_core::{CoreError, CoreResult, ObjectId};
use forge_db::ops;

use crate::eval::context::EvalContext;
use crate::model::proposal::{Proposal, ProposalId};
use crate::model::operation::{Operation, ProposalCreateOp, ProposalDeleteOp, ProposalUpdateOp};

pub fn evaluate_proposal_create(ctx: &EvalContext, op: &ProposalCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.proposer, AuthClass::Active)?;
    if op.proposed_ops.is_empty() {
        return Err(CoreError::Malformed("a proposal must wrap at least one operation".into()));
    }
    if op.expiration.unix_secs() <= ctx.now.unix_secs() {
        return Err(CoreError::Expired {
            expiration: op.expiration.unix_secs(),
            now: ctx.now.unix_secs(),
        });
    }
    Ok(())
}

pub fn apply_proposal_create(ctx: &mut EvalContext, op: &ProposalCreateOp) -> CoreResult<ProposalId> {
    let mut required_active = BTreeSet::new();
    let mut required_owner = BTreeSet::new();
    for wrapped in &op.proposed_ops {
        let (account, class) = wrapped.required_authority();
        match class {
            AuthClass::Active => {
                required_active.insert(account);
            }
            AuthClass::Owner => {
                required_owner.insert(account);
            }
        }
    }
    let review_period_deadline = op
        .review_period_secs
        .map(|secs| ctx.now.saturating_add_secs(i64::from(secs)));

    Ok(ops::create(ctx.db, |id| Proposal {
        id,
        proposer: op.proposer,
        proposed_ops: op.proposed_ops.clone(),
        expiration: op.expiration,
        review_period_deadline,
        required_active_approvals: required_active,
        required_owner_approvals: required_owner,
        available_active_approvals: BTreeSet::new(),
        available_owner_approvals: BTreeSet::new(),
    }))
}

pub fn evaluate_proposal_update(ctx: &EvalContext, op: &ProposalUpdateOp) -> CoreResult<()> {
    let proposal_id: ProposalId = ProposalId::from_instance(op.proposal.instance());
    let proposal = ops::get(ctx.db, proposal_id)?;
    if proposal.is_expired(ctx.now) {
        return Err(CoreError::Expired {
            expiration: proposal.expiration.unix_secs(),
            now: ctx.now.unix_secs(),
        });
    }
    // Every account named in this update must itself have signed, whether
    // it's adding or withdrawing its own approval.
    for account in op
        .active_approvals_to_add
        .iter()
        .chain(op.active_approvals_to_remove.iter())
    {
        ctx.require_authority(*account, AuthClass::Active)?;
    }
    for account in op
        .owner_approvals_to_add
        .iter()
        .chain(op.owner_approvals_to_remove.iter())
    {
        ctx.require_authority(*account, AuthClass::Owner)?;
    }
    Ok(())
}

/// Applies the approval changes, then executes every wrapped operation in
/// order if the proposal is now fully approved and past its review period.
/// A failure partway through a wrapped operation propagates up so the
/// enclosing transaction's undo session rolls back the whole update,
/// including the approval changes that triggered it.
pub fn apply_proposal_update(ctx: &mut EvalContext, op: &ProposalUpdateOp) -> CoreResult<()> {
    let proposal_id: ProposalId = ProposalId::from_instance(op.proposal.instance());
    ops::modify(ctx.db, proposal_id, |p| {
        for account in &op.active_approvals_to_add {
            p.add_active_approval(*account);
        }
        for account in &op.active_approvals_to_remove {
            p.remove_active_approval(*account);
        }
        for account in &op.owner_approvals_to_add {
            p.add_owner_approval(*account);
        }
        for account in &op.owner_approvals_to_remove {
            p.remove_owner_approval(*account);
        }
    })?;

    let proposal = ops::get(ctx.db, proposal_id)?;
    if !proposal.is_ready_to_execute(ctx.now) {
        return Ok(());
    }
    let wrapped_ops = proposal.proposed_ops.clone();

    // The wrapped operations' own authority requirements were already
    // satisfied off-band by the approval bookkeeping above, not by whoever
    // signed this particular `ProposalUpdate`. Reconstruct a signed-key set
    // from every approving account's own authority so each wrapped
    // operation's `evaluate_*` (which re-checks authority itself) passes
    // exactly when that account's approval was in fact required and given.
    let mut approved_keys = std::collections::HashSet::new();
    for account in proposal
        .available_active_approvals
        .iter()
        .chain(proposal.available_owner_approvals.iter())
    {
        if let Ok(acct) = ops::get(ctx.db, *account) {
            approved_keys.extend(acct.active.key_auths.iter().map(|(k, _)| *k));
            approved_keys.extend(acct.owner.key_auths.iter().map(|(k, _)| *k));
        }
    }

    let mut inner = EvalContext {
        db: &mut *ctx.db,
        now: ctx.now,
        core_asset_id: ctx.core_asset_id,
        params: ctx.params,
        fee_schedule: ctx.fee_schedule,
        signed: &approved_keys,
    };
    for wrapped in &wrapped_ops {
        crate::eval::transaction::evaluate_operation(&inner, wrapped)?;
        crate::eval::transaction::apply_operation(&mut inner, wrapped)?;
    }
    ops::remove(ctx.db, proposal_id)?;
    Ok(())
}

/// Lets the proposer withdraw a proposal before it executes — the only way
/// to clear one that expires without ever collecting its full approval set,
/// since an unapproved proposal just sits past `expiration` otherwise.
pub fn evaluate_proposal_delete(ctx: &EvalContext, op: &ProposalDeleteOp) -> CoreResult<()> {
    ctx.require_authority(op.proposal_author, AuthClass::Active)?;
    let proposal_id: ProposalId = ProposalId::from_instance(op.proposal.instance());
    let proposal = ops::get(ctx.db, proposal_id)?;
    if proposal.proposer != op.proposal_author {
        return Err(CoreError::Unauthorized("only the proposer may delete a proposal".into()));
    }
    Ok(())
}

pub fn apply_proposal_delete(ctx: &mut EvalContext, op: &ProposalDeleteOp) -> CoreResult<()> {
    let proposal_id: ProposalId = ProposalId::from_instance(op.proposal.instance());
    ops::remove(ctx.db, proposal_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ObjectDatabase;
    use crate::fee::FeeSchedule;
    use crate::model::account::{Account, AccountId};
    use forge_core::{GlobalParameters, Timestamp};
    use std::collections::HashSet;

    fn ctx<'a>(
        db: &'a mut ObjectDatabase,
        params: &'a GlobalParameters,
        fee_schedule: &'a FeeSchedule,
        signed: &'a HashSet<forge_crypto::PublicKey>,
        now: Timestamp,
    ) -> EvalContext<'a> {
        EvalContext {
            db,
            now,
            core_asset_id: ObjectId::new(1, 3, 0),
            params,
            fee_schedule,
            signed,
        }
    }

    fn make_account(db: &mut ObjectDatabase, name: &str, key: forge_crypto::PublicKey) -> AccountId {
        ops::create(db, |id| Account {
            id,
            name: name.into(),
            owner: forge_auth::Authority::key_only(1, vec![(key, 1)]),
            active: forge_auth::Authority::key_only(1, vec![(key, 1)]),
            memo_key: key,
            voting_key: key,
            vote_targets: Vec::new(),
            referrer: ObjectId::null(),
            referrer_percent: 0,
            is_prime: false,
            total_core_in_orders: 0,
        })
    }

    #[test]
    fn proposal_executes_once_every_signer_approves() {
        let mut db = ObjectDatabase::new();
        let key_a = forge_crypto::KeyPair::generate().public_key();
        let key_b = forge_crypto::KeyPair::generate().public_key();
        let alice = make_account(&mut db, "alice", key_a);
        let bob = make_account(&mut db, "bob", key_b);

        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let now = Timestamp::from_unix_secs(0);

        let create_op = ProposalCreateOp {
            proposer: alice,
            expiration: Timestamp::from_unix_secs(1_000_000),
            review_period_secs: None,
            proposed_ops: vec![Operation::AccountUpdate(crate::model::operation::AccountUpdateOp {
                account: bob,
                owner: None,
                active: None,
                memo_key: None,
                vote_targets: Some(vec![]),
            })],
        };
        let proposal_id = {
            let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed, now);
            apply_proposal_create(&mut evalctx, &create_op).unwrap()
        };

        let required = ops::get(&db, proposal_id).unwrap().required_active_approvals.clone();
        assert!(required.contains(&bob));

        let mut signed_bob = HashSet::new();
        signed_bob.insert(key_b);
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed_bob, now);
        let update_op = ProposalUpdateOp {
            proposal: proposal_id.into(),
            active_approvals_to_add: vec![bob],
            active_approvals_to_remove: vec![],
            owner_approvals_to_add: vec![],
            owner_approvals_to_remove: vec![],
        };
        apply_proposal_update(&mut evalctx, &update_op).unwrap();

        // Fully approved and executed: the proposal object is gone and
        // bob's vote targets were cleared by the wrapped operation.
        assert!(ops::try_get::<ObjectDatabase, Proposal>(&db, proposal_id).is_none());
        assert!(ops::get(&db, bob).unwrap().vote_targets.is_empty());
    }

    #[test]
    fn proposer_can_delete_an_unapproved_proposal() {
        let mut db = ObjectDatabase::new();
        let key_a = forge_crypto::KeyPair::generate().public_key();
        let alice = make_account(&mut db, "alice", key_a);
        let bob = make_account(&mut db, "bob", forge_crypto::KeyPair::generate().public_key());

        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let now = Timestamp::from_unix_secs(0);

        let create_op = ProposalCreateOp {
            proposer: alice,
            expiration: Timestamp::from_unix_secs(1_000_000),
            review_period_secs: None,
            proposed_ops: vec![Operation::AccountUpdate(crate::model::operation::AccountUpdateOp {
                account: bob,
                owner: None,
                active: None,
                memo_key: None,
                vote_targets: Some(vec![]),
            })],
        };
        let proposal_id = {
            let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed, now);
            apply_proposal_create(&mut evalctx, &create_op).unwrap()
        };

        let delete_op = ProposalDeleteOp { proposal: proposal_id.into(), proposal_author: alice };
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed, now);
        evaluate_proposal_delete(&evalctx, &delete_op).unwrap();
        apply_proposal_delete(&mut evalctx, &delete_op).unwrap();

        assert!(ops::try_get::<ObjectDatabase, Proposal>(&db, proposal_id).is_none());
    }
}
