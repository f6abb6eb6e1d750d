//! Account lifecycle and balance transfers.

use forge_auth::AuthClass;
use forge_core::id::InstanceId;
use forge_core::{CoreError, CoreResult, ObjectId};
use forge_db::ops;
use forge_market::Amount;

use crate::eval::context::EvalContext;
use crate::model::account::{Account, AccountBalance, AccountBalanceId, AccountId};
use crate::model::operation::{AccountCreateOp, AccountUpdateOp, TransferOp};

/// Finds or lazily creates the `AccountBalance` object for `(owner,
/// asset_id)`. Every account implicitly holds a zero balance in every
/// asset; the object is only materialized the first time it's touched.
pub fn balance_id(ctx: &mut EvalContext, owner: AccountId, asset_id: ObjectId) -> AccountBalanceId {
    if let Some(existing) = ctx.db.balance_object_for(owner, asset_id) {
        return AccountBalanceId::from_instance(existing.instance());
    }
    let id = ops::create(ctx.db, |id| AccountBalance {
        id,
        owner,
        asset_id,
        amount: 0,
    });
    ctx.db.register_balance(owner, asset_id, id.into());
    id
}

/// The `balance_id`/`credit_balance` pair a consensus-layer end-of-block
/// hook uses to refund an expired order or settlement directly against the
/// database, without needing a whole [`EvalContext`] (no fee schedule or
/// signer set applies to a refund the protocol itself initiates).
pub fn balance_id_on_db(
    db: &mut crate::db::ObjectDatabase,
    owner: AccountId,
    asset_id: ObjectId,
) -> AccountBalanceId {
    if let Some(existing) = db.balance_object_for(owner, asset_id) {
        return AccountBalanceId::from_instance(existing.instance());
    }
    let id = ops::create(db, |id| AccountBalance {
        id,
        owner,
        asset_id,
        amount: 0,
    });
    db.register_balance(owner, asset_id, id.into());
    id
}

pub fn credit_balance(
    db: &mut crate::db::ObjectDatabase,
    owner: AccountId,
    asset_id: ObjectId,
    delta: Amount,
) -> CoreResult<()> {
    let id = balance_id_on_db(db, owner, asset_id);
    ops::modify(db, id, |b| b.amount += delta).map_err(Into::into)
}

pub(crate) fn add_to_balance(ctx: &mut EvalContext, owner: AccountId, asset_id: ObjectId, delta: Amount) -> CoreResult<()> {
    let id = balance_id(ctx, owner, asset_id);
    ops::modify(ctx.db, id, |b| b.amount += delta).map_err(Into::into)
}

pub(crate) fn debit(ctx: &mut EvalContext, owner: AccountId, asset_id: ObjectId, amount: Amount) -> CoreResult<()> {
    let id = balance_id(ctx, owner, asset_id);
    let current = ops::get(ctx.db, id)?.amount;
    if current < amount {
        return Err(CoreError::InsufficientBalance {
            need: amount as u128,
            have: current.max(0) as u128,
        });
    }
    ops::modify(ctx.db, id, |b| b.amount -= amount).map_err(Into::into)
}

pub fn evaluate_account_create(ctx: &EvalContext, op: &AccountCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.registrar, AuthClass::Active)?;
    if !crate::model::account::is_valid_account_name(&op.name) {
        return Err(CoreError::Malformed(format!("invalid account name {}", op.name)));
    }
    if ctx.db.account_by_name(&op.name).is_some() {
        return Err(CoreError::Duplicate(format!("account name {} already registered", op.name)));
    }
    if op.owner.is_impossible() || op.active.is_impossible() {
        return Err(CoreError::Malformed("authority threshold unreachable".into()));
    }
    if op.referrer_percent > 100 {
        return Err(CoreError::Malformed("referrer percent must be at most 100".into()));
    }
    Ok(())
}

pub fn apply_account_create(ctx: &mut EvalContext, op: &AccountCreateOp) -> CoreResult<AccountId> {
    let self_referred = op.referrer == op.registrar;
    let id = ops::create(ctx.db, |id| Account {
        id,
        name: op.name.clone(),
        owner: op.owner.clone(),
        active: op.active.clone(),
        memo_key: op.memo_key,
        voting_key: op.voting_key,
        vote_targets: Vec::new(),
        referrer: op.referrer.into(),
        referrer_percent: if self_referred { 0 } else { op.referrer_percent },
        is_prime: false,
        total_core_in_orders: 0,
    });
    ctx.db.register_account_name(op.name.clone(), id);
    Ok(id)
}

pub fn evaluate_account_update(ctx: &EvalContext, op: &AccountUpdateOp) -> CoreResult<()> {
    let class = if op.owner.is_some() { AuthClass::Owner } else { AuthClass::Active };
    ctx.require_authority(op.account, class)?;
    if let Some(owner) = &op.owner {
        if owner.is_impossible() {
            return Err(CoreError::Malformed("owner authority threshold unreachable".into()));
        }
    }
    if let Some(active) = &op.active {
        if active.is_impossible() {
            return Err(CoreError::Malformed("active authority threshold unreachable".into()));
        }
    }
    Ok(())
}

pub fn apply_account_update(ctx: &mut EvalContext, op: &AccountUpdateOp) -> CoreResult<()> {
    ops::modify(ctx.db, op.account, |a| {
        if let Some(owner) = &op.owner {
            a.owner = owner.clone();
        }
        if let Some(active) = &op.active {
            a.active = active.clone();
        }
        if let Some(memo_key) = op.memo_key {
            a.memo_key = memo_key;
        }
        if let Some(targets) = &op.vote_targets {
            a.vote_targets = targets.clone();
        }
    })
    .map_err(Into::into)
}

pub fn evaluate_transfer(ctx: &EvalContext, op: &TransferOp) -> CoreResult<()> {
    ctx.require_authority(op.from, AuthClass::Active)?;
    if op.amount <= 0 {
        return Err(CoreError::Malformed("transfer amount must be positive".into()));
    }
    ops::get(ctx.db, op.to)?;
    Ok(())
}

pub fn apply_transfer(ctx: &mut EvalContext, op: &TransferOp) -> CoreResult<()> {
    debit(ctx, op.from, op.asset_id.into(), op.amount)?;
    add_to_balance(ctx, op.to, op.asset_id.into(), op.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ObjectDatabase;
    use crate::fee::FeeSchedule;
    use forge_core::{GlobalParameters, Timestamp};
    use std::collections::HashSet;

    fn ctx<'a>(
        db: &'a mut ObjectDatabase,
        params: &'a GlobalParameters,
        fee_schedule: &'a FeeSchedule,
        signed: &'a HashSet<forge_crypto::PublicKey>,
    ) -> EvalContext<'a> {
        EvalContext {
            db,
            now: Timestamp::from_unix_secs(0),
            core_asset_id: ObjectId::new(1, 3, 0),
            params,
            fee_schedule,
            signed,
        }
    }

    #[test]
    fn transfer_moves_balance_between_accounts() {
        let mut db = ObjectDatabase::new();
        let asset = ObjectId::new(1, 3, 0);
        let alice = ops::create(&mut db, |id| Account {
            id,
            name: "alice".into(),
            owner: forge_auth::Authority::key_only(0, vec![]),
            active: forge_auth::Authority::key_only(0, vec![]),
            memo_key: forge_crypto::KeyPair::generate().public_key(),
            voting_key: forge_crypto::KeyPair::generate().public_key(),
            vote_targets: Vec::new(),
            referrer: ObjectId::null(),
            is_prime: false,
            total_core_in_orders: 0,
        });
        let bob = ops::create(&mut db, |id| Account {
            id,
            name: "bob".into(),
            owner: forge_auth::Authority::key_only(0, vec![]),
            active: forge_auth::Authority::key_only(0, vec![]),
            memo_key: forge_crypto::KeyPair::generate().public_key(),
            voting_key: forge_crypto::KeyPair::generate().public_key(),
            vote_targets: Vec::new(),
            referrer: ObjectId::null(),
            is_prime: false,
            total_core_in_orders: 0,
        });
        let alice_balance = balance_id(
            &mut ctx(&mut db, &GlobalParameters::default(), &FeeSchedule::with_defaults(), &HashSet::new()),
            alice,
            asset,
        );
        ops::modify(&mut db, alice_balance, |b| b.amount = 1_000).unwrap();

        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed);
        let op = TransferOp { from: alice, to: bob, amount: 300, asset_id: asset.into(), memo: None };
        apply_transfer(&mut evalctx, &op).unwrap();

        assert_eq!(ops::get(&db, alice_balance).unwrap().amount, 700);
        let bob_balance = db.balance_object_for(bob, asset).unwrap();
        let bob_balance: AccountBalanceId = AccountBalanceId::from_instance(bob_balance.instance());
        assert_eq!(ops::get(&db, bob_balance).unwrap().amount, 300);
    }

    #[test]
    fn debit_rejects_insufficient_balance() {
        let mut db = ObjectDatabase::new();
        let asset = ObjectId::new(1, 3, 0);
        let alice = AccountId::new(0);
        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed);
        assert!(debit(&mut evalctx, alice, asset, 10).is_err());
    }
}
