//! Recurring withdrawal authorizations: `withdraw_from` pre-approves
//! `authorized_account` to pull a bounded amount per period without handing
//! over a general spending authority over its balance.

use forge_auth::AuthClass;
use forge_core::id::InstanceId;
use forge_core::{CoreError, CoreResult};
use forge_db::ops;

use crate::eval::account;
use crate::eval::context::EvalContext;
use crate::model::withdraw::{WithdrawPermission, WithdrawPermissionId};
use crate::model::operation::{
    WithdrawPermissionClaimOp, WithdrawPermissionCreateOp, WithdrawPermissionDeleteOp,
};

pub fn evaluate_withdraw_permission_create(
    ctx: &EvalContext,
    op: &WithdrawPermissionCreateOp,
) -> CoreResult<()> {
    ctx.require_authority(op.withdraw_from, AuthClass::Active)?;
    if op.withdrawal_limit <= 0 {
        return Err(CoreError::Malformed("withdrawal_limit must be positive".into()));
    }
    if op.withdrawal_period_secs == 0 || op.periods_until_expiration == 0 {
        return Err(CoreError::Malformed("period and expiration count must be positive".into()));
    }
    ops::get(ctx.db, op.authorized_account)?;
    Ok(())
}

pub fn apply_withdraw_permission_create(
    ctx: &mut EvalContext,
    op: &WithdrawPermissionCreateOp,
) -> CoreResult<WithdrawPermissionId> {
    let expiration = ctx.now.saturating_add_secs(
        i64::from(op.withdrawal_period_secs) * i64::from(op.periods_until_expiration),
    );
    Ok(ops::create(ctx.db, |id| WithdrawPermission {
        id,
        withdraw_from: op.withdraw_from,
        authorized_account: op.authorized_account,
        withdrawal_limit: op.withdrawal_limit,
        withdrawal_limit_asset_id: op.withdrawal_limit_asset_id,
        withdrawal_period_secs: op.withdrawal_period_secs,
        period_start: ctx.now,
        claimed_this_period: 0,
        expiration,
    }))
}

pub fn evaluate_withdraw_permission_claim(
    ctx: &EvalContext,
    op: &WithdrawPermissionClaimOp,
) -> CoreResult<()> {
    ctx.require_authority(op.withdraw_to, AuthClass::Active)?;
    if op.amount <= 0 {
        return Err(CoreError::Malformed("claim amount must be positive".into()));
    }
    let permission_id: WithdrawPermissionId =
        WithdrawPermissionId::from_instance(op.withdraw_permission.instance());
    let permission = ops::get(ctx.db, permission_id)?;
    if permission.authorized_account != op.withdraw_to {
        return Err(CoreError::Unauthorized(
            "only the authorized account may claim this permission, and only to itself".into(),
        ));
    }
    let mut permission = permission.clone();
    let remaining = permission
        .remaining_this_period(ctx.now)
        .ok_or_else(|| CoreError::Expired {
            expiration: permission.expiration.unix_secs(),
            now: ctx.now.unix_secs(),
        })?;
    if op.amount > remaining {
        return Err(CoreError::InsufficientBalance {
            need: op.amount as u128,
            have: remaining.max(0) as u128,
        });
    }
    Ok(())
}

pub fn apply_withdraw_permission_claim(
    ctx: &mut EvalContext,
    op: &WithdrawPermissionClaimOp,
) -> CoreResult<()> {
    let permission_id: WithdrawPermissionId =
        WithdrawPermissionId::from_instance(op.withdraw_permission.instance());
    let permission = ops::get(ctx.db, permission_id)?.clone();

    account::debit(
        ctx,
        permission.withdraw_from,
        permission.withdrawal_limit_asset_id.into(),
        op.amount,
    )?;
    account::add_to_balance(
        ctx,
        op.withdraw_to,
        permission.withdrawal_limit_asset_id.into(),
        op.amount,
    )?;

    ops::modify(ctx.db, permission_id, |p| {
        p.roll_period_if_elapsed(ctx.now);
        p.claimed_this_period += op.amount;
    })
    .map_err(Into::into)
}

pub fn evaluate_withdraw_permission_delete(
    ctx: &EvalContext,
    op: &WithdrawPermissionDeleteOp,
) -> CoreResult<()> {
    ctx.require_authority(op.withdraw_from, AuthClass::Active)?;
    let permission_id: WithdrawPermissionId =
        WithdrawPermissionId::from_instance(op.withdraw_permission.instance());
    let permission = ops::get(ctx.db, permission_id)?;
    if permission.withdraw_from != op.withdraw_from {
        return Err(CoreError::Unauthorized(
            "only the granting account may revoke this permission".into(),
        ));
    }
    Ok(())
}

pub fn apply_withdraw_permission_delete(
    ctx: &mut EvalContext,
    op: &WithdrawPermissionDeleteOp,
) -> CoreResult<()> {
    let permission_id: WithdrawPermissionId =
        WithdrawPermissionId::from_instance(op.withdraw_permission.instance());
    ops::remove(ctx.db, permission_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ObjectDatabase;
    use crate::fee::FeeSchedule;
    use crate::model::account::Account;
    use crate::model::asset::AssetId;
    use forge_core::{GlobalParameters, ObjectId, Timestamp};
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

    fn make_account(db: &mut ObjectDatabase, name: &str) -> crate::model::account::AccountId {
        ops::create(db, |id| Account {
            id,
            name: name.into(),
            owner: forge_auth::Authority::key_only(0, vec![]),
            active: forge_auth::Authority::key_only(0, vec![]),
            memo_key: forge_crypto::KeyPair::generate().public_key(),
            voting_key: forge_crypto::KeyPair::generate().public_key(),
            vote_targets: Vec::new(),
            referrer: ObjectId::null(),
            referrer_percent: 0,
            is_prime: false,
            total_core_in_orders: 0,
        })
    }

    #[test]
    fn claim_moves_balance_and_tracks_period_usage() {
        let mut db = ObjectDatabase::new();
        let payer = make_account(&mut db, "payer");
        let payee = make_account(&mut db, "payee");
        let asset = AssetId::new(0);
        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let now = Timestamp::from_unix_secs(0);
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed, now);
        account::add_to_balance(&mut evalctx, payer, asset.into(), 1_000).unwrap();

        let create_op = WithdrawPermissionCreateOp {
            withdraw_from: payer,
            authorized_account: payee,
            withdrawal_limit: 100,
            withdrawal_limit_asset_id: asset,
            withdrawal_period_secs: 86_400,
            periods_until_expiration: 12,
        };
        let permission_id = apply_withdraw_permission_create(&mut evalctx, &create_op).unwrap();

        let claim_op = WithdrawPermissionClaimOp {
            withdraw_permission: permission_id.into(),
            withdraw_to: payee,
            amount: 60,
        };
        evaluate_withdraw_permission_claim(&evalctx, &claim_op).unwrap();
        apply_withdraw_permission_claim(&mut evalctx, &claim_op).unwrap();

        let payer_balance = evalctx.db.balance_object_for(payer, asset.into()).unwrap();
        assert_eq!(ops::get(evalctx.db, payer_balance).unwrap().amount, 940);
        let payee_balance = evalctx.db.balance_object_for(payee, asset.into()).unwrap();
        assert_eq!(ops::get(evalctx.db, payee_balance).unwrap().amount, 60);

        // A second claim exceeding the remaining 40 this period is rejected.
        let over_claim = WithdrawPermissionClaimOp {
            withdraw_permission: permission_id.into(),
            withdraw_to: payee,
            amount: 50,
        };
        assert!(evaluate_withdraw_permission_claim(&evalctx, &over_claim).is_err());
    }

    #[test]
    fn granter_can_revoke_a_permission() {
        let mut db = ObjectDatabase::new();
        let payer = make_account(&mut db, "payer");
        let payee = make_account(&mut db, "payee");
        let asset = AssetId::new(0);
        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let now = Timestamp::from_unix_secs(0);
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed, now);

        let create_op = WithdrawPermissionCreateOp {
            withdraw_from: payer,
            authorized_account: payee,
            withdrawal_limit: 100,
            withdrawal_limit_asset_id: asset,
            withdrawal_period_secs: 86_400,
            periods_until_expiration: 12,
        };
        let permission_id = apply_withdraw_permission_create(&mut evalctx, &create_op).unwrap();

        let delete_op = WithdrawPermissionDeleteOp {
            withdraw_permission: permission_id.into(),
            withdraw_from: payer,
        };
        evaluate_withdraw_permission_delete(&evalctx, &delete_op).unwrap();
        apply_withdraw_permission_delete(&mut evalctx, &delete_op).unwrap();

        assert!(ops::try_get::<ObjectDatabase, WithdrawPermission>(evalctx.db, permission_id).is_none());
    }
}
