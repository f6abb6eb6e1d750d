//! Vesting balance creation and withdrawal.

use forge_auth::AuthClass;
use forge_core::id::InstanceId;
use forge_core::CoreResult;
use forge_db::ops;

use crate::eval::account;
use crate::eval::context::EvalContext;
use crate::model::operation::{VestingBalanceCreateOp, VestingBalanceWithdrawOp};
use crate::model::vesting::{VestingBalance, VestingBalanceId};

pub fn evaluate_vesting_balance_create(ctx: &EvalContext, op: &VestingBalanceCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.creator, AuthClass::Active)?;
    if op.amount <= 0 {
        return Err(forge_core::CoreError::Malformed("vesting deposit must be positive".into()));
    }
    ops::get(ctx.db, op.owner)?;
    Ok(())
}

pub fn apply_vesting_balance_create(
    ctx: &mut EvalContext,
    op: &VestingBalanceCreateOp,
) -> CoreResult<VestingBalanceId> {
    account::debit(ctx, op.creator, op.asset_id.into(), op.amount)?;
    Ok(ops::create(ctx.db, |id| VestingBalance {
        id,
        owner: op.owner,
        asset_id: op.asset_id,
        original_amount: op.amount,
        balance: op.amount,
        policy: op.policy,
        created_at: ctx.now,
        coin_seconds_earned: 0,
        coin_seconds_last_update: ctx.now,
    }))
}

pub fn evaluate_vesting_balance_withdraw(
    ctx: &EvalContext,
    op: &VestingBalanceWithdrawOp,
) -> CoreResult<()> {
    ctx.require_authority(op.owner, AuthClass::Active)?;
    let vesting_id: VestingBalanceId = VestingBalanceId::from_instance(op.vesting_balance.instance());
    let balance = ops::get(ctx.db, vesting_id)?;
    if balance.owner != op.owner {
        return Err(forge_core::CoreError::Unauthorized(
            "only the vesting balance's owner may withdraw from it".into(),
        ));
    }
    let mut probe = balance.clone();
    probe
        .withdraw(op.amount, ctx.now)
        .map_err(|msg| forge_core::CoreError::InvariantViolated(msg.into()))
}

pub fn apply_vesting_balance_withdraw(
    ctx: &mut EvalContext,
    op: &VestingBalanceWithdrawOp,
) -> CoreResult<()> {
    let vesting_id: VestingBalanceId = VestingBalanceId::from_instance(op.vesting_balance.instance());
    let asset_id = ops::get(ctx.db, vesting_id)?.asset_id;
    let now = ctx.now;
    ops::modify(ctx.db, vesting_id, |b| {
        b.withdraw(op.amount, now).expect("validated in evaluate_vesting_balance_withdraw");
    })?;
    account::add_to_balance(ctx, op.owner, asset_id.into(), op.amount)
}
