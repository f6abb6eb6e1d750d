//! Witness registration and maintenance. Block production itself (slot
//! assignment, secret reveal verification, the shuffle RNG) lives in
//! `forge-consensus`, which only needs read access to the `Witness` objects
//! this module creates and updates.

use forge_auth::AuthClass;
use forge_core::id::InstanceId;
use forge_core::{CoreError, CoreResult, ObjectId};
use forge_db::ops;

use crate::eval::context::EvalContext;
use crate::model::account::AccountId;
use crate::model::delegate::{Witness, WitnessId};
use crate::model::operation::{WitnessCreateOp, WitnessUpdateOp};

pub fn evaluate_witness_create(ctx: &EvalContext, op: &WitnessCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.account, AuthClass::Active)?;
    ops::get(ctx.db, op.account)?;
    if ctx
        .db
        .witnesses
        .iter()
        .any(|(_, w)| w.account == op.account)
    {
        return Err(CoreError::Duplicate(format!(
            "account {:?} already runs a witness",
            op.account
        )));
    }
    Ok(())
}

pub fn apply_witness_create(ctx: &mut EvalContext, op: &WitnessCreateOp) -> CoreResult<WitnessId> {
    Ok(ops::create(ctx.db, |id| Witness {
        id,
        account: op.account,
        signing_key: op.signing_key,
        next_secret_hash: op.initial_secret_hash,
        last_secret: None,
        total_votes: 0,
        pay_rate_bps: 0,
        url: op.url.clone(),
        blocks_produced: 0,
        blocks_missed: 0,
        proposed_parameters: None,
    }))
}

/// Resolves a [`WitnessUpdateOp`]'s witness id to its controlling account,
/// since the authority it must satisfy isn't known until the witness is
/// looked up in the database.
pub fn witness_update_signer(ctx: &EvalContext, op: &WitnessUpdateOp) -> CoreResult<AccountId> {
    let witness_id: WitnessId = WitnessId::from_instance(op.witness.instance());
    Ok(ops::get(ctx.db, witness_id)?.account)
}

pub fn evaluate_witness_update(ctx: &EvalContext, op: &WitnessUpdateOp) -> CoreResult<()> {
    let signer = witness_update_signer(ctx, op)?;
    ctx.require_authority(signer, AuthClass::Active)?;
    Ok(())
}

pub fn apply_witness_update(ctx: &mut EvalContext, op: &WitnessUpdateOp) -> CoreResult<()> {
    let witness_id: WitnessId = WitnessId::from_instance(op.witness.instance());
    ops::modify(ctx.db, witness_id, |w| {
        if let Some(key) = op.new_signing_key {
            w.signing_key = key;
        }
        if let Some(url) = &op.new_url {
            w.url = url.clone();
        }
        if op.proposed_parameters.is_some() {
            w.proposed_parameters = op.proposed_parameters.clone();
        }
    })
    .map_err(Into::into)
}

/// Converts a raw witness [`ObjectId`] (as carried in a vote target list) to
/// its typed id, for callers outside this module that only have the erased
/// form.
pub fn witness_id_from_object(object_id: ObjectId) -> WitnessId {
    WitnessId::from_instance(object_id.instance())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ObjectDatabase;
    use crate::fee::FeeSchedule;
    use crate::model::account::Account;
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

    fn make_account(db: &mut ObjectDatabase) -> AccountId {
        ops::create(db, |id| Account {
            id,
            name: "witness-operator".into(),
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
    fn create_then_update_changes_url() {
        let mut db = ObjectDatabase::new();
        let account = make_account(&mut db);
        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed);

        let create_op = WitnessCreateOp {
            account,
            signing_key: forge_crypto::KeyPair::generate().public_key(),
            initial_secret_hash: [7u8; 32],
            url: "https://example.invalid".into(),
        };
        let witness_id = apply_witness_create(&mut evalctx, &create_op).unwrap();

        let update_op = WitnessUpdateOp {
            witness: witness_id.into(),
            new_signing_key: None,
            new_url: Some("https://updated.invalid".into()),
            proposed_parameters: None,
        };
        assert_eq!(witness_update_signer(&evalctx, &update_op).unwrap(), account);
        apply_witness_update(&mut evalctx, &update_op).unwrap();
        assert_eq!(ops::get(evalctx.db, witness_id).unwrap().url, "https://updated.invalid");
    }

    #[test]
    fn duplicate_witness_registration_is_rejected() {
        let mut db = ObjectDatabase::new();
        let account = make_account(&mut db);
        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = HashSet::new();
        let mut evalctx = ctx(&mut db, &params, &fee_schedule, &signed);

        let op = WitnessCreateOp {
            account,
            signing_key: forge_crypto::KeyPair::generate().public_key(),
            initial_secret_hash: [1u8; 32],
            url: String::new(),
        };
        apply_witness_create(&mut evalctx, &op).unwrap();
        assert!(evaluate_witness_create(&evalctx, &op).is_err());
    }
}
