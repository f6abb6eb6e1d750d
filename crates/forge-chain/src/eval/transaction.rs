//! The per-operation and per-transaction dispatch loop: matches each
//! [`Operation`] variant to its evaluate/apply pair, settles its fee, and
//! wraps the whole thing in undo sessions so a failure anywhere unwinds
//! every mutation made so far, not just the operation that failed.

use std::collections::HashSet;

use forge_core::id::InstanceId;
use forge_core::{ChainId, CoreError, CoreResult, ObjectId, Timestamp};
use forge_crypto::hash::Digest;
use forge_crypto::{CompactSignature, PublicKey};
use forge_db::ops;
use forge_market::Asset as MarketAsset;

use crate::db::ObjectDatabase;
use crate::eval::context::EvalContext;
use crate::eval::{account, asset, key, orders, proposal, vesting, withdraw, witness};
use crate::fee::FeeSchedule;
use crate::model::account::AccountId;
use crate::model::operation::Operation;

/// Runs every `evaluate_*` business-rule and authority check for `op`
/// without mutating the database.
pub fn evaluate_operation(ctx: &EvalContext, op: &Operation) -> CoreResult<()> {
    match op {
        Operation::AccountCreate(o) => account::evaluate_account_create(ctx, o),
        Operation::AccountUpdate(o) => account::evaluate_account_update(ctx, o),
        Operation::Transfer(o) => account::evaluate_transfer(ctx, o),
        Operation::AssetCreate(o) => asset::evaluate_asset_create(ctx, o),
        Operation::AssetIssue(o) => asset::evaluate_asset_issue(ctx, o),
        Operation::AssetUpdate(o) => asset::evaluate_asset_update(ctx, o),
        Operation::AssetPublishFeed(o) => asset::evaluate_asset_publish_feed(ctx, o),
        Operation::LimitOrderCreate(o) => orders::evaluate_limit_order_create(ctx, o),
        Operation::LimitOrderCancel(o) => orders::evaluate_limit_order_cancel(ctx, o),
        Operation::ShortOrderCreate(o) => orders::evaluate_short_order_create(ctx, o),
        Operation::CallOrderUpdate(o) => orders::evaluate_call_order_update(ctx, o),
        Operation::ForceSettlementCreate(o) => orders::evaluate_force_settlement_create(ctx, o),
        Operation::WitnessCreate(o) => witness::evaluate_witness_create(ctx, o),
        Operation::WitnessUpdate(o) => witness::evaluate_witness_update(ctx, o),
        Operation::ProposalCreate(o) => proposal::evaluate_proposal_create(ctx, o),
        Operation::ProposalUpdate(o) => proposal::evaluate_proposal_update(ctx, o),
        Operation::WithdrawPermissionCreate(o) => withdraw::evaluate_withdraw_permission_create(ctx, o),
        Operation::WithdrawPermissionClaim(o) => withdraw::evaluate_withdraw_permission_claim(ctx, o),
        Operation::VestingBalanceCreate(o) => vesting::evaluate_vesting_balance_create(ctx, o),
        Operation::VestingBalanceWithdraw(o) => vesting::evaluate_vesting_balance_withdraw(ctx, o),
        Operation::KeyCreate(o) => key::evaluate_key_create(ctx, o),
        Operation::ShortOrderCancel(o) => orders::evaluate_short_order_cancel(ctx, o),
        Operation::ProposalDelete(o) => proposal::evaluate_proposal_delete(ctx, o),
        Operation::WithdrawPermissionDelete(o) => withdraw::evaluate_withdraw_permission_delete(ctx, o),
        Operation::AssetFundFeePool(o) => asset::evaluate_asset_fund_fee_pool(ctx, o),
        Operation::AssetGlobalSettle(o) => asset::evaluate_asset_global_settle(ctx, o),
    }
}

/// Applies `op`'s mutation, assuming [`evaluate_operation`] has already
/// passed. Each handler returns the id of whatever it created, if anything;
/// the dispatcher only needs to know whether it succeeded.
pub fn apply_operation(ctx: &mut EvalContext, op: &Operation) -> CoreResult<()> {
    match op {
        Operation::AccountCreate(o) => account::apply_account_create(ctx, o).map(|_| ()),
        Operation::AccountUpdate(o) => account::apply_account_update(ctx, o),
        Operation::Transfer(o) => account::apply_transfer(ctx, o),
        Operation::AssetCreate(o) => asset::apply_asset_create(ctx, o).map(|_| ()),
        Operation::AssetIssue(o) => asset::apply_asset_issue(ctx, o),
        Operation::AssetUpdate(o) => asset::apply_asset_update(ctx, o),
        Operation::AssetPublishFeed(o) => asset::apply_asset_publish_feed(ctx, o),
        Operation::LimitOrderCreate(o) => orders::apply_limit_order_create(ctx, o).map(|_| ()),
        Operation::LimitOrderCancel(o) => orders::apply_limit_order_cancel(ctx, o),
        Operation::ShortOrderCreate(o) => orders::apply_short_order_create(ctx, o).map(|_| ()),
        Operation::CallOrderUpdate(o) => orders::apply_call_order_update(ctx, o),
        Operation::ForceSettlementCreate(o) => orders::apply_force_settlement_create(ctx, o).map(|_| ()),
        Operation::WitnessCreate(o) => witness::apply_witness_create(ctx, o).map(|_| ()),
        Operation::WitnessUpdate(o) => witness::apply_witness_update(ctx, o),
        Operation::ProposalCreate(o) => proposal::apply_proposal_create(ctx, o).map(|_| ()),
        Operation::ProposalUpdate(o) => proposal::apply_proposal_update(ctx, o),
        Operation::WithdrawPermissionCreate(o) => {
            withdraw::apply_withdraw_permission_create(ctx, o).map(|_| ())
        }
        Operation::WithdrawPermissionClaim(o) => withdraw::apply_withdraw_permission_claim(ctx, o),
        Operation::VestingBalanceCreate(o) => vesting::apply_vesting_balance_create(ctx, o).map(|_| ()),
        Operation::VestingBalanceWithdraw(o) => vesting::apply_vesting_balance_withdraw(ctx, o),
        Operation::KeyCreate(o) => key::apply_key_create(ctx, o).map(|_| ()),
        Operation::ShortOrderCancel(o) => orders::apply_short_order_cancel(ctx, o),
        Operation::ProposalDelete(o) => proposal::apply_proposal_delete(ctx, o),
        Operation::WithdrawPermissionDelete(o) => withdraw::apply_withdraw_permission_delete(ctx, o),
        Operation::AssetFundFeePool(o) => asset::apply_asset_fund_fee_pool(ctx, o),
        Operation::AssetGlobalSettle(o) => asset::apply_asset_global_settle(ctx, o),
    }
}

/// The account the fee-schedule bills for `op`: the same account whose
/// authority `op` requires in the common case, with `WitnessUpdate` and
/// `ProposalUpdate` resolved against the database first since their
/// placeholder id isn't meaningful on its own.
fn fee_payer(ctx: &EvalContext, op: &Operation) -> CoreResult<AccountId> {
    match op {
        Operation::WitnessUpdate(o) => witness::witness_update_signer(ctx, o),
        Operation::ProposalUpdate(o) => {
            let proposal_id = crate::model::proposal::ProposalId::from_instance(o.proposal.instance());
            Ok(ops::get(ctx.db, proposal_id)?.proposer)
        }
        _ => Ok(op.required_authority().0),
    }
}

/// Charges `op`'s fee against `payer`'s balance in `declared_fee.asset_id`,
/// converting through that asset's `core_exchange_rate` when it isn't the
/// core asset, and accruing the result onto the asset's dynamic data.
fn settle_operation_fee(ctx: &mut EvalContext, op: &Operation, declared_fee: MarketAsset) -> CoreResult<()> {
    let core_fee = ctx.fee_schedule.compute_fee(op);
    if core_fee == 0 {
        return Ok(());
    }
    let payer = fee_payer(ctx, op)?;
    let fee_asset_object_id: ObjectId = declared_fee.asset_id;
    let fee_asset = ops::get(ctx.db, fee_asset_object_id)?.clone();
    let core_exchange_rate = fee_asset.core_exchange_rate;
    let dynamic_data_id = fee_asset.dynamic_data_id;

    // Paying directly in core costs exactly `core_fee`; paying in another
    // asset costs whatever the signer declared, which `settle_fee` checks
    // converts to at least `core_fee`.
    let debit_amount = if fee_asset_object_id == ctx.core_asset_id {
        core_fee
    } else {
        declared_fee.amount
    };
    account::debit(ctx, payer, fee_asset_object_id, debit_amount)?;

    let mut dynamic_data = ops::get(ctx.db, dynamic_data_id)?.clone();
    let settlement =
        crate::fee::settle_fee(core_fee, ctx.core_asset_id, &declared_fee, &mut dynamic_data, core_exchange_rate)?;
    ops::modify(ctx.db, dynamic_data_id, |data| *data = dynamic_data)?;

    rebate_referrer(ctx, payer, fee_asset_object_id, dynamic_data_id, settlement.accrued)
}

/// Pays `payer`'s referrer its cut of a just-accrued fee, drawn back out of
/// the fee asset's `accumulated_fees`. A no-op for prime accounts, accounts
/// with no referrer, or a 0% referrer share.
fn rebate_referrer(
    ctx: &mut EvalContext,
    payer: AccountId,
    fee_asset_object_id: ObjectId,
    dynamic_data_id: crate::model::asset::DynamicAssetDataId,
    accrued: forge_market::Amount,
) -> CoreResult<()> {
    let payer_account = ops::get(ctx.db, payer)?.clone();
    if payer_account.is_prime || payer_account.referrer_percent == 0 || payer_account.referrer.is_null() {
        return Ok(());
    }
    let rebate =
        (i128::from(accrued) * i128::from(payer_account.referrer_percent) / 100) as forge_market::Amount;
    if rebate <= 0 {
        return Ok(());
    }
    let referrer: AccountId = AccountId::from_instance(payer_account.referrer.instance());
    ops::modify(ctx.db, dynamic_data_id, |d| d.accumulated_fees -= rebate)?;
    account::add_to_balance(ctx, referrer, fee_asset_object_id, rebate)
}

/// One operation plus the asset/amount its author offered to pay the fee
/// in; `forge_market::Asset`'s `asset_id` names the fee asset and `amount`
/// is the declared (non-core) amount, matching the convention
/// `fee::settle_fee` expects.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransactionEntry {
    pub operation: Operation,
    pub declared_fee: MarketAsset,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub expiration: Timestamp,
    pub entries: Vec<TransactionEntry>,
}

/// One signer's compact signature over a transaction's digest. Carrying the
/// signer's key alongside the signature (rather than recovering it from the
/// signature itself) keeps verification a plain lookup-and-check against
/// whatever authority a transaction's operations actually require.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TransactionSignature {
    pub signer: PublicKey,
    pub signature: CompactSignature,
}

/// A [`Transaction`] plus the signatures its author attached, in the
/// wire-level shape a node receives: `(expiration, operations[],
/// signatures[])`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<TransactionSignature>,
}

/// Computes the digest a transaction's signatures are taken over: the chain
/// id followed by the canonical serialization of every field except
/// signatures, so a transaction signed for one chain can never be replayed
/// on another.
pub fn transaction_digest(chain_id: ChainId, tx: &Transaction) -> CoreResult<Digest> {
    let body =
        bincode::serialize(tx).map_err(|e| CoreError::Serialization(e.to_string()))?;
    Ok(forge_crypto::hash::hash_many(&[chain_id.as_bytes(), &body]))
}

/// Verifies every attached signature against `tx`'s digest and returns the
/// set of public keys that signed it. A signature that doesn't verify is a
/// malformed transaction, not a silently-dropped one: a forged or corrupted
/// signature must fail the whole transaction, not just withhold its signer
/// from the authority set.
pub fn verify_transaction_signatures(
    chain_id: ChainId,
    signed_tx: &SignedTransaction,
) -> CoreResult<HashSet<PublicKey>> {
    let digest = transaction_digest(chain_id, &signed_tx.transaction)?;
    let mut signed = HashSet::with_capacity(signed_tx.signatures.len());
    for entry in &signed_tx.signatures {
        entry
            .signer
            .verify(&digest, &entry.signature)
            .map_err(|_| CoreError::Malformed(format!("invalid signature from {:?}", entry.signer)))?;
        signed.insert(entry.signer);
    }
    Ok(signed)
}

/// Evaluates, settles the fee for, and applies every entry in `tx` inside
/// one outer undo session: any failure rolls the whole transaction back,
/// not just the entry that failed.
pub fn apply_transaction(
    db: &mut ObjectDatabase,
    now: Timestamp,
    core_asset_id: ObjectId,
    params: &forge_core::GlobalParameters,
    fee_schedule: &FeeSchedule,
    signed: &HashSet<PublicKey>,
    tx: &Transaction,
) -> CoreResult<()> {
    if tx.expiration.unix_secs() <= now.unix_secs() {
        return Err(CoreError::Expired {
            expiration: tx.expiration.unix_secs(),
            now: now.unix_secs(),
        });
    }
    if tx.entries.is_empty() {
        return Err(CoreError::Malformed("a transaction must contain at least one operation".into()));
    }

    let mut session = db.begin_session();
    let result = (|| -> CoreResult<()> {
        for entry in &tx.entries {
            let mut ctx = EvalContext {
                db: session.db_mut(),
                now,
                core_asset_id,
                params,
                fee_schedule,
                signed,
            };
            evaluate_operation(&ctx, &entry.operation)?;
            settle_operation_fee(&mut ctx, &entry.operation, entry.declared_fee)?;
            apply_operation(&mut ctx, &entry.operation)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::Account;
    use crate::model::asset::{Asset, AssetId, AssetPermissions, DynamicAssetData};
    use forge_market::Price;
    use std::collections::HashSet as Set;

    fn make_account(db: &mut ObjectDatabase, name: &str) -> AccountId {
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

    /// Creates the core asset itself, which is the first `Asset` object
    /// registered so it lands at instance 0, matching `AssetId::new(0)`.
    fn make_core_asset(db: &mut ObjectDatabase, issuer: AccountId) -> AssetId {
        let dynamic_data_id = ops::create(db, |id| DynamicAssetData {
            id,
            current_supply: 0,
            accumulated_fees: 0,
            fee_pool: 0,
        });
        ops::create(db, |id| Asset {
            id,
            symbol: "CORE".into(),
            issuer,
            max_supply: 1_000_000_000,
            precision: 4,
            permissions: AssetPermissions::empty(),
            flags: AssetPermissions::empty(),
            core_exchange_rate: Price::new(
                MarketAsset::new(1, ObjectId::new(1, 3, 0)),
                MarketAsset::new(1, ObjectId::new(1, 3, 0)),
            ),
            short_backing_asset: None,
            dynamic_data_id,
            bitasset_data_id: None,
            market_fee_bps: 0,
        })
    }

    #[test]
    fn a_failing_operation_rolls_back_every_prior_mutation_in_the_transaction() {
        let mut db = ObjectDatabase::new();
        let alice = make_account(&mut db, "alice");
        let bob = make_account(&mut db, "bob");
        let core = make_core_asset(&mut db, alice);

        let params = forge_core::GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = Set::new();
        let now = Timestamp::from_unix_secs(0);

        // Fund alice directly (outside any session) so the transfer below
        // has something to move.
        {
            let mut ctx = EvalContext {
                db: &mut db,
                now,
                core_asset_id: core.into(),
                params: &params,
                fee_schedule: &fee_schedule,
                signed: &signed,
            };
            account::add_to_balance(&mut ctx, alice, core.into(), 10_000).unwrap();
        }

        let good_transfer = Operation::Transfer(crate::model::operation::TransferOp {
            from: alice,
            to: bob,
            amount: 1_000,
            asset_id: core,
            memo: None,
        });
        // Second transfer asks for more than alice has left, so it fails.
        let bad_transfer = Operation::Transfer(crate::model::operation::TransferOp {
            from: alice,
            to: bob,
            amount: 50_000,
            asset_id: core,
            memo: None,
        });

        let tx = Transaction {
            expiration: Timestamp::from_unix_secs(1_000_000),
            entries: vec![
                TransactionEntry {
                    operation: good_transfer,
                    declared_fee: MarketAsset::new(0, core.into()),
                },
                TransactionEntry {
                    operation: bad_transfer,
                    declared_fee: MarketAsset::new(0, core.into()),
                },
            ],
        };

        let result = apply_transaction(&mut db, now, core.into(), &params, &fee_schedule, &signed, &tx);
        assert!(result.is_err());

        let alice_balance = db.balance_object_for(alice, core.into()).unwrap();
        assert_eq!(ops::get(&db, alice_balance).unwrap().amount, 10_000);
        assert!(db.balance_object_for(bob, core.into()).is_none());
    }

    #[test]
    fn verifies_signature_over_chain_id_and_transaction_body() {
        let chain_id = forge_core::ChainId::from_bytes([7u8; 32]);
        let kp = forge_crypto::KeyPair::generate();
        let tx = Transaction {
            expiration: Timestamp::from_unix_secs(1_000_000),
            entries: vec![],
        };
        let digest = transaction_digest(chain_id, &tx).unwrap();
        let signed_tx = SignedTransaction {
            transaction: tx,
            signatures: vec![TransactionSignature {
                signer: kp.public_key(),
                signature: kp.sign(&digest),
            }],
        };

        let signed = verify_transaction_signatures(chain_id, &signed_tx).unwrap();
        assert!(signed.contains(&kp.public_key()));

        let other_chain = forge_core::ChainId::from_bytes([9u8; 32]);
        assert!(verify_transaction_signatures(other_chain, &signed_tx).is_err());
    }

    #[test]
    fn referrer_receives_its_percentage_of_the_payer_fee() {
        let mut db = ObjectDatabase::new();
        let alice = make_account(&mut db, "alice");
        let referrer = make_account(&mut db, "referrer");
        ops::modify(&mut db, alice, |a| {
            a.referrer = referrer.into();
            a.referrer_percent = 50;
        })
        .unwrap();
        let core = make_core_asset(&mut db, alice);

        let params = forge_core::GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let signed = Set::new();
        let now = Timestamp::from_unix_secs(0);

        {
            let mut ctx = EvalContext {
                db: &mut db,
                now,
                core_asset_id: core.into(),
                params: &params,
                fee_schedule: &fee_schedule,
                signed: &signed,
            };
            account::add_to_balance(&mut ctx, alice, core.into(), 10_000).unwrap();
        }

        let transfer = Operation::Transfer(crate::model::operation::TransferOp {
            from: alice,
            to: referrer,
            amount: 0,
            asset_id: core,
            memo: None,
        });
        let tx = Transaction {
            expiration: Timestamp::from_unix_secs(1_000_000),
            entries: vec![TransactionEntry {
                operation: transfer,
                declared_fee: MarketAsset::new(0, core.into()),
            }],
        };
        apply_transaction(&mut db, now, core.into(), &params, &fee_schedule, &signed, &tx).unwrap();

        let referrer_balance = db.balance_object_for(referrer, core.into()).unwrap();
        // Transfer costs 200 core; half of that goes to the referrer.
        assert_eq!(ops::get(&db, referrer_balance).unwrap().amount, 100);
    }
}
