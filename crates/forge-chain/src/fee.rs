//! Fee schedule and non-core fee exchange.
//!
//! Every operation carries a core-asset fee computed from a fixed
//! per-operation-kind table plus a per-byte rate for variable-length fields
//! (currently only the transfer memo). When the payer settles the fee in a
//! non-core asset, the converted core amount comes out of that asset's
//! `fee_pool` and the declared non-core amount accrues to its
//! `accumulated_fees`; the conversion and both ledger updates happen
//! together so a failed conversion never leaves the pool or the accrual
//! half-applied.

use std::collections::HashMap;

use forge_core::CoreError;
use forge_market::{Amount, Asset as MarketAsset, Price};

use crate::model::asset::DynamicAssetData;
use crate::model::operation::{Operation, TransferOp};

/// Discriminant used to key the fee table — one entry per `Operation`
/// variant, independent of the operation's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    AccountCreate,
    AccountUpdate,
    Transfer,
    AssetCreate,
    AssetIssue,
    AssetUpdate,
    AssetPublishFeed,
    LimitOrderCreate,
    LimitOrderCancel,
    ShortOrderCreate,
    CallOrderUpdate,
    ForceSettlementCreate,
    WitnessCreate,
    WitnessUpdate,
    ProposalCreate,
    ProposalUpdate,
    WithdrawPermissionCreate,
    WithdrawPermissionClaim,
    VestingBalanceCreate,
    VestingBalanceWithdraw,
    KeyCreate,
    ShortOrderCancel,
    ProposalDelete,
    WithdrawPermissionDelete,
    AssetFundFeePool,
    AssetGlobalSettle,
}

impl From<&Operation> for OperationKind {
    fn from(op: &Operation) -> Self {
        match op {
            Operation::AccountCreate(_) => OperationKind::AccountCreate,
            Operation::AccountUpdate(_) => OperationKind::AccountUpdate,
            Operation::Transfer(_) => OperationKind::Transfer,
            Operation::AssetCreate(_) => OperationKind::AssetCreate,
            Operation::AssetIssue(_) => OperationKind::AssetIssue,
            Operation::AssetUpdate(_) => OperationKind::AssetUpdate,
            Operation::AssetPublishFeed(_) => OperationKind::AssetPublishFeed,
            Operation::LimitOrderCreate(_) => OperationKind::LimitOrderCreate,
            Operation::LimitOrderCancel(_) => OperationKind::LimitOrderCancel,
            Operation::ShortOrderCreate(_) => OperationKind::ShortOrderCreate,
            Operation::CallOrderUpdate(_) => OperationKind::CallOrderUpdate,
            Operation::ForceSettlementCreate(_) => OperationKind::ForceSettlementCreate,
            Operation::WitnessCreate(_) => OperationKind::WitnessCreate,
            Operation::WitnessUpdate(_) => OperationKind::WitnessUpdate,
            Operation::ProposalCreate(_) => OperationKind::ProposalCreate,
            Operation::ProposalUpdate(_) => OperationKind::ProposalUpdate,
            Operation::WithdrawPermissionCreate(_) => OperationKind::WithdrawPermissionCreate,
            Operation::WithdrawPermissionClaim(_) => OperationKind::WithdrawPermissionClaim,
            Operation::VestingBalanceCreate(_) => OperationKind::VestingBalanceCreate,
            Operation::VestingBalanceWithdraw(_) => OperationKind::VestingBalanceWithdraw,
            Operation::KeyCreate(_) => OperationKind::KeyCreate,
            Operation::ShortOrderCancel(_) => OperationKind::ShortOrderCancel,
            Operation::ProposalDelete(_) => OperationKind::ProposalDelete,
            Operation::WithdrawPermissionDelete(_) => OperationKind::WithdrawPermissionDelete,
            Operation::AssetFundFeePool(_) => OperationKind::AssetFundFeePool,
            Operation::AssetGlobalSettle(_) => OperationKind::AssetGlobalSettle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeeSchedule {
    base_fees: HashMap<OperationKind, Amount>,
    /// Core-asset fee charged per byte of variable-length payload (memo).
    pub data_byte_fee: Amount,
}

impl FeeSchedule {
    /// A schedule with plausible flat fees for every operation kind, scaled
    /// so account/asset creation (which consumes scarce namespace) costs
    /// more than routine transfers and order placement.
    pub fn with_defaults() -> Self {
        use OperationKind::*;
        let mut base_fees = HashMap::new();
        base_fees.insert(AccountCreate, 5_000);
        base_fees.insert(AccountUpdate, 2_000);
        base_fees.insert(Transfer, 200);
        base_fees.insert(AssetCreate, 50_000);
        base_fees.insert(AssetIssue, 500);
        base_fees.insert(AssetUpdate, 2_000);
        base_fees.insert(AssetPublishFeed, 100);
        base_fees.insert(LimitOrderCreate, 200);
        base_fees.insert(LimitOrderCancel, 100);
        base_fees.insert(ShortOrderCreate, 200);
        base_fees.insert(CallOrderUpdate, 200);
        base_fees.insert(ForceSettlementCreate, 200);
        base_fees.insert(WitnessCreate, 10_000);
        base_fees.insert(WitnessUpdate, 2_000);
        base_fees.insert(ProposalCreate, 2_000);
        base_fees.insert(ProposalUpdate, 500);
        base_fees.insert(WithdrawPermissionCreate, 2_000);
        base_fees.insert(WithdrawPermissionClaim, 200);
        base_fees.insert(VestingBalanceCreate, 2_000);
        base_fees.insert(VestingBalanceWithdraw, 200);
        base_fees.insert(KeyCreate, 200);
        base_fees.insert(ShortOrderCancel, 100);
        base_fees.insert(ProposalDelete, 100);
        base_fees.insert(WithdrawPermissionDelete, 100);
        base_fees.insert(AssetFundFeePool, 100);
        base_fees.insert(AssetGlobalSettle, 2_000);
        FeeSchedule {
            base_fees,
            data_byte_fee: 10,
        }
    }

    pub fn base_fee(&self, kind: OperationKind) -> Amount {
        self.base_fees.get(&kind).copied().unwrap_or(0)
    }

    /// The core-asset fee for `op`, including the variable-length surcharge
    /// on any payload it carries (currently only the transfer memo).
    pub fn compute_fee(&self, op: &Operation) -> Amount {
        let base = self.base_fee(OperationKind::from(op));
        let variable = match op {
            Operation::Transfer(TransferOp { memo: Some(bytes), .. }) => {
                bytes.len() as Amount * self.data_byte_fee
            }
            _ => 0,
        };
        base + variable
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The result of settling a fee: how much was drawn from the paying asset's
/// `fee_pool` (zero if the fee was paid directly in core) and how much
/// accrued to that asset's `accumulated_fees`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSettlement {
    pub pool_drawn: Amount,
    pub accrued: Amount,
}

/// Settles a `core_fee`-sized fee declared in `fee_asset`. `core_asset_id`
/// identifies the chain's core asset, against which no conversion is
/// necessary. `fee_asset_dynamic_data` is the paying asset's dynamic data —
/// for the core asset itself this should be the core asset's own dynamic
/// data, and `pool_drawn` will always be zero since there is nothing to
/// convert. `core_exchange_rate` follows the asset-model convention of
/// quoting in the core asset (`quote.asset_id == core_asset_id`).
pub fn settle_fee(
    core_fee: Amount,
    core_asset_id: forge_core::ObjectId,
    fee_asset: &MarketAsset,
    fee_asset_dynamic_data: &mut DynamicAssetData,
    core_exchange_rate: Price,
) -> Result<FeeSettlement, CoreError> {
    if fee_asset.asset_id == core_asset_id {
        fee_asset_dynamic_data.accumulated_fees = fee_asset_dynamic_data
            .accumulated_fees
            .checked_add(core_fee)
            .ok_or_else(|| CoreError::InvariantViolated("accumulated_fees overflow".into()))?;
        return Ok(FeeSettlement {
            pool_drawn: 0,
            accrued: core_fee,
        });
    }

    let core_owed = MarketAsset::new(core_fee, core_asset_id);
    let converted = core_exchange_rate.multiply(core_owed).ok_or_else(|| {
        CoreError::Malformed("fee does not convert against core_exchange_rate".into())
    })?;
    if converted.amount > fee_asset.amount {
        return Err(CoreError::Malformed(
            "declared fee asset amount is less than the converted fee".into(),
        ));
    }
    if fee_asset_dynamic_data.fee_pool < core_fee {
        return Err(CoreError::InsufficientFeePool {
            need: core_fee as u128,
            have: fee_asset_dynamic_data.fee_pool.max(0) as u128,
        });
    }
    fee_asset_dynamic_data.fee_pool -= core_fee;
    fee_asset_dynamic_data.accumulated_fees = fee_asset_dynamic_data
        .accumulated_fees
        .checked_add(converted.amount)
        .ok_or_else(|| CoreError::InvariantViolated("accumulated_fees overflow".into()))?;
    Ok(FeeSettlement {
        pool_drawn: core_fee,
        accrued: converted.amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::asset::DynamicAssetDataId;
    use forge_core::ObjectId;

    fn core_id() -> ObjectId {
        ObjectId::new(1, 3, 0)
    }

    fn non_core_id() -> ObjectId {
        ObjectId::new(1, 3, 1)
    }

    fn dynamic_data() -> DynamicAssetData {
        DynamicAssetData {
            id: DynamicAssetDataId::new(0),
            current_supply: 1_000_000,
            accumulated_fees: 0,
            fee_pool: 1_000,
        }
    }

    #[test]
    fn transfer_fee_includes_memo_surcharge() {
        let schedule = FeeSchedule::with_defaults();
        let op = Operation::Transfer(TransferOp {
            from: crate::model::account::AccountId::new(0),
            to: crate::model::account::AccountId::new(1),
            amount: 1,
            asset_id: crate::model::asset::AssetId::new(0),
            memo: Some(vec![0u8; 5]),
        });
        assert_eq!(schedule.compute_fee(&op), 200 + 5 * 10);
    }

    #[test]
    fn core_asset_fee_needs_no_conversion() {
        let mut data = dynamic_data();
        let fee_asset = MarketAsset::new(200, core_id());
        let rate = Price::new(MarketAsset::new(1, core_id()), MarketAsset::new(1, core_id()));
        let settlement = settle_fee(200, core_id(), &fee_asset, &mut data, rate).unwrap();
        assert_eq!(settlement.pool_drawn, 0);
        assert_eq!(settlement.accrued, 200);
        assert_eq!(data.accumulated_fees, 200);
        assert_eq!(data.fee_pool, 1_000);
    }

    #[test]
    fn non_core_fee_draws_the_pool_and_accrues_the_converted_amount() {
        let mut data = dynamic_data();
        // quote is always core, per convention: 1 core = 2 of the non-core asset.
        let rate = Price::new(MarketAsset::new(2, non_core_id()), MarketAsset::new(1, core_id()));
        let fee_asset = MarketAsset::new(1_000, non_core_id());
        let settlement = settle_fee(100, core_id(), &fee_asset, &mut data, rate).unwrap();
        assert_eq!(settlement.pool_drawn, 100);
        assert_eq!(settlement.accrued, 200);
        assert_eq!(data.fee_pool, 900);
        assert_eq!(data.accumulated_fees, 200);
    }

    #[test]
    fn insufficient_fee_pool_is_rejected() {
        let mut data = dynamic_data();
        data.fee_pool = 50;
        let rate = Price::new(MarketAsset::new(2, non_core_id()), MarketAsset::new(1, core_id()));
        let fee_asset = MarketAsset::new(1_000, non_core_id());
        assert!(settle_fee(100, core_id(), &fee_asset, &mut data, rate).is_err());
    }
}
