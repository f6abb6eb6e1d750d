//! Margin calls, forced settlement, and global settlement for
//! market-issued assets backed by collateral.

use crate::order::{CallOrder, ForceSettlement};
use crate::types::{Asset, Price};
use forge_core::ObjectId;

/// Scales `call_limit` upward by `premium_bps` basis points — margin calls
/// are allowed to sell collateral up to this much above the feed's call
/// limit, never below it, so a forced sale can still clear the book during
/// a fast-moving market without handing collateral away at a stale price.
pub fn margin_call_price_ceiling(call_limit: Price, premium_bps: u16) -> Price {
    let scaled_base = (i128::from(call_limit.base.amount) * i128::from(10_000 + premium_bps)) / 10_000;
    Price::new(
        Asset::new(scaled_base as crate::types::Amount, call_limit.base.asset_id),
        call_limit.quote,
    )
}

/// Returns the ids of every call order whose collateral ratio has fallen to
/// or below `maintenance_bps` at `settlement_price`, most undercollateralized
/// first.
pub fn scan_margin_calls(
    calls: &[CallOrder],
    settlement_price: Price,
    maintenance_bps: u16,
) -> Vec<ObjectId> {
    let mut flagged: Vec<(ObjectId, u32)> = calls
        .iter()
        .filter_map(|c| {
            c.collateral_ratio_bps(settlement_price)
                .filter(|ratio| *ratio <= u32::from(maintenance_bps))
                .map(|ratio| (c.id, ratio))
        })
        .collect();
    flagged.sort_by_key(|(_, ratio)| *ratio);
    flagged.into_iter().map(|(id, _)| id).collect()
}

/// The single least-collateralized call order for `debt_asset`, used to
/// fill forced settlement requests first — the position soonest to be
/// margin-called anyway absorbs the settlement demand.
pub fn least_collateralized<'a>(
    calls: &'a [CallOrder],
    settlement_price: Price,
) -> Option<&'a CallOrder> {
    calls
        .iter()
        .filter_map(|c| c.collateral_ratio_bps(settlement_price).map(|r| (c, r)))
        .min_by_key(|(_, r)| *r)
        .map(|(c, _)| c)
}

/// Whether a pending [`ForceSettlement`] request has cleared its mandatory
/// delay and may be matched.
pub fn settlement_is_due(request: &ForceSettlement, now: forge_core::Timestamp, delay_secs: u32) -> bool {
    now.unix_secs() - request.requested_at.unix_secs() >= i64::from(delay_secs)
}

/// Executes as much of a forced settlement request as the least-collateralized
/// call order can absorb, at `settlement_price`. Returns the debt and
/// collateral amounts transferred, or `None` if the call has no capacity.
pub fn apply_forced_settlement(
    call: &mut CallOrder,
    request: &mut ForceSettlement,
    settlement_price: Price,
) -> Option<(Asset, Asset)> {
    let debt_amount = request.balance.amount.min(call.debt.amount);
    if debt_amount <= 0 {
        return None;
    }
    let collateral_amount = settlement_price
        .multiply(Asset::new(debt_amount, call.debt.asset_id))?
        .amount
        .min(call.collateral.amount);

    call.debt.amount -= debt_amount;
    call.collateral.amount -= collateral_amount;
    request.balance.amount -= debt_amount;

    Some((
        Asset::new(debt_amount, call.debt.asset_id),
        Asset::new(collateral_amount, call.collateral.asset_id),
    ))
}

/// A black swan: the feed settlement price implies even the
/// least-collateralized position can't cover its debt. From this point the
/// asset is frozen and every debt holder redeems pro-rata at
/// `total_collateral / total_debt` instead of the feed price.
pub fn is_black_swan(least_collateralized_ratio_bps: u32) -> bool {
    least_collateralized_ratio_bps < 10_000
}

pub fn global_settlement_price(total_collateral: Asset, total_debt: Asset) -> Option<Price> {
    if total_debt.amount <= 0 {
        return None;
    }
    Some(Price::new(total_collateral, total_debt))
}
