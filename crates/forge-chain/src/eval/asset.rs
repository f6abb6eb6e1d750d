//! Asset lifecycle: creation, issuance, parameter updates, and delegate feed
//! publication.

use forge_auth::AuthClass;
use forge_core::{CoreError, CoreResult};
use forge_db::ops;
use forge_market::{median_feed, FeedSubmission};

use crate::eval::context::EvalContext;
use crate::model::asset::{
    self, Asset, AssetId, AssetPermissions, BitassetData, DynamicAssetData,
};
use crate::model::market::CallOrderId;
use crate::model::operation::{
    AssetCreateOp, AssetFundFeePoolOp, AssetGlobalSettleOp, AssetIssueOp, AssetPublishFeedOp,
    AssetUpdateOp,
};

/// How long a published feed stays eligible for the median, in seconds.
pub const FEED_LIFETIME_SECS: u32 = 24 * 3600;
const DEFAULT_FORCE_SETTLEMENT_DELAY_SECS: u32 = 24 * 3600;
const DEFAULT_FORCE_SETTLEMENT_OFFSET_BPS: u16 = 100;

pub fn evaluate_asset_create(ctx: &EvalContext, op: &AssetCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.issuer, AuthClass::Active)?;
    if !asset::is_valid_symbol(&op.symbol) {
        return Err(CoreError::Malformed(format!("invalid asset symbol {}", op.symbol)));
    }
    if ctx.db.asset_by_symbol(&op.symbol).is_some() {
        return Err(CoreError::Duplicate(format!("asset symbol {} already registered", op.symbol)));
    }
    if op.max_supply <= 0 || op.max_supply > forge_market::MAX_SHARES {
        return Err(CoreError::Malformed("max_supply out of range".into()));
    }
    if op.precision > 10 {
        return Err(CoreError::Malformed("precision must be 0-10".into()));
    }
    if op.market_fee_bps > 10_000 {
        return Err(CoreError::Malformed("market_fee_bps exceeds 10000".into()));
    }
    if let Some(backing) = op.short_backing_asset {
        ops::get(ctx.db, backing)?;
    }
    Ok(())
}

pub fn apply_asset_create(ctx: &mut EvalContext, op: &AssetCreateOp) -> CoreResult<AssetId> {
    let dynamic_data_id = ops::create(ctx.db, |id| DynamicAssetData {
        id,
        current_supply: 0,
        accumulated_fees: 0,
        fee_pool: 0,
    });

    let mut permissions = AssetPermissions::CHARGE_MARKET_FEE
        | AssetPermissions::WHITE_LIST
        | AssetPermissions::OVERRIDE_AUTHORITY
        | AssetPermissions::TRANSFER_RESTRICTED
        | AssetPermissions::DISABLE_FORCE_SETTLE
        | AssetPermissions::GLOBAL_SETTLE
        | AssetPermissions::DISABLE_CONFIDENTIAL;
    let mut flags = AssetPermissions::empty();
    if op.market_fee_bps > 0 {
        flags |= AssetPermissions::CHARGE_MARKET_FEE;
    }

    let bitasset_data_id = if op.short_backing_asset.is_some() {
        permissions |= AssetPermissions::MARKET_ISSUED;
        flags |= AssetPermissions::MARKET_ISSUED;
        Some(ops::create(ctx.db, |id| BitassetData {
            id,
            feeds: Vec::new(),
            current_feed: None,
            current_feed_updated_at: ctx.now,
            force_settlement_delay_secs: DEFAULT_FORCE_SETTLEMENT_DELAY_SECS,
            force_settlement_offset_bps: DEFAULT_FORCE_SETTLEMENT_OFFSET_BPS,
            globally_settled_price: None,
        }))
    } else {
        None
    };

    let id = ops::create(ctx.db, |id| Asset {
        id,
        symbol: op.symbol.clone(),
        issuer: op.issuer,
        max_supply: op.max_supply,
        precision: op.precision,
        permissions,
        flags,
        core_exchange_rate: op.core_exchange_rate,
        short_backing_asset: op.short_backing_asset.map(Into::into),
        dynamic_data_id,
        bitasset_data_id,
        market_fee_bps: op.market_fee_bps,
    });
    ctx.db.register_asset_symbol(op.symbol.clone(), id);
    Ok(id)
}

pub fn evaluate_asset_issue(ctx: &EvalContext, op: &AssetIssueOp) -> CoreResult<()> {
    ctx.require_authority(op.issuer, AuthClass::Active)?;
    let asset = ops::get(ctx.db, op.asset_id)?;
    if asset.issuer != op.issuer {
        return Err(CoreError::Unauthorized(format!("{} is not the issuer of this asset", op.issuer)));
    }
    if asset.is_market_issued() {
        return Err(CoreError::MarketRule("market-issued assets cannot be issued directly".into()));
    }
    if op.amount <= 0 {
        return Err(CoreError::Malformed("issue amount must be positive".into()));
    }
    let dynamic_data = ops::get(ctx.db, asset.dynamic_data_id)?;
    if dynamic_data.current_supply.saturating_add(op.amount) > asset.max_supply {
        return Err(CoreError::InvariantViolated("issue would exceed max_supply".into()));
    }
    Ok(())
}

pub fn apply_asset_issue(ctx: &mut EvalContext, op: &AssetIssueOp) -> CoreResult<()> {
    let dynamic_data_id = ops::get(ctx.db, op.asset_id)?.dynamic_data_id;
    ops::modify(ctx.db, dynamic_data_id, |d| d.current_supply += op.amount)?;
    crate::eval::account::add_to_balance(ctx, op.issue_to, op.asset_id.into(), op.amount)
}

pub fn evaluate_asset_update(ctx: &EvalContext, op: &AssetUpdateOp) -> CoreResult<()> {
    ctx.require_authority(op.issuer, AuthClass::Active)?;
    let asset = ops::get(ctx.db, op.asset_id)?;
    if asset.issuer != op.issuer {
        return Err(CoreError::Unauthorized(format!("{} is not the issuer of this asset", op.issuer)));
    }
    if let Some(bps) = op.new_market_fee_bps {
        if bps > 10_000 {
            return Err(CoreError::Malformed("market_fee_bps exceeds 10000".into()));
        }
    }
    Ok(())
}

pub fn apply_asset_update(ctx: &mut EvalContext, op: &AssetUpdateOp) -> CoreResult<()> {
    ops::modify(ctx.db, op.asset_id, |a| {
        if let Some(rate) = op.new_core_exchange_rate {
            a.core_exchange_rate = rate;
        }
        if let Some(bps) = op.new_market_fee_bps {
            a.market_fee_bps = bps;
        }
    })
    .map_err(Into::into)
}

pub fn evaluate_asset_publish_feed(ctx: &EvalContext, op: &AssetPublishFeedOp) -> CoreResult<()> {
    ctx.require_authority(op.publisher, AuthClass::Active)?;
    let asset = ops::get(ctx.db, op.asset_id)?;
    if !asset.is_market_issued() {
        return Err(CoreError::MarketRule("feeds only apply to market-issued assets".into()));
    }
    Ok(())
}

/// Publishes `op.publisher`'s feed and recomputes the asset's current median
/// feed from every submission younger than [`FEED_LIFETIME_SECS`].
pub fn apply_asset_publish_feed(ctx: &mut EvalContext, op: &AssetPublishFeedOp) -> CoreResult<()> {
    let asset = ops::get(ctx.db, op.asset_id)?.clone();
    let bitasset_data_id = asset
        .bitasset_data_id
        .ok_or_else(|| CoreError::MarketRule("asset has no bitasset data".into()))?;

    let now = ctx.now;
    ops::modify(ctx.db, bitasset_data_id, |data| {
        data.feeds.retain(|(publisher, _)| *publisher != op.publisher);
        data.feeds.push((
            op.publisher,
            FeedSubmission {
                feed: op.feed,
                published_at: now,
            },
        ));
        let submissions: Vec<FeedSubmission> = data.feeds.iter().map(|(_, s)| *s).collect();
        if let Some(median) = median_feed(&submissions, now, FEED_LIFETIME_SECS) {
            data.current_feed = Some(median);
            data.current_feed_updated_at = now;
        }
    })
    .map_err(Into::into)
}

pub fn evaluate_asset_fund_fee_pool(ctx: &EvalContext, op: &AssetFundFeePoolOp) -> CoreResult<()> {
    ctx.require_authority(op.from_account, AuthClass::Active)?;
    if op.amount <= 0 {
        return Err(CoreError::Malformed("fund amount must be positive".into()));
    }
    ops::get(ctx.db, op.asset_id)?;
    Ok(())
}

/// Anyone may top up an asset's fee pool, which the fee schedule later draws
/// on to let that asset's holders pay network fees in their own asset
/// instead of core (see `crate::fee::settle_fee`).
pub fn apply_asset_fund_fee_pool(ctx: &mut EvalContext, op: &AssetFundFeePoolOp) -> CoreResult<()> {
    crate::eval::account::debit(ctx, op.from_account, ctx.core_asset_id, op.amount)?;
    let dynamic_data_id = ops::get(ctx.db, op.asset_id)?.dynamic_data_id;
    ops::modify(ctx.db, dynamic_data_id, |d| d.fee_pool += op.amount).map_err(Into::into)
}

pub fn evaluate_asset_global_settle(ctx: &EvalContext, op: &AssetGlobalSettleOp) -> CoreResult<()> {
    ctx.require_authority(op.issuer, AuthClass::Active)?;
    let asset = ops::get(ctx.db, op.asset_id)?;
    if asset.issuer != op.issuer {
        return Err(CoreError::Unauthorized(format!("{} is not the issuer of this asset", op.issuer)));
    }
    if !asset.permissions.contains(AssetPermissions::GLOBAL_SETTLE) {
        return Err(CoreError::MarketRule("asset does not permit issuer-triggered global settlement".into()));
    }
    let bitasset_id = asset
        .bitasset_data_id
        .ok_or_else(|| CoreError::MarketRule("asset has no bitasset data".into()))?;
    let bitasset = ops::get(ctx.db, bitasset_id)?;
    if bitasset.globally_settled_price.is_some() {
        return Err(CoreError::InvariantViolated("asset is already globally settled".into()));
    }
    let feed = bitasset
        .current_feed
        .ok_or_else(|| CoreError::MarketRule("asset has no published feed yet".into()))?;
    if op.settle_price.cmp_oriented(feed.call_limit) == Some(std::cmp::Ordering::Greater) {
        return Err(CoreError::MarketRule(
            "settle price is more favorable to debt holders than the feed's call limit".into(),
        ));
    }
    Ok(())
}

/// Freezes the asset at the issuer-supplied price and closes every open call
/// order against it: each borrower redeems at `op.settle_price`, capped by
/// the collateral actually posted, and the debt is burned from supply.
pub fn apply_asset_global_settle(ctx: &mut EvalContext, op: &AssetGlobalSettleOp) -> CoreResult<()> {
    let asset = ops::get(ctx.db, op.asset_id)?.clone();
    let bitasset_id = asset.bitasset_data_id.expect("checked in evaluate_asset_global_settle");
    ops::modify(ctx.db, bitasset_id, |b| b.globally_settled_price = Some(op.settle_price))?;

    let asset_object_id: forge_core::ObjectId = op.asset_id.into();
    let calls: Vec<CallOrderId> = ctx
        .db
        .call_orders
        .iter()
        .filter(|(_, c)| c.debt.asset_id == asset_object_id)
        .map(|(_, c)| c.id)
        .collect();

    for call_id in calls {
        let call = ops::get(ctx.db, call_id)?.clone();
        let owed = op
            .settle_price
            .multiply(call.debt)
            .map(|owed| owed.amount.min(call.collateral.amount))
            .unwrap_or(0);
        crate::eval::account::add_to_balance(ctx, call.borrower, call.collateral.asset_id, owed)?;
        ops::modify(ctx.db, asset.dynamic_data_id, |d| d.current_supply -= call.debt.amount)?;
        ops::remove(ctx.db, call_id)?;
    }
    Ok(())
}
