//! Order book operations: limit order placement/cancellation, short order
//! placement, call order (margin position) adjustment, and forced
//! settlement requests. Matching against the resting book happens inline
//! at order-creation time rather than in a separate pass, so a crossing
//! order fills immediately.

use std::cmp::Ordering;

use forge_auth::AuthClass;
use forge_core::id::InstanceId;
use forge_core::{CoreError, CoreResult, ObjectId};
use forge_market::{matching, Amount, Asset as MarketAsset, Price};

use crate::eval::account;
use crate::eval::context::EvalContext;
use crate::model::asset::AssetId;
use crate::model::market::{
    CallOrder, CallOrderId, ForceSettlement, ForceSettlementId, LimitOrder, LimitOrderId,
    ShortOrder, ShortOrderId,
};
use crate::model::operation::{
    CallOrderUpdateOp, ForceSettlementCreateOp, LimitOrderCancelOp, LimitOrderCreateOp,
    ShortOrderCancelOp, ShortOrderCreateOp,
};
use forge_db::ops;

fn accrue_market_fee(ctx: &mut EvalContext, asset_id: AssetId, amount: Amount) -> CoreResult<()> {
    if amount <= 0 {
        return Ok(());
    }
    let dynamic_id = ops::get(ctx.db, asset_id)?.dynamic_data_id;
    ops::modify(ctx.db, dynamic_id, |d| d.accumulated_fees += amount).map_err(Into::into)
}

fn as_asset_id(object_id: ObjectId) -> AssetId {
    AssetId::from_instance(object_id.instance())
}

pub fn evaluate_limit_order_create(ctx: &EvalContext, op: &LimitOrderCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.seller, AuthClass::Active)?;
    if op.amount_to_sell <= 0 || op.min_to_receive <= 0 {
        return Err(CoreError::Malformed("order amounts must be positive".into()));
    }
    if op.sell_asset_id == op.receive_asset_id {
        return Err(CoreError::Malformed("sell and receive assets must differ".into()));
    }
    if op.expiration.unix_secs() <= ctx.now.unix_secs() {
        return Err(CoreError::Expired {
            expiration: op.expiration.unix_secs(),
            now: ctx.now.unix_secs(),
        });
    }
    ops::get(ctx.db, op.sell_asset_id)?;
    ops::get(ctx.db, op.receive_asset_id)?;
    Ok(())
}

pub fn apply_limit_order_create(ctx: &mut EvalContext, op: &LimitOrderCreateOp) -> CoreResult<LimitOrderId> {
    account::debit(ctx, op.seller, op.sell_asset_id.into(), op.amount_to_sell)?;

    let sell_price = Price::new(
        MarketAsset::new(op.min_to_receive, op.receive_asset_id.into()),
        MarketAsset::new(op.amount_to_sell, op.sell_asset_id.into()),
    );
    let order_id = ops::create(ctx.db, |id| LimitOrder {
        id,
        seller: op.seller,
        for_sale: op.amount_to_sell,
        sell_price,
        expiration: op.expiration,
        fill_or_kill: op.fill_or_kill,
    });

    match_limit_order_against_book(ctx, order_id)?;

    if op.fill_or_kill {
        let remaining = ops::try_get(ctx.db, order_id).map(|o| o.for_sale).unwrap_or(0);
        if remaining > 0 {
            return Err(CoreError::MarketRule(
                "fill-or-kill order could not be completely filled".into(),
            ));
        }
    }
    Ok(order_id)
}

/// Repeatedly crosses `taker_id` against the best resting opposite-side
/// order until either side is exhausted or no crossing maker remains.
fn match_limit_order_against_book(ctx: &mut EvalContext, taker_id: LimitOrderId) -> CoreResult<()> {
    loop {
        let taker = match ops::try_get(ctx.db, taker_id) {
            Some(o) if o.for_sale > 0 => *o,
            _ => break,
        };
        let want_quote = taker.sell_price.quote.asset_id; // what the taker is selling
        let want_base = taker.sell_price.base.asset_id; // what the taker wants
        let now_secs = ctx.now.unix_secs();

        let mut candidates: Vec<LimitOrder> = ctx
            .db
            .limit_orders
            .iter()
            .map(|(_, o)| *o)
            .filter(|o| {
                o.id != taker_id
                    && o.for_sale > 0
                    && o.expiration.unix_secs() > now_secs
                    && o.sell_price.quote.asset_id == want_base
                    && o.sell_price.base.asset_id == want_quote
            })
            .collect();
        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| a.sell_price.cmp_oriented(b.sell_price).unwrap_or(Ordering::Equal));
        let maker = candidates[0];
        let maker_id = maker.id;

        let receive_asset_id = as_asset_id(want_base);
        let market_fee_bps = ops::get(ctx.db, receive_asset_id)?.market_fee_bps;

        let mut taker_dto = taker.to_dto();
        let mut maker_dto = maker.to_dto();
        let fill = match matching::match_limit_orders(&mut taker_dto, &mut maker_dto, market_fee_bps) {
            Some(fill) => fill,
            None => break,
        };

        ops::modify(ctx.db, maker_id, |o| o.apply_dto(&maker_dto))?;
        ops::modify(ctx.db, taker_id, |o| o.apply_dto(&taker_dto))?;

        account::add_to_balance(ctx, maker.seller, want_quote, fill.taker_paid.amount)?;
        account::add_to_balance(ctx, taker.seller, want_base, fill.maker_paid.amount)?;
        accrue_market_fee(ctx, receive_asset_id, fill.market_fee.amount)?;

        if maker_dto.is_filled() {
            ops::remove(ctx.db, maker_id)?;
        }
        if taker_dto.is_filled() {
            ops::remove(ctx.db, taker_id)?;
            break;
        }
    }
    Ok(())
}

pub fn evaluate_limit_order_cancel(ctx: &EvalContext, op: &LimitOrderCancelOp) -> CoreResult<()> {
    ctx.require_authority(op.seller, AuthClass::Active)?;
    let order_id: LimitOrderId = LimitOrderId::from_instance(op.order_id.instance());
    let order = ops::get(ctx.db, order_id)?;
    if order.seller != op.seller {
        return Err(CoreError::Unauthorized("only the order's seller may cancel it".into()));
    }
    Ok(())
}

pub fn apply_limit_order_cancel(ctx: &mut EvalContext, op: &LimitOrderCancelOp) -> CoreResult<()> {
    let order_id: LimitOrderId = LimitOrderId::from_instance(op.order_id.instance());
    let order = ops::remove(ctx.db, order_id)?;
    account::add_to_balance(ctx, order.seller, order.sell_price.quote.asset_id, order.for_sale)
}

pub fn evaluate_short_order_create(ctx: &EvalContext, op: &ShortOrderCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.seller, AuthClass::Active)?;
    if op.collateral <= 0 || op.max_debt <= 0 {
        return Err(CoreError::Malformed("short order amounts must be positive".into()));
    }
    let debt_asset = ops::get(ctx.db, op.debt_asset_id)?;
    if !debt_asset.is_market_issued() {
        return Err(CoreError::MarketRule("only market-issued assets can be shorted".into()));
    }
    if debt_asset.short_backing_asset != Some(op.collateral_asset_id.into()) {
        return Err(CoreError::MarketRule("collateral asset does not back this debt asset".into()));
    }
    Ok(())
}

pub fn apply_short_order_create(ctx: &mut EvalContext, op: &ShortOrderCreateOp) -> CoreResult<ShortOrderId> {
    let debt_asset = ops::get(ctx.db, op.debt_asset_id)?.clone();
    let bitasset_id = debt_asset
        .bitasset_data_id
        .ok_or_else(|| CoreError::MarketRule("asset has no bitasset data".into()))?;
    let short_limit = ops::get(ctx.db, bitasset_id)?
        .current_feed
        .ok_or_else(|| CoreError::MarketRule("asset has no published feed yet".into()))?
        .short_limit;

    account::debit(ctx, op.seller, op.collateral_asset_id.into(), op.collateral)?;

    let sell_price = Price::new(
        MarketAsset::new(op.max_debt, op.debt_asset_id.into()),
        MarketAsset::new(op.collateral, op.collateral_asset_id.into()),
    );
    let order_id = ops::create(ctx.db, |id| ShortOrder {
        id,
        seller: op.seller,
        available_collateral: op.collateral,
        sell_price,
        short_limit,
        expiration: op.expiration,
    });

    match_short_order_against_book(ctx, order_id, op.debt_asset_id)?;
    Ok(order_id)
}

fn match_short_order_against_book(
    ctx: &mut EvalContext,
    short_id: ShortOrderId,
    debt_asset_id: AssetId,
) -> CoreResult<()> {
    loop {
        let short = match ops::try_get(ctx.db, short_id) {
            Some(o) if o.available_collateral > 0 => *o,
            _ => break,
        };
        let collateral_asset_id = short.sell_price.quote.asset_id;
        let debt_asset_object_id: ObjectId = debt_asset_id.into();
        let now_secs = ctx.now.unix_secs();

        let mut candidates: Vec<LimitOrder> = ctx
            .db
            .limit_orders
            .iter()
            .map(|(_, o)| *o)
            .filter(|o| {
                o.for_sale > 0
                    && o.expiration.unix_secs() > now_secs
                    && o.sell_price.quote.asset_id == collateral_asset_id
                    && o.sell_price.base.asset_id == debt_asset_object_id
            })
            .collect();
        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| a.sell_price.cmp_oriented(b.sell_price).unwrap_or(Ordering::Equal));
        let bid = candidates[0];
        let bid_id = bid.id;
        let mut short_dto = short.to_dto();
        let mut bid_dto = bid.to_dto();

        let matched = match matching::match_short_against_limit(&mut short_dto, &mut bid_dto, short.seller.into()) {
            Some(m) => m,
            None => break,
        };
        let (call_delta, debt_to_bidder) = matched;

        ops::modify(ctx.db, short_id, |o| o.apply_dto(&short_dto))?;
        ops::modify(ctx.db, bid_id, |o| o.apply_dto(&bid_dto))?;

        let existing_call_id = ctx
            .db
            .call_orders
            .iter()
            .find(|(_, c)| c.borrower == short.seller && c.debt.asset_id == call_delta.debt.asset_id)
            .map(|(_, c)| c.id);

        if let Some(call_id) = existing_call_id {
            let existing = *ops::get(ctx.db, call_id)?;
            let merged = matching::merge_call_orders(&existing.to_dto(), &call_delta)
                .ok_or_else(|| CoreError::InvariantViolated("call order merge overflowed".into()))?;
            ops::modify(ctx.db, call_id, |c| c.apply_dto(&merged))?;
        } else {
            ops::create(ctx.db, |id| {
                CallOrder::from_dto(id, short.seller, &call_delta)
            });
        }

        // The bidder receives the borrowed debt asset; the short's collateral
        // now backs the newly opened (or topped-up) call order instead of
        // sitting in the seller's balance.
        account::add_to_balance(ctx, bid.seller, debt_to_bidder.asset_id, debt_to_bidder.amount)?;
        let dynamic_id = ops::get(ctx.db, debt_asset_id)?.dynamic_data_id;
        ops::modify(ctx.db, dynamic_id, |d| d.current_supply += debt_to_bidder.amount)?;

        if bid_dto.is_filled() {
            ops::remove(ctx.db, bid_id)?;
        }
        if short_dto.available_collateral <= 0 {
            ops::remove(ctx.db, short_id)?;
            break;
        }
    }
    Ok(())
}

pub fn evaluate_short_order_cancel(ctx: &EvalContext, op: &ShortOrderCancelOp) -> CoreResult<()> {
    ctx.require_authority(op.seller, AuthClass::Active)?;
    let order_id: ShortOrderId = ShortOrderId::from_instance(op.order_id.instance());
    let order = ops::get(ctx.db, order_id)?;
    if order.seller != op.seller {
        return Err(CoreError::Unauthorized("only the order's seller may cancel it".into()));
    }
    Ok(())
}

pub fn apply_short_order_cancel(ctx: &mut EvalContext, op: &ShortOrderCancelOp) -> CoreResult<()> {
    let order_id: ShortOrderId = ShortOrderId::from_instance(op.order_id.instance());
    let order = ops::remove(ctx.db, order_id)?;
    account::add_to_balance(ctx, order.seller, order.sell_price.quote.asset_id, order.available_collateral)
}

pub fn evaluate_call_order_update(ctx: &EvalContext, op: &CallOrderUpdateOp) -> CoreResult<()> {
    ctx.require_authority(op.borrower, AuthClass::Active)?;
    if op.delta_collateral == 0 && op.delta_debt == 0 {
        return Err(CoreError::Malformed("call order update must change something".into()));
    }
    let asset = ops::get(ctx.db, op.debt_asset_id)?;
    if !asset.is_market_issued() {
        return Err(CoreError::MarketRule("only market-issued assets have call orders".into()));
    }
    Ok(())
}

pub fn apply_call_order_update(ctx: &mut EvalContext, op: &CallOrderUpdateOp) -> CoreResult<()> {
    let asset = ops::get(ctx.db, op.debt_asset_id)?.clone();
    let bitasset_id = asset
        .bitasset_data_id
        .ok_or_else(|| CoreError::MarketRule("asset has no bitasset data".into()))?;
    let bitasset = ops::get(ctx.db, bitasset_id)?.clone();
    let feed = bitasset
        .current_feed
        .ok_or_else(|| CoreError::MarketRule("asset has no published feed yet".into()))?;
    let backing_asset_id = asset
        .short_backing_asset
        .ok_or_else(|| CoreError::MarketRule("asset is not backed".into()))?;

    let existing_id = ctx
        .db
        .call_orders
        .iter()
        .find(|(_, c)| c.borrower == op.borrower && c.debt.asset_id == op.debt_asset_id.into())
        .map(|(_, c)| c.id);

    match op.delta_collateral.cmp(&0) {
        Ordering::Greater => account::debit(ctx, op.borrower, backing_asset_id, op.delta_collateral)?,
        Ordering::Less => account::add_to_balance(ctx, op.borrower, backing_asset_id, -op.delta_collateral)?,
        Ordering::Equal => {}
    }
    match op.delta_debt.cmp(&0) {
        Ordering::Greater => {
            account::add_to_balance(ctx, op.borrower, op.debt_asset_id.into(), op.delta_debt)?;
            ops::modify(ctx.db, asset.dynamic_data_id, |d| d.current_supply += op.delta_debt)?;
        }
        Ordering::Less => {
            account::debit(ctx, op.borrower, op.debt_asset_id.into(), -op.delta_debt)?;
            ops::modify(ctx.db, asset.dynamic_data_id, |d| d.current_supply += op.delta_debt)?;
        }
        Ordering::Equal => {}
    }

    let call_id = match existing_id {
        Some(id) => {
            ops::modify(ctx.db, id, |c| {
                c.debt.amount += op.delta_debt;
                c.collateral.amount += op.delta_collateral;
            })?;
            id
        }
        None => {
            if op.delta_debt <= 0 {
                return Err(CoreError::MarketRule("no existing position to adjust".into()));
            }
            ops::create(ctx.db, |id| CallOrder {
                id,
                borrower: op.borrower,
                debt: MarketAsset::new(op.delta_debt, op.debt_asset_id.into()),
                collateral: MarketAsset::new(op.delta_collateral.max(0), backing_asset_id),
                call_price: feed.call_limit,
            })
        }
    };

    let call = *ops::get(ctx.db, call_id)?;
    if call.debt.amount <= 0 {
        ops::remove(ctx.db, call_id)?;
        return Ok(());
    }
    let ratio = call.to_dto().collateral_ratio_bps(feed.call_limit).unwrap_or(0);
    if op.delta_debt > 0 && ratio < u32::from(feed.required_initial_collateral_bps) {
        return Err(CoreError::InsufficientCollateral {
            min_bps: feed.required_initial_collateral_bps,
        });
    }
    Ok(())
}

pub fn scale_price_base(price: Price, numerator_bps: u32) -> Price {
    let scaled = (i128::from(price.base.amount) * i128::from(numerator_bps)) / 10_000;
    Price::new(MarketAsset::new(scaled as Amount, price.base.asset_id), price.quote)
}

pub fn evaluate_force_settlement_create(ctx: &EvalContext, op: &ForceSettlementCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.owner, AuthClass::Active)?;
    if op.amount <= 0 {
        return Err(CoreError::Malformed("settlement amount must be positive".into()));
    }
    let asset = ops::get(ctx.db, op.asset_id)?;
    if !asset.is_market_issued() {
        return Err(CoreError::MarketRule("only market-issued assets can be forced-settled".into()));
    }
    Ok(())
}

pub fn apply_force_settlement_create(
    ctx: &mut EvalContext,
    op: &ForceSettlementCreateOp,
) -> CoreResult<ForceSettlementId> {
    account::debit(ctx, op.owner, op.asset_id.into(), op.amount)?;
    let request_id = ops::create(ctx.db, |id| ForceSettlement {
        id,
        owner: op.owner,
        balance: MarketAsset::new(op.amount, op.asset_id.into()),
        requested_at: ctx.now,
    });

    let asset = ops::get(ctx.db, op.asset_id)?.clone();
    let Some(bitasset_id) = asset.bitasset_data_id else {
        return Ok(request_id);
    };
    let bitasset = ops::get(ctx.db, bitasset_id)?.clone();
    let Some(feed) = bitasset.current_feed else {
        return Ok(request_id);
    };
    // Settle strictly worse than the feed's call limit, so settling on-chain
    // is never more attractive than trading against the open book.
    let settlement_price = scale_price_base(feed.call_limit, 10_000u32.saturating_sub(u32::from(bitasset.force_settlement_offset_bps)));

    let best_call_id = ctx
        .db
        .call_orders
        .iter()
        .filter(|(_, c)| c.debt.asset_id == op.asset_id.into())
        .filter_map(|(_, c)| c.to_dto().collateral_ratio_bps(settlement_price).map(|r| (c.id, r)))
        .min_by_key(|(_, r)| *r)
        .map(|(id, _)| id);

    let Some(call_id) = best_call_id else {
        return Ok(request_id);
    };
    let mut call_dto = ops::get(ctx.db, call_id)?.to_dto();
    let mut request_dto = ops::get(ctx.db, request_id)?.to_dto();
    let Some((debt_settled, collateral_paid)) =
        forge_market::margin::apply_forced_settlement(&mut call_dto, &mut request_dto, settlement_price)
    else {
        return Ok(request_id);
    };

    ops::modify(ctx.db, call_id, |c| c.apply_dto(&call_dto))?;
    ops::modify(ctx.db, request_id, |r| r.balance = request_dto.balance)?;
    account::add_to_balance(ctx, op.owner, collateral_paid.asset_id, collateral_paid.amount)?;
    ops::modify(ctx.db, asset.dynamic_data_id, |d| d.current_supply -= debt_settled.amount)?;

    if call_dto.debt.amount <= 0 {
        ops::remove(ctx.db, call_id)?;
    }
    if request_dto.balance.amount <= 0 {
        ops::remove(ctx.db, request_id)?;
    }
    Ok(request_id)
}
