//! Limit-order and short-order matching.
//!
//! Two crossing orders always trade at the **maker's** price — whichever
//! order already rested on the book — never at the taker's limit. This
//! rewards resting liquidity and gives a deterministic trade price
//! independent of arrival order among equally-crossing orders.

use crate::order::{CallOrder, LimitOrder, ShortOrder};
use crate::types::{Amount, Asset, Price};
use forge_core::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub taker_paid: Asset,
    pub maker_paid: Asset,
    pub market_fee: Asset,
}

/// Matches a taker limit order against a resting maker limit order,
/// mutating both in place. Returns `None` if the orders don't cross (taker
/// is not willing to pay at least the maker's price) or if either side has
/// nothing left to trade.
///
/// The market fee is charged to the *receiving* side of the trade and is
/// capped at the amount received — a 100% fee rate still never results in
/// the receiver's balance going negative, it just zeroes the receipt.
pub fn match_limit_orders(
    taker: &mut LimitOrder,
    maker: &mut LimitOrder,
    market_fee_bps: u16,
) -> Option<Fill> {
    if taker.is_filled() || maker.is_filled() {
        return None;
    }
    // Taker crosses if its price (what it's willing to give up per unit
    // received) is at least as good as the maker's price, oriented to the
    // maker's market.
    let taker_price_from_maker_view = taker.sell_price.reciprocal();
    let crosses = maker
        .sell_price
        .cmp_oriented(taker_price_from_maker_view)
        .map(|ord| ord != std::cmp::Ordering::Greater)
        .unwrap_or(false);
    if !crosses {
        return None;
    }

    // Trade at the maker's price: maker gives `maker.sell_asset()`,
    // receives `maker.amount_to_receive()`. The traded quantity is bounded
    // by both sides' remaining size.
    let maker_receive_if_full = maker.amount_to_receive()?;
    let taker_offers = taker.sell_asset();
    if taker_offers.asset_id != maker_receive_if_full.asset_id {
        return None;
    }

    let traded_to_maker = taker_offers.amount.min(maker_receive_if_full.amount);
    if traded_to_maker <= 0 {
        return None;
    }
    let maker_sold = maker
        .sell_price
        .reciprocal()
        .multiply(Asset::new(traded_to_maker, maker_receive_if_full.asset_id))?;

    let market_fee = apply_market_fee(maker_sold, market_fee_bps);
    let taker_paid_amount = Asset::new(traded_to_maker, maker_receive_if_full.asset_id);
    let maker_paid_to_taker = Asset::new(
        maker_sold.amount - market_fee.amount,
        maker_sold.asset_id,
    );

    maker.for_sale -= maker_sold.amount;
    taker.for_sale -= taker_paid_amount.amount;

    Some(Fill {
        taker_paid: taker_paid_amount,
        maker_paid: maker_paid_to_taker,
        market_fee,
    })
}

/// Market fee on `received`, capped so the fee never exceeds the amount
/// actually received.
pub fn apply_market_fee(received: Asset, fee_bps: u16) -> Asset {
    let fee = (i128::from(received.amount) * i128::from(fee_bps)) / 10_000;
    let capped = fee.min(i128::from(received.amount)).max(0);
    Asset::new(capped as Amount, received.asset_id)
}

/// A short order matching against a limit bid opens (or tops up) a call
/// order for the short seller. Returns the call order delta to apply and
/// the amount deducted from each side; the caller is responsible for
/// storing/merging the resulting [`CallOrder`] (only one call order exists
/// per borrower+debt-asset, so an existing one must be merged rather than
/// a second created).
pub fn match_short_against_limit(
    short: &mut ShortOrder,
    bid: &mut LimitOrder,
    borrower: ObjectId,
) -> Option<(CallOrder, Asset)> {
    if bid.is_filled() {
        return None;
    }
    // Shorts only match bids at or above short_limit.
    let bid_price_from_short_view = bid.sell_price.reciprocal();
    let meets_limit = short
        .short_limit
        .cmp_oriented(bid_price_from_short_view)
        .map(|ord| ord != std::cmp::Ordering::Greater)
        .unwrap_or(false);
    if !meets_limit {
        return None;
    }

    let bid_wants = bid.sell_asset();
    let short_can_sell = short.sell_price.multiply(Asset::new(
        short.available_collateral,
        short.sell_price.quote.asset_id,
    ))?;
    if bid_wants.asset_id != short_can_sell.asset_id {
        return None;
    }

    let debt_amount = bid_wants.amount.min(short_can_sell.amount);
    if debt_amount <= 0 {
        return None;
    }
    let collateral_used = short
        .sell_price
        .reciprocal()
        .multiply(Asset::new(debt_amount, short_can_sell.asset_id))?;

    short.available_collateral -= collateral_used.amount;
    bid.for_sale -= debt_amount;

    let call = CallOrder {
        id: ObjectId::null(),
        borrower,
        debt: Asset::new(debt_amount, short_can_sell.asset_id),
        collateral: Asset::new(collateral_used.amount, collateral_used.asset_id),
        call_price: short.sell_price,
    };
    Some((call, Asset::new(debt_amount, short_can_sell.asset_id)))
}

/// Merges a freshly matched short fill into an existing call order for the
/// same borrower+debt asset, re-deriving `call_price` as the size-weighted
/// average of the two positions' rates — enforcing the "at most one call
/// order per borrower+asset" invariant at the merge point rather than
/// leaving it to callers.
pub fn merge_call_orders(existing: &CallOrder, incoming: &CallOrder) -> Option<CallOrder> {
    if existing.borrower != incoming.borrower || existing.debt.asset_id != incoming.debt.asset_id {
        return None;
    }
    let debt = existing.debt.checked_add(incoming.debt)?;
    let collateral = existing.collateral.checked_add(incoming.collateral)?;
    Some(CallOrder {
        id: existing.id,
        borrower: existing.borrower,
        debt,
        collateral,
        call_price: incoming.call_price,
    })
}
