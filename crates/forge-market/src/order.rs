//! Order book entities. These are plain data — the matching algorithms in
//! [`crate::matching`] and [`crate::margin`] are the only code that
//! mutates them; callers own the actual object-database storage.

use crate::types::{Amount, Asset, Price};
use forge_core::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: ObjectId,
    pub seller: ObjectId,
    /// Remaining amount offered, denominated in `sell_price.quote`'s asset.
    pub for_sale: Amount,
    /// Immutable exchange rate fixed at order creation: `base` is the asset
    /// the seller wants to receive, `quote` is the asset for sale.
    pub sell_price: Price,
    pub expiration: Timestamp,
    pub fill_or_kill: bool,
}

impl LimitOrder {
    pub fn sell_asset(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.quote.asset_id)
    }

    /// What this order wants in return for every unit still offered.
    pub fn amount_to_receive(&self) -> Option<Asset> {
        self.sell_price.multiply(self.sell_asset())
    }

    pub fn is_filled(&self) -> bool {
        self.for_sale == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortOrder {
    pub id: ObjectId,
    pub seller: ObjectId,
    /// Remaining amount of the borrower's collateral asset still backing
    /// this short.
    pub available_collateral: Amount,
    /// Rate at which collateral converts into the debt asset sold short.
    pub sell_price: Price,
    /// Shorts never match against bids priced worse than this.
    pub short_limit: Price,
    pub expiration: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOrder {
    pub id: ObjectId,
    pub borrower: ObjectId,
    /// The amount owed, in the market-issued (debt) asset.
    pub debt: Asset,
    /// Backing collateral, in the debt asset's backing asset.
    pub collateral: Asset,
    /// Price at which this call order's collateral converts to debt;
    /// derived from the feed at the time the short was opened or last
    /// topped up, not the live feed.
    pub call_price: Price,
}

impl CallOrder {
    /// Collateral ratio in basis points: `collateral_value / debt * 10000`,
    /// where `collateral_value` is `collateral` converted into the debt
    /// asset at `settlement_price`.
    pub fn collateral_ratio_bps(&self, settlement_price: Price) -> Option<u32> {
        if self.debt.amount == 0 {
            return None;
        }
        let collateral_value = settlement_price.multiply(self.collateral)?;
        let ratio = (i128::from(collateral_value.amount) * 10_000) / i128::from(self.debt.amount);
        Some(ratio.max(0) as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSettlement {
    pub id: ObjectId,
    pub owner: ObjectId,
    pub balance: Asset,
    pub requested_at: Timestamp,
}
