//! Asset amounts and prices. Amounts are signed 64-bit "shares"; every
//! multiplication promotes to `i128` so a product of two `MAX_SHARES`
//! values never overflows before the final bounds check — the translation
//! of the original chain's 128-bit-intermediate arithmetic rule.

use forge_core::ObjectId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub type Amount = i64;

/// Largest representable share amount. Any computed amount must be
/// asserted against this before being written back to an object; it exists
/// to catch multiplication overflow/explosion bugs, not to limit ordinary
/// balances.
pub const MAX_SHARES: Amount = Amount::MAX / 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub amount: Amount,
    pub asset_id: ObjectId,
}

impl Asset {
    pub fn new(amount: Amount, asset_id: ObjectId) -> Self {
        Asset { amount, asset_id }
    }

    pub fn checked_add(self, rhs: Asset) -> Option<Asset> {
        if self.asset_id != rhs.asset_id {
            return None;
        }
        self.amount
            .checked_add(rhs.amount)
            .map(|amount| Asset::new(amount, self.asset_id))
    }

    pub fn checked_sub(self, rhs: Asset) -> Option<Asset> {
        if self.asset_id != rhs.asset_id {
            return None;
        }
        self.amount
            .checked_sub(rhs.amount)
            .map(|amount| Asset::new(amount, self.asset_id))
    }
}

/// `base / quote`: one unit of `quote` is worth `base.amount / quote.amount`
/// units of `base`'s asset. `~price` (see [`Price::reciprocal`]) swaps the
/// two legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Price { base, quote }
    }

    pub fn reciprocal(self) -> Price {
        Price {
            base: self.quote,
            quote: self.base,
        }
    }

    /// Multiplies an asset amount by this price, converting it from the
    /// quote asset to the base asset. Returns `None` if `asset`'s id
    /// matches neither leg, or if the computation would exceed
    /// [`MAX_SHARES`].
    pub fn multiply(self, asset: Asset) -> Option<Asset> {
        let (from, to) = if asset.asset_id == self.quote.asset_id {
            (self.quote, self.base)
        } else if asset.asset_id == self.base.asset_id {
            (self.base, self.quote)
        } else {
            return None;
        };
        if from.amount == 0 {
            return None;
        }
        let product = i128::from(asset.amount) * i128::from(to.amount);
        let result = product / i128::from(from.amount);
        if result.unsigned_abs() > MAX_SHARES as u128 {
            return None;
        }
        Some(Asset::new(result as Amount, to.asset_id))
    }

    /// `true` if both prices share the same (base, quote) asset pair in
    /// either order — required before two prices can be compared.
    pub fn same_market(a: Price, b: Price) -> bool {
        (a.base.asset_id == b.base.asset_id && a.quote.asset_id == b.quote.asset_id)
            || (a.base.asset_id == b.quote.asset_id && a.quote.asset_id == b.base.asset_id)
    }

    /// Cross-multiplies in `i128` to compare `self` and `other` without a
    /// lossy floating-point division. `other` is flipped to `self`'s market
    /// orientation first if needed.
    pub fn cmp_oriented(self, other: Price) -> Option<Ordering> {
        if !Price::same_market(self, other) {
            return None;
        }
        let other = if other.base.asset_id == self.base.asset_id {
            other
        } else {
            other.reciprocal()
        };
        let lhs = i128::from(self.base.amount) * i128::from(other.quote.amount);
        let rhs = i128::from(other.base.amount) * i128::from(self.quote.amount);
        Some(lhs.cmp(&rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: u64, amount: Amount) -> Asset {
        Asset::new(amount, ObjectId::new(1, 3, id))
    }

    #[test]
    fn multiply_converts_quote_to_base() {
        // price: 2 base per 1 quote
        let price = Price::new(asset(0, 2), asset(1, 1));
        let ten_quote = asset(1, 10);
        let result = price.multiply(ten_quote).unwrap();
        assert_eq!(result.amount, 20);
        assert_eq!(result.asset_id, asset(0, 0).asset_id);
    }

    #[test]
    fn reciprocal_swaps_legs() {
        let price = Price::new(asset(0, 2), asset(1, 1));
        let recip = price.reciprocal();
        assert_eq!(recip.base, price.quote);
        assert_eq!(recip.quote, price.base);
    }

    #[test]
    fn cmp_oriented_handles_flipped_market() {
        let a = Price::new(asset(0, 2), asset(1, 1)); // 2 base/quote
        let b = Price::new(asset(1, 1), asset(0, 3)); // quote/base flipped: 1/3 quote per base -> 3 base per quote
        assert_eq!(a.cmp_oriented(b), Some(Ordering::Less));
    }

    #[test]
    fn cmp_oriented_rejects_mismatched_market() {
        let a = Price::new(asset(0, 2), asset(1, 1));
        let b = Price::new(asset(2, 1), asset(3, 1));
        assert_eq!(a.cmp_oriented(b), None);
    }
}
