//! Assets, and the side objects that hold data too hot to keep on the
//! asset object itself (supply/fee bookkeeping changes every transfer;
//! feed data changes every publish).

use crate::model::account::AccountId;
use forge_core::{define_object, ObjectId, Timestamp};
use forge_market::{Amount, FeedSubmission, Price, PriceFeed};
use serde::{Deserialize, Serialize};

pub const MIN_SYMBOL_LEN: usize = 3;
pub const MAX_SYMBOL_LEN: usize = 16;

/// `true` if `symbol` could be registered: uppercase ascii letters and
/// digits, starting with a letter, no repeated structure requirements
/// beyond length.
pub fn is_valid_symbol(symbol: &str) -> bool {
    if symbol.len() < MIN_SYMBOL_LEN || symbol.len() > MAX_SYMBOL_LEN {
        return false;
    }
    let bytes = symbol.as_bytes();
    if !bytes[0].is_ascii_uppercase() {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

bitflags::bitflags! {
    /// Issuer-controlled permission/flag bits. Flags are the subset of
    /// permissions currently exercised; an issuer can never set a flag bit
    /// its permissions bitmask doesn't also grant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AssetPermissions: u16 {
        const CHARGE_MARKET_FEE    = 0b0000_0001;
        const WHITE_LIST           = 0b0000_0010;
        const OVERRIDE_AUTHORITY   = 0b0000_0100;
        const TRANSFER_RESTRICTED  = 0b0000_1000;
        const DISABLE_FORCE_SETTLE = 0b0001_0000;
        const GLOBAL_SETTLE        = 0b0010_0000;
        const DISABLE_CONFIDENTIAL = 0b0100_0000;
        const MARKET_ISSUED        = 0b1000_0000;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    pub issuer: AccountId,
    pub max_supply: Amount,
    pub precision: u8,
    pub permissions: AssetPermissions,
    pub flags: AssetPermissions,
    pub core_exchange_rate: Price,
    /// Set only for market-issued assets: the asset collateral is posted in.
    pub short_backing_asset: Option<ObjectId>,
    pub dynamic_data_id: DynamicAssetDataId,
    pub bitasset_data_id: Option<BitassetDataId>,
    pub market_fee_bps: u16,
}

define_object!(AssetMarker, AssetId, Asset, space = 1u8, type_id = 3);

impl Asset {
    pub fn is_market_issued(&self) -> bool {
        self.bitasset_data_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicAssetData {
    pub id: DynamicAssetDataId,
    pub current_supply: Amount,
    /// Fees collected in this asset, paid out to the issuer at maintenance.
    pub accumulated_fees: Amount,
    /// Core-asset pool an issuer funds so non-core fees can be converted to
    /// core at `core_exchange_rate` instead of requiring the payer to hold
    /// core asset directly.
    pub fee_pool: Amount,
}

define_object!(
    DynamicAssetDataMarker,
    DynamicAssetDataId,
    DynamicAssetData,
    space = 2u8,
    type_id = 2
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitassetData {
    pub id: BitassetDataId,
    pub feeds: Vec<(AccountId, FeedSubmission)>,
    pub current_feed: Option<PriceFeed>,
    pub current_feed_updated_at: Timestamp,
    pub force_settlement_delay_secs: u32,
    /// Basis-point offset applied against the feed price when a forced
    /// settlement executes, so settling is never strictly more attractive
    /// than trading on the open market.
    pub force_settlement_offset_bps: u16,
    /// Set once the asset has gone through global settlement (a black-swan
    /// event where even the least-collateralized call order can't cover its
    /// debt at the feed price): every remaining debt position settles at
    /// this price instead of matching or margin-calling further.
    pub globally_settled_price: Option<Price>,
}

define_object!(
    BitassetDataMarker,
    BitassetDataId,
    BitassetData,
    space = 2u8,
    type_id = 3
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_symbols_accepted() {
        assert!(is_valid_symbol("USD"));
        assert!(is_valid_symbol("BTC2X"));
    }

    #[test]
    fn invalid_symbols_rejected() {
        assert!(!is_valid_symbol("us"));
        assert!(!is_valid_symbol("usd"));
        assert!(!is_valid_symbol("1USD"));
        assert!(!is_valid_symbol("US_D"));
    }

    #[test]
    fn permission_flags_never_exceed_grant() {
        let permissions = AssetPermissions::CHARGE_MARKET_FEE | AssetPermissions::WHITE_LIST;
        let flags = AssetPermissions::CHARGE_MARKET_FEE;
        assert!(permissions.contains(flags));
        assert!(!permissions.contains(AssetPermissions::GLOBAL_SETTLE));
    }
}
