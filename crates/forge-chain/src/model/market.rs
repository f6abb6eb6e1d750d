//! Database-resident order book entities.
//!
//! `forge_market::{LimitOrder, ShortOrder, CallOrder, ForceSettlement}` are
//! plain DTOs owned by the matching-engine crate, which knows nothing of
//! `forge_core::Object` or the database's space/type registry — it depends
//! only on `forge-core`'s id and asset primitives, not on this crate. The
//! orphan rule then forbids implementing a foreign trait (`Object`) for a
//! foreign type (the DTOs) here, so each order kind gets a thin database
//! entity of its own, convertible to and from the DTO the matching
//! functions actually operate on.

use crate::model::account::AccountId;
use forge_core::define_object;
use forge_market::{Amount, CallOrder as CallOrderDto, ForceSettlement as ForceSettlementDto};
use forge_market::{LimitOrder as LimitOrderDto, Price, ShortOrder as ShortOrderDto};
use forge_core::Timestamp;
use forge_market::types::Asset as MarketAsset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: LimitOrderId,
    pub seller: AccountId,
    pub for_sale: Amount,
    pub sell_price: Price,
    pub expiration: Timestamp,
    pub fill_or_kill: bool,
}

define_object!(LimitOrderMarker, LimitOrderId, LimitOrder, space = 1u8, type_id = 10);

impl LimitOrder {
    pub fn to_dto(&self) -> LimitOrderDto {
        LimitOrderDto {
            id: self.id.into(),
            seller: self.seller.into(),
            for_sale: self.for_sale,
            sell_price: self.sell_price,
            expiration: self.expiration,
            fill_or_kill: self.fill_or_kill,
        }
    }

    /// Syncs the mutable fields a matching pass can change back from the
    /// DTO it matched against. `id`/`seller`/`sell_price` never change.
    pub fn apply_dto(&mut self, dto: &LimitOrderDto) {
        self.for_sale = dto.for_sale;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortOrder {
    pub id: ShortOrderId,
    pub seller: AccountId,
    pub available_collateral: Amount,
    pub sell_price: Price,
    pub short_limit: Price,
    pub expiration: Timestamp,
}

define_object!(ShortOrderMarker, ShortOrderId, ShortOrder, space = 1u8, type_id = 11);

impl ShortOrder {
    pub fn to_dto(&self) -> ShortOrderDto {
        ShortOrderDto {
            id: self.id.into(),
            seller: self.seller.into(),
            available_collateral: self.available_collateral,
            sell_price: self.sell_price,
            short_limit: self.short_limit,
            expiration: self.expiration,
        }
    }

    pub fn apply_dto(&mut self, dto: &ShortOrderDto) {
        self.available_collateral = dto.available_collateral;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOrder {
    pub id: CallOrderId,
    pub borrower: AccountId,
    pub debt: MarketAsset,
    pub collateral: MarketAsset,
    pub call_price: Price,
}

define_object!(CallOrderMarker, CallOrderId, CallOrder, space = 1u8, type_id = 12);

impl CallOrder {
    pub fn to_dto(&self) -> CallOrderDto {
        CallOrderDto {
            id: self.id.into(),
            borrower: self.borrower.into(),
            debt: self.debt,
            collateral: self.collateral,
            call_price: self.call_price,
        }
    }

    pub fn from_dto(id: CallOrderId, borrower: AccountId, dto: &CallOrderDto) -> Self {
        CallOrder {
            id,
            borrower,
            debt: dto.debt,
            collateral: dto.collateral,
            call_price: dto.call_price,
        }
    }

    pub fn apply_dto(&mut self, dto: &CallOrderDto) {
        self.debt = dto.debt;
        self.collateral = dto.collateral;
        self.call_price = dto.call_price;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSettlement {
    pub id: ForceSettlementId,
    pub owner: AccountId,
    pub balance: MarketAsset,
    pub requested_at: Timestamp,
}

define_object!(
    ForceSettlementMarker,
    ForceSettlementId,
    ForceSettlement,
    space = 1u8,
    type_id = 13
);

impl ForceSettlement {
    pub fn to_dto(&self) -> ForceSettlementDto {
        ForceSettlementDto {
            id: self.id.into(),
            owner: self.owner.into(),
            balance: self.balance,
            requested_at: self.requested_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_market::types::Asset;

    #[test]
    fn limit_order_round_trips_through_dto() {
        let order = LimitOrder {
            id: LimitOrderId::new(5),
            seller: AccountId::new(1),
            for_sale: 100,
            sell_price: Price {
                base: Asset::new(1, forge_core::ObjectId::new(1, 3, 0)),
                quote: Asset::new(1, forge_core::ObjectId::new(1, 3, 1)),
            },
            expiration: Timestamp::from_unix_secs(1_000),
            fill_or_kill: false,
        };
        let mut dto = order.to_dto();
        dto.for_sale = 40;
        let mut order = order;
        order.apply_dto(&dto);
        assert_eq!(order.for_sale, 40);
        assert_eq!(dto.id, forge_core::ObjectId::from(order.id));
    }
}
