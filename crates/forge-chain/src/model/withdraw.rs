//! Recurring withdrawal authorization: lets `withdraw_from` pre-authorize
//! `authorized_account` to pull up to `withdrawal_limit` out of its balance
//! once per `withdrawal_period_secs`, without handing over a general
//! spending authority. Used for subscriptions and payroll-style transfers.

use crate::model::account::AccountId;
use crate::model::asset::AssetId;
use forge_core::{define_object, Timestamp};
use forge_market::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawPermission {
    pub id: WithdrawPermissionId,
    pub withdraw_from: AccountId,
    pub authorized_account: AccountId,
    pub withdrawal_limit: Amount,
    pub withdrawal_limit_asset_id: AssetId,
    pub withdrawal_period_secs: u32,
    /// Start of the period currently in progress; resets on each claim.
    pub period_start: Timestamp,
    /// Running total claimed so far in the current period, bounded by
    /// `withdrawal_limit`.
    pub claimed_this_period: Amount,
    pub expiration: Timestamp,
}

define_object!(
    WithdrawPermissionMarker,
    WithdrawPermissionId,
    WithdrawPermission,
    space = 1u8,
    type_id = 8
);

impl WithdrawPermission {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expiration
    }

    /// Rolls over into a fresh period if `now` has moved past the current
    /// one, resetting the claimed counter.
    pub fn roll_period_if_elapsed(&mut self, now: Timestamp) {
        while now.unix_secs() >= self.period_start.unix_secs() + self.withdrawal_period_secs as i64
        {
            self.period_start = self
                .period_start
                .saturating_add_secs(self.withdrawal_period_secs as i64);
            self.claimed_this_period = 0;
        }
    }

    /// Returns the amount still claimable in the current period after
    /// rolling it forward, or `None` if the permission has expired.
    pub fn remaining_this_period(&mut self, now: Timestamp) -> Option<Amount> {
        if self.is_expired(now) {
            return None;
        }
        self.roll_period_if_elapsed(now);
        Some(self.withdrawal_limit - self.claimed_this_period)
    }
}
