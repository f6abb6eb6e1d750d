//! Vesting balances: funds deposited now, claimable only as they vest under
//! one of two policies. The evaluator's withdraw handler is the single site
//! that clamps `withdrawable` against the live balance, per the decision in
//! `proposed_parameters`-free coin-days accrual: accrued seconds are never
//! allowed to imply more than 100% vested regardless of how long they pile up.

use crate::model::account::AccountId;
use crate::model::asset::AssetId;
use crate::model::operation::VestingPolicy;
use forge_core::{define_object, Timestamp};
use forge_market::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VestingBalance {
    pub id: VestingBalanceId,
    pub owner: AccountId,
    pub asset_id: AssetId,
    /// Total ever deposited; never changes after creation.
    pub original_amount: Amount,
    /// What remains after withdrawals.
    pub balance: Amount,
    pub policy: VestingPolicy,
    pub created_at: Timestamp,
    /// Coin-days-destroyed accumulator: sum of (balance held x seconds held)
    /// since the last withdrawal, used only by the `CoinDaysDestroyed`
    /// policy. Unused under `Linear`.
    pub coin_seconds_earned: i128,
    pub coin_seconds_last_update: Timestamp,
}

define_object!(
    VestingBalanceMarker,
    VestingBalanceId,
    VestingBalance,
    space = 1u8,
    type_id = 9
);

impl VestingBalance {
    /// Folds in coin-seconds accrued between `coin_seconds_last_update` and
    /// `now` at the current balance, then advances the watermark. A no-op
    /// under `Linear`, where vesting depends only on wall-clock age.
    pub fn accrue_coin_seconds(&mut self, now: Timestamp) {
        if let VestingPolicy::CoinDaysDestroyed { .. } = self.policy {
            let elapsed = (now - self.coin_seconds_last_update).max(0);
            self.coin_seconds_earned += self.balance as i128 * elapsed as i128;
        }
        self.coin_seconds_last_update = now;
    }

    /// The portion of `balance` currently withdrawable. Always clamped to
    /// `[0, balance]` at this single site — the only place vested-fraction
    /// arithmetic is allowed to run, so no caller can observe an
    /// over-100%-vested intermediate value.
    pub fn withdrawable(&self, now: Timestamp) -> Amount {
        if self.balance <= 0 {
            return 0;
        }
        let vested = match self.policy {
            VestingPolicy::Linear { vesting_secs } => {
                if vesting_secs == 0 {
                    self.original_amount
                } else {
                    let age = (now - self.created_at).max(0);
                    let fraction = (age as i128).min(vesting_secs as i128);
                    (self.original_amount as i128 * fraction / vesting_secs as i128) as Amount
                }
            }
            VestingPolicy::CoinDaysDestroyed {
                vesting_secs,
                min_withdraw_secs,
            } => {
                let age = (now - self.created_at).max(0);
                if age < min_withdraw_secs as i64 {
                    0
                } else if vesting_secs == 0 {
                    self.original_amount
                } else {
                    // Coin-seconds needed to fully vest: balance held for
                    // the whole vesting window.
                    let full = self.original_amount as i128 * vesting_secs as i128;
                    if full == 0 {
                        0
                    } else {
                        (self.original_amount as i128 * self.coin_seconds_earned / full) as Amount
                    }
                }
            }
        };
        vested.clamp(0, self.balance)
    }

    /// Withdraws `amount`, failing if it exceeds what's currently
    /// withdrawable. Resets the coin-seconds accumulator proportionally so
    /// a partial withdrawal doesn't let the remainder re-claim already-spent
    /// accrual.
    pub fn withdraw(&mut self, amount: Amount, now: Timestamp) -> Result<(), &'static str> {
        self.accrue_coin_seconds(now);
        let withdrawable = self.withdrawable(now);
        if amount <= 0 || amount > withdrawable {
            return Err("amount exceeds withdrawable balance");
        }
        if let VestingPolicy::CoinDaysDestroyed { .. } = self.policy {
            let fraction_remaining = if self.balance == 0 {
                0i128
            } else {
                self.coin_seconds_earned * (self.balance - amount) as i128 / self.balance as i128
            };
            self.coin_seconds_earned = fraction_remaining;
        }
        self.balance -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_balance() -> VestingBalance {
        VestingBalance {
            id: VestingBalanceId::new(0),
            owner: AccountId::new(0),
            asset_id: AssetId::new(0),
            original_amount: 1_000,
            balance: 1_000,
            policy: VestingPolicy::Linear { vesting_secs: 100 },
            created_at: Timestamp::from_unix_secs(0),
            coin_seconds_earned: 0,
            coin_seconds_last_update: Timestamp::from_unix_secs(0),
        }
    }

    #[test]
    fn linear_vesting_grows_proportionally() {
        let b = linear_balance();
        assert_eq!(b.withdrawable(Timestamp::from_unix_secs(0)), 0);
        assert_eq!(b.withdrawable(Timestamp::from_unix_secs(50)), 500);
        assert_eq!(b.withdrawable(Timestamp::from_unix_secs(100)), 1_000);
    }

    #[test]
    fn linear_vesting_never_exceeds_balance_after_partial_withdrawal() {
        let mut b = linear_balance();
        b.withdraw(400, Timestamp::from_unix_secs(50)).unwrap();
        assert_eq!(b.balance, 600);
        // Fully vested by t=100 regardless of the earlier withdrawal.
        assert_eq!(b.withdrawable(Timestamp::from_unix_secs(100)), 600);
    }

    #[test]
    fn withdrawal_beyond_vested_amount_is_rejected() {
        let mut b = linear_balance();
        assert!(b.withdraw(600, Timestamp::from_unix_secs(50)).is_err());
    }

    #[test]
    fn coin_days_destroyed_respects_minimum_hold_and_caps_at_balance() {
        let mut b = VestingBalance {
            id: VestingBalanceId::new(0),
            owner: AccountId::new(0),
            asset_id: AssetId::new(0),
            original_amount: 1_000,
            balance: 1_000,
            policy: VestingPolicy::CoinDaysDestroyed {
                vesting_secs: 1_000,
                min_withdraw_secs: 10,
            },
            created_at: Timestamp::from_unix_secs(0),
            coin_seconds_earned: 0,
            coin_seconds_last_update: Timestamp::from_unix_secs(0),
        };
        assert_eq!(b.withdrawable(Timestamp::from_unix_secs(5)), 0);
        b.accrue_coin_seconds(Timestamp::from_unix_secs(2_000));
        // Way more coin-seconds accrued than the vesting window implies;
        // still clamped to the live balance, never beyond it.
        assert_eq!(b.withdrawable(Timestamp::from_unix_secs(2_000)), 1_000);
    }
}
