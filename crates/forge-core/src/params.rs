//! Chain-wide configuration. `GlobalParameters` is itself an object the
//! maintenance loop can update (subject to the bounds below); the bounds
//! are consensus constants, not configuration.

use serde::{Deserialize, Serialize};

/// Hard bounds enforced whenever `GlobalParameters` is replaced, whether at
/// genesis or via a maintenance-time proposed update.
pub const MIN_BLOCK_INTERVAL_SECS: u32 = 1;
pub const MAX_BLOCK_INTERVAL_SECS: u32 = 30;
pub const MAX_FEED_PRODUCERS: u16 = 200;
pub const MAX_SIG_CHECK_DEPTH: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalParameters {
    pub block_interval_secs: u32,
    pub maintenance_interval_secs: u32,
    pub max_block_size: u32,
    pub max_transaction_size: u32,
    pub max_transaction_expiration_secs: u32,
    pub max_undo_history: u32,
    pub max_feed_producers: u16,
    pub max_market_fee_bps: u16,
    pub max_sig_check_depth: u8,
    pub genesis_proposal_review_period_secs: u32,
    pub active_witness_count: u16,
    pub active_delegate_count: u16,
}

impl Default for GlobalParameters {
    fn default() -> Self {
        GlobalParameters {
            block_interval_secs: 5,
            maintenance_interval_secs: 24 * 3600,
            max_block_size: 2 * 1024 * 1024,
            max_transaction_size: 64 * 1024,
            max_transaction_expiration_secs: 24 * 3600,
            max_undo_history: 10_000,
            max_feed_producers: MAX_FEED_PRODUCERS,
            max_market_fee_bps: 10_000,
            max_sig_check_depth: MAX_SIG_CHECK_DEPTH,
            genesis_proposal_review_period_secs: 7 * 24 * 3600,
            active_witness_count: 21,
            active_delegate_count: 21,
        }
    }
}

impl GlobalParameters {
    /// Validates the bounds `spec.md` §6 calls out explicitly.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_interval_secs < MIN_BLOCK_INTERVAL_SECS
            || self.block_interval_secs > MAX_BLOCK_INTERVAL_SECS
        {
            return Err(format!(
                "block_interval_secs {} out of range [{}, {}]",
                self.block_interval_secs, MIN_BLOCK_INTERVAL_SECS, MAX_BLOCK_INTERVAL_SECS
            ));
        }
        if self.max_feed_producers > MAX_FEED_PRODUCERS {
            return Err(format!(
                "max_feed_producers {} exceeds {}",
                self.max_feed_producers, MAX_FEED_PRODUCERS
            ));
        }
        if self.max_sig_check_depth > MAX_SIG_CHECK_DEPTH {
            return Err(format!(
                "max_sig_check_depth {} exceeds {}",
                self.max_sig_check_depth, MAX_SIG_CHECK_DEPTH
            ));
        }
        if self.max_market_fee_bps > 10_000 {
            return Err(format!(
                "max_market_fee_bps {} exceeds 10000",
                self.max_market_fee_bps
            ));
        }
        Ok(())
    }
}
