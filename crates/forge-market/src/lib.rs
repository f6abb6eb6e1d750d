//! ─── ForgeChain Matching Engine ──────────────────────────────────────────
//!
//! Limit/short/call order books, the per-delegate median price feed, and
//! the margin-call / forced-settlement / global-settlement machinery for
//! market-issued assets. Pure algorithms over plain data — storage and the
//! operation catalog that drives these functions live one layer up in
//! `forge-chain`, which depends on this crate rather than the other way
//! around, so the matching math has no dependency on account/asset
//! bookkeeping.

pub mod feed;
pub mod margin;
pub mod matching;
pub mod order;
pub mod types;

pub use feed::{median_feed, FeedSubmission, PriceFeed};
pub use matching::{apply_market_fee, match_limit_orders, match_short_against_limit, Fill};
pub use order::{CallOrder, ForceSettlement, LimitOrder, ShortOrder};
pub use types::{Amount, Asset, Price, MAX_SHARES};
