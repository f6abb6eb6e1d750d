//! Per-delegate price feeds and the chain-wide median derived from them.
//!
//! Market-issued assets have no on-chain price oracle of their own; a
//! rotating set of feed-producing delegates each publish a [`PriceFeed`],
//! and every field of the effective feed is the independent median across
//! whichever feeds are younger than the feed lifetime — not a single
//! "closest to median" feed chosen wholesale. Medianing fields
//! independently means the effective feed is never exactly equal to any
//! one delegate's submission, which is the point: no single delegate
//! controls the settlement price.

use crate::types::Price;
use forge_core::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeed {
    /// Floor price below which a margin call's forced sale will not go,
    /// independent of the feed's settlement price.
    pub call_limit: Price,
    /// Shorts only match against bids at or above this price.
    pub short_limit: Price,
    pub max_margin_period_secs: u32,
    /// Basis points, e.g. 2000 = 200% collateral required to open a
    /// position.
    pub required_initial_collateral_bps: u16,
    /// Basis points, e.g. 1750 = 175%; a position is margin-called once its
    /// collateral ratio falls to this level.
    pub required_maintenance_collateral_bps: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeedSubmission {
    pub feed: PriceFeed,
    pub published_at: Timestamp,
}

fn median_u16(mut values: Vec<u16>) -> u16 {
    values.sort_unstable();
    values[values.len() / 2]
}

fn median_u32(mut values: Vec<u32>) -> u32 {
    values.sort_unstable();
    values[values.len() / 2]
}

fn median_price(mut values: Vec<Price>) -> Price {
    // Prices across feeds share a market by construction (same base/quote
    // pair for a given market-issued asset), so ordering by `base.amount`
    // at a fixed `quote.amount` would require normalization; instead
    // compare via `cmp_oriented` against the first entry to get a total
    // order cheaply.
    values.sort_by(|a, b| a.cmp_oriented(*b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}

/// Computes the effective feed from every submission younger than
/// `max_age_secs` as of `now`, taking the median of each field
/// independently. Returns `None` if no submission is young enough.
pub fn median_feed(submissions: &[FeedSubmission], now: Timestamp, max_age_secs: u32) -> Option<PriceFeed> {
    let fresh: Vec<PriceFeed> = submissions
        .iter()
        .filter(|s| now.unix_secs() - s.published_at.unix_secs() <= i64::from(max_age_secs))
        .map(|s| s.feed)
        .collect();
    if fresh.is_empty() {
        return None;
    }
    Some(PriceFeed {
        call_limit: median_price(fresh.iter().map(|f| f.call_limit).collect()),
        short_limit: median_price(fresh.iter().map(|f| f.short_limit).collect()),
        max_margin_period_secs: median_u32(fresh.iter().map(|f| f.max_margin_period_secs).collect()),
        required_initial_collateral_bps: median_u16(
            fresh.iter().map(|f| f.required_initial_collateral_bps).collect(),
        ),
        required_maintenance_collateral_bps: median_u16(
            fresh
                .iter()
                .map(|f| f.required_maintenance_collateral_bps)
                .collect(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Asset;
    use forge_core::ObjectId;

    fn price(base_amount: i64, quote_amount: i64) -> Price {
        Price::new(
            Asset::new(base_amount, ObjectId::new(1, 3, 0)),
            Asset::new(quote_amount, ObjectId::new(1, 3, 1)),
        )
    }

    fn feed(call: i64, initial_bps: u16) -> PriceFeed {
        PriceFeed {
            call_limit: price(call, 1),
            short_limit: price(call, 1),
            max_margin_period_secs: 3600,
            required_initial_collateral_bps: initial_bps,
            required_maintenance_collateral_bps: 1750,
        }
    }

    #[test]
    fn median_ignores_stale_submissions() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let submissions = vec![
            FeedSubmission {
                feed: feed(100, 2000),
                published_at: Timestamp::from_unix_secs(now.unix_secs() - 10),
            },
            FeedSubmission {
                feed: feed(200, 3000),
                published_at: Timestamp::from_unix_secs(now.unix_secs() - 100_000), // stale
            },
        ];
        let effective = median_feed(&submissions, now, 3600).unwrap();
        assert_eq!(effective.required_initial_collateral_bps, 2000);
    }

    #[test]
    fn median_is_middle_value_across_three_feeds() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let submissions: Vec<_> = [1000u16, 2000, 3000]
            .iter()
            .map(|bps| FeedSubmission {
                feed: feed(100, *bps),
                published_at: now,
            })
            .collect();
        let effective = median_feed(&submissions, now, 3600).unwrap();
        assert_eq!(effective.required_initial_collateral_bps, 2000);
    }

    #[test]
    fn no_fresh_feeds_returns_none() {
        let now = Timestamp::from_unix_secs(1_000_000);
        let submissions = vec![FeedSubmission {
            feed: feed(100, 2000),
            published_at: Timestamp::from_unix_secs(0),
        }];
        assert!(median_feed(&submissions, now, 3600).is_none());
    }
}
