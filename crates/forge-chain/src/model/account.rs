//! Accounts and their per-asset balances.

use forge_auth::Authority;
use forge_core::{define_object, ObjectId};
use forge_crypto::PublicKey;
use forge_market::Amount;
use serde::{Deserialize, Serialize};

pub const MIN_ACCOUNT_NAME_LEN: usize = 3;
pub const MAX_ACCOUNT_NAME_LEN: usize = 63;

/// `true` if `name` could be registered: lowercase ascii letters, digits,
/// `-` and `.`, with at most one `/` splitting the name into a parent
/// account and a single sub-account segment. Each segment must start with
/// a letter and carry no leading, trailing, or doubled punctuation.
pub fn is_valid_account_name(name: &str) -> bool {
    if name.len() < MIN_ACCOUNT_NAME_LEN || name.len() > MAX_ACCOUNT_NAME_LEN {
        return false;
    }
    let mut segments = name.split('/');
    let (Some(first), second, rest) = (segments.next(), segments.next(), segments.next()) else {
        return false;
    };
    if rest.is_some() {
        return false;
    }
    if !is_valid_name_segment(first) {
        return false;
    }
    match second {
        Some(sub) => is_valid_name_segment(sub),
        None => true,
    }
}

fn is_valid_name_segment(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let bytes = segment.as_bytes();
    if !bytes[0].is_ascii_lowercase() {
        return false;
    }
    let mut prev_punct = false;
    for &b in bytes {
        match b {
            b'a'..=b'z' | b'0'..=b'9' => prev_punct = false,
            b'-' | b'.' => {
                if prev_punct {
                    return false;
                }
                prev_punct = true;
            }
            _ => return false,
        }
    }
    !prev_punct
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub owner: Authority,
    pub active: Authority,
    pub memo_key: PublicKey,
    pub voting_key: PublicKey,
    /// Witnesses and delegates this account votes for.
    pub vote_targets: Vec<ObjectId>,
    pub referrer: ObjectId,
    /// Share of this account's network fees, in whole percent (0-100), paid
    /// back to `referrer` instead of the fee pool. Meaningless when
    /// `referrer` is null.
    pub referrer_percent: u8,
    /// Prime accounts pay no network fee share to their referrer and carry
    /// extra weight in vote tallies; set once at registration and never
    /// revocable.
    pub is_prime: bool,
    /// Core-asset value currently committed to this account's open
    /// limit/short orders. Kept here rather than recomputed from the order
    /// book on every balance check, with the invariant that
    /// `core_balance + total_core_in_orders` never changes except through
    /// transfers, fee payments, and order fills.
    pub total_core_in_orders: Amount,
}

define_object!(AccountMarker, AccountId, Account, space = 1u8, type_id = 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: AccountBalanceId,
    pub owner: AccountId,
    pub asset_id: ObjectId,
    pub amount: Amount,
}

define_object!(
    AccountBalanceMarker,
    AccountBalanceId,
    AccountBalance,
    space = 2u8,
    type_id = 1
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_accepted() {
        assert!(is_valid_account_name("alice"));
        assert!(is_valid_account_name("alice-bob"));
        assert!(is_valid_account_name("ab1"));
        assert!(is_valid_account_name("alice.bob"));
        assert!(is_valid_account_name("alice/vault"));
    }

    #[test]
    fn invalid_names_rejected() {
        assert!(!is_valid_account_name(""));
        assert!(!is_valid_account_name("ab"));
        assert!(!is_valid_account_name("Alice"));
        assert!(!is_valid_account_name("-alice"));
        assert!(!is_valid_account_name("alice-"));
        assert!(!is_valid_account_name("alice--bob"));
        assert!(!is_valid_account_name("alice_bob"));
        assert!(!is_valid_account_name("alice.-bob"));
        assert!(!is_valid_account_name("alice/vault/sub"));
        assert!(!is_valid_account_name("alice/"));
        assert!(!is_valid_account_name("/alice"));
    }
}
