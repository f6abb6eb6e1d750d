//! ─── ForgeChain Authority Resolver ───────────────────────────────────────
//!
//! Weighted-threshold multisig checking. An [`Authority`] is satisfied when
//! the sum of weights of the keys a transaction actually signed with —
//! plus the weight of any account authority that is itself transitively
//! satisfied — meets or exceeds `weight_threshold`. Recursion through
//! account authorities is bounded by `max_depth` (consensus constant
//! `MAX_SIG_CHECK_DEPTH`, currently 2) to keep verification cost bounded
//! regardless of how account authorities are wired together.

use forge_core::ObjectId;
use forge_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Which authority level is being satisfied. Active-authority checks also
/// accept a satisfied owner authority, since owner is strictly stronger;
/// owner-authority checks do not fall back to active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthClass {
    Active,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    pub key_auths: Vec<(PublicKey, u16)>,
    pub account_auths: Vec<(ObjectId, u16)>,
}

impl Authority {
    pub fn key_only(threshold: u32, keys: Vec<(PublicKey, u16)>) -> Self {
        Authority {
            weight_threshold: threshold,
            key_auths: keys,
            account_auths: Vec::new(),
        }
    }

    pub fn is_impossible(&self) -> bool {
        let max: u32 = self
            .key_auths
            .iter()
            .map(|(_, w)| u32::from(*w))
            .sum::<u32>()
            + self
                .account_auths
                .iter()
                .map(|(_, w)| u32::from(*w))
                .sum::<u32>();
        max < self.weight_threshold
    }
}

/// Looks up an account's active/owner authorities by id. Implemented by
/// whatever owns the concrete account object (`forge-chain`); kept generic
/// here so this crate never depends on the object database.
pub trait AuthorityProvider {
    fn active_authority(&self, account: ObjectId) -> Option<&Authority>;
    fn owner_authority(&self, account: ObjectId) -> Option<&Authority>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing signature: account {0} authority not satisfied")]
    MissingSignature(ObjectId),
    #[error("authority recursion exceeded max depth {0}")]
    DepthExceeded(u8),
    #[error("unknown account in authority graph: {0}")]
    UnknownAccount(ObjectId),
}

impl From<AuthError> for forge_core::CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingSignature(id) => forge_core::CoreError::MissingSignature(id),
            AuthError::DepthExceeded(max) => forge_core::CoreError::AuthorityDepthExceeded { max },
            AuthError::UnknownAccount(id) => forge_core::CoreError::Unknown(id),
        }
    }
}

/// Recursion + memoization context for one transaction's signature check.
struct Checker<'a, P: AuthorityProvider> {
    provider: &'a P,
    signed: &'a HashSet<PublicKey>,
    max_depth: u8,
    cache: HashMap<(ObjectId, AuthClass), bool>,
}

impl<'a, P: AuthorityProvider> Checker<'a, P> {
    fn authority_weight(&mut self, authority: &Authority, depth: u8) -> Result<u32, AuthError> {
        let mut weight = 0u32;
        for (key, w) in &authority.key_auths {
            if self.signed.contains(key) {
                weight += u32::from(*w);
            }
        }
        for (account, w) in &authority.account_auths {
            if depth >= self.max_depth {
                continue; // too deep to count this branch, but not an error by itself
            }
            if self.check(*account, AuthClass::Active, depth + 1)? {
                weight += u32::from(*w);
            }
        }
        Ok(weight)
    }

    fn check(&mut self, account: ObjectId, class: AuthClass, depth: u8) -> Result<bool, AuthError> {
        if depth > self.max_depth {
            return Err(AuthError::DepthExceeded(self.max_depth));
        }
        if let Some(cached) = self.cache.get(&(account, class)) {
            return Ok(*cached);
        }

        let result = match class {
            AuthClass::Owner => {
                let owner = self
                    .provider
                    .owner_authority(account)
                    .ok_or(AuthError::UnknownAccount(account))?
                    .clone();
                self.authority_weight(&owner, depth)? >= owner.weight_threshold
            }
            AuthClass::Active => {
                let active = self
                    .provider
                    .active_authority(account)
                    .ok_or(AuthError::UnknownAccount(account))?
                    .clone();
                let active_ok = self.authority_weight(&active, depth)? >= active.weight_threshold;
                if active_ok {
                    true
                } else {
                    // Owner is strictly stronger than active: a satisfied
                    // owner authority also satisfies an active requirement.
                    self.check(account, AuthClass::Owner, depth)?
                }
            }
        };

        self.cache.insert((account, class), result);
        Ok(result)
    }
}

/// Checks whether `signed` satisfies `account`'s authority at `class`,
/// recursing through account authorities up to `max_depth` levels deep.
pub fn satisfies<P: AuthorityProvider>(
    provider: &P,
    account: ObjectId,
    class: AuthClass,
    signed: &HashSet<PublicKey>,
    max_depth: u8,
) -> Result<bool, AuthError> {
    let mut checker = Checker {
        provider,
        signed,
        max_depth,
        cache: HashMap::new(),
    };
    checker.check(account, class, 0)
}

/// Convenience wrapper returning [`AuthError::MissingSignature`] instead of
/// `Ok(false)`, matching the error taxonomy's `MissingSignature` variant.
pub fn require<P: AuthorityProvider>(
    provider: &P,
    account: ObjectId,
    class: AuthClass,
    signed: &HashSet<PublicKey>,
    max_depth: u8,
) -> Result<(), AuthError> {
    if satisfies(provider, account, class, signed, max_depth)? {
        Ok(())
    } else {
        Err(AuthError::MissingSignature(account))
    }
}
