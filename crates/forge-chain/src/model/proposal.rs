//! Deferred, multi-approval execution. A `ProposalCreate` operation wraps a
//! batch of other operations; instead of executing immediately it sits in
//! the database accumulating approvals until every required signer has
//! signed on, at which point it auto-executes (no later than its
//! expiration, no earlier than its review period deadline).

use std::collections::BTreeSet;

use crate::model::account::AccountId;
use crate::model::operation::Operation;
use forge_core::{define_object, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: AccountId,
    pub proposed_ops: Vec<Operation>,
    pub expiration: Timestamp,
    /// If set, the proposal cannot execute before this time even if fully
    /// approved — the window during which a losing minority can notice and
    /// react (e.g. by moving funds) before an owner-authority change lands.
    pub review_period_deadline: Option<Timestamp>,
    pub required_active_approvals: BTreeSet<AccountId>,
    pub required_owner_approvals: BTreeSet<AccountId>,
    pub available_active_approvals: BTreeSet<AccountId>,
    pub available_owner_approvals: BTreeSet<AccountId>,
}

define_object!(ProposalMarker, ProposalId, Proposal, space = 1u8, type_id = 7);

impl Proposal {
    /// `true` once every required signer (active or owner) has approved.
    /// Owner approval also satisfies an active requirement for the same
    /// account, since owner strictly dominates active.
    pub fn is_fully_approved(&self) -> bool {
        let active_satisfied = self.required_active_approvals.iter().all(|acct| {
            self.available_active_approvals.contains(acct)
                || self.available_owner_approvals.contains(acct)
        });
        let owner_satisfied = self
            .required_owner_approvals
            .iter()
            .all(|acct| self.available_owner_approvals.contains(acct));
        active_satisfied && owner_satisfied
    }

    /// `true` if `is_fully_approved()` and, when a review period is set,
    /// `now` has reached the deadline.
    pub fn is_ready_to_execute(&self, now: Timestamp) -> bool {
        if !self.is_fully_approved() {
            return false;
        }
        match self.review_period_deadline {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expiration
    }

    pub fn add_active_approval(&mut self, account: AccountId) {
        self.available_active_approvals.insert(account);
    }

    pub fn remove_active_approval(&mut self, account: AccountId) {
        self.available_active_approvals.remove(&account);
    }

    pub fn add_owner_approval(&mut self, account: AccountId) {
        self.available_owner_approvals.insert(account);
    }

    pub fn remove_owner_approval(&mut self, account: AccountId) {
        self.available_owner_approvals.remove(&account);
    }
}
