//! The evaluation context threaded through every operation handler: database
//! access, wall-clock time, chain-wide parameters, the fee schedule, and the
//! set of keys that actually signed this transaction.

use std::collections::HashSet;

use forge_auth::AuthorityProvider;
use forge_core::id::InstanceId;
use forge_core::{CoreResult, GlobalParameters, ObjectId, Timestamp};
use forge_crypto::PublicKey;

use crate::db::ObjectDatabase;
use crate::fee::FeeSchedule;
use crate::model::account::AccountId;

pub struct EvalContext<'a> {
    pub db: &'a mut ObjectDatabase,
    pub now: Timestamp,
    pub core_asset_id: ObjectId,
    pub params: &'a GlobalParameters,
    pub fee_schedule: &'a FeeSchedule,
    pub signed: &'a HashSet<PublicKey>,
}

impl<'a> EvalContext<'a> {
    /// Requires that `account`'s authority at `class` is satisfied by the
    /// keys that signed this transaction.
    pub fn require_authority(
        &self,
        account: AccountId,
        class: forge_auth::AuthClass,
    ) -> CoreResult<()> {
        forge_auth::require(
            &DbAuthorityProvider(&*self.db),
            account.into(),
            class,
            self.signed,
            self.params.max_sig_check_depth,
        )
        .map_err(Into::into)
    }
}

/// Adapts [`ObjectDatabase`] to the matching-independent [`AuthorityProvider`]
/// contract `forge-auth` needs, without giving that crate a dependency on
/// the concrete database type.
pub struct DbAuthorityProvider<'a>(pub &'a ObjectDatabase);

impl<'a> AuthorityProvider for DbAuthorityProvider<'a> {
    fn active_authority(&self, account: ObjectId) -> Option<&forge_auth::Authority> {
        let id = AccountId::from_instance(account.instance());
        forge_db::ops::try_get(self.0, id).map(|a| &a.active)
    }

    fn owner_authority(&self, account: ObjectId) -> Option<&forge_auth::Authority> {
        let id = AccountId::from_instance(account.instance());
        forge_db::ops::try_get(self.0, id).map(|a| &a.owner)
    }
}
