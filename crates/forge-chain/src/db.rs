//! The concrete object database: one [`forge_db::PrimaryIndex`] per entity
//! type, wired up via [`forge_db::has_index`], plus the secondary indices
//! that need more than raw primary-key lookup (account name, asset symbol).
//!
//! Every mutation goes through `forge_db::ops::{create, modify, remove}`
//! directly against this struct — there is no per-entity wrapper method set,
//! matching the generic-registry design those functions exist for.

use forge_core::ObjectId;
use forge_db::{has_index, ops, Observable, PrimaryIndex, UndoBacked, UndoLog, UndoSession, UniqueIndex};

use crate::model::account::{Account, AccountBalance, AccountId};
use crate::model::asset::{Asset, AssetId, BitassetData, DynamicAssetData};
use crate::model::delegate::Witness;
use crate::model::global::DynamicGlobalData;
use crate::model::key::Key;
use crate::model::market::{CallOrder, ForceSettlement, LimitOrder, ShortOrder};
use crate::model::proposal::Proposal;
use crate::model::vesting::VestingBalance;
use crate::model::withdraw::WithdrawPermission;

/// A mutation `ObjectDatabase` delivers to every registered observer, after
/// the fact and regardless of entity type — an account-history indexer or
/// a block explorer's live feed is the kind of consumer this exists for,
/// not anything `forge-chain`/`forge-consensus` themselves read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverEvent {
    Created(ObjectId),
    Modified(ObjectId),
    Removed(ObjectId),
}

#[derive(Default)]
pub struct ObjectDatabase {
    pub accounts: PrimaryIndex<Account>,
    pub account_balances: PrimaryIndex<AccountBalance>,
    pub assets: PrimaryIndex<Asset>,
    pub dynamic_asset_data: PrimaryIndex<DynamicAssetData>,
    pub bitasset_data: PrimaryIndex<BitassetData>,
    pub keys: PrimaryIndex<Key>,
    pub witnesses: PrimaryIndex<Witness>,
    pub proposals: PrimaryIndex<Proposal>,
    pub withdraw_permissions: PrimaryIndex<WithdrawPermission>,
    pub vesting_balances: PrimaryIndex<VestingBalance>,
    pub limit_orders: PrimaryIndex<LimitOrder>,
    pub short_orders: PrimaryIndex<ShortOrder>,
    pub call_orders: PrimaryIndex<CallOrder>,
    pub force_settlements: PrimaryIndex<ForceSettlement>,
    pub dynamic_global_data: PrimaryIndex<DynamicGlobalData>,

    /// Account name -> id. Names are globally unique at registration.
    pub account_names: UniqueIndex<String, AccountId>,
    /// Asset symbol -> id. Symbols are globally unique at registration.
    pub asset_symbols: UniqueIndex<String, AssetId>,
    /// (owner, asset) -> balance object, so a transfer never has to scan
    /// every balance object an account holds.
    pub balances_by_owner_asset: UniqueIndex<(AccountId, ObjectId), ObjectId>,

    log: UndoLog<ObjectDatabase>,

    /// Not part of consensus state: never snapshotted, never rolled back by
    /// undo. A hook that cares about unwound mutations must diff two
    /// snapshots itself, same as any other external observer would.
    observers: Vec<Box<dyn FnMut(ObserverEvent)>>,
}

has_index!(ObjectDatabase, Account, accounts);
has_index!(ObjectDatabase, AccountBalance, account_balances);
has_index!(ObjectDatabase, Asset, assets);
has_index!(ObjectDatabase, DynamicAssetData, dynamic_asset_data);
has_index!(ObjectDatabase, BitassetData, bitasset_data);
has_index!(ObjectDatabase, Key, keys);
has_index!(ObjectDatabase, Witness, witnesses);
has_index!(ObjectDatabase, Proposal, proposals);
has_index!(ObjectDatabase, WithdrawPermission, withdraw_permissions);
has_index!(ObjectDatabase, VestingBalance, vesting_balances);
has_index!(ObjectDatabase, LimitOrder, limit_orders);
has_index!(ObjectDatabase, ShortOrder, short_orders);
has_index!(ObjectDatabase, CallOrder, call_orders);
has_index!(ObjectDatabase, ForceSettlement, force_settlements);
has_index!(ObjectDatabase, DynamicGlobalData, dynamic_global_data);

impl UndoBacked for ObjectDatabase {
    fn undo_log(&mut self) -> &mut UndoLog<ObjectDatabase> {
        &mut self.log
    }
}

impl Observable for ObjectDatabase {
    fn notify_created(&mut self, id: ObjectId) {
        for observer in &mut self.observers {
            observer(ObserverEvent::Created(id));
        }
    }

    fn notify_modified(&mut self, id: ObjectId) {
        for observer in &mut self.observers {
            observer(ObserverEvent::Modified(id));
        }
    }

    fn notify_removed(&mut self, id: ObjectId) {
        for observer in &mut self.observers {
            observer(ObserverEvent::Removed(id));
        }
    }
}

impl ObjectDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(&mut self) -> UndoSession<'_, ObjectDatabase> {
        UndoSession::start(self)
    }

    /// Subscribes `observer` to every `create`/`modify`/`remove` from this
    /// point on. There is no unsubscribe: a node wires its observers once at
    /// startup and keeps them for its lifetime.
    pub fn register_observer(&mut self, observer: impl FnMut(ObserverEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Registers `name` as in use by `id`, recording its removal on the
    /// active undo session so a rolled-back registration frees the name
    /// again.
    pub fn register_account_name(&mut self, name: String, id: AccountId) {
        self.account_names.insert(name.clone(), id);
        self.log.record(move |db| {
            db.account_names.remove(&name);
        });
    }

    pub fn register_asset_symbol(&mut self, symbol: String, id: AssetId) {
        self.asset_symbols.insert(symbol.clone(), id);
        self.log.record(move |db| {
            db.asset_symbols.remove(&symbol);
        });
    }

    pub fn register_balance(&mut self, owner: AccountId, asset_id: ObjectId, balance_object: ObjectId) {
        let key = (owner, asset_id);
        self.balances_by_owner_asset.insert(key, balance_object);
        self.log.record(move |db| {
            db.balances_by_owner_asset.remove(&key);
        });
    }

    pub fn balance_object_for(&self, owner: AccountId, asset_id: ObjectId) -> Option<ObjectId> {
        self.balances_by_owner_asset.get(&(owner, asset_id))
    }

    pub fn account_by_name(&self, name: &str) -> Option<AccountId> {
        self.account_names.get(&name.to_string())
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<AssetId> {
        self.asset_symbols.get(&symbol.to_string())
    }

    /// The id of the singleton [`crate::model::global::DynamicGlobalData`]
    /// object. Always instance 0: genesis creates it first and nothing else
    /// is ever created in its (space, type) slot.
    pub fn dynamic_global_data_id() -> crate::model::global::DynamicGlobalDataId {
        crate::model::global::DynamicGlobalDataId::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::account::AccountBalanceId;

    #[test]
    fn account_name_registration_rolls_back_with_its_session() {
        let mut db = ObjectDatabase::new();
        {
            let mut session = db.begin_session();
            let owner_key = forge_crypto::KeyPair::generate().public_key();
            let active_key = forge_crypto::KeyPair::generate().public_key();
            let id = ops::create(session.db_mut(), |id| crate::model::account::Account {
                id,
                name: "alice".into(),
                owner: forge_auth::Authority::key_only(1, vec![(owner_key, 1)]),
                active: forge_auth::Authority::key_only(1, vec![(active_key, 1)]),
                memo_key: forge_crypto::KeyPair::generate().public_key(),
                voting_key: forge_crypto::KeyPair::generate().public_key(),
                vote_targets: Vec::new(),
                referrer: ObjectId::null(),
                referrer_percent: 0,
                is_prime: false,
                total_core_in_orders: 0,
            });
            session.db_mut().register_account_name("alice".into(), id);
            assert_eq!(session.db().account_by_name("alice"), Some(id));
            // session dropped without commit
        }
        assert_eq!(db.account_by_name("alice"), None);
        assert_eq!(db.accounts.len(), 0);
    }

    #[test]
    fn balance_lookup_finds_the_registered_object() {
        let mut db = ObjectDatabase::new();
        let owner = AccountId::new(0);
        let asset_id = ObjectId::new(1, 3, 0);
        let balance_id = ops::create(&mut db, |id: AccountBalanceId| AccountBalance {
            id,
            owner,
            asset_id,
            amount: 0,
        });
        db.register_balance(owner, asset_id, balance_id.into());
        assert_eq!(db.balance_object_for(owner, asset_id), Some(balance_id.into()));
    }

    #[test]
    fn registered_observer_sees_every_mutation() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut db = ObjectDatabase::new();
        let seen: Rc<RefCell<Vec<ObserverEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        db.register_observer(move |event| sink.borrow_mut().push(event));

        let owner = AccountId::new(0);
        let asset_id = ObjectId::new(1, 3, 0);
        let balance_id = ops::create(&mut db, |id: AccountBalanceId| AccountBalance {
            id,
            owner,
            asset_id,
            amount: 0,
        });
        ops::modify(&mut db, balance_id, |b| b.amount = 10).unwrap();
        ops::remove(&mut db, balance_id).unwrap();

        let events = seen.borrow();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ObserverEvent::Created(_)));
        assert!(matches!(events[1], ObserverEvent::Modified(_)));
        assert!(matches!(events[2], ObserverEvent::Removed(_)));
    }
}
