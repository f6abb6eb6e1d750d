//! The `create` / `get` / `modify` / `remove` contract every entity type
//! goes through. Generic over the concrete database type `DB` so adding a
//! new object type never means a new set of CRUD functions — only a
//! `HasIndex<T>` impl pointing at the right [`PrimaryIndex`] field.

use crate::index::PrimaryIndex;
use crate::undo::UndoBacked;
use forge_core::{CoreError, CoreResult, Object, ObjectId};

/// Implemented once per `(DB, T)` pair, usually by a small macro in the
/// crate that owns the concrete `DB` struct (see `forge-chain::db`).
pub trait HasIndex<T: Object> {
    fn index(&self) -> &PrimaryIndex<T>;
    fn index_mut(&mut self) -> &mut PrimaryIndex<T>;
}

/// Fired once per successful `create`/`modify`/`remove`, after the index
/// mutation and undo recording but regardless of whether the surrounding
/// transaction ultimately commits or unwinds — a hook sees every attempted
/// mutation, not just durable ones. Exists so read-side consumers (an
/// account-history indexer, a block explorer's live feed) can observe
/// every object change without the typed CRUD layer knowing they exist.
/// One `ObjectDatabase` implementation backs every entity type; a hook
/// that only cares about one `(space,type)` filters the `ObjectId` itself.
pub trait Observable {
    fn notify_created(&mut self, _id: ObjectId) {}
    fn notify_modified(&mut self, _id: ObjectId) {}
    fn notify_removed(&mut self, _id: ObjectId) {}
}

pub fn get<DB, T>(db: &DB, id: T::Id) -> CoreResult<&T>
where
    DB: HasIndex<T>,
    T: Object,
{
    db.index()
        .get_raw(forge_core::id::InstanceId::instance_value(&id))
        .ok_or_else(|| CoreError::Unknown(id.into()))
}

pub fn try_get<DB, T>(db: &DB, id: T::Id) -> Option<&T>
where
    DB: HasIndex<T>,
    T: Object,
{
    db.index()
        .get_raw(forge_core::id::InstanceId::instance_value(&id))
}

pub fn create<DB, T>(db: &mut DB, make: impl FnOnce(T::Id) -> T) -> T::Id
where
    DB: UndoBacked + HasIndex<T> + Observable,
    T: Object + Clone + Send + 'static,
{
    let instance = db.index().next_instance();
    let id = <T::Id as forge_core::id::InstanceId>::from_instance(instance);
    let value = make(id);
    db.index_mut().insert_raw(instance, value);
    db.undo_log().record(move |db: &mut DB| {
        db.index_mut().remove_raw(instance);
    });
    db.notify_created(id.into());
    id
}

pub fn modify<DB, T>(db: &mut DB, id: T::Id, f: impl FnOnce(&mut T)) -> CoreResult<()>
where
    DB: UndoBacked + HasIndex<T> + Observable,
    T: Object + Clone + Send + 'static,
{
    let instance = forge_core::id::InstanceId::instance_value(&id);
    let before = db
        .index()
        .get_raw(instance)
        .cloned()
        .ok_or_else(|| CoreError::Unknown(id.into()))?;
    let mut after = before.clone();
    f(&mut after);
    db.index_mut().insert_raw(instance, after);
    db.undo_log().record(move |db: &mut DB| {
        db.index_mut().insert_raw(instance, before.clone());
    });
    db.notify_modified(id.into());
    Ok(())
}

pub fn remove<DB, T>(db: &mut DB, id: T::Id) -> CoreResult<T>
where
    DB: UndoBacked + HasIndex<T> + Observable,
    T: Object + Clone + Send + 'static,
{
    let instance = forge_core::id::InstanceId::instance_value(&id);
    let removed = db
        .index_mut()
        .remove_raw(instance)
        .ok_or_else(|| CoreError::Unknown(id.into()))?;
    let restore = removed.clone();
    db.undo_log().record(move |db: &mut DB| {
        db.index_mut().insert_raw(instance, restore.clone());
    });
    db.notify_removed(id.into());
    Ok(removed)
}

/// Declares `HasIndex<$entity>` for `$db`, pointing at field `$field`. Used
/// once per entity type so the generic CRUD functions above stay
/// type-agnostic.
#[macro_export]
macro_rules! has_index {
    ($db:ty, $entity:ty, $field:ident) => {
        impl $crate::ops::HasIndex<$entity> for $db {
            fn index(&self) -> &$crate::index::PrimaryIndex<$entity> {
                &self.$field
            }
            fn index_mut(&mut self) -> &mut $crate::index::PrimaryIndex<$entity> {
                &mut self.$field
            }
        }
    };
}
