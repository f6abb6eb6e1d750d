//! ─── ForgeChain Object Database ──────────────────────────────────────────
//!
//! A typed, in-memory object store with nested undo sessions. Every
//! consensus-relevant entity (accounts, assets, orders, ...) is stored in a
//! [`index::PrimaryIndex<T>`] and mutated only through [`ops::create`],
//! [`ops::modify`], and [`ops::remove`], which record an inverse action on
//! the active [`undo::UndoSession`] so a failed transaction or an undone
//! block leaves the database exactly as it was.

pub mod index;
pub mod ops;
pub mod undo;

pub use index::{OrderedIndex, PrimaryIndex, UniqueIndex};
pub use ops::{HasIndex, Observable};
pub use undo::{UndoAction, UndoBacked, UndoLog, UndoSession};
