//! ─── ForgeChain Core Types ───────────────────────────────────────────────
//!
//! Shared vocabulary for the validating core: object identity, the core
//! error taxonomy, wall-clock time, chain-wide parameters, and the
//! collaborator traits (`ports`) that keep the core ignorant of gossip,
//! RPC, wallets and disk format.

pub mod chain_id;
pub mod error;
pub mod id;
pub mod object;
pub mod params;
pub mod ports;
pub mod time;

pub use chain_id::ChainId;
pub use error::{CoreError, CoreResult};
pub use id::{IdSpace, ObjectId, TypedId};
pub use object::Object;
pub use params::GlobalParameters;
pub use time::Timestamp;
