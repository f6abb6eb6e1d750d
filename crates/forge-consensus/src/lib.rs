//! ─── ForgeChain Consensus ────────────────────────────────────────────────
//!
//! Block production and validation, fork tracking and reorg, the
//! maintenance interval, and the pending-transaction pool that feeds a
//! witness its next block. Everything here drives `forge-chain`'s
//! `ObjectDatabase` and `apply_transaction` from the outside; this crate
//! owns wall-clock time, the witness schedule, and undo-session lifetimes
//! that `forge-chain` only ever receives as plain arguments.

pub mod block;
pub mod fork;
pub mod maintenance;
pub mod pending;
pub mod witness_schedule;

pub use block::{apply_block, apply_block_with_options, block_digest, produce_block, ApplyOptions, BlockHeader, BlockId, SignedBlock};
pub use fork::ForkDatabase;
pub use maintenance::perform_maintenance;
pub use pending::PendingPool;
