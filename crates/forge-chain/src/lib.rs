//! ─── ForgeChain Validating Core ──────────────────────────────────────────
//!
//! The object database, transaction evaluation pipeline, and matching-engine
//! wiring that turn a signed [`model::operation::Operation`] into a mutation
//! of chain state. Block production, fork resolution, and the maintenance
//! loop live one layer up in `forge-consensus`, which depends on this crate
//! for `db::ObjectDatabase` and `eval::apply_transaction` and supplies the
//! witness schedule and wall-clock time this crate only ever receives as
//! plain arguments.

pub mod db;
pub mod eval;
pub mod fee;
pub mod model;

pub use db::ObjectDatabase;
pub use eval::{
    apply_transaction, transaction_digest, verify_transaction_signatures, EvalContext,
    SignedTransaction, Transaction, TransactionEntry, TransactionSignature,
};
pub use fee::{FeeSchedule, FeeSettlement, OperationKind};
pub use model::Operation;
