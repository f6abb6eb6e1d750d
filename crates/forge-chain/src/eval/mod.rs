//! Per-operation evaluation and application. Each submodule owns one family
//! of operations; `transaction` is the only one that reaches across the
//! others, dispatching by `Operation` variant and wrapping the whole
//! transaction in a single undo session.

pub mod account;
pub mod asset;
pub mod context;
pub mod key;
pub mod orders;
pub mod proposal;
pub mod transaction;
pub mod vesting;
pub mod withdraw;
pub mod witness;

pub use context::EvalContext;
pub use transaction::{
    apply_transaction, transaction_digest, verify_transaction_signatures, SignedTransaction,
    Transaction, TransactionEntry, TransactionSignature,
};
