use crate::id::ObjectId;
use thiserror::Error;

/// Every way core validation can refuse a transaction, block, or maintenance
/// step. Matches the node's error taxonomy one-to-one with its causes so a
/// caller can branch on variant instead of parsing a message.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Structural / wire errors ─────────────────────────────────────────
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("unknown object: {0}")]
    Unknown(ObjectId),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    // ── Authority errors ──────────────────────────────────────────────────
    #[error("missing signature from {0}")]
    MissingSignature(ObjectId),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("authority recursion exceeded max depth {max}")]
    AuthorityDepthExceeded { max: u8 },

    // ── Balance / fee errors ──────────────────────────────────────────────
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u128, have: u128 },

    #[error("insufficient fee pool: need {need}, have {have}")]
    InsufficientFeePool { need: u128, have: u128 },

    #[error("insufficient collateral: ratio would fall below {min_bps} bps")]
    InsufficientCollateral { min_bps: u16 },

    // ── Invariant errors ──────────────────────────────────────────────────
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    // ── Lifecycle errors ───────────────────────────────────────────────────
    #[error("expired at {expiration}, now {now}")]
    Expired { expiration: i64, now: i64 },

    #[error("duplicate: {0}")]
    Duplicate(String),

    // ── Market errors ──────────────────────────────────────────────────────
    #[error("market rule violated: {0}")]
    MarketRule(String),

    // ── Fork / consensus errors ────────────────────────────────────────────
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    #[error("block signed by wrong witness: expected {expected}, got {got}")]
    WrongWitness { expected: ObjectId, got: ObjectId },

    #[error("reorg failed, rolled back: {0}")]
    ReorgFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
