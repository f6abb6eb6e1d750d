//! The pending-transaction pool a node gossips and draws from when it is
//! its turn to produce a block.
//!
//! Transactions are speculatively applied against the live database the
//! moment they're accepted, inside a dedicated undo session, so a
//! transaction that only became valid because of another still-pending
//! transaction (spending a balance it just received, say) is accepted too.
//! That session is rolled all the way back before every block apply and
//! the surviving transactions are re-validated one at a time afterward —
//! anything the new block itself invalidated is quietly dropped instead of
//! poisoning the next block's attempt.

use forge_chain::fee::FeeSchedule;
use forge_chain::{apply_transaction, verify_transaction_signatures, ObjectDatabase, SignedTransaction};
use forge_core::{ChainId, CoreResult, GlobalParameters, ObjectId, Timestamp};
use forge_db::{UndoBacked, UndoSession};

/// Transactions accepted but not yet included in a block, applied
/// speculatively against the database `session` wraps.
pub struct PendingPool<'a> {
    session: UndoSession<'a, ObjectDatabase>,
    chain_id: ChainId,
    core_asset_id: ObjectId,
    transactions: Vec<SignedTransaction>,
}

impl<'a> PendingPool<'a> {
    pub fn new(db: &'a mut ObjectDatabase, chain_id: ChainId, core_asset_id: ObjectId) -> Self {
        PendingPool { session: db.begin_session(), chain_id, core_asset_id, transactions: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transactions(&self) -> &[SignedTransaction] {
        &self.transactions
    }

    /// Verifies and speculatively applies `tx`, keeping it in the pool only
    /// if both succeed.
    pub fn accept(
        &mut self,
        now: Timestamp,
        params: &GlobalParameters,
        fee_schedule: &FeeSchedule,
        tx: SignedTransaction,
    ) -> CoreResult<()> {
        let signed = verify_transaction_signatures(self.chain_id, &tx)?;
        apply_transaction(
            self.session.db_mut(),
            now,
            self.core_asset_id,
            params,
            fee_schedule,
            &signed,
            &tx.transaction,
        )?;
        self.transactions.push(tx);
        Ok(())
    }

    /// Drains every pending transaction, undoing their speculative effects
    /// so the database is clean for a block about to be applied on top of
    /// it. The caller re-submits whichever of the returned transactions it
    /// still wants considered once that block has landed.
    pub fn drain_for_block(self) -> Vec<SignedTransaction> {
        drop(self.session);
        self.transactions
    }

    /// Re-validates `transactions` against the current database state one
    /// at a time, keeping the ones that still apply and logging the ones
    /// that don't. Used after a block lands to repopulate the pool for the
    /// next one.
    pub fn refill(
        db: &'a mut ObjectDatabase,
        chain_id: ChainId,
        core_asset_id: ObjectId,
        now: Timestamp,
        params: &GlobalParameters,
        fee_schedule: &FeeSchedule,
        transactions: Vec<SignedTransaction>,
    ) -> Self {
        let mut pool = PendingPool::new(db, chain_id, core_asset_id);
        for tx in transactions {
            if let Err(err) = pool.accept(now, params, fee_schedule, tx) {
                tracing::warn!(?err, "dropping pending transaction that no longer applies");
            }
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_chain::fee::FeeSchedule;

    #[test]
    fn a_fresh_pool_is_empty() {
        let mut db = ObjectDatabase::new();
        let pool = PendingPool::new(&mut db, ChainId::from_bytes([0u8; 32]), ObjectId::new(1, 3, 0));
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn draining_an_empty_pool_returns_nothing() {
        let mut db = ObjectDatabase::new();
        let pool = PendingPool::new(&mut db, ChainId::from_bytes([0u8; 32]), ObjectId::new(1, 3, 0));
        assert!(pool.drain_for_block().is_empty());
    }

    #[test]
    fn a_malformed_transaction_is_rejected_and_not_retained() {
        let mut db = ObjectDatabase::new();
        let mut pool = PendingPool::new(&mut db, ChainId::from_bytes([0u8; 32]), ObjectId::new(1, 3, 0));
        let params = GlobalParameters::default();
        let fee_schedule = FeeSchedule::with_defaults();
        let tx = SignedTransaction {
            transaction: forge_chain::eval::transaction::Transaction {
                expiration: Timestamp::from_unix_secs(0),
                entries: Vec::new(),
            },
            signatures: Vec::new(),
        };
        let result = pool.accept(Timestamp::from_unix_secs(100), &params, &fee_schedule, tx);
        assert!(result.is_err());
        assert!(pool.is_empty());
    }
}
