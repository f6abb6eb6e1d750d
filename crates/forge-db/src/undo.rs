//! Nested undo sessions over a generic database handle `DB`.
//!
//! Every mutation records the inverse action as a boxed closure onto the
//! innermost open session's frame. Dropping an uncommitted [`UndoSession`]
//! replays its frame's closures in reverse order, restoring exactly the
//! state before the session began — the same "RAII cleans up on unwind"
//! contract the validation log this core replaces used, translated to
//! Rust's `Drop` instead of C++ exception unwinding.

/// One inverse-mutation closure.
pub type UndoAction<DB> = Box<dyn FnOnce(&mut DB) + Send>;

/// The stack of open session frames. `DB` implements [`UndoBacked`] and
/// embeds one of these.
pub struct UndoLog<DB> {
    stack: Vec<Vec<UndoAction<DB>>>,
}

impl<DB> Default for UndoLog<DB> {
    fn default() -> Self {
        UndoLog { stack: Vec::new() }
    }
}

impl<DB> UndoLog<DB> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently-open (nested) sessions.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn push_frame(&mut self) {
        self.stack.push(Vec::new());
    }

    fn pop_frame(&mut self) -> Vec<UndoAction<DB>> {
        self.stack.pop().unwrap_or_default()
    }

    /// Records the inverse of a mutation just applied. A no-op outside any
    /// open session — callers performing ungoverned (e.g. genesis) writes
    /// simply never pay for undo bookkeeping.
    pub fn record(&mut self, undo_action: impl FnOnce(&mut DB) + Send + 'static) {
        if let Some(top) = self.stack.last_mut() {
            top.push(Box::new(undo_action));
        }
    }
}

/// Implemented by the concrete database type to expose its [`UndoLog`].
pub trait UndoBacked: Sized {
    fn undo_log(&mut self) -> &mut UndoLog<Self>;
}

/// RAII guard for one undo session. Call [`UndoSession::commit`] to keep the
/// mutations (merging them into the parent session, or discarding the undo
/// record entirely if this was the outermost session); dropping without
/// committing rolls every mutation made during the session back out.
pub struct UndoSession<'a, DB: UndoBacked> {
    db: &'a mut DB,
    committed: bool,
}

impl<'a, DB: UndoBacked> UndoSession<'a, DB> {
    pub fn start(db: &'a mut DB) -> Self {
        db.undo_log().push_frame();
        UndoSession { db, committed: false }
    }

    pub fn db(&self) -> &DB {
        self.db
    }

    pub fn db_mut(&mut self) -> &mut DB {
        self.db
    }

    /// How many mutations are currently staged on this session's frame.
    pub fn pending_len(&self) -> usize {
        self.db
            .undo_log()
            .stack
            .last()
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Keeps the session's mutations. If a parent session is open, folds
    /// this session's undo actions into it so an enclosing rollback still
    /// unwinds them; otherwise the mutations become permanent.
    pub fn commit(mut self) {
        self.finish(true);
    }

    /// Explicit alias for `commit` at a non-outermost nesting level, matching
    /// the "merge into enclosing session" terminology used elsewhere in this
    /// codebase's undo vocabulary.
    pub fn merge(self) {
        self.commit();
    }

    /// Finalizes the session like [`commit`](Self::commit), but instead of
    /// folding the mutations into an open parent (or discarding the undo
    /// record entirely at the outermost level), hands back the recorded
    /// inverse actions so the caller can replay them later — a block that
    /// applied successfully but is later reorged away.
    ///
    /// Only meaningful for a session with no open parent; call this on the
    /// single top-level session wrapping one block's apply, never on a
    /// session nested inside another held-open one.
    pub fn into_retained_actions(mut self) -> Vec<UndoAction<DB>> {
        self.committed = true;
        self.db.undo_log().pop_frame()
    }

    fn finish(&mut self, commit: bool) {
        if self.committed {
            return;
        }
        self.committed = true;
        let frame = self.db.undo_log().pop_frame();
        if commit {
            if let Some(parent) = self.db.undo_log().stack.last_mut() {
                parent.extend(frame);
            }
        } else {
            for action in frame.into_iter().rev() {
                action(self.db);
            }
        }
    }
}

impl<'a, DB: UndoBacked> Drop for UndoSession<'a, DB> {
    fn drop(&mut self) {
        self.finish(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestDb {
        value: i64,
        log: UndoLog<TestDb>,
    }

    impl UndoBacked for TestDb {
        fn undo_log(&mut self) -> &mut UndoLog<TestDb> {
            &mut self.log
        }
    }

    fn bump(db: &mut TestDb, by: i64) {
        let before = db.value;
        db.value += by;
        db.undo_log().record(move |db| db.value = before);
    }

    #[test]
    fn rollback_on_drop_restores_value() {
        let mut db = TestDb::default();
        {
            let mut session = UndoSession::start(&mut db);
            bump(session.db_mut(), 5);
            bump(session.db_mut(), 10);
            assert_eq!(session.db().value, 15);
            // dropped without commit
        }
        assert_eq!(db.value, 0);
    }

    #[test]
    fn commit_keeps_mutation() {
        let mut db = TestDb::default();
        {
            let mut session = UndoSession::start(&mut db);
            bump(session.db_mut(), 7);
            session.commit();
        }
        assert_eq!(db.value, 7);
    }

    #[test]
    fn nested_session_rollback_only_unwinds_inner() {
        let mut db = TestDb::default();
        {
            let mut outer = UndoSession::start(&mut db);
            bump(outer.db_mut(), 1);
            {
                let mut inner = UndoSession::start(outer.db_mut());
                bump(inner.db_mut(), 100);
                // inner dropped, rolls back only its own +100
            }
            assert_eq!(outer.db().value, 1);
            outer.commit();
        }
        assert_eq!(db.value, 1);
    }

    #[test]
    fn nested_commit_merges_into_parent_rollback() {
        let mut db = TestDb::default();
        {
            let mut outer = UndoSession::start(&mut db);
            bump(outer.db_mut(), 1);
            {
                let mut inner = UndoSession::start(outer.db_mut());
                bump(inner.db_mut(), 100);
                inner.commit();
            }
            assert_eq!(outer.db().value, 101);
            // outer dropped without commit: both +1 and +100 unwind
        }
        assert_eq!(db.value, 0);
    }

    #[test]
    fn retained_actions_replay_to_undo_a_session_applied_earlier() {
        let mut db = TestDb::default();
        let actions = {
            let mut session = UndoSession::start(&mut db);
            bump(session.db_mut(), 5);
            bump(session.db_mut(), 2);
            session.into_retained_actions()
        };
        assert_eq!(db.value, 7);

        for action in actions.into_iter().rev() {
            action(&mut db);
        }
        assert_eq!(db.value, 0);
    }
}
