//! Registers a raw key under an owning account, for wallets/explorers to
//! attach a human label to a key used in an authority — the key itself is
//! never looked up from here by the authority check, which only ever sees
//! the raw `PublicKey`.

use forge_auth::AuthClass;
use forge_core::CoreResult;
use forge_db::ops;

use crate::eval::context::EvalContext;
use crate::model::key::{Key, KeyId};
use crate::model::operation::KeyCreateOp;

pub fn evaluate_key_create(ctx: &EvalContext, op: &KeyCreateOp) -> CoreResult<()> {
    ctx.require_authority(op.owner, AuthClass::Active)?;
    ops::get(ctx.db, op.owner)?;
    Ok(())
}

pub fn apply_key_create(ctx: &mut EvalContext, op: &KeyCreateOp) -> CoreResult<KeyId> {
    Ok(ops::create(ctx.db, |id| Key {
        id,
        owner: op.owner,
        public_key: op.public_key,
        label: op.label.clone(),
    }))
}
