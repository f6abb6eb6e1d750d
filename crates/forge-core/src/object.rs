//! The contract every object-database entity implements.

use crate::id::{InstanceId, ObjectId};

/// Any value stored in the object database. `define_object!` wires this up
/// for concrete entity types so `forge-db`'s index registry can stay
/// generic instead of hand-rolling a tree per entity kind.
pub trait Object: Clone {
    type Id: InstanceId + Into<ObjectId>;
    const SPACE: u8;
    const TYPE: u8;
}
