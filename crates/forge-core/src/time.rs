//! Wall-clock time. The core never reads the system clock directly — every
//! timestamp comparison goes through a [`Timestamp`] supplied by a
//! [`crate::ports::Clock`] collaborator, so replay and tests can drive time
//! deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch, UTC. Matches the wire encoding of block and
/// transaction timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    pub fn from_unix_secs(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn unix_secs(self) -> i64 {
        self.0
    }

    pub fn checked_add_secs(self, secs: i64) -> Option<Self> {
        self.0.checked_add(secs).map(Timestamp)
    }

    pub fn saturating_add_secs(self, secs: i64) -> Self {
        Timestamp(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Sub for Timestamp {
    type Output = i64;
    fn sub(self, rhs: Timestamp) -> i64 {
        self.0 - rhs.0
    }
}
