//! Wall-clock time source wired to the real system clock. The validating
//! core never reads the clock itself — it only ever sees a
//! [`forge_core::ports::Clock`] — so this is the one place `chrono::Utc`
//! actually gets called.

use forge_core::ports::Clock;
use forge_core::Timestamp;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_secs(chrono::Utc::now().timestamp())
    }
}
