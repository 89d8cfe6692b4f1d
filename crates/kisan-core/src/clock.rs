//! Wall-clock abstraction used to stamp fetch times.
//!
//! TTL expiry is measured by the cache backends themselves; this clock only
//! produces the `fetched_at` timestamps recorded alongside payloads.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(feature = "test-util")]
pub use manual::ManualClock;

#[cfg(feature = "test-util")]
mod manual {
    use super::Clock;
    use chrono::{DateTime, Duration, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Clock whose time only moves when told to. Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Creates a clock frozen at `start`.
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        /// Sets the current time.
        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock() = now;
        }

        /// Moves the current time forward.
        pub fn advance(&self, by: std::time::Duration) {
            if let Ok(by) = Duration::from_std(by) {
                let mut now = self.now.lock();
                if let Some(next) = now.checked_add_signed(by) {
                    *now = next;
                }
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }
}
