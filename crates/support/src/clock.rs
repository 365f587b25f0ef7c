use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::constants::{CLOCK_AFTER_EPOCH, THIS_IS_A_BUG};

/// A source of milliseconds since the unix epoch.
///
/// The schedulers never read the system time directly, which makes their
/// timed behavior fully drivable from tests via [`MockClock`].
pub trait Clock: fmt::Debug + Send + Sync {
    fn now_ms(&self) -> i64;
}

/// A [`Clock`] backed by the system wall clock.
#[derive(Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect(&format!("{CLOCK_AFTER_EPOCH}{THIS_IS_A_BUG}"))
            .as_millis() as i64
    }
}

/// A [`Clock`] which returns a pre-programmed time, advanced explicitly.
#[derive(Debug)]
pub struct MockClock {
    now: AtomicI64,
}

impl MockClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
