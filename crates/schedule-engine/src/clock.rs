//! Injectable source of "now".
//!
//! Computations never read the system clock directly; the engine asks its
//! [`Clock`] and converts the instant into the tenant's wall-clock time.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the OS clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used by tests and the CLI's `--now`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The clock's current instant as wall-clock time in `tz`.
pub fn local_now(clock: &dyn Clock, tz: Tz) -> NaiveDateTime {
    clock.now().with_timezone(&tz).naive_local()
}
