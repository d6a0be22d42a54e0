//! Injectable time source.
//!
//! Staleness checks and age-of-data computation both depend on "now".
//! Keeping the clock behind a trait lets tests pin time instead of
//! sleeping through freshness windows.

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
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
