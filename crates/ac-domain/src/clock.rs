//! Wall-clock access as an injectable dependency (spec §9: "pass a
//! `CoreContext` struct ... holding handles to Store, UpstreamClient, Queue,
//! **Clock**, Logger to every component").
//!
//! `updatedAt` and staleness (§4.3, §8 P7) are defined in terms of wall time,
//! so every component that reads or writes them takes a `&dyn Clock` instead
//! of calling `Utc::now()` directly — this is what lets the service/queue/
//! sweeper tests fix "now" instead of racing the real clock.

use chrono::{DateTime, Utc};
use chrono_tz::Europe::Berlin;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock, used in production wiring.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format a UTC instant as the stable Europe/Berlin wall-clock string used
/// for `Act::updated_at` (spec §3: `YYYY-MM-DD HH:MM:SS±HH:MM`).
///
/// This is a stable external contract (spec §9) — format once when composing
/// a record, parse only to compute staleness, never store as a raw number.
pub fn format_berlin(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Berlin).format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

/// Parse a Berlin-zone `updatedAt` string back into a UTC instant.
///
/// Returns `None` on any malformed or missing input — staleness
/// classification (spec §4.5 step 3) treats a parse failure the same as a
/// missing timestamp: stale.
pub fn parse_berlin(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
