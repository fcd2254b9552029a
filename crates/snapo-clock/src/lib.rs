//! Clock capability: monotonic + wall time, injected rather than read from
//! global state so the rest of the pipeline stays deterministic under test.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic + wall time source consumed by the interception engine and the
/// log-tab processor. Implementations must be cheap to call -- every
/// observed request/response/message timestamps through this trait.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch, for export (HAR `startedDateTime`,
    /// NDJSON `tWallMs`).
    fn wall_ms(&self) -> i64;

    /// Nanoseconds on an arbitrary monotonic origin, for duration math.
    /// Never goes backwards within a process lifetime.
    fn mono_ns(&self) -> i64;
}

/// Default `Clock` backed by `SystemTime`/`Instant`.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn mono_ns(&self) -> i64 {
        self.origin.elapsed().as_nanos() as i64
    }
}

/// A manually-advanced clock for deterministic tests.
///
/// Both components start at 0 and only move when told to, so duration
/// assertions in tests don't race real wall-clock time.
pub struct FakeClock {
    wall_ms: AtomicI64,
    mono_ns: AtomicI64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            wall_ms: AtomicI64::new(0),
            mono_ns: AtomicI64::new(0),
        }
    }

    pub fn set_wall_ms(&self, v: i64) {
        self.wall_ms.store(v, Ordering::SeqCst);
    }

    pub fn set_mono_ns(&self, v: i64) {
        self.mono_ns.store(v, Ordering::SeqCst);
    }

    pub fn advance_mono_ns(&self, delta: i64) {
        self.mono_ns.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn advance_wall_ms(&self, delta: i64) {
        self.wall_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn wall_ms(&self) -> i64 {
        self.wall_ms.load(Ordering::SeqCst)
    }

    fn mono_ns(&self) -> i64 {
        self.mono_ns.load(Ordering::SeqCst)
    }
}
