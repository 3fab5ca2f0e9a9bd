//! # Clock Abstraction
//!
//! Expiring backends never call `SystemTime::now()` directly; they hold a
//! [`Clock`] so TTL behavior is deterministic under test. Production code
//! uses [`SystemClock`], tests drive [`ManualClock`] forward explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// =============================================================================
// CLOCK TRAIT
// =============================================================================

/// Source of the current time in milliseconds since the Unix epoch.
///
/// Implementations must be safe to share across threads; backends hold
/// them as `Arc<dyn Clock>`.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

// =============================================================================
// SYSTEM CLOCK
// =============================================================================

/// Wall-clock time. The default for every backend constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // A clock before the epoch reads as 0 rather than failing.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

// =============================================================================
// MANUAL CLOCK
// =============================================================================

/// A clock that only moves when told to. Intended for tests that assert
/// expiry without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at the given epoch offset.
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(start_millis),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, delta: Duration) {
        self.millis
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute epoch offset.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// =============================================================================
// TESTS
// =============================================================================
