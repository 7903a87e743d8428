// sigil-gate-core/src/core/time.rs
// ============================================================================
// Module: Sigil Gate Time Model
// Description: Canonical timestamp representation for decisions and logs.
// Purpose: Provide deterministic, replayable time values across Sigil Gate records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Sigil Gate uses explicit time values supplied by callers to keep replay
//! deterministic. The core engines never read wall-clock time directly;
//! hosts pass timestamps into every operation that needs one. Circuit
//! cooldowns, hold expiry, and proposal TTLs are all computed from these
//! caller-supplied values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in Sigil Gate records.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads the
///   wall clock.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp advanced by the given number of milliseconds.
    #[must_use]
    pub const fn saturating_add_millis(self, millis: u64) -> Self {
        let add = if millis > i64::MAX as u64 { i64::MAX } else { millis as i64 };
        Self(self.0.saturating_add(add))
    }

    /// Returns the milliseconds elapsed since `earlier`, or zero when
    /// `earlier` is in the future.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> u64 {
        let diff = self.0.saturating_sub(earlier.0);
        if diff < 0 { 0 } else { diff as u64 }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
