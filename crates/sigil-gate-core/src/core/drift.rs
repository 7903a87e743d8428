// sigil-gate-core/src/core/drift.rs
// ============================================================================
// Module: Sigil Gate Drift Records
// Description: Drift window records, baselines, breaker states, and alerts.
// Purpose: Provide the serializable state surface of the drift engine.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! Drift measures how far an agent's recent operations have departed from
//! the baseline captured at its first operation. The score is a weighted
//! sum of four normalized contributions (mode deviation, domain change,
//! constraint removal, failure rate). A per-agent circuit breaker opens on
//! critical drift or a run of consecutive failures and recovers through a
//! half-open probe.
//!
//! # Invariants
//! - `open -> half-open` is time-triggered only (cooldown elapsed).
//! - `half-open -> closed` requires one successful operation.
//! - Any failure in `half-open` returns to `open`.
//! - `closed -> open` only on critical drift score or the
//!   consecutive-failure ceiling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::frame::ParsedFrame;
use crate::core::identifiers::AgentId;
use crate::core::symbol::Symbol;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Window Records
// ============================================================================

/// One operation observed by the drift engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Parsed frame the operation ran under.
    pub frame: ParsedFrame,
    /// Proposed action (tool name or action label).
    pub action: String,
    /// Whether the transport reported success.
    pub success: bool,
    /// Caller-supplied observation time.
    pub at: Timestamp,
}

/// Baseline snapshot taken at an agent's first recorded operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftBaseline {
    /// Baseline mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Symbol>,
    /// Baseline domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Symbol>,
    /// Baseline constraints in input order.
    #[serde(default)]
    pub constraints: Vec<Symbol>,
    /// When the baseline was captured.
    pub taken_at: Timestamp,
}

impl DriftBaseline {
    /// Captures a baseline from the given frame.
    #[must_use]
    pub fn capture(frame: &ParsedFrame, at: Timestamp) -> Self {
        Self {
            mode: frame.mode,
            domain: frame.domain,
            constraints: frame.constraints.clone(),
            taken_at: at,
        }
    }
}

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

/// Circuit breaker state for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Operations permitted.
    Closed,
    /// All operations denied at the gatekeeper.
    Open,
    /// One probe operation is allowed through.
    HalfOpen,
}

impl CircuitState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

// ============================================================================
// SECTION: Drift State Snapshot
// ============================================================================

/// Snapshot of an agent's drift state returned by status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDriftState {
    /// Agent the snapshot describes.
    pub agent_id: AgentId,
    /// Sliding window of recent operations, oldest first.
    pub window: Vec<OperationRecord>,
    /// Current drift score in `[0, 1]`.
    pub drift_score: f64,
    /// Circuit breaker state.
    pub circuit: CircuitState,
    /// Consecutive failures observed.
    pub consecutive_failures: u32,
    /// Baseline captured at the first operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<DriftBaseline>,
    /// Time of the last breaker transition.
    pub last_transition: Timestamp,
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Weights applied to the four drift contributions.
///
/// # Invariants
/// - The four weights sum to `1.0` (validated at configuration time).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftWeights {
    /// Weight of mode-strength deviation from baseline.
    pub mode_deviation: f64,
    /// Weight of the baseline/current domain change indicator.
    pub domain_change: f64,
    /// Weight of the dropped-baseline-constraint fraction.
    pub constraint_removal: f64,
    /// Weight of the window failure rate.
    pub failure_rate: f64,
}

impl DriftWeights {
    /// Returns the sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.mode_deviation + self.domain_change + self.constraint_removal + self.failure_rate
    }
}

impl Default for DriftWeights {
    fn default() -> Self {
        Self {
            mode_deviation: 0.3,
            domain_change: 0.2,
            constraint_removal: 0.3,
            failure_rate: 0.2,
        }
    }
}

/// Drift engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Score at which a warning alert is raised.
    pub warning_threshold: f64,
    /// Score at which the breaker trips.
    pub critical_threshold: f64,
    /// Rolling window capacity.
    pub window_size: usize,
    /// Open to half-open cooldown in milliseconds.
    pub cooldown_ms: u64,
    /// Consecutive-failure trip trigger.
    pub consecutive_failure_ceiling: u32,
    /// Contribution weights.
    pub weights: DriftWeights,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 0.15,
            critical_threshold: 0.30,
            window_size: 100,
            cooldown_ms: 30_000,
            consecutive_failure_ceiling: 3,
            weights: DriftWeights::default(),
        }
    }
}

// ============================================================================
// SECTION: Alerts
// ============================================================================

/// Alert level for threshold crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftAlertLevel {
    /// Warning threshold crossed.
    Warning,
    /// Critical threshold reached; breaker tripped.
    Critical,
}

impl DriftAlertLevel {
    /// Returns a stable label for the level.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Alert emitted when a drift threshold is crossed on a recorded operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    /// Agent the alert refers to.
    pub agent_id: AgentId,
    /// Alert level.
    pub level: DriftAlertLevel,
    /// Drift score at the time of the alert.
    pub score: f64,
    /// When the alert was raised.
    pub at: Timestamp,
    /// Human-readable summary.
    pub message: String,
}
