// sigil-gate-core/src/core/hold.rs
// ============================================================================
// Module: Sigil Gate Hold Records
// Description: Hold requests, terminal decisions, severities, and stats.
// Purpose: Provide the at-most-once human-review queue data model.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A hold is an operation paused for human review, stored as first-class
//! data. `pending` is the only non-terminal state; a hold reaches exactly
//! one of `approved`, `rejected`, or `expired`, and a [`HoldDecision`] is
//! created exactly once per terminal transition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::HoldId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ToolName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: States and Severity
// ============================================================================

/// Hold lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldState {
    /// Awaiting a human decision.
    Pending,
    /// Approved by an operator.
    Approved,
    /// Rejected by an operator.
    Rejected,
    /// Expired before a decision was made.
    Expired,
}

impl HoldState {
    /// Returns true for terminal states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns a stable label for the state.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// Review severity attached to a hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldSeverity {
    /// Routine review.
    Low,
    /// Elevated attention.
    Medium,
    /// Urgent review.
    High,
    /// Immediate review; highest tier.
    Critical,
}

impl HoldSeverity {
    /// Returns a stable label for the severity.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

// ============================================================================
// SECTION: Requests and Decisions
// ============================================================================

/// A paused operation awaiting human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldRequest {
    /// Unique hold identifier.
    pub hold_id: HoldId,
    /// Agent whose operation is held.
    pub agent_id: AgentId,
    /// Original frame expression.
    pub frame: String,
    /// Requested tool.
    pub tool: ToolName,
    /// Tool arguments at the time of the hold.
    pub arguments: Value,
    /// Why the hold was created.
    pub reason: String,
    /// Review severity.
    pub severity: HoldSeverity,
    /// Opaque metadata supplied by the creator.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Expiry deadline, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// Current lifecycle state.
    pub state: HoldState,
}

/// Terminal decision recorded for a hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldDecision {
    /// Hold the decision refers to.
    pub hold_id: HoldId,
    /// Operator who decided, or the sweeper's synthetic identity.
    pub decided_by: OperatorId,
    /// Decision time.
    pub decided_at: Timestamp,
    /// Stated reason.
    pub reason: String,
    /// Terminal state reached.
    pub outcome: HoldState,
    /// Replacement frame supplied by the approver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_frame: Option<String>,
    /// Replacement arguments supplied by the approver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_arguments: Option<Value>,
}

// ============================================================================
// SECTION: Stats and Configuration
// ============================================================================

/// Aggregate hold counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldStats {
    /// Currently pending holds.
    pub pending: usize,
    /// Holds approved so far.
    pub approved: usize,
    /// Holds rejected so far.
    pub rejected: usize,
    /// Holds expired so far.
    pub expired: usize,
}

impl HoldStats {
    /// Returns the total number of holds ever observed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.expired
    }
}

/// Hold manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldConfig {
    /// Default expiry applied to new holds, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    /// Window during which identical hold requests are deduplicated.
    pub fingerprint_window_ms: u64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: Some(86_400_000),
            fingerprint_window_ms: 10_000,
        }
    }
}
