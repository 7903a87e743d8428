// sigil-gate-core/src/core/decision.rs
// ============================================================================
// Module: Sigil Gate Interceptor Decisions
// Description: Intercept requests and the decisions returned for them.
// Purpose: Provide the immutable result record of every gated operation.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! Every operation an agent wants to perform arrives as an
//! [`InterceptRequest`] and leaves as an [`InterceptorDecision`]. `block`
//! and `hold` outcomes are ordinary data, never errors; the transport
//! always receives a decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::HoldId;
use crate::core::identifiers::ToolName;
use crate::core::time::Timestamp;
use crate::core::validation::ValidationReport;

// ============================================================================
// SECTION: Intercept Request
// ============================================================================

/// A single intercepted operation handed to the gatekeeper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptRequest {
    /// Caller agent identity.
    pub agent_id: AgentId,
    /// Raw frame expression describing the intended operation.
    pub frame: String,
    /// Raw parent frame, when the operation runs under a delegation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_frame: Option<String>,
    /// Requested tool.
    pub tool: ToolName,
    /// Tool arguments as an opaque JSON value.
    pub arguments: Value,
    /// Caller-supplied request time.
    pub requested_at: Timestamp,
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome category of an intercepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    /// Operation may proceed.
    Allow,
    /// Operation is paused pending human review.
    Hold,
    /// Operation is refused.
    Block,
}

impl GateAction {
    /// Returns a stable label for the action.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Hold => "hold",
            Self::Block => "block",
        }
    }
}

/// Immutable decision returned for every intercepted operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptorDecision {
    /// Decision category.
    pub action: GateAction,
    /// True exactly when `action` is `allow`.
    pub allowed: bool,
    /// The original frame expression the decision refers to.
    pub frame: String,
    /// The requested tool the decision refers to.
    pub tool: ToolName,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Combined parse and validation confidence in `[0, 1]`.
    pub coverage_confidence: f64,
    /// Validation report backing the decision, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ValidationReport>,
    /// Hold created for this operation, when `action` is `hold`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_id: Option<HoldId>,
}

impl InterceptorDecision {
    /// Creates a decision for the given request with the given action.
    #[must_use]
    pub fn new(
        request: &InterceptRequest,
        action: GateAction,
        reason: impl Into<String>,
        coverage_confidence: f64,
    ) -> Self {
        Self {
            action,
            allowed: action == GateAction::Allow,
            frame: request.frame.clone(),
            tool: request.tool.clone(),
            reason: reason.into(),
            coverage_confidence,
            report: None,
            hold_id: None,
        }
    }

    /// Attaches the validation report.
    #[must_use]
    pub fn with_report(mut self, report: ValidationReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Attaches the hold identifier.
    #[must_use]
    pub fn with_hold_id(mut self, hold_id: HoldId) -> Self {
        self.hold_id = Some(hold_id);
        self
    }
}
