// sigil-gate-core/src/core/proposal.rs
// ============================================================================
// Module: Sigil Gate Proposal Records
// Description: Agent proposals, justifications, and risk assessments.
// Purpose: Provide the out-of-band instance creation request model.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! A proposal is an out-of-band request to create an agent instance. It
//! embeds the synthesized definition, a justification with an enumerated
//! trigger, a five-factor risk assessment, and a resource estimate. The
//! risk score routes the proposal to automatic, human, or elevated
//! approval. Proposals own their hold linkage: a pending proposal stores
//! the hold id it is waiting on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::agent::AgentDefinition;
use crate::core::identifiers::HoldId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ProposalId;
use crate::core::identifiers::SourceId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Justification
// ============================================================================

/// What prompted a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalTrigger {
    /// A new data source appeared.
    NewDataSource,
    /// An operator asked for the agent.
    UserRequest,
    /// A schedule fired.
    Scheduled,
    /// Another agent's dependency requires it.
    Dependency,
    /// The system decided it is needed.
    System,
}

impl ProposalTrigger {
    /// Returns a stable label for the trigger.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewDataSource => "new_data_source",
            Self::UserRequest => "user_request",
            Self::Scheduled => "scheduled",
            Self::Dependency => "dependency",
            Self::System => "system",
        }
    }
}

/// Why a proposal exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalJustification {
    /// Enumerated trigger.
    pub trigger: ProposalTrigger,
    /// Prose summary of the need.
    pub summary: String,
    /// Opaque context captured at generation time.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Risk Assessment
// ============================================================================

/// Weight of the data-access risk category.
pub const RISK_WEIGHT_DATA_ACCESS: f64 = 0.25;
/// Weight of the external-calls risk category.
pub const RISK_WEIGHT_EXTERNAL_CALLS: f64 = 0.20;
/// Weight of the resource-usage risk category.
pub const RISK_WEIGHT_RESOURCE_USAGE: f64 = 0.15;
/// Weight of the symbol-creation risk category.
pub const RISK_WEIGHT_SYMBOL_CREATION: f64 = 0.20;
/// Weight of the privilege-level risk category.
pub const RISK_WEIGHT_PRIVILEGE_LEVEL: f64 = 0.20;

/// Five-category risk assessment with sub-scores in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Breadth and sensitivity of data access.
    pub data_access: f64,
    /// Exposure to external calls.
    pub external_calls: f64,
    /// Resource consumption pressure.
    pub resource_usage: f64,
    /// Symbol-creation surface.
    pub symbol_creation: f64,
    /// Privilege and delegation surface.
    pub privilege_level: f64,
    /// Labels of the factors that contributed to the sub-scores.
    #[serde(default)]
    pub factors: Vec<String>,
}

impl RiskAssessment {
    /// Returns the weighted total risk score in `[0, 1]`.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.data_access.mul_add(
            RISK_WEIGHT_DATA_ACCESS,
            self.external_calls.mul_add(
                RISK_WEIGHT_EXTERNAL_CALLS,
                self.resource_usage.mul_add(
                    RISK_WEIGHT_RESOURCE_USAGE,
                    self.symbol_creation.mul_add(
                        RISK_WEIGHT_SYMBOL_CREATION,
                        self.privilege_level * RISK_WEIGHT_PRIVILEGE_LEVEL,
                    ),
                ),
            ),
        )
    }
}

// ============================================================================
// SECTION: Estimates
// ============================================================================

/// Minimum, typical, and maximum estimate for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateTriplet {
    /// Lower bound.
    pub min: u64,
    /// Expected value.
    pub typical: u64,
    /// Upper bound.
    pub max: u64,
}

impl EstimateTriplet {
    /// Creates an estimate triplet.
    #[must_use]
    pub const fn new(min: u64, typical: u64, max: u64) -> Self {
        Self {
            min,
            typical,
            max,
        }
    }
}

/// Resource estimate for a proposed instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    /// Token consumption estimate.
    pub tokens: EstimateTriplet,
    /// Execution-time estimate in milliseconds.
    pub execution_ms: EstimateTriplet,
    /// Operation-count estimate.
    pub operations: EstimateTriplet,
}

/// Summary of the data a proposed agent would touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataAccessSummary {
    /// Sources the agent would read.
    #[serde(default)]
    pub sources: Vec<SourceId>,
    /// Distinct source types involved.
    #[serde(default)]
    pub source_types: Vec<String>,
    /// Whether any source requires stored credentials.
    pub requires_credentials: bool,
}

// ============================================================================
// SECTION: Proposal
// ============================================================================

/// Proposal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Awaiting a decision.
    Pending,
    /// Approved; instance spawned or spawning.
    Approved,
    /// Rejected.
    Rejected,
    /// Expired before a decision.
    Expired,
}

impl ProposalState {
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

/// Approval routing derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalLevel {
    /// Approved automatically without human involvement.
    Auto,
    /// Requires a human decision.
    Human,
    /// Requires an elevated human decision.
    Elevated,
}

/// Decision recorded on a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalDecision {
    /// Who decided. Automatic approvals carry the synthetic system
    /// operator identity.
    pub decided_by: OperatorId,
    /// Decision time.
    pub decided_at: Timestamp,
    /// Stated reason.
    pub reason: String,
    /// Whether the proposal was approved.
    pub approved: bool,
}

/// Out-of-band request to create an agent instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProposal {
    /// Proposal identifier (prefixed `prop_`).
    pub proposal_id: ProposalId,
    /// Synthesized definition to spawn from.
    pub definition: AgentDefinition,
    /// Why the proposal exists.
    pub justification: ProposalJustification,
    /// Computed risk assessment.
    pub risk: RiskAssessment,
    /// Resource estimate.
    pub estimate: ResourceEstimate,
    /// Data-access summary.
    pub data_access: DataAccessSummary,
    /// Approval routing decided at generation time.
    pub approval_level: ApprovalLevel,
    /// Current state.
    pub state: ProposalState,
    /// Creation time.
    pub created_at: Timestamp,
    /// Expiry deadline for pending proposals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// Hold the proposal is waiting on, when routed to human review.
    /// The proposal owns the linkage; any reverse index is derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_id: Option<HoldId>,
    /// Recorded decision, once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ProposalDecision>,
}

// ============================================================================
// SECTION: Data Sources
// ============================================================================

/// A registered data source proposals can target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Source identifier (prefixed `src_`).
    pub source_id: SourceId,
    /// Human-readable name.
    pub name: String,
    /// Source type tag (for example `api`, `web`, `database`, `stream`,
    /// `file_feed`). Selects the proposal template.
    pub source_type: String,
    /// Authentication scheme required, when any (for example `oauth2`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<String>,
    /// Endpoint or locator, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Registration time.
    pub registered_at: Timestamp,
}
