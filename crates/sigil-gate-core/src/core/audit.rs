// sigil-gate-core/src/core/audit.rs
// ============================================================================
// Module: Sigil Gate Audit Records
// Description: Append-only audit events and query filters.
// Purpose: Provide the shared event record every component writes.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! Every component records what it did as [`AuditEvent`] values. Events are
//! append-only, never mutated or deleted, and totally ordered by the audit
//! log's internal sequence counter: a reader that has seen sequence `n` has
//! seen every earlier sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AgentId;
use crate::core::identifiers::CampaignId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ProposalId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Kind of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Gatekeeper allowed an operation.
    InterceptAllowed,
    /// Gatekeeper held an operation for review.
    InterceptHeld,
    /// Gatekeeper blocked an operation.
    InterceptBlocked,
    /// Post-execution outcome recorded.
    OutcomeRecorded,
    /// Drift threshold crossed.
    DriftAlert,
    /// Agent circuit breaker opened.
    CircuitOpened,
    /// Agent circuit breaker moved to half-open.
    CircuitHalfOpen,
    /// Agent circuit breaker closed.
    CircuitClosed,
    /// Agent forcibly halted by an operator.
    AgentHalted,
    /// Hold created.
    HoldCreated,
    /// Hold approved.
    HoldApproved,
    /// Hold rejected.
    HoldRejected,
    /// Hold expired by the sweeper.
    HoldExpired,
    /// Delegation recorded.
    DelegationCreated,
    /// Delegation revoked by its parent.
    DelegationRevoked,
    /// Instance spawned.
    InstanceSpawned,
    /// Instance lifecycle status changed.
    InstanceStatusChanged,
    /// Quota check denied an operation.
    QuotaDenied,
    /// Scope check denied an operation.
    ScopeDenied,
    /// Proposal created and queued.
    ProposalCreated,
    /// Proposal approved automatically.
    ProposalAutoApproved,
    /// Proposal approved by an operator.
    ProposalApproved,
    /// Proposal rejected by an operator.
    ProposalRejected,
    /// Proposal expired by the sweeper.
    ProposalExpired,
    /// Campaign circuit breaker opened.
    CampaignBreakerOpened,
    /// Campaign circuit breaker closed.
    CampaignBreakerClosed,
    /// Persistent store write failed; in-memory state kept authoritative.
    StoreDegraded,
}

impl AuditEventType {
    /// Returns a stable label for the event type.
    #[must_use]
    #[allow(clippy::too_many_lines, reason = "Flat label table.")]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InterceptAllowed => "intercept_allowed",
            Self::InterceptHeld => "intercept_held",
            Self::InterceptBlocked => "intercept_blocked",
            Self::OutcomeRecorded => "outcome_recorded",
            Self::DriftAlert => "drift_alert",
            Self::CircuitOpened => "circuit_opened",
            Self::CircuitHalfOpen => "circuit_half_open",
            Self::CircuitClosed => "circuit_closed",
            Self::AgentHalted => "agent_halted",
            Self::HoldCreated => "hold_created",
            Self::HoldApproved => "hold_approved",
            Self::HoldRejected => "hold_rejected",
            Self::HoldExpired => "hold_expired",
            Self::DelegationCreated => "delegation_created",
            Self::DelegationRevoked => "delegation_revoked",
            Self::InstanceSpawned => "instance_spawned",
            Self::InstanceStatusChanged => "instance_status_changed",
            Self::QuotaDenied => "quota_denied",
            Self::ScopeDenied => "scope_denied",
            Self::ProposalCreated => "proposal_created",
            Self::ProposalAutoApproved => "proposal_auto_approved",
            Self::ProposalApproved => "proposal_approved",
            Self::ProposalRejected => "proposal_rejected",
            Self::ProposalExpired => "proposal_expired",
            Self::CampaignBreakerOpened => "campaign_breaker_opened",
            Self::CampaignBreakerClosed => "campaign_breaker_closed",
            Self::StoreDegraded => "store_degraded",
        }
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier (prefixed `evt_`).
    pub event_id: EventId,
    /// Total-order sequence assigned by the audit log.
    pub seq: u64,
    /// Event kind.
    pub event_type: AuditEventType,
    /// Event time as supplied by the recording component.
    pub at: Timestamp,
    /// Related agent, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    /// Related instance, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    /// Related campaign, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// Related proposal, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
    /// Operator involved, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<OperatorId>,
    /// Opaque event details.
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

/// Draft of an audit event before the log assigns identity and sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEventDraft {
    /// Event kind.
    pub event_type: AuditEventType,
    /// Event time.
    pub at: Timestamp,
    /// Related agent, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    /// Related instance, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    /// Related campaign, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// Related proposal, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
    /// Operator involved, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<OperatorId>,
    /// Opaque event details.
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl AuditEventDraft {
    /// Creates a draft with the given type and time.
    #[must_use]
    pub fn new(event_type: AuditEventType, at: Timestamp) -> Self {
        Self {
            event_type,
            at,
            agent_id: None,
            instance_id: None,
            campaign_id: None,
            proposal_id: None,
            operator_id: None,
            details: BTreeMap::new(),
        }
    }

    /// Attaches the related agent.
    #[must_use]
    pub fn agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    /// Attaches the related instance.
    #[must_use]
    pub fn instance(mut self, instance_id: InstanceId) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    /// Attaches the related campaign.
    #[must_use]
    pub fn campaign(mut self, campaign_id: CampaignId) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    /// Attaches the related proposal.
    #[must_use]
    pub fn proposal(mut self, proposal_id: ProposalId) -> Self {
        self.proposal_id = Some(proposal_id);
        self
    }

    /// Attaches the involved operator.
    #[must_use]
    pub fn operator(mut self, operator_id: OperatorId) -> Self {
        self.operator_id = Some(operator_id);
        self
    }

    /// Attaches a detail entry.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Filter for audit log reads. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Match the related agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    /// Match the related instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    /// Match the related campaign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// Match the related proposal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
    /// Match the event type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<AuditEventType>,
    /// Match events at or after this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    /// Match events strictly before this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<Timestamp>,
    /// Maximum number of events to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Returns true when the event matches every populated filter field.
    #[must_use]
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(agent_id) = &self.agent_id {
            if event.agent_id.as_ref() != Some(agent_id) {
                return false;
            }
        }
        if let Some(instance_id) = &self.instance_id {
            if event.instance_id.as_ref() != Some(instance_id) {
                return false;
            }
        }
        if let Some(campaign_id) = &self.campaign_id {
            if event.campaign_id.as_ref() != Some(campaign_id) {
                return false;
            }
        }
        if let Some(proposal_id) = &self.proposal_id {
            if event.proposal_id.as_ref() != Some(proposal_id) {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(from) = self.from {
            if event.at < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.at >= until {
                return false;
            }
        }
        true
    }
}
