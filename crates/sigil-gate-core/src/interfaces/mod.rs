// sigil-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Sigil Gate Interfaces
// Description: Backend-agnostic interfaces for persistence and notification.
// Purpose: Define the contract surfaces used by Sigil Gate managers.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Sigil Gate integrates with external systems without
//! embedding backend-specific details. Store implementations must be
//! deterministic and fail closed on missing or invalid data; managers
//! recover from store failures by keeping their in-memory state
//! authoritative and reconciling on the next sweep.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AgentDefinition;
use crate::core::AgentInstance;
use crate::core::AgentProposal;
use crate::core::AuditEvent;
use crate::core::Campaign;
use crate::core::DataSource;
use crate::core::HoldRequest;
use crate::core::agent::InstanceStatus;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::CampaignId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::ProposalId;
use crate::core::identifiers::SourceId;
use crate::core::proposal::ProposalState;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Persistence errors shared by all store traits.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("governance store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("governance store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("governance store invalid data: {0}")]
    Invalid(String),
    /// Identifier violates its required prefix.
    #[error("identifier `{id}` missing required prefix `{prefix}`")]
    BadPrefix {
        /// The offending identifier.
        id: String,
        /// The required prefix.
        prefix: String,
    },
    /// Store reported an error.
    #[error("governance store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Registry Store
// ============================================================================

/// Persistence surface for campaigns, definitions, instances, and sources.
pub trait RegistryStore {
    /// Saves or replaces a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn save_campaign(&self, campaign: &Campaign) -> Result<(), StoreError>;

    /// Loads a campaign by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_campaign(&self, campaign_id: &CampaignId) -> Result<Option<Campaign>, StoreError>;

    /// Saves or replaces an agent definition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn save_definition(&self, definition: &AgentDefinition) -> Result<(), StoreError>;

    /// Loads an agent definition by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_definition(&self, agent_id: &AgentId) -> Result<Option<AgentDefinition>, StoreError>;

    /// Saves or replaces an agent instance.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn save_instance(&self, instance: &AgentInstance) -> Result<(), StoreError>;

    /// Loads an agent instance by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_instance(&self, instance_id: &InstanceId) -> Result<Option<AgentInstance>, StoreError>;

    /// Lists instances filtered by status and campaign.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_instances(
        &self,
        status: Option<InstanceStatus>,
        campaign_id: Option<&CampaignId>,
    ) -> Result<Vec<AgentInstance>, StoreError>;

    /// Saves or replaces a data source.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn save_data_source(&self, source: &DataSource) -> Result<(), StoreError>;

    /// Loads a data source by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_data_source(&self, source_id: &SourceId) -> Result<Option<DataSource>, StoreError>;
}

// ============================================================================
// SECTION: Proposal Store
// ============================================================================

/// Persistence surface for proposals. Managers write through on every
/// state change and rehydrate lazily at first use.
pub trait ProposalStore {
    /// Saves or replaces a proposal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn save_proposal(&self, proposal: &AgentProposal) -> Result<(), StoreError>;

    /// Loads a proposal by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_proposal(&self, proposal_id: &ProposalId) -> Result<Option<AgentProposal>, StoreError>;

    /// Lists proposals filtered by state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_proposals(&self, state: Option<ProposalState>)
    -> Result<Vec<AgentProposal>, StoreError>;
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Persistence surface for audit events. Append-only; no deletion API
/// exists anywhere in the system.
pub trait AuditStore {
    /// Appends an audit event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the append fails.
    fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError>;

    /// Loads events with sequence greater than or equal to `from_seq`, in
    /// sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load_events_from(&self, from_seq: u64) -> Result<Vec<AuditEvent>, StoreError>;
}

// ============================================================================
// SECTION: Notification Hooks
// ============================================================================

/// Notification errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Notifier reported an error.
    #[error("notification failed: {0}")]
    Failed(String),
}

/// Capability invoked when a hold is created.
///
/// Implementations must not block the hold manager; failures are recorded
/// and otherwise ignored.
pub trait HoldNotifier {
    /// Notifies an external channel about a newly created hold.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails.
    fn hold_created(&self, request: &HoldRequest) -> Result<(), NotifyError>;
}

/// Capability invoked when a proposal is queued for human review.
///
/// Implementations must not block the proposal manager; failures are
/// recorded and otherwise ignored.
pub trait ProposalNotifier {
    /// Notifies an external channel about a pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails.
    fn proposal_pending(&self, proposal: &AgentProposal) -> Result<(), NotifyError>;
}
