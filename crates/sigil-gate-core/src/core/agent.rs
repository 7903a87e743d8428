// sigil-gate-core/src/core/agent.rs
// ============================================================================
// Module: Sigil Gate Agent Model
// Description: Agent definitions, instances, scopes, quotas, and campaigns.
// Purpose: Provide the catalogued and runtime agent data structures.
// Dependencies: serde, crate::core
// ============================================================================

//! ## Overview
//! Agents exist in two tiers: immutable catalogued definitions and mutable
//! runtime instances. An instance progresses through a monotonic lifecycle
//! (the only reversible edge is `running <-> paused`), operates inside a
//! resolved scope of symbol patterns and tools, and consumes quotas tracked
//! in its resource usage counters. Campaigns group instances and carry
//! their own circuit breaker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::drift::CircuitState;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::CampaignId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::NamespaceId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::ToolName;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Definition
// ============================================================================

/// Functional category of an agent definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    /// Fetches data from external systems.
    DataAcquisition,
    /// Cleans, reshapes, or enriches data.
    DataProcessing,
    /// Produces analytical outputs.
    Analysis,
    /// Watches systems or feeds for conditions.
    Monitoring,
    /// Bridges to third-party services.
    Integration,
}

impl AgentCategory {
    /// Returns a stable label for the category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DataAcquisition => "data_acquisition",
            Self::DataProcessing => "data_processing",
            Self::Analysis => "analysis",
            Self::Monitoring => "monitoring",
            Self::Integration => "integration",
        }
    }
}

/// Coarse risk classification of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Minimal blast radius.
    Low,
    /// Limited external effects.
    Medium,
    /// Significant external effects.
    High,
    /// Requires the strictest oversight.
    Critical,
}

/// Per-instance resource ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Operations allowed per rolling minute.
    pub rate_limit_per_minute: u32,
    /// Lifetime token budget.
    pub token_budget: u64,
    /// Cumulative execution time ceiling in milliseconds.
    pub timeout_ms: u64,
    /// Lifetime cap on symbols the instance may create.
    pub max_symbols_created: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 60,
            token_budget: 1_000_000,
            timeout_ms: 300_000,
            max_symbols_created: 100,
        }
    }
}

/// Catalogued specification of a potential agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Definition identifier (prefixed `agent.`).
    pub agent_id: AgentId,
    /// Human-readable name.
    pub name: String,
    /// Definition version.
    pub version: String,
    /// What the agent is for.
    pub purpose: String,
    /// Functional category.
    pub category: AgentCategory,
    /// Data sources the agent reads.
    #[serde(default)]
    pub data_sources: Vec<SourceId>,
    /// Capability tags the agent needs to function.
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    /// Capability tags the agent can exploit when present.
    #[serde(default)]
    pub optional_capabilities: Vec<String>,
    /// Symbol patterns the agent is expected to emit.
    #[serde(default)]
    pub output_patterns: Vec<String>,
    /// Resource ceilings applied to spawned instances.
    pub resource_limits: ResourceLimits,
    /// Conditions under which the agent counts as successful.
    #[serde(default)]
    pub success_criteria: Vec<String>,
    /// Definitions this agent depends on.
    #[serde(default)]
    pub dependencies: Vec<AgentId>,
    /// Governing frame expression.
    pub frame: String,
    /// Coarse risk classification.
    pub risk_level: RiskLevel,
    /// Whether spawning always requires human approval.
    pub requires_approval: bool,
    /// Namespace scoping the instance's symbol patterns.
    pub namespace: NamespaceId,
    /// Template the definition was generated from, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Lifecycle status of an agent instance.
///
/// Transitions are monotonic except `running <-> paused`; completion
/// statuses are terminal apart from archival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Proposed but not yet queued for approval.
    Proposed,
    /// Waiting for approval.
    PendingApproval,
    /// Approved; not yet spawning.
    Approved,
    /// Being brought up.
    Spawning,
    /// Actively operating.
    Running,
    /// Temporarily suspended.
    Paused,
    /// Producing its final report.
    Reporting,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// Abandoned before completion.
    Abandoned,
    /// Archived; end of lifecycle.
    Archived,
}

impl InstanceStatus {
    /// Returns true when a transition from `self` to `next` is legal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Proposed, Self::PendingApproval)
                | (Self::PendingApproval, Self::Approved | Self::Abandoned)
                | (Self::Approved, Self::Spawning)
                | (Self::Spawning, Self::Running | Self::Failed)
                | (
                    Self::Running,
                    Self::Paused
                        | Self::Reporting
                        | Self::Completed
                        | Self::Failed
                        | Self::Abandoned
                )
                | (
                    Self::Paused,
                    Self::Running | Self::Completed | Self::Failed | Self::Abandoned
                )
                | (Self::Reporting, Self::Completed | Self::Failed)
                | (Self::Completed | Self::Failed | Self::Abandoned, Self::Archived)
        )
    }

    /// Returns true for statuses that count as finished work.
    #[must_use]
    pub const fn is_completion(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned | Self::Archived)
    }

    /// Returns a stable label for the status.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Spawning => "spawning",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Reporting => "reporting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Archived => "archived",
        }
    }
}

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Resolved operating scope of an instance.
///
/// # Invariants
/// - A child scope's allowed symbol patterns are always a subset of its
///   parent's; denials only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentScope {
    /// Symbol patterns the instance may touch.
    #[serde(default)]
    pub allowed_symbol_patterns: Vec<String>,
    /// Symbol patterns explicitly denied.
    #[serde(default)]
    pub denied_symbol_patterns: Vec<String>,
    /// Tools the instance may request. Entries may be literal names or
    /// glob patterns.
    #[serde(default)]
    pub allowed_tools: Vec<ToolName>,
    /// Tools explicitly denied. Entries may be literal names or glob
    /// patterns; a denied match always wins.
    #[serde(default)]
    pub denied_tools: Vec<ToolName>,
    /// Namespace the scope is rooted in.
    pub namespace: NamespaceId,
    /// Maximum delegation depth below this instance.
    pub max_delegation_depth: u32,
}

/// Running resource counters for an instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Tokens consumed so far.
    pub tokens_used: u64,
    /// Execution time consumed so far in milliseconds.
    pub execution_ms: u64,
    /// Symbols created so far.
    pub symbols_created: u32,
    /// Total operations recorded.
    pub operations: u64,
}

/// Outcome quality counters for an instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Operations that succeeded.
    pub successes: u64,
    /// Operations that failed.
    pub failures: u64,
    /// Time of the most recent operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation_at: Option<Timestamp>,
}

/// Runtime agent actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstance {
    /// Instance identifier (prefixed `inst_`).
    pub instance_id: InstanceId,
    /// Definition the instance was spawned from.
    pub definition_id: AgentId,
    /// Campaign membership, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    /// Parent instance, when spawned through delegation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<InstanceId>,
    /// Current lifecycle status.
    pub status: InstanceStatus,
    /// Resolved operating scope.
    pub scope: AgentScope,
    /// Running resource counters.
    pub usage: ResourceUsage,
    /// Ancestor instance ids, nearest parent first.
    #[serde(default)]
    pub delegation_chain: Vec<InstanceId>,
    /// Outcome quality counters.
    pub metrics: AgentMetrics,
    /// Governing frame expression.
    pub frame: String,
    /// Whether the instance is enabled.
    pub enabled: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last mutation time.
    pub updated_at: Timestamp,
}

// ============================================================================
// SECTION: Quotas
// ============================================================================

/// Quota-governed resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaResource {
    /// Operations per rolling minute.
    RatePerMinute,
    /// Lifetime token budget.
    TokenBudget,
    /// Cumulative execution time.
    ExecutionTime,
    /// Lifetime symbol-creation cap.
    SymbolsCreated,
}

impl QuotaResource {
    /// Returns a stable label for the resource.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RatePerMinute => "rate_per_minute",
            Self::TokenBudget => "token_budget",
            Self::ExecutionTime => "execution_time",
            Self::SymbolsCreated => "symbols_created",
        }
    }
}

/// Result of a quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCheck {
    /// Whether the requested amount fits the quota.
    pub allowed: bool,
    /// Remaining headroom after the requested amount, saturating at zero.
    pub remaining: u64,
    /// Denial reason, when `allowed` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// SECTION: Campaigns
// ============================================================================

/// A campaign grouping related instances, with its own circuit breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign identifier (prefixed `camp_`).
    pub campaign_id: CampaignId,
    /// Human-readable name.
    pub name: String,
    /// Campaign-level breaker state.
    pub breaker: CircuitState,
    /// Consecutive failed instances observed.
    pub consecutive_failures: u32,
    /// Time of the last breaker transition.
    pub last_transition: Timestamp,
    /// Creation time.
    pub created_at: Timestamp,
}

// ============================================================================
// SECTION: Capability Map
// ============================================================================

/// Fixed mapping from capability tags to the tools they grant.
///
/// Entries may be literal tool names or glob patterns; both land on the
/// allowed-tools list of the constructed scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityToolMap {
    /// Capability tag to tool list.
    entries: BTreeMap<String, Vec<ToolName>>,
}

impl CapabilityToolMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds a capability with its granted tools.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>, tools: &[&str]) -> Self {
        self.entries
            .insert(capability.into(), tools.iter().map(|tool| ToolName::new(*tool)).collect());
        self
    }

    /// Returns the tools granted by a capability tag.
    #[must_use]
    pub fn tools_for(&self, capability: &str) -> &[ToolName] {
        self.entries.get(capability).map_or(&[], Vec::as_slice)
    }

    /// Builds the default capability map.
    #[must_use]
    pub fn default_map() -> Self {
        Self::new()
            .with_capability("web_fetch", &["WebFetch", "WebSearch"])
            .with_capability("web_scraping", &["WebFetch", "mcp__browser__*"])
            .with_capability("file_read", &["Read", "Glob", "Grep"])
            .with_capability("file_write", &["Write", "Edit"])
            .with_capability("data_query", &["mcp__sql__query", "mcp__sql__describe_*"])
            .with_capability("symbol_emit", &["EmitSymbol"])
            .with_capability("delegation_spawn", &["SpawnAgent", "DelegateTask"])
            .with_capability("notify", &["Notify", "mcp__mail__send"])
    }
}

impl Default for CapabilityToolMap {
    fn default() -> Self {
        Self::default_map()
    }
}
