// sigil-gate-core/src/runtime/registry.rs
// ============================================================================
// Module: Sigil Gate Agent Registry
// Description: Definitions, instances, scopes, quotas, and campaign breakers.
// Purpose: Manage agent lifecycles and enforce scope and quota policy.
// Dependencies: crate::core, crate::interfaces, crate::runtime::audit, rand
// ============================================================================

//! ## Overview
//! The registry keeps two tiers: immutable catalogued definitions and
//! mutable runtime instances. Instances progress through a monotonic
//! lifecycle, operate inside a scope constructed at spawn time, and
//! consume quotas tracked per instance. Each instance has its own lock;
//! the outer map lock only guards the map shape. Campaigns carry a
//! circuit breaker that refuses new spawns after a run of failed
//! instances.
//!
//! Scope construction is a pure function of the definition, the optional
//! parent scope, and the capability map, so the child-subset invariant is
//! directly testable. A parent scope is never mutated from a child path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use thiserror::Error;

use crate::core::agent::AgentDefinition;
use crate::core::agent::AgentInstance;
use crate::core::agent::AgentMetrics;
use crate::core::agent::AgentScope;
use crate::core::agent::Campaign;
use crate::core::agent::CapabilityToolMap;
use crate::core::agent::InstanceStatus;
use crate::core::agent::QuotaCheck;
use crate::core::agent::QuotaResource;
use crate::core::agent::ResourceLimits;
use crate::core::agent::ResourceUsage;
use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::drift::CircuitState;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::CampaignId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::ToolName;
use crate::core::identifiers::prefix;
use crate::core::time::Timestamp;
use crate::interfaces::RegistryStore;
use crate::interfaces::StoreError;
use crate::runtime::audit::AuditLog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rolling window length for the per-minute rate quota.
const RATE_WINDOW_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Default maximum delegation depth for new scopes.
    pub max_delegation_depth: u32,
    /// Consecutive failed instances that open a campaign breaker.
    pub campaign_failure_ceiling: u32,
    /// Campaign breaker open to half-open cooldown in milliseconds.
    pub campaign_cooldown_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: 3,
            campaign_failure_ceiling: 3,
            campaign_cooldown_ms: 30_000,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Definition identifier is unknown.
    #[error("unknown agent definition `{0}`")]
    UnknownDefinition(String),
    /// Definition identifier is already registered.
    #[error("agent definition `{0}` already registered")]
    DuplicateDefinition(String),
    /// Definition identifier violates its required prefix.
    #[error("agent definition id `{0}` must start with `agent.`")]
    BadDefinitionPrefix(String),
    /// Instance identifier is unknown.
    #[error("unknown agent instance `{0}`")]
    UnknownInstance(String),
    /// Campaign identifier is unknown.
    #[error("unknown campaign `{0}`")]
    UnknownCampaign(String),
    /// Requested lifecycle transition is illegal.
    #[error("illegal instance transition {from} -> {to}")]
    InvalidTransition {
        /// Current status label.
        from: &'static str,
        /// Requested status label.
        to: &'static str,
    },
    /// Campaign breaker refuses new spawns.
    #[error("campaign `{0}` circuit breaker is open")]
    CampaignBreakerOpen(String),
    /// Delegation depth cap reached.
    #[error("delegation depth {depth} exceeds maximum {max}")]
    DelegationDepthExceeded {
        /// Requested depth.
        depth: u32,
        /// Configured maximum.
        max: u32,
    },
    /// Registry lock was poisoned.
    #[error("registry state unavailable")]
    Unavailable,
}

// ============================================================================
// SECTION: Spawn Requests
// ============================================================================

/// Parameters for spawning an instance.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// Definition to spawn from.
    pub definition_id: AgentId,
    /// Campaign membership, when any.
    pub campaign_id: Option<CampaignId>,
    /// Parent instance, when spawned through delegation.
    pub parent_instance_id: Option<InstanceId>,
    /// Frame override; defaults to the definition's governing frame.
    pub frame: Option<String>,
}

// ============================================================================
// SECTION: Instance State
// ============================================================================

/// Mutable per-instance runtime state, guarded by its own lock.
struct InstanceState {
    /// The instance record.
    instance: AgentInstance,
    /// Resource ceilings copied from the definition at spawn.
    limits: ResourceLimits,
    /// Operation timestamps inside the rolling rate window.
    rate_window: VecDeque<Timestamp>,
}

/// Guarded registry maps.
struct RegistryInner {
    /// Catalogued definitions.
    definitions: BTreeMap<AgentId, AgentDefinition>,
    /// Runtime instances.
    instances: BTreeMap<InstanceId, Arc<Mutex<InstanceState>>>,
    /// Campaigns.
    campaigns: BTreeMap<CampaignId, Campaign>,
    /// Monotonic id counter.
    next_seq: u64,
}

// ============================================================================
// SECTION: Agent Registry
// ============================================================================

/// Agent definition catalog and instance lifecycle manager.
pub struct AgentRegistry {
    /// Registry configuration.
    config: RegistryConfig,
    /// Capability to tool mapping used at scope construction.
    capability_map: CapabilityToolMap,
    /// Guarded registry maps.
    inner: Mutex<RegistryInner>,
    /// Boot-scoped random tag for id suffixes.
    boot_tag: u64,
    /// Optional persistence tee.
    store: Option<Box<dyn RegistryStore + Send + Sync>>,
    /// Shared audit log.
    audit: Arc<AuditLog>,
}

impl AgentRegistry {
    /// Creates a registry.
    #[must_use]
    pub fn new(
        config: RegistryConfig,
        capability_map: CapabilityToolMap,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            config,
            capability_map,
            inner: Mutex::new(RegistryInner {
                definitions: BTreeMap::new(),
                instances: BTreeMap::new(),
                campaigns: BTreeMap::new(),
                next_seq: 1,
            }),
            boot_tag: OsRng.next_u64(),
            store: None,
            audit,
        }
    }

    /// Attaches a persistence tee.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn RegistryStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    /// Registers an immutable agent definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::BadDefinitionPrefix`] for ids without the
    /// `agent.` prefix and [`RegistryError::DuplicateDefinition`] when the
    /// id is already registered.
    pub fn register_definition(&self, definition: AgentDefinition) -> Result<(), RegistryError> {
        if !definition.agent_id.has_prefix(prefix::AGENT_DEFINITION) {
            return Err(RegistryError::BadDefinitionPrefix(definition.agent_id.to_string()));
        }
        {
            let mut inner = self.inner.lock().map_err(|_| RegistryError::Unavailable)?;
            if inner.definitions.contains_key(&definition.agent_id) {
                return Err(RegistryError::DuplicateDefinition(definition.agent_id.to_string()));
            }
            inner.definitions.insert(definition.agent_id.clone(), definition.clone());
        }
        self.write_through(|store| store.save_definition(&definition));
        Ok(())
    }

    /// Returns a definition by identifier.
    #[must_use]
    pub fn definition(&self, agent_id: &AgentId) -> Option<AgentDefinition> {
        let inner = self.inner.lock().ok()?;
        inner.definitions.get(agent_id).cloned()
    }

    // ------------------------------------------------------------------
    // Campaigns
    // ------------------------------------------------------------------

    /// Creates a campaign with a closed breaker.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unavailable`] when registry state cannot
    /// be locked.
    pub fn create_campaign(
        &self,
        name: &str,
        now: Timestamp,
    ) -> Result<Campaign, RegistryError> {
        let campaign = {
            let mut inner = self.inner.lock().map_err(|_| RegistryError::Unavailable)?;
            let seq = inner.next_seq;
            inner.next_seq += 1;
            let campaign = Campaign {
                campaign_id: CampaignId::new(format!(
                    "{}{seq:06}_{:08x}",
                    prefix::CAMPAIGN,
                    self.boot_tag & 0xFFFF_FFFF
                )),
                name: name.to_string(),
                breaker: CircuitState::Closed,
                consecutive_failures: 0,
                last_transition: now,
                created_at: now,
            };
            inner.campaigns.insert(campaign.campaign_id.clone(), campaign.clone());
            campaign
        };
        self.write_through(|store| store.save_campaign(&campaign));
        Ok(campaign)
    }

    /// Returns a campaign by identifier.
    #[must_use]
    pub fn campaign(&self, campaign_id: &CampaignId) -> Option<Campaign> {
        let inner = self.inner.lock().ok()?;
        inner.campaigns.get(campaign_id).cloned()
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Spawns an instance from a registered definition.
    ///
    /// The new instance starts in `spawning`; hosts transition it to
    /// `running` once brought up.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the definition is unknown, the
    /// campaign breaker is open, or the delegation depth cap is reached.
    pub fn spawn_instance(
        &self,
        request: &SpawnRequest,
        now: Timestamp,
    ) -> Result<AgentInstance, RegistryError> {
        let instance = {
            let mut inner = self.inner.lock().map_err(|_| RegistryError::Unavailable)?;
            let definition = inner
                .definitions
                .get(&request.definition_id)
                .ok_or_else(|| {
                    RegistryError::UnknownDefinition(request.definition_id.to_string())
                })?
                .clone();

            if let Some(campaign_id) = &request.campaign_id {
                self.check_campaign_gate(&mut inner, campaign_id, now)?;
            }

            let (parent_scope, delegation_chain) = match &request.parent_instance_id {
                Some(parent_id) => {
                    let parent = inner.instances.get(parent_id).ok_or_else(|| {
                        RegistryError::UnknownInstance(parent_id.to_string())
                    })?;
                    let parent = parent.lock().map_err(|_| RegistryError::Unavailable)?;
                    let mut chain = vec![parent_id.clone()];
                    chain.extend(parent.instance.delegation_chain.iter().cloned());
                    (Some(parent.instance.scope.clone()), chain)
                }
                None => (None, Vec::new()),
            };

            #[allow(clippy::cast_possible_truncation, reason = "Chain depth is bounded small.")]
            let depth = delegation_chain.len() as u32;
            let max = parent_scope
                .as_ref()
                .map_or(self.config.max_delegation_depth, |scope| scope.max_delegation_depth);
            if depth > max {
                return Err(RegistryError::DelegationDepthExceeded {
                    depth,
                    max,
                });
            }

            let scope = build_scope(
                &definition,
                parent_scope.as_ref(),
                &self.capability_map,
                self.config.max_delegation_depth,
            );

            let seq = inner.next_seq;
            inner.next_seq += 1;
            let instance = AgentInstance {
                instance_id: InstanceId::new(format!(
                    "{}{seq:06}_{:08x}",
                    prefix::INSTANCE,
                    self.boot_tag & 0xFFFF_FFFF
                )),
                definition_id: definition.agent_id.clone(),
                campaign_id: request.campaign_id.clone(),
                parent_instance_id: request.parent_instance_id.clone(),
                status: InstanceStatus::Spawning,
                scope,
                usage: ResourceUsage::default(),
                delegation_chain,
                metrics: AgentMetrics::default(),
                frame: request.frame.clone().unwrap_or_else(|| definition.frame.clone()),
                enabled: true,
                created_at: now,
                updated_at: now,
            };
            inner.instances.insert(
                instance.instance_id.clone(),
                Arc::new(Mutex::new(InstanceState {
                    instance: instance.clone(),
                    limits: definition.resource_limits,
                    rate_window: VecDeque::new(),
                })),
            );
            instance
        };

        let mut event = AuditEventDraft::new(AuditEventType::InstanceSpawned, now)
            .agent(instance.definition_id.clone())
            .instance(instance.instance_id.clone());
        if let Some(campaign_id) = &instance.campaign_id {
            event = event.campaign(campaign_id.clone());
        }
        self.audit.record(event);
        self.write_through(|store| store.save_instance(&instance));
        Ok(instance)
    }

    /// Returns an instance snapshot by identifier.
    #[must_use]
    pub fn instance(&self, instance_id: &InstanceId) -> Option<AgentInstance> {
        let state = self.instance_state(instance_id)?;
        let state = state.lock().ok()?;
        Some(state.instance.clone())
    }

    /// Transitions an instance's lifecycle status.
    ///
    /// Updates the owning campaign's breaker on completion statuses.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidTransition`] for illegal moves.
    pub fn transition_status(
        &self,
        instance_id: &InstanceId,
        next: InstanceStatus,
        now: Timestamp,
    ) -> Result<AgentInstance, RegistryError> {
        let state = self
            .instance_state(instance_id)
            .ok_or_else(|| RegistryError::UnknownInstance(instance_id.to_string()))?;
        let (snapshot, campaign_outcome) = {
            let mut state = state.lock().map_err(|_| RegistryError::Unavailable)?;
            let from = state.instance.status;
            if !from.can_transition_to(next) {
                return Err(RegistryError::InvalidTransition {
                    from: from.label(),
                    to: next.label(),
                });
            }
            state.instance.status = next;
            state.instance.updated_at = now;
            let outcome = match next {
                InstanceStatus::Failed => Some(false),
                InstanceStatus::Completed => Some(true),
                _ => None,
            };
            (state.instance.clone(), outcome)
        };

        self.audit.record(
            AuditEventDraft::new(AuditEventType::InstanceStatusChanged, now)
                .instance(instance_id.clone())
                .detail("status", Value::String(next.label().to_string())),
        );
        if let (Some(success), Some(campaign_id)) = (campaign_outcome, &snapshot.campaign_id) {
            self.record_campaign_outcome(campaign_id, success, now);
        }
        self.write_through(|store| store.save_instance(&snapshot));
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Scope and quota enforcement
    // ------------------------------------------------------------------

    /// Returns whether the instance's scope admits the requested tool.
    ///
    /// `None` means the instance is unknown; callers treat that as out of
    /// scope for registered-instance paths.
    #[must_use]
    pub fn tool_allowed(&self, instance_id: &InstanceId, tool: &ToolName) -> Option<bool> {
        let state = self.instance_state(instance_id)?;
        let state = state.lock().ok()?;
        Some(scope_admits_tool(&state.instance.scope, tool))
    }

    /// Checks a quota without consuming it.
    #[must_use]
    pub fn check_quota(
        &self,
        instance_id: &InstanceId,
        resource: QuotaResource,
        amount: u64,
        now: Timestamp,
    ) -> QuotaCheck {
        let Some(state) = self.instance_state(instance_id) else {
            return QuotaCheck {
                allowed: false,
                remaining: 0,
                reason: Some(format!("unknown instance `{instance_id}`")),
            };
        };
        let Ok(state) = state.lock() else {
            return QuotaCheck {
                allowed: false,
                remaining: 0,
                reason: Some("instance state unavailable".to_string()),
            };
        };
        quota_check(&state, resource, amount, now)
    }

    /// Records resource consumption atomically.
    pub fn record_usage(
        &self,
        instance_id: &InstanceId,
        resource: QuotaResource,
        amount: u64,
        now: Timestamp,
    ) {
        let Some(state) = self.instance_state(instance_id) else {
            return;
        };
        let snapshot = {
            let Ok(mut state) = state.lock() else {
                return;
            };
            match resource {
                QuotaResource::RatePerMinute => {
                    state.rate_window.push_back(now);
                    prune_rate_window(&mut state.rate_window, now);
                    state.instance.usage.operations = state.instance.usage.operations.saturating_add(1);
                }
                QuotaResource::TokenBudget => {
                    state.instance.usage.tokens_used =
                        state.instance.usage.tokens_used.saturating_add(amount);
                }
                QuotaResource::ExecutionTime => {
                    state.instance.usage.execution_ms =
                        state.instance.usage.execution_ms.saturating_add(amount);
                }
                QuotaResource::SymbolsCreated => {
                    #[allow(clippy::cast_possible_truncation, reason = "Symbol counts are small.")]
                    let delta = amount.min(u64::from(u32::MAX)) as u32;
                    state.instance.usage.symbols_created =
                        state.instance.usage.symbols_created.saturating_add(delta);
                }
            }
            state.instance.updated_at = now;
            state.instance.clone()
        };
        self.write_through(|store| store.save_instance(&snapshot));
    }

    /// Records an operation outcome on the instance metrics.
    pub fn record_outcome(&self, instance_id: &InstanceId, success: bool, now: Timestamp) {
        let Some(state) = self.instance_state(instance_id) else {
            return;
        };
        let snapshot = {
            let Ok(mut state) = state.lock() else {
                return;
            };
            if success {
                state.instance.metrics.successes = state.instance.metrics.successes.saturating_add(1);
            } else {
                state.instance.metrics.failures = state.instance.metrics.failures.saturating_add(1);
            }
            state.instance.metrics.last_operation_at = Some(now);
            state.instance.updated_at = now;
            state.instance.clone()
        };
        self.write_through(|store| store.save_instance(&snapshot));
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Returns the per-instance state handle.
    fn instance_state(&self, instance_id: &InstanceId) -> Option<Arc<Mutex<InstanceState>>> {
        let inner = self.inner.lock().ok()?;
        inner.instances.get(instance_id).cloned()
    }

    /// Enforces the campaign breaker at spawn time, advancing open
    /// breakers to half-open after the cooldown.
    fn check_campaign_gate(
        &self,
        inner: &mut RegistryInner,
        campaign_id: &CampaignId,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let campaign = inner
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| RegistryError::UnknownCampaign(campaign_id.to_string()))?;
        if campaign.breaker == CircuitState::Open {
            if now.millis_since(campaign.last_transition) >= self.config.campaign_cooldown_ms {
                campaign.breaker = CircuitState::HalfOpen;
                campaign.last_transition = now;
            } else {
                return Err(RegistryError::CampaignBreakerOpen(campaign_id.to_string()));
            }
        }
        Ok(())
    }

    /// Applies an instance completion outcome to its campaign breaker.
    fn record_campaign_outcome(&self, campaign_id: &CampaignId, success: bool, now: Timestamp) {
        let (snapshot, transition) = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            let Some(campaign) = inner.campaigns.get_mut(campaign_id) else {
                return;
            };
            let transition = if success {
                campaign.consecutive_failures = 0;
                (campaign.breaker == CircuitState::HalfOpen).then(|| {
                    campaign.breaker = CircuitState::Closed;
                    campaign.last_transition = now;
                    AuditEventType::CampaignBreakerClosed
                })
            } else {
                campaign.consecutive_failures = campaign.consecutive_failures.saturating_add(1);
                let tripped = campaign.breaker == CircuitState::HalfOpen
                    || (campaign.breaker == CircuitState::Closed
                        && campaign.consecutive_failures >= self.config.campaign_failure_ceiling);
                tripped.then(|| {
                    campaign.breaker = CircuitState::Open;
                    campaign.last_transition = now;
                    AuditEventType::CampaignBreakerOpened
                })
            };
            (campaign.clone(), transition)
        };
        if let Some(event_type) = transition {
            self.audit.record(
                AuditEventDraft::new(event_type, now).campaign(snapshot.campaign_id.clone()),
            );
        }
        self.write_through(|store| store.save_campaign(&snapshot));
    }

    /// Applies a store write, degrading to memory-only on failure.
    fn write_through(
        &self,
        write: impl FnOnce(&(dyn RegistryStore + Send + Sync)) -> Result<(), StoreError>,
    ) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = write(store.as_ref()) {
            self.audit.record(
                AuditEventDraft::new(AuditEventType::StoreDegraded, Timestamp::default())
                    .detail("error", Value::String(err.to_string())),
            );
        }
    }
}

// ============================================================================
// SECTION: Scope Construction
// ============================================================================

/// Builds an instance scope from its definition and optional parent.
///
/// Pure: never mutates the parent scope. Child allowed patterns are the
/// definition's patterns restricted to what the parent admits; denials
/// are unioned.
#[must_use]
pub fn build_scope(
    definition: &AgentDefinition,
    parent: Option<&AgentScope>,
    capability_map: &CapabilityToolMap,
    default_max_depth: u32,
) -> AgentScope {
    let mut allowed_patterns = definition.output_patterns.clone();
    allowed_patterns.push(format!("Ξ.*.{}.*", definition.namespace));

    let mut allowed_tools: Vec<ToolName> = Vec::new();
    for capability in &definition.required_capabilities {
        for tool in capability_map.tools_for(capability) {
            if !allowed_tools.contains(tool) {
                allowed_tools.push(tool.clone());
            }
        }
    }

    let mut denied_patterns = Vec::new();
    let mut denied_tools = Vec::new();
    let mut max_depth = default_max_depth;

    if let Some(parent) = parent {
        allowed_patterns = intersect_patterns(&allowed_patterns, &parent.allowed_symbol_patterns);
        for pattern in &parent.denied_symbol_patterns {
            if !denied_patterns.contains(pattern) {
                denied_patterns.push(pattern.clone());
            }
        }
        for tool in &parent.denied_tools {
            if !denied_tools.contains(tool) {
                denied_tools.push(tool.clone());
            }
        }
        max_depth = max_depth.min(parent.max_delegation_depth.saturating_sub(1));
    }

    AgentScope {
        allowed_symbol_patterns: allowed_patterns,
        denied_symbol_patterns: denied_patterns,
        allowed_tools,
        denied_tools,
        namespace: definition.namespace.clone(),
        max_delegation_depth: max_depth,
    }
}

/// Restricts `own` patterns to those covered by a parent pattern.
///
/// A pattern is covered when a parent pattern equals it or glob-matches
/// it, so the result is always a subset of what the parent admits.
#[must_use]
pub fn intersect_patterns(own: &[String], parent: &[String]) -> Vec<String> {
    own.iter()
        .filter(|pattern| {
            parent
                .iter()
                .any(|candidate| candidate == *pattern || glob_match(candidate, pattern))
        })
        .cloned()
        .collect()
}

/// Returns whether a scope admits a tool. Denied entries win.
#[must_use]
pub fn scope_admits_tool(scope: &AgentScope, tool: &ToolName) -> bool {
    let denied = scope
        .denied_tools
        .iter()
        .any(|pattern| glob_match(pattern.as_str(), tool.as_str()));
    if denied {
        return false;
    }
    scope.allowed_tools.iter().any(|pattern| glob_match(pattern.as_str(), tool.as_str()))
}

/// Matches a glob pattern where `*` spans any run of characters.
#[must_use]
pub fn glob_match(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }
    let segments: Vec<&str> = pattern.split('*').collect();
    let mut remainder = value;
    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if index == 0 {
            let Some(rest) = remainder.strip_prefix(segment) else {
                return false;
            };
            remainder = rest;
        } else if index == segments.len() - 1 {
            return remainder.ends_with(segment);
        } else {
            let Some(found) = remainder.find(segment) else {
                return false;
            };
            remainder = &remainder[found + segment.len()..];
        }
    }
    true
}

// ============================================================================
// SECTION: Quota Evaluation
// ============================================================================

/// Evaluates a quota against the instance state.
fn quota_check(
    state: &InstanceState,
    resource: QuotaResource,
    amount: u64,
    now: Timestamp,
) -> QuotaCheck {
    let (used, limit) = match resource {
        QuotaResource::RatePerMinute => {
            let in_window = state
                .rate_window
                .iter()
                .filter(|at| now.millis_since(**at) < RATE_WINDOW_MS)
                .count() as u64;
            (in_window, u64::from(state.limits.rate_limit_per_minute))
        }
        QuotaResource::TokenBudget => (state.instance.usage.tokens_used, state.limits.token_budget),
        QuotaResource::ExecutionTime => {
            (state.instance.usage.execution_ms, state.limits.timeout_ms)
        }
        QuotaResource::SymbolsCreated => (
            u64::from(state.instance.usage.symbols_created),
            u64::from(state.limits.max_symbols_created),
        ),
    };
    let remaining = limit.saturating_sub(used);
    if amount > remaining {
        return QuotaCheck {
            allowed: false,
            remaining,
            reason: Some(format!(
                "{} quota exhausted: {used} used of {limit}",
                resource.label()
            )),
        };
    }
    QuotaCheck {
        allowed: true,
        remaining: remaining.saturating_sub(amount),
        reason: None,
    }
}

/// Drops rate-window entries older than the window.
fn prune_rate_window(window: &mut VecDeque<Timestamp>, now: Timestamp) {
    while let Some(front) = window.front() {
        if now.millis_since(*front) >= RATE_WINDOW_MS {
            window.pop_front();
        } else {
            break;
        }
    }
}
