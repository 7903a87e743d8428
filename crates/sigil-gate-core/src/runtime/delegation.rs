// sigil-gate-core/src/runtime/delegation.rs
// ============================================================================
// Module: Sigil Gate Delegation Engine
// Description: Parent-to-child frame inheritance and delegation records.
// Purpose: Materialize effective child frames and track delegation lifecycles.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! Delegation hands work from a parent agent to a child under an
//! inheritance mode. The engine materializes the child's *effective*
//! frame (inheriting mode, domain, inheritable constraints, and priority
//! per the mode), but chain-validates the child's *original* frame on
//! purpose: a child that fails to explicitly carry an inheritable
//! constraint is surfaced to the caller rather than silently patched.
//!
//! Delegation records are owned by the parent; only the recorded parent
//! may revoke, and a revoked record stays in the registry for audit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::drift::CircuitState;
use crate::core::frame::ParsedFrame;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::DelegationId;
use crate::core::identifiers::prefix;
use crate::core::symbol::Symbol;
use crate::core::symbol::SymbolCategory;
use crate::core::symbol::SymbolRegistry;
use crate::core::time::Timestamp;
use crate::core::agent::AgentInstance;
use crate::core::identifiers::InstanceId;
use crate::core::validation::ValidationReport;
use crate::core::validation::rules;
use crate::runtime::audit::AuditLog;
use crate::runtime::drift::DriftEngine;
use crate::runtime::registry::AgentRegistry;
use crate::runtime::registry::RegistryError;
use crate::runtime::registry::SpawnRequest;
use crate::runtime::resolver::FrameResolver;
use crate::runtime::validator::FrameValidator;

// ============================================================================
// SECTION: Inheritance Modes
// ============================================================================

/// Per-slot inheritance switches for custom delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomInheritance {
    /// Inherit the parent mode when the child lacks one.
    pub inherit_mode: bool,
    /// Inherit the parent domain.
    pub inherit_domain: bool,
    /// Copy inheritable parent constraints.
    pub inherit_constraints: bool,
    /// Inherit the parent priority modifier when the child lacks one.
    pub inherit_modifiers: bool,
}

/// How a child frame inherits from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum InheritanceMode {
    /// Inherit mode, domain, inheritable constraints, and priority.
    Strict,
    /// Inherit domain and the forbidden constraint only.
    Relaxed,
    /// Caller-provided per-slot switches.
    Custom(CustomInheritance),
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Delegation record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    /// Delegation is in force.
    Active,
    /// Delegation was revoked by its parent.
    Revoked,
}

/// A recorded parent-to-child delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRecord {
    /// Delegation identifier (prefixed `del_`).
    pub delegation_id: DelegationId,
    /// Parent agent.
    pub parent_agent_id: AgentId,
    /// Child agent.
    pub child_agent_id: AgentId,
    /// Parent frame at delegation time.
    pub parent_frame: String,
    /// Child frame as submitted.
    pub child_frame: String,
    /// Materialized effective child frame.
    pub effective_child_frame: String,
    /// Record status.
    pub status: DelegationStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Revocation time, once revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

/// Successful delegation result.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationOutcome {
    /// The recorded delegation.
    pub record: DelegationRecord,
    /// Chain validation report over the original child frame. May carry
    /// warnings.
    pub report: ValidationReport,
    /// The materialized effective child frame.
    pub effective_frame: ParsedFrame,
    /// Child instance spawned under the parent's scope, when the engine
    /// has a registry and the child names a catalogued definition.
    pub spawned_instance: Option<AgentInstance>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Delegation errors.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// A frame could not be parsed.
    #[error("{which} frame could not be parsed")]
    ParseFailed {
        /// Which frame failed (`parent` or `child`).
        which: &'static str,
    },
    /// The child's circuit breaker is open.
    #[error("child agent `{0}` circuit breaker is open")]
    ChildCircuitOpen(String),
    /// Chain validation produced errors.
    #[error("chain validation failed with {} error(s)", .report.errors.len())]
    ChainValidationFailed {
        /// The failing report.
        report: ValidationReport,
    },
    /// The delegation record is unknown.
    #[error("unknown delegation `{0}`")]
    UnknownDelegation(String),
    /// The registry refused to spawn the child instance.
    #[error(transparent)]
    Spawn(#[from] RegistryError),
    /// Revocation caller is not the recorded parent.
    #[error("only the recorded parent may revoke delegation `{0}`")]
    NotParent(String),
    /// The record is not active.
    #[error("delegation `{0}` is not active")]
    NotActive(String),
    /// Engine state was unavailable.
    #[error("delegation registry unavailable")]
    Unavailable,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Parameters for a delegation.
#[derive(Debug, Clone)]
pub struct DelegateRequest {
    /// Parent agent identity.
    pub parent_agent_id: AgentId,
    /// Child agent identity.
    pub child_agent_id: AgentId,
    /// Parent frame expression.
    pub parent_frame: String,
    /// Child frame expression as submitted.
    pub child_frame: String,
    /// Inheritance mode; `None` selects the configured default.
    pub mode: Option<InheritanceMode>,
}

// ============================================================================
// SECTION: Delegation Engine
// ============================================================================

/// Records and validates parent-to-child delegations.
pub struct DelegationEngine {
    /// Frame resolver.
    resolver: FrameResolver,
    /// Chain validator.
    validator: FrameValidator,
    /// Drift engine consulted for the child breaker check.
    drift: Arc<DriftEngine>,
    /// Registry asked to spawn children under the parent's scope.
    registry: Option<Arc<AgentRegistry>>,
    /// Shared audit log.
    audit: Arc<AuditLog>,
    /// Default inheritance mode when callers omit one.
    default_mode: InheritanceMode,
    /// Delegation records keyed by id.
    records: Mutex<BTreeMap<DelegationId, DelegationRecord>>,
    /// Monotonic id counter.
    next_seq: Mutex<u64>,
    /// Boot-scoped random tag for id suffixes.
    boot_tag: u64,
}

impl DelegationEngine {
    /// Creates a delegation engine.
    #[must_use]
    pub fn new(
        resolver: FrameResolver,
        validator: FrameValidator,
        drift: Arc<DriftEngine>,
        audit: Arc<AuditLog>,
        default_mode: InheritanceMode,
    ) -> Self {
        Self {
            resolver,
            validator,
            drift,
            registry: None,
            audit,
            default_mode,
            records: Mutex::new(BTreeMap::new()),
            next_seq: Mutex::new(1),
            boot_tag: OsRng.next_u64(),
        }
    }

    /// Attaches the registry that spawns child instances.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<AgentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Performs a delegation.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError`] when a frame fails to parse, the
    /// child's breaker is open, or chain validation reports errors.
    pub fn delegate(
        &self,
        request: &DelegateRequest,
        now: Timestamp,
    ) -> Result<DelegationOutcome, DelegationError> {
        let parent = self.resolver.parse(&request.parent_frame).ok_or(
            DelegationError::ParseFailed {
                which: "parent",
            },
        )?;
        let child = self.resolver.parse(&request.child_frame).ok_or(
            DelegationError::ParseFailed {
                which: "child",
            },
        )?;

        if let Some(status) = self.drift.peek_status(&request.child_agent_id, now) {
            if status.circuit == CircuitState::Open {
                return Err(DelegationError::ChildCircuitOpen(
                    request.child_agent_id.to_string(),
                ));
            }
        }

        let mode = request.mode.unwrap_or(self.default_mode);
        let effective_frame = self.materialize(&parent, &child, mode).ok_or(
            DelegationError::ParseFailed {
                which: "child",
            },
        )?;

        // Intentionally validate the original child frame, not the
        // effective one: a missing inheritable constraint must surface in
        // the returned report. The delegation only fails on errors the
        // inheritance did not repair (a weaker explicit child mode, or a
        // dropped constraint under switches that do not copy it).
        let report = self.validator.validate(&child, Some(&parent));
        if has_unrepaired_errors(&report, &effective_frame) {
            return Err(DelegationError::ChainValidationFailed {
                report,
            });
        }

        let spawned_instance = self.spawn_child(request, &effective_frame, now)?;

        let record = {
            let mut seq = self.next_seq.lock().map_err(|_| DelegationError::Unavailable)?;
            let id = DelegationId::new(format!(
                "{}{:06}_{:08x}",
                prefix::DELEGATION,
                *seq,
                self.boot_tag & 0xFFFF_FFFF
            ));
            *seq += 1;
            drop(seq);
            let record = DelegationRecord {
                delegation_id: id.clone(),
                parent_agent_id: request.parent_agent_id.clone(),
                child_agent_id: request.child_agent_id.clone(),
                parent_frame: request.parent_frame.clone(),
                child_frame: request.child_frame.clone(),
                effective_child_frame: effective_frame.render(),
                status: DelegationStatus::Active,
                created_at: now,
                revoked_at: None,
            };
            let mut records = self.records.lock().map_err(|_| DelegationError::Unavailable)?;
            records.insert(id, record.clone());
            record
        };

        self.audit.record(
            AuditEventDraft::new(AuditEventType::DelegationCreated, now)
                .agent(request.parent_agent_id.clone())
                .detail("delegation_id", Value::String(record.delegation_id.to_string()))
                .detail("child_agent_id", Value::String(request.child_agent_id.to_string()))
                .detail(
                    "effective_frame",
                    Value::String(record.effective_child_frame.clone()),
                ),
        );

        Ok(DelegationOutcome {
            record,
            report,
            effective_frame,
            spawned_instance,
        })
    }

    /// Spawns the child under the parent's scope when the child names a
    /// catalogued definition and the parent is a running instance.
    fn spawn_child(
        &self,
        request: &DelegateRequest,
        effective_frame: &ParsedFrame,
        now: Timestamp,
    ) -> Result<Option<AgentInstance>, DelegationError> {
        let Some(registry) = &self.registry else {
            return Ok(None);
        };
        if !request.child_agent_id.has_prefix(prefix::AGENT_DEFINITION)
            || !request.parent_agent_id.has_prefix(prefix::INSTANCE)
        {
            return Ok(None);
        }
        let parent_instance_id = InstanceId::new(request.parent_agent_id.as_str());
        let campaign_id = registry
            .instance(&parent_instance_id)
            .and_then(|parent| parent.campaign_id);
        let instance = registry.spawn_instance(
            &SpawnRequest {
                definition_id: request.child_agent_id.clone(),
                campaign_id,
                parent_instance_id: Some(parent_instance_id),
                frame: Some(effective_frame.render()),
            },
            now,
        )?;
        Ok(Some(instance))
    }

    /// Revokes an active delegation. Parent-only.
    ///
    /// # Errors
    ///
    /// Returns [`DelegationError`] when the record is unknown, the caller
    /// is not the recorded parent, or the record is not active.
    pub fn revoke(
        &self,
        delegation_id: &DelegationId,
        caller: &AgentId,
        now: Timestamp,
    ) -> Result<DelegationRecord, DelegationError> {
        let record = {
            let mut records = self.records.lock().map_err(|_| DelegationError::Unavailable)?;
            let record = records.get_mut(delegation_id).ok_or_else(|| {
                DelegationError::UnknownDelegation(delegation_id.to_string())
            })?;
            if &record.parent_agent_id != caller {
                return Err(DelegationError::NotParent(delegation_id.to_string()));
            }
            if record.status != DelegationStatus::Active {
                return Err(DelegationError::NotActive(delegation_id.to_string()));
            }
            record.status = DelegationStatus::Revoked;
            record.revoked_at = Some(now);
            record.clone()
        };
        self.audit.record(
            AuditEventDraft::new(AuditEventType::DelegationRevoked, now)
                .agent(caller.clone())
                .detail("delegation_id", Value::String(delegation_id.to_string())),
        );
        Ok(record)
    }

    /// Returns a delegation record by identifier.
    #[must_use]
    pub fn get(&self, delegation_id: &DelegationId) -> Option<DelegationRecord> {
        let records = self.records.lock().ok()?;
        records.get(delegation_id).cloned()
    }

    /// Lists delegations recorded for a parent.
    #[must_use]
    pub fn for_parent(&self, parent_agent_id: &AgentId) -> Vec<DelegationRecord> {
        let Ok(records) = self.records.lock() else {
            return Vec::new();
        };
        records
            .values()
            .filter(|record| &record.parent_agent_id == parent_agent_id)
            .cloned()
            .collect()
    }

    /// Returns whether a delegation is active.
    #[must_use]
    pub fn is_active(&self, delegation_id: &DelegationId) -> bool {
        self.get(delegation_id)
            .is_some_and(|record| record.status == DelegationStatus::Active)
    }

    // ------------------------------------------------------------------
    // Inheritance
    // ------------------------------------------------------------------

    /// Materializes the effective child frame under an inheritance mode.
    fn materialize(
        &self,
        parent: &ParsedFrame,
        child: &ParsedFrame,
        mode: InheritanceMode,
    ) -> Option<ParsedFrame> {
        let registry = self.resolver.registry();
        let switches = match mode {
            InheritanceMode::Strict => CustomInheritance {
                inherit_mode: true,
                inherit_domain: true,
                inherit_constraints: true,
                inherit_modifiers: true,
            },
            InheritanceMode::Relaxed => CustomInheritance {
                inherit_mode: false,
                inherit_domain: true,
                inherit_constraints: false,
                inherit_modifiers: false,
            },
            InheritanceMode::Custom(switches) => switches,
        };

        let mut effective = child.clone();
        if switches.inherit_mode && effective.mode.is_none() {
            effective.mode = parent.mode;
        }
        if switches.inherit_domain && parent.domain.is_some() {
            effective.domain = parent.domain;
        }
        let inherited_constraints = match mode {
            InheritanceMode::Strict => parent.inheritable_constraints(registry),
            InheritanceMode::Relaxed => {
                forbidden_constraint(parent, registry).into_iter().collect()
            }
            InheritanceMode::Custom(_) if switches.inherit_constraints => {
                parent.inheritable_constraints(registry)
            }
            InheritanceMode::Custom(_) => Vec::new(),
        };
        for constraint in inherited_constraints {
            if !effective.constraints.contains(&constraint) {
                effective.constraints.push(constraint);
            }
        }
        if switches.inherit_modifiers && !has_priority_modifier(&effective, registry) {
            if let Some(priority) = priority_modifier(parent, registry) {
                effective.modifiers.push(priority);
            }
        }
        effective.rebuild_canonical();

        // Re-parse the rendered form so attributes and symbol order come
        // from one code path.
        self.resolver.parse(&effective.render())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when the report carries errors the effective frame did
/// not repair through inheritance.
fn has_unrepaired_errors(report: &ValidationReport, effective: &ParsedFrame) -> bool {
    report.errors.iter().any(|finding| match finding.rule.as_str() {
        rules::CH_003 => finding
            .symbol
            .is_none_or(|symbol| !effective.constraints.contains(&symbol)),
        rules::CH_006 => finding.symbol.is_none_or(|symbol| effective.mode != Some(symbol)),
        _ => true,
    })
}

/// Returns the parent's forbidden constraint, when present.
fn forbidden_constraint(frame: &ParsedFrame, registry: &SymbolRegistry) -> Option<Symbol> {
    frame.constraints.iter().copied().find(|constraint| {
        frame
            .attributes_for(*constraint, registry)
            .is_some_and(|attrs| attrs.name == "forbidden")
    })
}

/// Returns whether the frame carries a priority modifier.
fn has_priority_modifier(frame: &ParsedFrame, registry: &SymbolRegistry) -> bool {
    priority_modifier(frame, registry).is_some()
}

/// Returns the frame's priority modifier, when present.
fn priority_modifier(frame: &ParsedFrame, registry: &SymbolRegistry) -> Option<Symbol> {
    frame.modifiers.iter().copied().find(|modifier| {
        frame.attributes_for(*modifier, registry).is_some_and(|attrs| {
            attrs.category == SymbolCategory::Modifier
                && (attrs.name == "priority_high" || attrs.name == "priority_low")
        })
    })
}
