// sigil-gate-core/src/runtime/hold.rs
// ============================================================================
// Module: Sigil Gate Hold Manager
// Description: Pending hold queue with at-most-once terminal transitions.
// Purpose: Manage human-in-the-loop approvals for paused operations.
// Dependencies: crate::core, crate::interfaces, crate::runtime::audit, rand
// ============================================================================

//! ## Overview
//! The hold manager owns every hold from creation to its single terminal
//! transition. All holds live behind one manager lock, which makes the
//! compare-and-set from `pending` trivial: the first approve or reject
//! wins and later calls return `None` without side effects. The expiry
//! sweeper is idempotent and may run on any scheduler. Creation is
//! deduplicated by a fingerprint over `(agent, frame, tool, arguments)`
//! within a short window so transport retries do not multiply holds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;

use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::hashing::fingerprint;
use crate::core::hold::HoldConfig;
use crate::core::hold::HoldDecision;
use crate::core::hold::HoldRequest;
use crate::core::hold::HoldSeverity;
use crate::core::hold::HoldState;
use crate::core::hold::HoldStats;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::HoldId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ToolName;
use crate::core::identifiers::prefix;
use crate::core::time::Timestamp;
use crate::interfaces::HoldNotifier;
use crate::runtime::audit::AuditLog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Synthetic operator identity used by the expiry sweeper.
const SWEEPER_OPERATOR: &str = "system.sweeper";

// ============================================================================
// SECTION: Manager State
// ============================================================================

/// Guarded hold manager state.
struct HoldInner {
    /// Every hold ever created, keyed by id.
    holds: BTreeMap<HoldId, HoldRequest>,
    /// Terminal decisions in creation order.
    history: Vec<HoldDecision>,
    /// Creation fingerprints for idempotent create.
    fingerprints: BTreeMap<String, (HoldId, Timestamp)>,
    /// Monotonic id counter.
    next_seq: u64,
}

/// Parameters for creating a hold.
#[derive(Debug, Clone)]
pub struct HoldCreateRequest {
    /// Agent whose operation is held.
    pub agent_id: AgentId,
    /// Original frame expression.
    pub frame: String,
    /// Requested tool.
    pub tool: ToolName,
    /// Tool arguments.
    pub arguments: Value,
    /// Why the hold is needed.
    pub reason: String,
    /// Review severity.
    pub severity: HoldSeverity,
    /// Opaque metadata.
    pub metadata: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Hold Manager
// ============================================================================

/// At-most-once human-in-the-loop approval queue.
pub struct HoldManager {
    /// Manager configuration.
    config: HoldConfig,
    /// Guarded state.
    inner: Mutex<HoldInner>,
    /// Boot-scoped random tag for id suffixes.
    boot_tag: u64,
    /// Shared audit log.
    audit: Arc<AuditLog>,
    /// Optional notification hook.
    notifier: Option<Box<dyn HoldNotifier + Send + Sync>>,
}

impl HoldManager {
    /// Creates a hold manager.
    #[must_use]
    pub fn new(config: HoldConfig, audit: Arc<AuditLog>) -> Self {
        Self {
            config,
            inner: Mutex::new(HoldInner {
                holds: BTreeMap::new(),
                history: Vec::new(),
                fingerprints: BTreeMap::new(),
                next_seq: 1,
            }),
            boot_tag: OsRng.next_u64(),
            audit,
            notifier: None,
        }
    }

    /// Attaches a notification hook.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn HoldNotifier + Send + Sync>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Returns the manager configuration.
    #[must_use]
    pub const fn config(&self) -> &HoldConfig {
        &self.config
    }

    /// Creates a hold, or returns the existing pending hold when an
    /// identical request was created within the fingerprint window.
    pub fn create(&self, request: HoldCreateRequest, now: Timestamp) -> HoldRequest {
        let print = creation_fingerprint(&request);
        let created = {
            let Ok(mut inner) = self.inner.lock() else {
                return orphan_hold(&request, now);
            };
            if let Some(existing) = self.deduplicate(&inner, print.as_deref(), now) {
                return existing;
            }

            let seq = inner.next_seq;
            inner.next_seq += 1;
            let hold_id = HoldId::new(format!(
                "{}{seq:06}_{:08x}",
                prefix::HOLD,
                self.boot_tag & 0xFFFF_FFFF
            ));
            let hold = HoldRequest {
                hold_id: hold_id.clone(),
                agent_id: request.agent_id.clone(),
                frame: request.frame.clone(),
                tool: request.tool.clone(),
                arguments: request.arguments.clone(),
                reason: request.reason.clone(),
                severity: request.severity,
                metadata: request.metadata.clone(),
                created_at: now,
                expires_at: self
                    .config
                    .default_timeout_ms
                    .map(|timeout| now.saturating_add_millis(timeout)),
                state: HoldState::Pending,
            };
            if let Some(print) = print {
                inner.fingerprints.insert(print, (hold_id.clone(), now));
            }
            inner.holds.insert(hold_id, hold.clone());
            hold
        };

        let mut event = AuditEventDraft::new(AuditEventType::HoldCreated, now)
            .agent(created.agent_id.clone())
            .detail("hold_id", Value::String(created.hold_id.to_string()))
            .detail("severity", Value::String(created.severity.label().to_string()));
        if let Some(notifier) = &self.notifier {
            if let Err(err) = notifier.hold_created(&created) {
                event = event.detail("notify_error", Value::String(err.to_string()));
            }
        }
        self.audit.record(event);
        created
    }

    /// Approves a pending hold. Returns `None` when the hold is unknown or
    /// already terminal.
    pub fn approve(
        &self,
        hold_id: &HoldId,
        approver: &OperatorId,
        reason: &str,
        modified_frame: Option<String>,
        modified_arguments: Option<Value>,
        now: Timestamp,
    ) -> Option<HoldDecision> {
        let decision =
            self.transition(hold_id, HoldState::Approved, approver, reason, now, |decision| {
                decision.modified_frame = modified_frame;
                decision.modified_arguments = modified_arguments;
            })?;
        self.audit.record(
            AuditEventDraft::new(AuditEventType::HoldApproved, now)
                .operator(approver.clone())
                .detail("hold_id", Value::String(hold_id.to_string())),
        );
        Some(decision)
    }

    /// Rejects a pending hold. Returns `None` when the hold is unknown or
    /// already terminal.
    pub fn reject(
        &self,
        hold_id: &HoldId,
        decider: &OperatorId,
        reason: &str,
        now: Timestamp,
    ) -> Option<HoldDecision> {
        let decision = self.transition(hold_id, HoldState::Rejected, decider, reason, now, |_| {})?;
        self.audit.record(
            AuditEventDraft::new(AuditEventType::HoldRejected, now)
                .operator(decider.clone())
                .detail("hold_id", Value::String(hold_id.to_string())),
        );
        Some(decision)
    }

    /// Expires every pending hold whose deadline has passed. Idempotent.
    ///
    /// Returns the holds expired by this sweep.
    pub fn sweep(&self, now: Timestamp) -> Vec<HoldId> {
        let expired = {
            let Ok(mut inner) = self.inner.lock() else {
                return Vec::new();
            };
            let due: Vec<HoldId> = inner
                .holds
                .values()
                .filter(|hold| {
                    hold.state == HoldState::Pending
                        && hold.expires_at.is_some_and(|deadline| deadline < now)
                })
                .map(|hold| hold.hold_id.clone())
                .collect();
            for hold_id in &due {
                if let Some(hold) = inner.holds.get_mut(hold_id) {
                    hold.state = HoldState::Expired;
                }
                inner.history.push(HoldDecision {
                    hold_id: hold_id.clone(),
                    decided_by: OperatorId::new(SWEEPER_OPERATOR),
                    decided_at: now,
                    reason: "hold expired before decision".to_string(),
                    outcome: HoldState::Expired,
                    modified_frame: None,
                    modified_arguments: None,
                });
            }
            due
        };
        for hold_id in &expired {
            self.audit.record(
                AuditEventDraft::new(AuditEventType::HoldExpired, now)
                    .detail("hold_id", Value::String(hold_id.to_string())),
            );
        }
        expired
    }

    /// Returns a hold by identifier.
    #[must_use]
    pub fn get(&self, hold_id: &HoldId) -> Option<HoldRequest> {
        let inner = self.inner.lock().ok()?;
        inner.holds.get(hold_id).cloned()
    }

    /// Lists pending holds, optionally filtered by agent.
    #[must_use]
    pub fn list_pending(&self, agent_id: Option<&AgentId>) -> Vec<HoldRequest> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        inner
            .holds
            .values()
            .filter(|hold| hold.state == HoldState::Pending)
            .filter(|hold| agent_id.is_none_or(|agent_id| &hold.agent_id == agent_id))
            .cloned()
            .collect()
    }

    /// Returns aggregate hold counters.
    #[must_use]
    pub fn stats(&self) -> HoldStats {
        let Ok(inner) = self.inner.lock() else {
            return HoldStats::default();
        };
        let mut stats = HoldStats::default();
        for hold in inner.holds.values() {
            match hold.state {
                HoldState::Pending => stats.pending += 1,
                HoldState::Approved => stats.approved += 1,
                HoldState::Rejected => stats.rejected += 1,
                HoldState::Expired => stats.expired += 1,
            }
        }
        stats
    }

    /// Returns the decision recorded for a hold, when terminal.
    #[must_use]
    pub fn decision_for(&self, hold_id: &HoldId) -> Option<HoldDecision> {
        let inner = self.inner.lock().ok()?;
        inner.history.iter().find(|decision| &decision.hold_id == hold_id).cloned()
    }

    /// Performs the compare-and-set terminal transition.
    fn transition(
        &self,
        hold_id: &HoldId,
        outcome: HoldState,
        decider: &OperatorId,
        reason: &str,
        now: Timestamp,
        mutate: impl FnOnce(&mut HoldDecision),
    ) -> Option<HoldDecision> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        let hold = inner.holds.get_mut(hold_id)?;
        if hold.state != HoldState::Pending {
            return None;
        }
        hold.state = outcome;
        let mut decision = HoldDecision {
            hold_id: hold_id.clone(),
            decided_by: decider.clone(),
            decided_at: now,
            reason: reason.to_string(),
            outcome,
            modified_frame: None,
            modified_arguments: None,
        };
        mutate(&mut decision);
        inner.history.push(decision.clone());
        Some(decision)
    }

    /// Returns an existing pending hold matching the fingerprint within
    /// the dedup window.
    fn deduplicate(
        &self,
        inner: &HoldInner,
        print: Option<&str>,
        now: Timestamp,
    ) -> Option<HoldRequest> {
        let print = print?;
        let (hold_id, created_at) = inner.fingerprints.get(print)?;
        if now.millis_since(*created_at) > self.config.fingerprint_window_ms {
            return None;
        }
        inner.holds.get(hold_id).filter(|hold| hold.state == HoldState::Pending).cloned()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Computes the creation fingerprint for deduplication.
fn creation_fingerprint(request: &HoldCreateRequest) -> Option<String> {
    let key = (
        request.agent_id.as_str(),
        request.frame.as_str(),
        request.tool.as_str(),
        &request.arguments,
    );
    fingerprint(&key).ok()
}

/// Builds a best-effort hold when the manager lock is poisoned. The hold
/// is not registered and cannot be approved; callers treat it as pending
/// forever, which fails closed.
fn orphan_hold(request: &HoldCreateRequest, now: Timestamp) -> HoldRequest {
    HoldRequest {
        hold_id: HoldId::new(format!("{}poisoned", prefix::HOLD)),
        agent_id: request.agent_id.clone(),
        frame: request.frame.clone(),
        tool: request.tool.clone(),
        arguments: request.arguments.clone(),
        reason: request.reason.clone(),
        severity: request.severity,
        metadata: request.metadata.clone(),
        created_at: now,
        expires_at: None,
        state: HoldState::Pending,
    }
}
