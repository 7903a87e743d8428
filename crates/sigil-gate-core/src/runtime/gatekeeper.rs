// sigil-gate-core/src/runtime/gatekeeper.rs
// ============================================================================
// Module: Sigil Gate Gatekeeper
// Description: The synchronous decision engine for intercepted operations.
// Purpose: Compose resolver, validator, drift, holds, and registry into decisions.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! The gatekeeper is the single canonical decision path: every transport
//! surface must call [`Gatekeeper::intercept`] before executing an
//! operation and [`Gatekeeper::record_outcome`] afterwards. Decisions are
//! always returned as data; `block` and `hold` are never errors and the
//! interceptor boundary never surfaces an exception to callers.
//!
//! The pipeline per operation: circuit check, parse and resolve, three
//! tier validation, scope check, quota check, hold policy, allow. An
//! allow whose coverage confidence falls below the configured floor is
//! downgraded to a hold.
//!
//! A hold approval may carry a replacement frame or arguments; transports
//! must resubmit the modified operation through [`Gatekeeper::intercept`]
//! so it is validated again before execution.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::Value;

use crate::core::agent::QuotaResource;
use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::decision::GateAction;
use crate::core::decision::InterceptRequest;
use crate::core::decision::InterceptorDecision;
use crate::core::drift::AgentDriftState;
use crate::core::drift::CircuitState;
use crate::core::frame::ParsedFrame;
use crate::core::hold::HoldSeverity;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::InstanceId;
use crate::core::identifiers::ToolName;
use crate::core::identifiers::prefix;
use crate::core::time::Timestamp;
use crate::core::validation::ValidationReport;
use crate::core::validation::rules;
use crate::runtime::audit::AuditLog;
use crate::runtime::drift::DriftEngine;
use crate::runtime::hold::HoldCreateRequest;
use crate::runtime::hold::HoldManager;
use crate::runtime::registry::AgentRegistry;
use crate::runtime::resolver::FrameResolver;
use crate::runtime::validator::FrameValidator;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wall-clock budget for a single decision, excluding I/O. The pipeline
/// is pure compute over in-memory state; hosts treat an overrun as a
/// collaborator fault and fail closed.
pub const DEFAULT_DECISION_BUDGET_MS: u64 = 100;

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Cooperative cancellation token for in-flight decisions.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Set once cancellation is requested.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Gatekeeper configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GatekeeperConfig {
    /// Whether warning-level drift alone forces a hold.
    pub hold_on_drift_prediction: bool,
    /// Whether a forbidden-with-execute finding forces a hold.
    pub hold_on_forbidden_with_override: bool,
    /// Minimum coverage confidence an allow decision must reach.
    pub allow_confidence_floor: f64,
    /// Coverage penalty applied per validation error.
    pub error_penalty: f64,
    /// Coverage penalty applied per validation warning.
    pub warning_penalty: f64,
    /// Tools exempt from `requires_approval` holds.
    pub approval_whitelist: Vec<ToolName>,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            hold_on_drift_prediction: true,
            // A forbidden constraint alongside execute is a warning by
            // itself; deployments opt in to forcing review for it.
            hold_on_forbidden_with_override: false,
            allow_confidence_floor: 0.5,
            error_penalty: 0.25,
            warning_penalty: 0.10,
            approval_whitelist: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Gatekeeper
// ============================================================================

/// Synchronous decision engine applied to every intercepted operation.
pub struct Gatekeeper {
    /// Frame resolver.
    resolver: FrameResolver,
    /// Three-tier validator.
    validator: FrameValidator,
    /// Drift engine.
    drift: Arc<DriftEngine>,
    /// Hold manager.
    holds: Arc<HoldManager>,
    /// Agent registry.
    registry: Arc<AgentRegistry>,
    /// Shared audit log.
    audit: Arc<AuditLog>,
    /// Gatekeeper configuration.
    config: GatekeeperConfig,
}

impl Gatekeeper {
    /// Creates a gatekeeper over its collaborators.
    #[must_use]
    pub fn new(
        resolver: FrameResolver,
        validator: FrameValidator,
        drift: Arc<DriftEngine>,
        holds: Arc<HoldManager>,
        registry: Arc<AgentRegistry>,
        audit: Arc<AuditLog>,
        config: GatekeeperConfig,
    ) -> Self {
        Self {
            resolver,
            validator,
            drift,
            holds,
            registry,
            audit,
            config,
        }
    }

    /// Returns the gatekeeper configuration.
    #[must_use]
    pub const fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Decides an intercepted operation, committing side effects (hold
    /// creation, rate accounting, audit events).
    #[must_use]
    pub fn intercept(&self, request: &InterceptRequest) -> InterceptorDecision {
        self.decide(request, true, None).unwrap_or_else(|| {
            InterceptorDecision::new(request, GateAction::Block, "decision discarded", 0.0)
        })
    }

    /// Decides an operation under a cancellation token. Cancellation
    /// observed after parse and validation but before commit discards the
    /// decision with no state changes and returns `None`.
    #[must_use]
    pub fn intercept_cancellable(
        &self,
        request: &InterceptRequest,
        token: &CancellationToken,
    ) -> Option<InterceptorDecision> {
        self.decide(request, true, Some(token))
    }

    /// Read-only dry run of the decision pipeline. Creates no holds,
    /// consumes no quota, and records no audit events.
    #[must_use]
    pub fn precheck(&self, request: &InterceptRequest) -> InterceptorDecision {
        self.decide(request, false, None).unwrap_or_else(|| {
            InterceptorDecision::new(request, GateAction::Block, "decision discarded", 0.0)
        })
    }

    /// Decides a batch of operations in input order.
    #[must_use]
    pub fn intercept_batch(&self, requests: &[InterceptRequest]) -> Vec<InterceptorDecision> {
        requests.iter().map(|request| self.intercept(request)).collect()
    }

    /// Read-only dry run over a batch of operations.
    #[must_use]
    pub fn precheck_batch(&self, requests: &[InterceptRequest]) -> Vec<InterceptorDecision> {
        requests.iter().map(|request| self.precheck(request)).collect()
    }

    /// Records the post-execution outcome of an operation, feeding the
    /// drift engine and the audit log.
    pub fn record_outcome(
        &self,
        agent_id: &AgentId,
        frame: &str,
        action: &str,
        success: bool,
        now: Timestamp,
    ) {
        let parsed = self.resolver.parse(frame).unwrap_or_default();
        let _alert = self.drift.record_operation(agent_id, &parsed, action, success, now);
        if agent_id.has_prefix(prefix::INSTANCE) {
            self.registry.record_outcome(&InstanceId::new(agent_id.as_str()), success, now);
        }
        self.audit.record(
            AuditEventDraft::new(AuditEventType::OutcomeRecorded, now)
                .agent(agent_id.clone())
                .detail("action", Value::String(action.to_string()))
                .detail("success", Value::Bool(success)),
        );
    }

    // ------------------------------------------------------------------
    // Decision pipeline
    // ------------------------------------------------------------------

    /// Runs the decision pipeline. With `commit` false the path is
    /// strictly read-only. Returns `None` when the cancellation token
    /// fires between validation and commit.
    #[allow(
        clippy::too_many_lines,
        reason = "Maintain a single linear flow for the ordered decision steps."
    )]
    fn decide(
        &self,
        request: &InterceptRequest,
        commit: bool,
        cancel: Option<&CancellationToken>,
    ) -> Option<InterceptorDecision> {
        let now = request.requested_at;

        // Step 1: circuit check. An open breaker blocks unconditionally.
        let drift_status = if commit {
            self.drift.status(&request.agent_id, now)
        } else {
            self.drift.peek_status(&request.agent_id, now)
        };
        if let Some(status) = &drift_status {
            if status.circuit == CircuitState::Open {
                let decision = InterceptorDecision::new(
                    request,
                    GateAction::Block,
                    "Circuit breaker is open",
                    1.0,
                );
                if commit {
                    self.audit_decision(request, &decision, now);
                }
                return Some(decision);
            }
        }

        // Step 2: parse and resolve.
        let Some(frame) = self.resolver.parse(&request.frame) else {
            let decision = InterceptorDecision::new(
                request,
                GateAction::Block,
                "frame could not be parsed",
                0.0,
            )
            .with_report(FrameValidator::parse_failed_report(&request.frame));
            if commit {
                self.audit_decision(request, &decision, now);
            }
            return Some(decision);
        };
        let parent = match &request.parent_frame {
            Some(raw) => match self.resolver.parse(raw) {
                Some(parent) => Some(parent),
                None => {
                    let decision = InterceptorDecision::new(
                        request,
                        GateAction::Block,
                        "parent frame could not be parsed",
                        0.0,
                    )
                    .with_report(FrameValidator::parse_failed_report(raw));
                    if commit {
                        self.audit_decision(request, &decision, now);
                    }
                    return Some(decision);
                }
            },
            None => None,
        };

        // Step 3: three-tier validation.
        let report = self.validator.validate(&frame, parent.as_ref());
        let coverage = self.coverage_confidence(&frame, &report);

        // Cancellation point: parse and validation are done, nothing has
        // been committed. A cancelled request is discarded here.
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return None;
        }

        if !report.valid() {
            let decision = InterceptorDecision::new(
                request,
                GateAction::Block,
                block_reason(&report),
                coverage,
            )
            .with_report(report);
            if commit {
                self.audit_decision(request, &decision, now);
            }
            return Some(decision);
        }

        // Steps 4 and 5: scope and quota for registered instances.
        if request.agent_id.has_prefix(prefix::INSTANCE) {
            let instance_id = InstanceId::new(request.agent_id.as_str());
            if let Some(decision) =
                self.scope_and_quota(request, &instance_id, coverage, &report, commit, now)
            {
                return Some(decision);
            }
        }

        // Step 6: hold policy.
        if let Some(reason) = self.hold_reason(request, &report, drift_status.as_ref()) {
            return Some(self.hold_decision(request, &reason, coverage, report, commit, now));
        }

        // Step 7: allow, unless coverage falls below the floor.
        if coverage < self.config.allow_confidence_floor {
            let reason = format!(
                "coverage confidence {coverage:.2} below allow floor {:.2}",
                self.config.allow_confidence_floor
            );
            return Some(self.hold_decision(request, &reason, coverage, report, commit, now));
        }

        if commit && request.agent_id.has_prefix(prefix::INSTANCE) {
            let instance_id = InstanceId::new(request.agent_id.as_str());
            self.registry.record_usage(&instance_id, QuotaResource::RatePerMinute, 1, now);
        }
        let decision = InterceptorDecision::new(request, GateAction::Allow, "allowed", coverage)
            .with_report(report);
        if commit {
            self.audit_decision(request, &decision, now);
        }
        Some(decision)
    }

    /// Applies scope and quota checks. Returns a blocking decision when a
    /// check fails, `None` when the instance may proceed.
    fn scope_and_quota(
        &self,
        request: &InterceptRequest,
        instance_id: &InstanceId,
        coverage: f64,
        report: &ValidationReport,
        commit: bool,
        now: Timestamp,
    ) -> Option<InterceptorDecision> {
        let allowed = self.registry.tool_allowed(instance_id, &request.tool);
        match allowed {
            None => {
                let decision = InterceptorDecision::new(
                    request,
                    GateAction::Block,
                    format!("unknown instance `{instance_id}`"),
                    coverage,
                )
                .with_report(report.clone());
                if commit {
                    self.audit_decision(request, &decision, now);
                }
                Some(decision)
            }
            Some(false) => {
                let decision = InterceptorDecision::new(
                    request,
                    GateAction::Block,
                    format!("tool `{}` is outside the instance scope", request.tool),
                    coverage,
                )
                .with_report(report.clone());
                if commit {
                    self.audit.record(
                        AuditEventDraft::new(AuditEventType::ScopeDenied, now)
                            .agent(request.agent_id.clone())
                            .instance(instance_id.clone())
                            .detail("tool", Value::String(request.tool.to_string())),
                    );
                    self.audit_decision(request, &decision, now);
                }
                Some(decision)
            }
            Some(true) => {
                // Cumulative quotas are probed for one remaining unit;
                // an exhausted budget blocks before execution.
                let quotas = [
                    (QuotaResource::RatePerMinute, 1),
                    (QuotaResource::TokenBudget, 1),
                    (QuotaResource::ExecutionTime, 1),
                    (QuotaResource::SymbolsCreated, 1),
                ];
                for (resource, amount) in quotas {
                    let check = self.registry.check_quota(instance_id, resource, amount, now);
                    if !check.allowed {
                        let reason = check
                            .reason
                            .unwrap_or_else(|| format!("{} quota exhausted", resource.label()));
                        let decision = InterceptorDecision::new(
                            request,
                            GateAction::Block,
                            reason.clone(),
                            coverage,
                        )
                        .with_report(report.clone());
                        if commit {
                            self.audit.record(
                                AuditEventDraft::new(AuditEventType::QuotaDenied, now)
                                    .agent(request.agent_id.clone())
                                    .instance(instance_id.clone())
                                    .detail("resource", Value::String(resource.label().to_string()))
                                    .detail("reason", Value::String(reason)),
                            );
                            self.audit_decision(request, &decision, now);
                        }
                        return Some(decision);
                    }
                }
                None
            }
        }
    }

    /// Evaluates the hold policy. Returns the hold reason when any
    /// condition demands human review.
    fn hold_reason(
        &self,
        request: &InterceptRequest,
        report: &ValidationReport,
        drift_status: Option<&AgentDriftState>,
    ) -> Option<String> {
        if report.has_hold_severity() {
            return Some("validation raised a hold-severity finding".to_string());
        }
        if self.config.hold_on_forbidden_with_override && report.contains_rule(rules::SM_006) {
            return Some("forbidden constraint with execute action requires review".to_string());
        }
        if self.config.hold_on_drift_prediction {
            if let Some(status) = drift_status {
                if status.drift_score >= self.drift.config().warning_threshold {
                    return Some(format!(
                        "drift score {:.3} at or above warning threshold",
                        status.drift_score
                    ));
                }
            }
        }
        if request.agent_id.has_prefix(prefix::INSTANCE) {
            let instance_id = InstanceId::new(request.agent_id.as_str());
            if let Some(instance) = self.registry.instance(&instance_id) {
                let requires_approval = self
                    .registry
                    .definition(&instance.definition_id)
                    .is_some_and(|definition| definition.requires_approval);
                let whitelisted = self
                    .config
                    .approval_whitelist
                    .iter()
                    .any(|tool| tool == &request.tool);
                if requires_approval && !whitelisted {
                    return Some("instance requires approval for this tool".to_string());
                }
            }
        }
        None
    }

    /// Builds a hold decision, creating the hold when committing.
    fn hold_decision(
        &self,
        request: &InterceptRequest,
        reason: &str,
        coverage: f64,
        report: ValidationReport,
        commit: bool,
        now: Timestamp,
    ) -> InterceptorDecision {
        let mut decision =
            InterceptorDecision::new(request, GateAction::Hold, reason, coverage).with_report(report);
        if commit {
            let hold = self.holds.create(
                HoldCreateRequest {
                    agent_id: request.agent_id.clone(),
                    frame: request.frame.clone(),
                    tool: request.tool.clone(),
                    arguments: request.arguments.clone(),
                    reason: reason.to_string(),
                    severity: HoldSeverity::Medium,
                    metadata: BTreeMap::new(),
                },
                now,
            );
            decision = decision.with_hold_id(hold.hold_id);
            self.audit_decision(request, &decision, now);
        }
        decision
    }

    /// Computes coverage confidence from parse confidence and report
    /// penalties.
    fn coverage_confidence(&self, frame: &ParsedFrame, report: &ValidationReport) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "Finding counts are tiny.")]
        let error_penalty = (report.errors.len() as f64 * self.config.error_penalty).min(1.0);
        #[allow(clippy::cast_precision_loss, reason = "Finding counts are tiny.")]
        let warning_penalty = (report.warnings.len() as f64 * self.config.warning_penalty).min(1.0);
        (frame.parse_confidence * (1.0 - error_penalty) * (1.0 - warning_penalty)).clamp(0.0, 1.0)
    }

    /// Records the decision into the audit log.
    fn audit_decision(
        &self,
        request: &InterceptRequest,
        decision: &InterceptorDecision,
        now: Timestamp,
    ) {
        let event_type = match decision.action {
            GateAction::Allow => AuditEventType::InterceptAllowed,
            GateAction::Hold => AuditEventType::InterceptHeld,
            GateAction::Block => AuditEventType::InterceptBlocked,
        };
        let mut event = AuditEventDraft::new(event_type, now)
            .agent(request.agent_id.clone())
            .detail("tool", Value::String(request.tool.to_string()))
            .detail("reason", Value::String(decision.reason.clone()));
        if let Some(hold_id) = &decision.hold_id {
            event = event.detail("hold_id", Value::String(hold_id.to_string()));
        }
        self.audit.record(event);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a block reason from the first error findings.
fn block_reason(report: &ValidationReport) -> String {
    let ids: Vec<&str> = report.errors.iter().map(|finding| finding.rule.as_str()).collect();
    format!("validation failed: {}", ids.join(", "))
}
