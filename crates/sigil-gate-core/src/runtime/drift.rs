// sigil-gate-core/src/runtime/drift.rs
// ============================================================================
// Module: Sigil Gate Drift Engine
// Description: Per-agent drift scoring and the circuit breaker state machine.
// Purpose: Detect and halt agents departing from their baseline behavior.
// Dependencies: crate::core, crate::runtime::audit
// ============================================================================

//! ## Overview
//! The drift engine keeps one mutex-guarded state per agent: a fixed
//! capacity sliding window of recent operations, the baseline captured at
//! the first operation, the current drift score, and the circuit breaker.
//! The machine's only external inputs are caller-supplied clock readings
//! and success/failure reports; transitions are reported, never retried,
//! and the engine itself never blocks on I/O. The open to half-open
//! transition is computed lazily on status reads, so no timer thread is
//! required.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;

use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::drift::AgentDriftState;
use crate::core::drift::CircuitState;
use crate::core::drift::DriftAlert;
use crate::core::drift::DriftAlertLevel;
use crate::core::drift::DriftBaseline;
use crate::core::drift::DriftConfig;
use crate::core::drift::OperationRecord;
use crate::core::frame::ParsedFrame;
use crate::core::identifiers::AgentId;
use crate::core::symbol::SymbolRegistry;
use crate::core::time::Timestamp;
use crate::runtime::audit::AuditLog;

// ============================================================================
// SECTION: Per-Agent State
// ============================================================================

/// Mutable drift state for one agent, guarded by its own mutex.
struct AgentState {
    /// Sliding window of recent operations, oldest first.
    window: VecDeque<OperationRecord>,
    /// Current drift score.
    drift_score: f64,
    /// Drift score before the latest record, for crossing detection.
    previous_score: f64,
    /// Breaker state.
    circuit: CircuitState,
    /// Consecutive failures observed.
    consecutive_failures: u32,
    /// Baseline captured at the first operation.
    baseline: Option<DriftBaseline>,
    /// Time of the last breaker transition.
    last_transition: Timestamp,
}

impl AgentState {
    /// Creates a fresh closed-circuit state.
    const fn new(now: Timestamp) -> Self {
        Self {
            window: VecDeque::new(),
            drift_score: 0.0,
            previous_score: 0.0,
            circuit: CircuitState::Closed,
            consecutive_failures: 0,
            baseline: None,
            last_transition: now,
        }
    }

    /// Builds a snapshot for status queries.
    fn snapshot(&self, agent_id: AgentId) -> AgentDriftState {
        AgentDriftState {
            agent_id,
            window: self.window.iter().cloned().collect(),
            drift_score: self.drift_score,
            circuit: self.circuit,
            consecutive_failures: self.consecutive_failures,
            baseline: self.baseline.clone(),
            last_transition: self.last_transition,
        }
    }
}

// ============================================================================
// SECTION: Drift Engine
// ============================================================================

/// Per-agent drift tracker with circuit breakers.
pub struct DriftEngine {
    /// Engine configuration.
    config: DriftConfig,
    /// Ontology used for mode strengths and constraint attributes.
    registry: SymbolRegistry,
    /// Per-agent states. The outer lock only guards the map shape; each
    /// agent's state has its own lock and no call holds both while doing
    /// work.
    agents: Mutex<BTreeMap<AgentId, Arc<Mutex<AgentState>>>>,
    /// Shared audit log.
    audit: Arc<AuditLog>,
}

impl DriftEngine {
    /// Creates a drift engine.
    #[must_use]
    pub fn new(config: DriftConfig, registry: SymbolRegistry, audit: Arc<AuditLog>) -> Self {
        Self {
            config,
            registry,
            agents: Mutex::new(BTreeMap::new()),
            audit,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Records an observed operation for an agent.
    ///
    /// Appends to the sliding window, recomputes the drift score, advances
    /// the breaker, and returns an alert when a threshold was crossed on
    /// this record.
    pub fn record_operation(
        &self,
        agent_id: &AgentId,
        frame: &ParsedFrame,
        action: &str,
        success: bool,
        now: Timestamp,
    ) -> Option<DriftAlert> {
        let state = self.agent_state(agent_id, now);
        let (alert, transition) = {
            let Ok(mut state) = state.lock() else {
                return None;
            };
            self.apply_record(agent_id, &mut state, frame, action, success, now)
        };

        if let Some((from, to)) = transition {
            self.record_transition(agent_id, from, to, now);
        }
        if let Some(alert) = &alert {
            self.audit.record(
                AuditEventDraft::new(AuditEventType::DriftAlert, now)
                    .agent(agent_id.clone())
                    .detail("level", Value::String(alert.level.label().to_string()))
                    .detail("score", score_value(alert.score)),
            );
        }
        alert
    }

    /// Returns a drift snapshot for an agent, advancing an open breaker to
    /// half-open when the cooldown has elapsed.
    #[must_use]
    pub fn status(&self, agent_id: &AgentId, now: Timestamp) -> Option<AgentDriftState> {
        let state = {
            let Ok(agents) = self.agents.lock() else {
                return None;
            };
            agents.get(agent_id)?.clone()
        };
        let (snapshot, transition) = {
            let Ok(mut state) = state.lock() else {
                return None;
            };
            let mut transition = None;
            if state.circuit == CircuitState::Open
                && now.millis_since(state.last_transition) >= self.config.cooldown_ms
            {
                state.circuit = CircuitState::HalfOpen;
                state.last_transition = now;
                transition = Some((CircuitState::Open, CircuitState::HalfOpen));
            }
            (state.snapshot(agent_id.clone()), transition)
        };
        if let Some((from, to)) = transition {
            self.record_transition(agent_id, from, to, now);
        }
        Some(snapshot)
    }

    /// Returns a drift snapshot without committing any breaker
    /// transition. The returned circuit state reflects what a status read
    /// at `now` would observe, which keeps dry-run paths read-only.
    #[must_use]
    pub fn peek_status(&self, agent_id: &AgentId, now: Timestamp) -> Option<AgentDriftState> {
        let state = {
            let Ok(agents) = self.agents.lock() else {
                return None;
            };
            agents.get(agent_id)?.clone()
        };
        let Ok(state) = state.lock() else {
            return None;
        };
        let mut snapshot = state.snapshot(agent_id.clone());
        if snapshot.circuit == CircuitState::Open
            && now.millis_since(snapshot.last_transition) >= self.config.cooldown_ms
        {
            snapshot.circuit = CircuitState::HalfOpen;
        }
        Some(snapshot)
    }

    /// Forcibly opens an agent's breaker.
    pub fn halt_agent(&self, agent_id: &AgentId, reason: &str, now: Timestamp) {
        let state = self.agent_state(agent_id, now);
        let transition = {
            let Ok(mut state) = state.lock() else {
                return;
            };
            let from = state.circuit;
            state.circuit = CircuitState::Open;
            state.last_transition = now;
            (from != CircuitState::Open).then_some(from)
        };
        if transition.is_some() {
            self.audit.record(
                AuditEventDraft::new(AuditEventType::AgentHalted, now)
                    .agent(agent_id.clone())
                    .detail("reason", Value::String(reason.to_string())),
            );
        }
    }

    /// Returns the per-agent state handle, creating it on first use.
    fn agent_state(&self, agent_id: &AgentId, now: Timestamp) -> Arc<Mutex<AgentState>> {
        let Ok(mut agents) = self.agents.lock() else {
            return Arc::new(Mutex::new(AgentState::new(now)));
        };
        agents
            .entry(agent_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(AgentState::new(now))))
            .clone()
    }

    /// Applies one record under the agent lock. Returns the alert raised
    /// on this record plus any breaker transition performed.
    fn apply_record(
        &self,
        agent_id: &AgentId,
        state: &mut AgentState,
        frame: &ParsedFrame,
        action: &str,
        success: bool,
        now: Timestamp,
    ) -> (Option<DriftAlert>, Option<(CircuitState, CircuitState)>) {
        if state.baseline.is_none() {
            state.baseline = Some(DriftBaseline::capture(frame, now));
        }
        state.window.push_back(OperationRecord {
            frame: frame.clone(),
            action: action.to_string(),
            success,
            at: now,
        });
        while state.window.len() > self.config.window_size {
            state.window.pop_front();
        }

        if success {
            state.consecutive_failures = 0;
        } else {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        }

        state.previous_score = state.drift_score;
        state.drift_score = self.compute_score(state, frame);

        let mut transition = None;
        match state.circuit {
            CircuitState::HalfOpen => {
                let to = if success { CircuitState::Closed } else { CircuitState::Open };
                state.circuit = to;
                state.last_transition = now;
                transition = Some((CircuitState::HalfOpen, to));
            }
            CircuitState::Closed => {
                let critical = state.drift_score >= self.config.critical_threshold;
                let exhausted =
                    state.consecutive_failures >= self.config.consecutive_failure_ceiling;
                if critical || exhausted {
                    state.circuit = CircuitState::Open;
                    state.last_transition = now;
                    transition = Some((CircuitState::Closed, CircuitState::Open));
                }
            }
            CircuitState::Open => {}
        }

        let alert = self.alert_for_crossing(agent_id, state, now);
        (alert, transition)
    }

    /// Builds the alert for a threshold crossed on the latest record.
    fn alert_for_crossing(
        &self,
        agent_id: &AgentId,
        state: &AgentState,
        now: Timestamp,
    ) -> Option<DriftAlert> {
        let score = state.drift_score;
        let previous = state.previous_score;
        if score >= self.config.critical_threshold && previous < self.config.critical_threshold {
            return Some(DriftAlert {
                agent_id: agent_id.clone(),
                level: DriftAlertLevel::Critical,
                score,
                at: now,
                message: format!(
                    "drift score {score:.3} reached critical threshold {:.3}",
                    self.config.critical_threshold
                ),
            });
        }
        if score >= self.config.warning_threshold && previous < self.config.warning_threshold {
            return Some(DriftAlert {
                agent_id: agent_id.clone(),
                level: DriftAlertLevel::Warning,
                score,
                at: now,
                message: format!(
                    "drift score {score:.3} crossed warning threshold {:.3}",
                    self.config.warning_threshold
                ),
            });
        }
        None
    }

    /// Computes the weighted drift score for the current window.
    fn compute_score(&self, state: &AgentState, current: &ParsedFrame) -> f64 {
        let Some(baseline) = &state.baseline else {
            return 0.0;
        };
        let weights = self.config.weights;

        let mode_deviation = self.mode_deviation(baseline, current);
        let domain_change = f64::from(u8::from(
            baseline.domain.is_some() && baseline.domain != current.domain,
        ));
        let constraint_removal = self.constraint_removal(baseline, current);
        let failure_rate = window_failure_rate(&state.window);

        let score = mode_deviation.mul_add(
            weights.mode_deviation,
            domain_change.mul_add(
                weights.domain_change,
                constraint_removal
                    .mul_add(weights.constraint_removal, failure_rate * weights.failure_rate),
            ),
        );
        score.clamp(0.0, 1.0)
    }

    /// Normalized mode-strength deviation between baseline and current.
    fn mode_deviation(&self, baseline: &DriftBaseline, current: &ParsedFrame) -> f64 {
        let baseline_strength = baseline.mode.and_then(|mode| self.registry.strength(mode));
        let current_strength = current.mode_strength(&self.registry);
        let (Some(baseline_strength), Some(current_strength)) =
            (baseline_strength, current_strength)
        else {
            return 0.0;
        };
        let max_strength = self.registry.max_mode_strength();
        if max_strength <= 1 {
            return 0.0;
        }
        let delta = f64::from(baseline_strength.abs_diff(current_strength));
        (delta / f64::from(max_strength - 1)).clamp(0.0, 1.0)
    }

    /// Fraction of baseline constraints no longer present; dropping any
    /// inheritable constraint floors the contribution at one.
    fn constraint_removal(&self, baseline: &DriftBaseline, current: &ParsedFrame) -> f64 {
        if baseline.constraints.is_empty() {
            return 0.0;
        }
        let dropped: Vec<_> = baseline
            .constraints
            .iter()
            .filter(|constraint| !current.constraints.contains(constraint))
            .collect();
        if dropped.is_empty() {
            return 0.0;
        }
        let dropped_inheritable = dropped.iter().any(|constraint| {
            self.registry.lookup(**constraint).is_some_and(|attrs| attrs.inherits)
        });
        if dropped_inheritable {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss, reason = "Constraint counts are tiny.")]
        let fraction = dropped.len() as f64 / baseline.constraints.len() as f64;
        fraction.clamp(0.0, 1.0)
    }

    /// Records a breaker transition into the audit log.
    fn record_transition(
        &self,
        agent_id: &AgentId,
        from: CircuitState,
        to: CircuitState,
        now: Timestamp,
    ) {
        let event_type = match to {
            CircuitState::Open => AuditEventType::CircuitOpened,
            CircuitState::HalfOpen => AuditEventType::CircuitHalfOpen,
            CircuitState::Closed => AuditEventType::CircuitClosed,
        };
        self.audit.record(
            AuditEventDraft::new(event_type, now)
                .agent(agent_id.clone())
                .detail("from", Value::String(from.label().to_string()))
                .detail("to", Value::String(to.label().to_string())),
        );
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Failure rate across the sliding window.
fn window_failure_rate(window: &VecDeque<OperationRecord>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window.iter().filter(|record| !record.success).count();
    #[allow(clippy::cast_precision_loss, reason = "Window capacity is small.")]
    let rate = failures as f64 / window.len() as f64;
    rate
}

/// Serializes a score into a JSON number, falling back to null.
fn score_value(score: f64) -> Value {
    serde_json::Number::from_f64(score).map_or(Value::Null, Value::Number)
}
