// sigil-gate-core/tests/drift.rs
// ============================================================================
// Module: Drift Engine Tests
// Description: Tests for drift scoring and the circuit breaker machine.
// ============================================================================
//! ## Overview
//! Validates baseline capture, score contributions, threshold alerts,
//! consecutive-failure trips, and the open/half-open/closed cycle.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use sigil_gate_core::AuditLog;
use sigil_gate_core::CircuitState;
use sigil_gate_core::DriftAlertLevel;
use sigil_gate_core::DriftConfig;
use sigil_gate_core::DriftEngine;
use sigil_gate_core::FrameResolver;
use sigil_gate_core::ParsedFrame;
use sigil_gate_core::SymbolRegistry;
use sigil_gate_core::Timestamp;
use sigil_gate_core::identifiers::AgentId;

/// Builds a drift engine with the given configuration.
fn engine(config: DriftConfig) -> DriftEngine {
    DriftEngine::new(config, SymbolRegistry::default_ontology(), Arc::new(AuditLog::new()))
}

/// Parses a frame through the default resolver.
fn parse(raw: &str) -> ParsedFrame {
    FrameResolver::new(SymbolRegistry::default_ontology())
        .parse(raw)
        .expect("test frame parses")
}

/// Timestamp helper.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Tests that a stable agent accrues no drift.
#[test]
fn test_stable_agent_has_zero_drift() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.stable");
    let frame = parse("⊕◊⛔▶");
    for step in 0..10 {
        let alert = engine.record_operation(&agent, &frame, "transfer", true, at(step));
        assert!(alert.is_none());
    }
    let status = engine.status(&agent, at(100)).expect("agent tracked");
    assert_eq!(status.drift_score, 0.0);
    assert_eq!(status.circuit, CircuitState::Closed);
    assert_eq!(status.window.len(), 10);
}

/// Tests that a domain change raises a warning alert on the crossing.
#[test]
fn test_domain_change_crosses_warning() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.wanderer");
    assert!(engine.record_operation(&agent, &parse("⊕◊▶"), "transfer", true, at(0)).is_none());
    let alert = engine
        .record_operation(&agent, &parse("⊕◈▶"), "transfer", true, at(1))
        .expect("warning alert raised");
    assert_eq!(alert.level, DriftAlertLevel::Warning);
    assert!(alert.score >= 0.15);
}

/// Tests that dropping an inheritable constraint floors the removal
/// contribution and trips the breaker at critical.
#[test]
fn test_inheritable_constraint_drop_trips_breaker() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.shedding");
    assert!(engine.record_operation(&agent, &parse("⊕◊⛔▶"), "transfer", true, at(0)).is_none());
    let alert = engine
        .record_operation(&agent, &parse("⊕◊▶"), "transfer", true, at(1))
        .expect("critical alert raised");
    assert_eq!(alert.level, DriftAlertLevel::Critical);
    let status = engine.status(&agent, at(2)).expect("agent tracked");
    assert_eq!(status.circuit, CircuitState::Open);
}

/// Tests the consecutive-failure ceiling opens the breaker.
#[test]
fn test_consecutive_failures_open_breaker() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.flaky");
    let frame = parse("⊕◊▶");
    for step in 0..3 {
        engine.record_operation(&agent, &frame, "transfer", false, at(step));
    }
    let status = engine.status(&agent, at(10)).expect("agent tracked");
    assert_eq!(status.circuit, CircuitState::Open);
    assert_eq!(status.consecutive_failures, 3);
}

/// Tests a success resets the consecutive-failure counter.
#[test]
fn test_success_resets_failure_streak() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.recovering");
    let frame = parse("⊕◊▶");
    engine.record_operation(&agent, &frame, "transfer", false, at(0));
    engine.record_operation(&agent, &frame, "transfer", false, at(1));
    engine.record_operation(&agent, &frame, "transfer", true, at(2));
    engine.record_operation(&agent, &frame, "transfer", false, at(3));
    let status = engine.status(&agent, at(4)).expect("agent tracked");
    assert_eq!(status.circuit, CircuitState::Closed);
    assert_eq!(status.consecutive_failures, 1);
}

/// Tests the time-triggered open to half-open transition on status reads.
#[test]
fn test_open_transitions_to_half_open_after_cooldown() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.cooling");
    let frame = parse("⊕◊▶");
    for step in 0..3 {
        engine.record_operation(&agent, &frame, "transfer", false, at(step));
    }
    let before = engine.status(&agent, at(1_000)).expect("agent tracked");
    assert_eq!(before.circuit, CircuitState::Open);
    let after = engine.status(&agent, at(40_000)).expect("agent tracked");
    assert_eq!(after.circuit, CircuitState::HalfOpen);
}

/// Tests that a read-only peek does not commit the transition.
#[test]
fn test_peek_does_not_commit_half_open() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.peeked");
    let frame = parse("⊕◊▶");
    for step in 0..3 {
        engine.record_operation(&agent, &frame, "transfer", false, at(step));
    }
    let peek = engine.peek_status(&agent, at(40_000)).expect("agent tracked");
    assert_eq!(peek.circuit, CircuitState::HalfOpen);
    let peek_again = engine.peek_status(&agent, at(1_000)).expect("agent tracked");
    assert_eq!(peek_again.circuit, CircuitState::Open);
}

/// Tests half-open success closes and half-open failure reopens.
#[test]
fn test_half_open_probe_outcomes() {
    let config = DriftConfig::default();
    let engine = engine(config);
    let agent = AgentId::new("agent.probing");
    let frame = parse("⊕◊▶");
    for step in 0..3 {
        engine.record_operation(&agent, &frame, "transfer", false, at(step));
    }
    let _ = engine.status(&agent, at(40_000));
    engine.record_operation(&agent, &frame, "transfer", true, at(40_001));
    let closed = engine.status(&agent, at(40_002)).expect("agent tracked");
    assert_eq!(closed.circuit, CircuitState::Closed);

    for step in 0..3 {
        engine.record_operation(&agent, &frame, "transfer", false, at(50_000 + step));
    }
    let _ = engine.status(&agent, at(90_000));
    engine.record_operation(&agent, &frame, "transfer", false, at(90_001));
    let reopened = engine.status(&agent, at(90_002)).expect("agent tracked");
    assert_eq!(reopened.circuit, CircuitState::Open);
}

/// Tests the forced halt entry point.
#[test]
fn test_halt_agent_opens_breaker() {
    let engine = engine(DriftConfig::default());
    let agent = AgentId::new("agent.halted");
    engine.record_operation(&agent, &parse("⊕◊▶"), "transfer", true, at(0));
    engine.halt_agent(&agent, "operator request", at(1));
    let status = engine.status(&agent, at(2)).expect("agent tracked");
    assert_eq!(status.circuit, CircuitState::Open);
}

/// Tests FIFO window eviction at capacity.
#[test]
fn test_window_evicts_oldest() {
    let config = DriftConfig {
        window_size: 5,
        ..DriftConfig::default()
    };
    let engine = engine(config);
    let agent = AgentId::new("agent.windowed");
    let frame = parse("⊕◊▶");
    for step in 0..8 {
        engine.record_operation(&agent, &frame, "transfer", true, at(step));
    }
    let status = engine.status(&agent, at(100)).expect("agent tracked");
    assert_eq!(status.window.len(), 5);
    assert_eq!(status.window.first().expect("window non-empty").at, at(3));
}

/// Tests that unknown agents have no status.
#[test]
fn test_unknown_agent_has_no_status() {
    let engine = engine(DriftConfig::default());
    assert!(engine.status(&AgentId::new("agent.ghost"), at(0)).is_none());
}
