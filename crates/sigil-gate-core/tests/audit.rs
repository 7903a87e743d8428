// sigil-gate-core/tests/audit.rs
// ============================================================================
// Module: Audit Log Tests
// Description: Tests for total ordering, queries, and store teeing.
// ============================================================================
//! ## Overview
//! Validates sequence assignment, consistent-prefix reads, query
//! filters, and the degradation path when the persistent tee fails.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

use sigil_gate_core::AuditEvent;
use sigil_gate_core::AuditEventDraft;
use sigil_gate_core::AuditEventType;
use sigil_gate_core::AuditLog;
use sigil_gate_core::AuditQuery;
use sigil_gate_core::AuditStore;
use sigil_gate_core::StoreError;
use sigil_gate_core::Timestamp;
use sigil_gate_core::identifiers::AgentId;

/// Audit store stub that always fails.
struct FailingStore;

impl AuditStore for FailingStore {
    fn append_event(&self, _event: &AuditEvent) -> Result<(), StoreError> {
        Err(StoreError::Io("disk on fire".to_string()))
    }

    fn load_events_from(&self, _from_seq: u64) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(Vec::new())
    }
}

/// Timestamp helper.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Tests total ordering: sequences are dense, increasing, and reads see
/// a consistent prefix.
#[test]
fn test_sequences_are_total_order() {
    let log = AuditLog::new();
    for step in 0..5 {
        log.record(AuditEventDraft::new(AuditEventType::OutcomeRecorded, at(step)));
    }
    let events = log.query(&AuditQuery::default());
    assert_eq!(events.len(), 5);
    for (index, event) in events.iter().enumerate() {
        assert_eq!(event.seq, index as u64 + 1);
        assert!(event.event_id.as_str().starts_with("evt_"));
    }
}

/// Tests query filters by agent, type, and time range.
#[test]
fn test_query_filters() {
    let log = AuditLog::new();
    log.record(
        AuditEventDraft::new(AuditEventType::InterceptAllowed, at(10))
            .agent(AgentId::new("agent.a")),
    );
    log.record(
        AuditEventDraft::new(AuditEventType::InterceptBlocked, at(20))
            .agent(AgentId::new("agent.b")),
    );
    log.record(
        AuditEventDraft::new(AuditEventType::InterceptAllowed, at(30))
            .agent(AgentId::new("agent.a")),
    );

    let by_agent = log.query(&AuditQuery {
        agent_id: Some(AgentId::new("agent.a")),
        ..AuditQuery::default()
    });
    assert_eq!(by_agent.len(), 2);

    let by_type = log.query(&AuditQuery {
        event_type: Some(AuditEventType::InterceptBlocked),
        ..AuditQuery::default()
    });
    assert_eq!(by_type.len(), 1);

    let by_range = log.query(&AuditQuery {
        from: Some(at(15)),
        until: Some(at(30)),
        ..AuditQuery::default()
    });
    assert_eq!(by_range.len(), 1);

    let limited = log.query(&AuditQuery {
        limit: Some(2),
        ..AuditQuery::default()
    });
    assert_eq!(limited.len(), 2);
}

/// Tests that a failing persistent tee degrades to memory-only and is
/// itself recorded.
#[test]
fn test_failing_store_degrades_and_records() {
    let log = AuditLog::with_store(Box::new(FailingStore));
    log.record(AuditEventDraft::new(AuditEventType::HoldCreated, at(1)));

    let events = log.query(&AuditQuery::default());
    assert_eq!(events.len(), 2, "original event plus degradation record");
    assert_eq!(events[1].event_type, AuditEventType::StoreDegraded);
}
