// sigil-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Sigil Gate Audit Log
// Description: Append-only, totally ordered audit event log.
// Purpose: Provide the single event-recording surface shared by all components.
// Dependencies: crate::core, crate::interfaces, rand
// ============================================================================

//! ## Overview
//! The audit log is a single-writer queue with many readers: an internal
//! mutex serializes appends, a monotonic counter assigns the total order,
//! and readers always observe a consistent prefix. Events are never
//! mutated or deleted. When a persistent [`AuditStore`] is attached the
//! log writes through to it; a store failure degrades the log to
//! memory-only for that event and is itself recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::audit::AuditEvent;
use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::audit::AuditQuery;
use crate::core::identifiers::EventId;
use crate::core::identifiers::prefix;
use crate::interfaces::AuditStore;

// ============================================================================
// SECTION: Audit Log
// ============================================================================

/// Writer-guarded log contents.
struct LogInner {
    /// Recorded events in sequence order.
    events: Vec<AuditEvent>,
    /// Next sequence number to assign.
    next_seq: u64,
}

/// Append-only audit log with total ordering.
///
/// # Invariants
/// - Sequence numbers are assigned and events appended under one lock, so
///   a reader that has seen sequence `n` has seen every earlier sequence.
pub struct AuditLog {
    /// Guarded log contents.
    inner: Mutex<LogInner>,
    /// Boot-scoped random tag making event ids unique across restarts.
    boot_tag: u64,
    /// Optional persistent tee.
    store: Option<Box<dyn AuditStore + Send + Sync>>,
}

impl AuditLog {
    /// Creates a memory-only audit log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LogInner {
                events: Vec::new(),
                next_seq: 1,
            }),
            boot_tag: OsRng.next_u64(),
            store: None,
        }
    }

    /// Creates an audit log that writes through to the given store.
    #[must_use]
    pub fn with_store(store: Box<dyn AuditStore + Send + Sync>) -> Self {
        Self {
            inner: Mutex::new(LogInner {
                events: Vec::new(),
                next_seq: 1,
            }),
            boot_tag: OsRng.next_u64(),
            store: Some(store),
        }
    }

    /// Records a draft event, assigning its identity and sequence.
    ///
    /// Returns the recorded event. Store failures never propagate: the
    /// in-memory log stays authoritative and the failure is recorded as a
    /// follow-up `store_degraded` event.
    pub fn record(&self, draft: AuditEventDraft) -> AuditEvent {
        let event = self.append(draft);
        if let Some(store) = &self.store {
            if let Err(err) = store.append_event(&event) {
                let degraded = AuditEventDraft::new(AuditEventType::StoreDegraded, event.at)
                    .detail("error", serde_json::Value::String(err.to_string()))
                    .detail("event_id", serde_json::Value::String(event.event_id.to_string()));
                let _ = self.append(degraded);
            }
        }
        event
    }

    /// Appends a draft to the in-memory log under the writer lock.
    fn append(&self, draft: AuditEventDraft) -> AuditEvent {
        let Ok(mut inner) = self.inner.lock() else {
            // A poisoned log still needs to hand back an event; sequence
            // zero marks it as unrecorded.
            return materialize(draft, self.boot_tag, 0);
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let event = materialize(draft, self.boot_tag, seq);
        inner.events.push(event.clone());
        event
    }

    /// Returns events matching the query, in sequence order.
    #[must_use]
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEvent> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        let mut out: Vec<AuditEvent> =
            inner.events.iter().filter(|event| query.matches(event)).cloned().collect();
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        out
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.events.len())
    }

    /// Returns true when no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the final event record for a draft.
fn materialize(draft: AuditEventDraft, boot_tag: u64, seq: u64) -> AuditEvent {
    AuditEvent {
        event_id: EventId::new(format!("{}{boot_tag:016x}_{seq}", prefix::EVENT)),
        seq,
        event_type: draft.event_type,
        at: draft.at,
        agent_id: draft.agent_id,
        instance_id: draft.instance_id,
        campaign_id: draft.campaign_id,
        proposal_id: draft.proposal_id,
        operator_id: draft.operator_id,
        details: draft.details,
    }
}
