// sigil-gate-core/tests/proposal.rs
// ============================================================================
// Module: Proposal Manager Tests
// Description: Tests for proposal generation, risk routing, and decisions.
// ============================================================================
//! ## Overview
//! Validates risk-based approval routing, the proposal/hold linkage,
//! operator decisions, expiry sweeping, and store write-through with
//! lazy rehydration.

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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use sigil_gate_core::AgentProposal;
use sigil_gate_core::AgentRegistry;
use sigil_gate_core::ApprovalLevel;
use sigil_gate_core::AuditLog;
use sigil_gate_core::CapabilityToolMap;
use sigil_gate_core::DataSource;
use sigil_gate_core::HoldConfig;
use sigil_gate_core::HoldManager;
use sigil_gate_core::HoldSeverity;
use sigil_gate_core::HoldState;
use sigil_gate_core::InstanceStatus;
use sigil_gate_core::ProposalConfig;
use sigil_gate_core::ProposalError;
use sigil_gate_core::ProposalManager;
use sigil_gate_core::ProposalState;
use sigil_gate_core::ProposalStore;
use sigil_gate_core::ProposalTrigger;
use sigil_gate_core::RegistryConfig;
use sigil_gate_core::StoreError;
use sigil_gate_core::Timestamp;
use sigil_gate_core::identifiers::OperatorId;
use sigil_gate_core::identifiers::ProposalId;
use sigil_gate_core::identifiers::SourceId;

/// In-memory proposal store for write-through and rehydration tests.
#[derive(Default)]
struct MemoryProposalStore {
    /// Saved proposals keyed by id.
    saved: Mutex<BTreeMap<ProposalId, AgentProposal>>,
}

impl ProposalStore for MemoryProposalStore {
    fn save_proposal(&self, proposal: &AgentProposal) -> Result<(), StoreError> {
        let mut saved = self.saved.lock().map_err(|_| StoreError::Io("poisoned".into()))?;
        saved.insert(proposal.proposal_id.clone(), proposal.clone());
        Ok(())
    }

    fn load_proposal(&self, proposal_id: &ProposalId) -> Result<Option<AgentProposal>, StoreError> {
        let saved = self.saved.lock().map_err(|_| StoreError::Io("poisoned".into()))?;
        Ok(saved.get(proposal_id).cloned())
    }

    fn list_proposals(
        &self,
        state: Option<ProposalState>,
    ) -> Result<Vec<AgentProposal>, StoreError> {
        let saved = self.saved.lock().map_err(|_| StoreError::Io("poisoned".into()))?;
        Ok(saved
            .values()
            .filter(|proposal| state.is_none_or(|state| proposal.state == state))
            .cloned()
            .collect())
    }
}

/// Test fixture bundling the proposal manager and collaborators.
struct Harness {
    /// Manager under test.
    manager: ProposalManager,
    /// Registry receiving spawns.
    registry: Arc<AgentRegistry>,
    /// Hold manager receiving linked holds.
    holds: Arc<HoldManager>,
}

/// Builds a harness, optionally backed by a shared store.
fn harness(store: Option<Arc<MemoryProposalStore>>) -> Harness {
    let audit = Arc::new(AuditLog::new());
    let registry = Arc::new(AgentRegistry::new(
        RegistryConfig::default(),
        CapabilityToolMap::default_map(),
        Arc::clone(&audit),
    ));
    let holds = Arc::new(HoldManager::new(HoldConfig::default(), Arc::clone(&audit)));
    let mut manager = ProposalManager::new(
        ProposalConfig::default(),
        Arc::clone(&registry),
        Arc::clone(&holds),
        audit,
    );
    if let Some(store) = store {
        manager = manager.with_store(Box::new(SharedStore {
            inner: store,
        }));
    }
    Harness {
        manager,
        registry,
        holds,
    }
}

/// Arc wrapper implementing the store trait for a shared memory store.
struct SharedStore {
    /// Shared backing store.
    inner: Arc<MemoryProposalStore>,
}

impl ProposalStore for SharedStore {
    fn save_proposal(&self, proposal: &AgentProposal) -> Result<(), StoreError> {
        self.inner.save_proposal(proposal)
    }

    fn load_proposal(&self, proposal_id: &ProposalId) -> Result<Option<AgentProposal>, StoreError> {
        self.inner.load_proposal(proposal_id)
    }

    fn list_proposals(
        &self,
        state: Option<ProposalState>,
    ) -> Result<Vec<AgentProposal>, StoreError> {
        self.inner.list_proposals(state)
    }
}

/// Builds a data source for tests.
fn source(source_type: &str, auth: Option<&str>) -> DataSource {
    DataSource {
        source_id: SourceId::new("src_feed_one"),
        name: "feed one".to_string(),
        source_type: source_type.to_string(),
        auth_scheme: auth.map(ToString::to_string),
        endpoint: Some("https://example.test/feed".to_string()),
        registered_at: at(0),
    }
}

/// Timestamp helper.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Tests that a low-risk source auto-approves and spawns immediately.
#[test]
fn test_low_risk_proposal_auto_approves() {
    let harness = harness(None);
    let proposal = harness
        .manager
        .generate_proposal(ProposalTrigger::NewDataSource, &source("database", None), BTreeMap::new(), at(0))
        .expect("proposal generated");

    assert_eq!(proposal.state, ProposalState::Approved);
    assert_eq!(proposal.approval_level, ApprovalLevel::Auto);
    assert!(proposal.risk.score() < 0.3, "auto approval implies low risk");
    assert!(!proposal.definition.requires_approval);
    assert!(proposal.hold_id.is_none());
    let decision = proposal.decision.expect("synthetic decision recorded");
    assert!(decision.approved);
    assert_eq!(decision.decided_by, OperatorId::new("system.auto"));

    assert!(
        harness.registry.definition(&proposal.definition.agent_id).is_some(),
        "auto approval registers the definition and spawns"
    );
}

/// Tests the web-scraping scenario: an authenticated scraping source
/// queues for human review with a linked hold and no spawned instance.
#[test]
fn test_scraper_proposal_queues_for_review() {
    let harness = harness(None);
    let proposal = harness
        .manager
        .generate_proposal(
            ProposalTrigger::NewDataSource,
            &source("web", Some("oauth2")),
            BTreeMap::new(),
            at(0),
        )
        .expect("proposal generated");

    assert_eq!(proposal.state, ProposalState::Pending);
    assert!(proposal.risk.score() >= 0.3);
    assert!(proposal.risk.factors.contains(&"oauth2".to_string()));
    assert!(proposal.risk.factors.contains(&"web_scraping".to_string()));

    let hold_id = proposal.hold_id.expect("hold linked");
    let hold = harness.holds.get(&hold_id).expect("hold exists");
    assert!(matches!(hold.severity, HoldSeverity::Medium | HoldSeverity::High));
    assert_eq!(hold.state, HoldState::Pending);

    assert!(
        harness.registry.definition(&proposal.definition.agent_id).is_none(),
        "no definition registered before approval"
    );
}

/// Tests operator approval spawns the instance and approves the hold.
#[test]
fn test_approve_spawns_and_closes_hold() {
    let harness = harness(None);
    let proposal = harness
        .manager
        .generate_proposal(
            ProposalTrigger::UserRequest,
            &source("web", Some("oauth2")),
            BTreeMap::new(),
            at(0),
        )
        .expect("proposal generated");
    let operator = OperatorId::new("op.alice");

    let instance = harness
        .manager
        .approve(&proposal.proposal_id, &operator, "vetted", None, at(10))
        .expect("approval spawns");
    assert_eq!(instance.status, InstanceStatus::Spawning);
    assert_eq!(instance.definition_id, proposal.definition.agent_id);

    let hold = harness.holds.get(&proposal.hold_id.expect("hold linked")).expect("hold exists");
    assert_eq!(hold.state, HoldState::Approved);

    assert!(matches!(
        harness.manager.approve(&proposal.proposal_id, &operator, "again", None, at(11)),
        Err(ProposalError::NotPending(_))
    ));
}

/// Tests rejection marks the proposal and its hold.
#[test]
fn test_reject_marks_proposal_and_hold() {
    let harness = harness(None);
    let proposal = harness
        .manager
        .generate_proposal(
            ProposalTrigger::NewDataSource,
            &source("web", Some("oauth2")),
            BTreeMap::new(),
            at(0),
        )
        .expect("proposal generated");
    let operator = OperatorId::new("op.bob");

    let rejected = harness
        .manager
        .reject(&proposal.proposal_id, &operator, "too risky", at(5))
        .expect("rejection succeeds");
    assert_eq!(rejected.state, ProposalState::Rejected);

    let hold = harness.holds.get(&proposal.hold_id.expect("hold linked")).expect("hold exists");
    assert_eq!(hold.state, HoldState::Rejected);

    assert!(
        harness.registry.definition(&proposal.definition.agent_id).is_none(),
        "rejected proposals never spawn"
    );
}

/// Tests the expiry sweeper on pending proposals.
#[test]
fn test_expire_stale_proposals() {
    let harness = harness(None);
    let proposal = harness
        .manager
        .generate_proposal(
            ProposalTrigger::Scheduled,
            &source("web", Some("oauth2")),
            BTreeMap::new(),
            at(0),
        )
        .expect("proposal generated");

    assert!(harness.manager.expire_stale(at(1_000)).is_empty());
    let expired = harness.manager.expire_stale(at(90_000_000));
    assert_eq!(expired, vec![proposal.proposal_id.clone()]);
    assert_eq!(
        harness.manager.get(&proposal.proposal_id).expect("proposal exists").state,
        ProposalState::Expired
    );
    assert!(harness.manager.expire_stale(at(90_000_001)).is_empty(), "sweep is idempotent");
}

/// Tests write-through persistence and lazy rehydration in a second
/// manager over the same store.
#[test]
fn test_proposals_survive_restart() {
    let store = Arc::new(MemoryProposalStore::default());
    let first = harness(Some(Arc::clone(&store)));
    let proposal = first
        .manager
        .generate_proposal(
            ProposalTrigger::NewDataSource,
            &source("web", Some("oauth2")),
            BTreeMap::new(),
            at(0),
        )
        .expect("proposal generated");

    let second = harness(Some(Arc::clone(&store)));
    let rehydrated = second.manager.get(&proposal.proposal_id).expect("proposal rehydrated");
    assert_eq!(rehydrated.state, ProposalState::Pending);
    assert_eq!(rehydrated.definition.agent_id, proposal.definition.agent_id);

    let pending = second.manager.list(Some(ProposalState::Pending));
    assert_eq!(pending.len(), 1);
}

/// Tests the hold-to-proposal derived index.
#[test]
fn test_proposal_lookup_by_hold() {
    let harness = harness(None);
    let proposal = harness
        .manager
        .generate_proposal(
            ProposalTrigger::Dependency,
            &source("web", Some("oauth2")),
            BTreeMap::new(),
            at(0),
        )
        .expect("proposal generated");
    let hold_id = proposal.hold_id.clone().expect("hold linked");
    let linked = harness.manager.proposal_for_hold(&hold_id).expect("index resolves");
    assert_eq!(linked.proposal_id, proposal.proposal_id);
}
