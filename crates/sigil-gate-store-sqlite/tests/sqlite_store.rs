// sigil-gate-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Governance Store Tests
// Description: Tests for table round-trips, prefixes, and filters.
// ============================================================================
//! ## Overview
//! Validates persistence round-trips for every table, prefix rejection
//! at the Rust boundary, list filters, and audit event ordering.

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

use sigil_gate_core::AgentCategory;
use sigil_gate_core::AgentDefinition;
use sigil_gate_core::AgentInstance;
use sigil_gate_core::AgentMetrics;
use sigil_gate_core::AgentScope;
use sigil_gate_core::AuditEvent;
use sigil_gate_core::AuditEventType;
use sigil_gate_core::AuditStore;
use sigil_gate_core::Campaign;
use sigil_gate_core::CircuitState;
use sigil_gate_core::DataSource;
use sigil_gate_core::InstanceStatus;
use sigil_gate_core::ProposalStore;
use sigil_gate_core::RegistryStore;
use sigil_gate_core::ResourceLimits;
use sigil_gate_core::ResourceUsage;
use sigil_gate_core::RiskLevel;
use sigil_gate_core::StoreError;
use sigil_gate_core::Timestamp;
use sigil_gate_core::identifiers::AgentId;
use sigil_gate_core::identifiers::CampaignId;
use sigil_gate_core::identifiers::EventId;
use sigil_gate_core::identifiers::InstanceId;
use sigil_gate_core::identifiers::NamespaceId;
use sigil_gate_core::identifiers::SourceId;
use sigil_gate_store_sqlite::SqliteGovernanceStore;
use sigil_gate_store_sqlite::SqliteStoreConfig;
use sigil_gate_store_sqlite::SqliteStoreMode;
use sigil_gate_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

/// Opens a store in a temporary directory.
fn open_store(dir: &TempDir) -> SqliteGovernanceStore {
    let config = SqliteStoreConfig {
        path: dir.path().join("governance.db"),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Normal,
    };
    SqliteGovernanceStore::new(&config).expect("store opens")
}

/// Timestamp helper.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Builds a definition for tests.
fn definition(agent_id: &str) -> AgentDefinition {
    AgentDefinition {
        agent_id: AgentId::new(agent_id),
        name: "persisted agent".to_string(),
        version: "2.1.0".to_string(),
        purpose: "round trip".to_string(),
        category: AgentCategory::Analysis,
        data_sources: vec![SourceId::new("src_feed")],
        required_capabilities: vec!["file_read".to_string()],
        optional_capabilities: Vec::new(),
        output_patterns: vec!["Ξ.analysis.*".to_string()],
        resource_limits: ResourceLimits::default(),
        success_criteria: Vec::new(),
        dependencies: Vec::new(),
        frame: "⊘◈◎".to_string(),
        risk_level: RiskLevel::Medium,
        requires_approval: false,
        namespace: NamespaceId::new("analysis"),
        template: None,
    }
}

/// Builds an instance for tests.
fn instance(instance_id: &str, status: InstanceStatus, campaign: Option<&str>) -> AgentInstance {
    AgentInstance {
        instance_id: InstanceId::new(instance_id),
        definition_id: AgentId::new("agent.analyzer"),
        campaign_id: campaign.map(CampaignId::new),
        parent_instance_id: None,
        status,
        scope: AgentScope {
            allowed_symbol_patterns: vec!["Ξ.analysis.*".to_string()],
            denied_symbol_patterns: Vec::new(),
            allowed_tools: Vec::new(),
            denied_tools: Vec::new(),
            namespace: NamespaceId::new("analysis"),
            max_delegation_depth: 3,
        },
        usage: ResourceUsage::default(),
        delegation_chain: Vec::new(),
        metrics: AgentMetrics::default(),
        frame: "⊘◈◎".to_string(),
        enabled: true,
        created_at: at(0),
        updated_at: at(0),
    }
}

/// Tests campaign round-trip.
#[test]
fn test_campaign_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let campaign = Campaign {
        campaign_id: CampaignId::new("camp_000001_abc"),
        name: "wave one".to_string(),
        breaker: CircuitState::Closed,
        consecutive_failures: 0,
        last_transition: at(5),
        created_at: at(5),
    };
    store.save_campaign(&campaign).expect("saves");
    let loaded = store.load_campaign(&campaign.campaign_id).expect("loads").expect("present");
    assert_eq!(loaded, campaign);
    assert!(store.load_campaign(&CampaignId::new("camp_missing")).expect("loads").is_none());
}

/// Tests definition round-trip and prefix rejection.
#[test]
fn test_definition_round_trip_and_prefix() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let definition = definition("agent.analyzer");
    store.save_definition(&definition).expect("saves");
    let loaded =
        store.load_definition(&definition.agent_id).expect("loads").expect("present");
    assert_eq!(loaded, definition);

    let bad = AgentDefinition {
        agent_id: AgentId::new("analyzer"),
        ..loaded
    };
    assert!(matches!(store.save_definition(&bad), Err(StoreError::BadPrefix { .. })));
}

/// Tests instance round-trip and filtered listing.
#[test]
fn test_instance_listing_filters() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    store
        .save_instance(&instance("inst_000001_a", InstanceStatus::Running, Some("camp_one")))
        .expect("saves");
    store
        .save_instance(&instance("inst_000002_b", InstanceStatus::Failed, Some("camp_one")))
        .expect("saves");
    store
        .save_instance(&instance("inst_000003_c", InstanceStatus::Running, None))
        .expect("saves");

    let running = store.list_instances(Some(InstanceStatus::Running), None).expect("lists");
    assert_eq!(running.len(), 2);

    let campaign = CampaignId::new("camp_one");
    let in_campaign = store.list_instances(None, Some(&campaign)).expect("lists");
    assert_eq!(in_campaign.len(), 2);

    let both = store
        .list_instances(Some(InstanceStatus::Running), Some(&campaign))
        .expect("lists");
    assert_eq!(both.len(), 1);
}

/// Tests instance upsert replaces the stored row.
#[test]
fn test_instance_upsert_replaces() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let mut record = instance("inst_000009_z", InstanceStatus::Running, None);
    store.save_instance(&record).expect("saves");
    record.status = InstanceStatus::Completed;
    record.updated_at = at(99);
    store.save_instance(&record).expect("replaces");
    let loaded = store.load_instance(&record.instance_id).expect("loads").expect("present");
    assert_eq!(loaded.status, InstanceStatus::Completed);
}

/// Tests data source round-trip.
#[test]
fn test_data_source_round_trip() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let source = DataSource {
        source_id: SourceId::new("src_feed"),
        name: "feed".to_string(),
        source_type: "api".to_string(),
        auth_scheme: Some("oauth2".to_string()),
        endpoint: None,
        registered_at: at(1),
    };
    store.save_data_source(&source).expect("saves");
    let loaded = store.load_data_source(&source.source_id).expect("loads").expect("present");
    assert_eq!(loaded, source);
}

/// Tests proposal round-trip and the state filter.
#[test]
fn test_proposal_round_trip_and_filter() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    let proposal = sigil_gate_core::AgentProposal {
        proposal_id: sigil_gate_core::identifiers::ProposalId::new("prop_000001_aa"),
        definition: definition("agent.analyzer"),
        justification: sigil_gate_core::ProposalJustification {
            trigger: sigil_gate_core::ProposalTrigger::NewDataSource,
            summary: "new feed appeared".to_string(),
            context: BTreeMap::new(),
        },
        risk: sigil_gate_core::RiskAssessment::default(),
        estimate: sigil_gate_core::ResourceEstimate::default(),
        data_access: sigil_gate_core::DataAccessSummary::default(),
        approval_level: sigil_gate_core::ApprovalLevel::Human,
        state: sigil_gate_core::ProposalState::Pending,
        created_at: at(0),
        expires_at: Some(at(86_400_000)),
        hold_id: Some(sigil_gate_core::identifiers::HoldId::new("hold_000001_aa")),
        decision: None,
    };
    store.save_proposal(&proposal).expect("saves");
    let loaded = store.load_proposal(&proposal.proposal_id).expect("loads").expect("present");
    assert_eq!(loaded, proposal);

    let pending = store
        .list_proposals(Some(sigil_gate_core::ProposalState::Pending))
        .expect("lists");
    assert_eq!(pending.len(), 1);
    let approved = store
        .list_proposals(Some(sigil_gate_core::ProposalState::Approved))
        .expect("lists");
    assert!(approved.is_empty());
}

/// Tests audit append ordering and the sequence filter.
#[test]
fn test_audit_event_ordering() {
    let dir = TempDir::new().expect("tempdir");
    let store = open_store(&dir);
    for seq in 1..=4_u64 {
        let event = AuditEvent {
            event_id: EventId::new(format!("evt_{seq:04}")),
            seq,
            event_type: AuditEventType::OutcomeRecorded,
            at: at(i64::try_from(seq).expect("small") * 10),
            agent_id: Some(AgentId::new("agent.a")),
            instance_id: None,
            campaign_id: None,
            proposal_id: None,
            operator_id: None,
            details: BTreeMap::new(),
        };
        store.append_event(&event).expect("appends");
    }

    let all = store.load_events_from(0).expect("loads");
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|pair| pair[0].seq < pair[1].seq));

    let tail = store.load_events_from(3).expect("loads");
    assert_eq!(tail.len(), 2);
}
