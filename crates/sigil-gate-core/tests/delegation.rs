// sigil-gate-core/tests/delegation.rs
// ============================================================================
// Module: Delegation Engine Tests
// Description: Tests for frame inheritance and delegation records.
// ============================================================================
//! ## Overview
//! Validates effective-frame materialization under strict, relaxed, and
//! custom inheritance, chain-validation surfacing, breaker rejection, and
//! parent-only revocation.

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

use std::sync::Arc;

use sigil_gate_core::AuditLog;
use sigil_gate_core::CustomInheritance;
use sigil_gate_core::DelegateRequest;
use sigil_gate_core::DelegationEngine;
use sigil_gate_core::DelegationError;
use sigil_gate_core::DelegationStatus;
use sigil_gate_core::DriftConfig;
use sigil_gate_core::DriftEngine;
use sigil_gate_core::FrameResolver;
use sigil_gate_core::FrameValidator;
use sigil_gate_core::InheritanceMode;
use sigil_gate_core::Symbol;
use sigil_gate_core::SymbolRegistry;
use sigil_gate_core::Timestamp;
use sigil_gate_core::identifiers::AgentId;
use sigil_gate_core::validation::rules;

/// Builds a delegation engine plus the drift engine it consults.
fn engine(default_mode: InheritanceMode) -> (DelegationEngine, Arc<DriftEngine>) {
    let audit = Arc::new(AuditLog::new());
    let ontology = SymbolRegistry::default_ontology();
    let drift = Arc::new(DriftEngine::new(
        DriftConfig::default(),
        ontology.clone(),
        Arc::clone(&audit),
    ));
    let engine = DelegationEngine::new(
        FrameResolver::new(ontology.clone()),
        FrameValidator::new(ontology),
        Arc::clone(&drift),
        audit,
        default_mode,
    );
    (engine, drift)
}

/// Builds a delegation request.
fn request(parent_frame: &str, child_frame: &str, mode: Option<InheritanceMode>) -> DelegateRequest {
    DelegateRequest {
        parent_agent_id: AgentId::new("agent.parent"),
        child_agent_id: AgentId::new("agent.child"),
        parent_frame: parent_frame.to_string(),
        child_frame: child_frame.to_string(),
        mode,
    }
}

/// Timestamp helper.
const fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Tests strict inheritance: mode, domain, forbidden constraint, and the
/// surfaced CH-002 domain-change warning.
#[test]
fn test_strict_inheritance_materializes_parent_slots() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let outcome = engine.delegate(&request("⊕◊⛔▶", "◈▼β", None), at(0)).expect("delegation succeeds");

    let effective = &outcome.effective_frame;
    assert_eq!(effective.mode, Some(Symbol::new('⊕')));
    assert_eq!(effective.domain, Some(Symbol::new('◊')));
    assert!(effective.constraints.contains(&Symbol::new('⛔')));
    assert_eq!(effective.action, Some(Symbol::new('▼')));
    assert_eq!(effective.entity, Some(Symbol::new('β')));
    assert_eq!(outcome.record.effective_child_frame, "⊕◊⛔▼β");

    assert!(outcome.report.contains_rule(rules::CH_002));
    assert!(outcome.report.contains_rule(rules::CH_003), "missing forbidden is surfaced");
    assert_eq!(outcome.record.status, DelegationStatus::Active);
}

/// Tests strict inheritance keeps the child's own mode when present.
#[test]
fn test_strict_keeps_child_mode() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let outcome = engine.delegate(&request("⊘◊▶", "⊕◊⛔◎", None), at(0)).expect("delegation succeeds");
    assert_eq!(outcome.effective_frame.mode, Some(Symbol::new('⊕')));
}

/// Tests strict inheritance copies the parent priority modifier.
#[test]
fn test_strict_inherits_priority_modifier() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let outcome = engine.delegate(&request("⊕↑◊▶", "◎γ", None), at(0)).expect("delegation succeeds");
    assert!(outcome.effective_frame.modifiers.contains(&Symbol::new('↑')));
}

/// Tests relaxed inheritance copies domain and forbidden only.
#[test]
fn test_relaxed_inheritance_is_minimal() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let outcome = engine
        .delegate(&request("⊕↑◊⛔▶", "◎γ", Some(InheritanceMode::Relaxed)), at(0))
        .expect("delegation succeeds");
    let effective = &outcome.effective_frame;
    assert_eq!(effective.mode, None, "relaxed does not inherit mode");
    assert_eq!(effective.domain, Some(Symbol::new('◊')));
    assert!(effective.constraints.contains(&Symbol::new('⛔')));
    assert!(effective.modifiers.is_empty(), "relaxed does not inherit priority");
}

/// Tests relaxed inheritance fails when the child drops a non-forbidden
/// inheritable constraint that relaxed mode will not copy.
#[test]
fn test_relaxed_does_not_repair_compliance() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let error = engine
        .delegate(&request("⊕◊⛔⚖▶", "◎γ", Some(InheritanceMode::Relaxed)), at(0))
        .expect_err("dropped compliance must fail under relaxed");
    assert!(matches!(error, DelegationError::ChainValidationFailed { .. }));
}

/// Tests custom inheritance honors per-slot switches.
#[test]
fn test_custom_inheritance_switches() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let custom = InheritanceMode::Custom(CustomInheritance {
        inherit_mode: true,
        inherit_domain: false,
        inherit_constraints: true,
        inherit_modifiers: false,
    });
    let outcome = engine
        .delegate(&request("⊕↑◊⛔▶", "◈⛔◎γ", Some(custom)), at(0))
        .expect("delegation succeeds");
    let effective = &outcome.effective_frame;
    assert_eq!(effective.mode, Some(Symbol::new('⊕')));
    assert_eq!(effective.domain, Some(Symbol::new('◈')), "domain inheritance disabled");
    assert!(effective.modifiers.is_empty(), "modifier inheritance disabled");
}

/// Tests that an explicitly weaker child mode fails delegation.
#[test]
fn test_weaker_child_mode_fails() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let error = engine
        .delegate(&request("⊕◊⛔▶", "⊖◊⛔◎", None), at(0))
        .expect_err("weakening must fail");
    match error {
        DelegationError::ChainValidationFailed {
            report,
        } => assert!(report.contains_rule(rules::CH_001)),
        other => panic!("unexpected error: {other}"),
    }
}

/// Tests that custom inheritance without constraint copying fails when
/// the child drops the forbidden constraint.
#[test]
fn test_custom_without_constraints_fails_on_forbidden() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let custom = InheritanceMode::Custom(CustomInheritance {
        inherit_mode: true,
        inherit_domain: true,
        inherit_constraints: false,
        inherit_modifiers: false,
    });
    let error = engine
        .delegate(&request("⊕◊⛔▶", "◎γ", Some(custom)), at(0))
        .expect_err("dropped forbidden must fail");
    assert!(matches!(error, DelegationError::ChainValidationFailed { .. }));
}

/// Tests that an unparseable frame fails delegation.
#[test]
fn test_unparseable_frames_fail() {
    let (engine, _) = engine(InheritanceMode::Strict);
    assert!(matches!(
        engine.delegate(&request("⊕⊘", "◎γ", None), at(0)),
        Err(DelegationError::ParseFailed { which: "parent" })
    ));
    assert!(matches!(
        engine.delegate(&request("⊕◊▶", "αβ", None), at(0)),
        Err(DelegationError::ParseFailed { which: "child" })
    ));
}

/// Tests that an open child breaker rejects delegation.
#[test]
fn test_open_child_breaker_rejects() {
    let (engine, drift) = engine(InheritanceMode::Strict);
    let child = AgentId::new("agent.child");
    drift.halt_agent(&child, "runaway", at(0));
    let error = engine.delegate(&request("⊕◊▶", "◎γ", None), at(1)).expect_err("open breaker");
    assert!(matches!(error, DelegationError::ChildCircuitOpen(_)));
}

/// Tests parent-only revocation and single-shot semantics.
#[test]
fn test_revocation_is_parent_only_and_single() {
    let (engine, _) = engine(InheritanceMode::Strict);
    let outcome = engine.delegate(&request("⊕◊▶", "⊕◊◎γ", None), at(0)).expect("delegation succeeds");
    let id = outcome.record.delegation_id.clone();
    assert!(engine.is_active(&id));

    let stranger = AgentId::new("agent.stranger");
    assert!(matches!(
        engine.revoke(&id, &stranger, at(1)),
        Err(DelegationError::NotParent(_))
    ));

    let parent = AgentId::new("agent.parent");
    let revoked = engine.revoke(&id, &parent, at(2)).expect("parent revokes");
    assert_eq!(revoked.status, DelegationStatus::Revoked);
    assert!(!engine.is_active(&id));

    assert!(matches!(engine.revoke(&id, &parent, at(3)), Err(DelegationError::NotActive(_))));
}

/// Tests that a delegation naming a catalogued definition spawns the
/// child under the parent instance.
#[test]
fn test_delegation_spawns_child_instance() {
    let audit = Arc::new(AuditLog::new());
    let ontology = SymbolRegistry::default_ontology();
    let drift = Arc::new(DriftEngine::new(
        DriftConfig::default(),
        ontology.clone(),
        Arc::clone(&audit),
    ));
    let registry = Arc::new(sigil_gate_core::AgentRegistry::new(
        sigil_gate_core::RegistryConfig::default(),
        sigil_gate_core::CapabilityToolMap::default_map(),
        Arc::clone(&audit),
    ));
    let engine = DelegationEngine::new(
        FrameResolver::new(ontology.clone()),
        FrameValidator::new(ontology),
        drift,
        audit,
        InheritanceMode::Strict,
    )
    .with_registry(Arc::clone(&registry));

    registry
        .register_definition(sigil_gate_core::AgentDefinition {
            agent_id: AgentId::new("agent.child_worker"),
            name: "child worker".to_string(),
            version: "1.0.0".to_string(),
            purpose: "delegated work".to_string(),
            category: sigil_gate_core::AgentCategory::DataProcessing,
            data_sources: Vec::new(),
            required_capabilities: vec!["file_read".to_string()],
            optional_capabilities: Vec::new(),
            output_patterns: vec!["Ξ.child.*".to_string()],
            resource_limits: sigil_gate_core::ResourceLimits::default(),
            success_criteria: Vec::new(),
            dependencies: Vec::new(),
            frame: "⊘◈◎γ".to_string(),
            risk_level: sigil_gate_core::RiskLevel::Low,
            requires_approval: false,
            namespace: sigil_gate_core::identifiers::NamespaceId::new("child"),
            template: None,
        })
        .expect("child definition registers");
    registry
        .register_definition(sigil_gate_core::AgentDefinition {
            agent_id: AgentId::new("agent.parent_worker"),
            name: "parent worker".to_string(),
            version: "1.0.0".to_string(),
            purpose: "delegating work".to_string(),
            category: sigil_gate_core::AgentCategory::Analysis,
            data_sources: Vec::new(),
            required_capabilities: vec!["file_read".to_string()],
            optional_capabilities: Vec::new(),
            output_patterns: vec!["Ξ.child.*".to_string(), "Ξ.parent.*".to_string()],
            resource_limits: sigil_gate_core::ResourceLimits::default(),
            success_criteria: Vec::new(),
            dependencies: Vec::new(),
            frame: "⊘◈▼β".to_string(),
            risk_level: sigil_gate_core::RiskLevel::Low,
            requires_approval: false,
            namespace: sigil_gate_core::identifiers::NamespaceId::new("parent"),
            template: None,
        })
        .expect("parent definition registers");
    let parent = registry
        .spawn_instance(
            &sigil_gate_core::SpawnRequest {
                definition_id: AgentId::new("agent.parent_worker"),
                campaign_id: None,
                parent_instance_id: None,
                frame: None,
            },
            at(0),
        )
        .expect("parent spawns");

    let outcome = engine
        .delegate(
            &DelegateRequest {
                parent_agent_id: AgentId::new(parent.instance_id.as_str()),
                child_agent_id: AgentId::new("agent.child_worker"),
                parent_frame: "⊘◈▼β".to_string(),
                child_frame: "⊘◈◎γ".to_string(),
                mode: None,
            },
            at(1),
        )
        .expect("delegation succeeds");

    let child = outcome.spawned_instance.expect("child spawned");
    assert_eq!(child.parent_instance_id, Some(parent.instance_id.clone()));
    assert_eq!(child.frame, outcome.record.effective_child_frame);
    assert_eq!(child.delegation_chain, vec![parent.instance_id]);
}

/// Tests parent-scoped listing.
#[test]
fn test_for_parent_lists_records() {
    let (engine, _) = engine(InheritanceMode::Strict);
    engine.delegate(&request("⊕◊▶", "⊕◊◎γ", None), at(0)).expect("delegation succeeds");
    engine.delegate(&request("⊕◊▶", "⊕◊⟲δ", None), at(1)).expect("delegation succeeds");
    assert_eq!(engine.for_parent(&AgentId::new("agent.parent")).len(), 2);
    assert!(engine.for_parent(&AgentId::new("agent.other")).is_empty());
}
