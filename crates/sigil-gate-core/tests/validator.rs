// sigil-gate-core/tests/validator.rs
// ============================================================================
// Module: Three-Tier Validator Tests
// Description: Tests for structural, semantic, and chain rules.
// ============================================================================
//! ## Overview
//! Validates each rule tier in isolation plus the chain scenarios for
//! mode strength, domain scope, constraint inheritance, entity
//! hierarchy, and forbidden-mode preservation.

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

use sigil_gate_core::FrameResolver;
use sigil_gate_core::FrameValidator;
use sigil_gate_core::ParsedFrame;
use sigil_gate_core::RuleSeverity;
use sigil_gate_core::Symbol;
use sigil_gate_core::SymbolRegistry;
use sigil_gate_core::validation::rules;

/// Builds a validator over the default ontology.
fn validator() -> FrameValidator {
    FrameValidator::new(SymbolRegistry::default_ontology())
}

/// Parses a frame through the default resolver.
fn parse(raw: &str) -> ParsedFrame {
    FrameResolver::new(SymbolRegistry::default_ontology())
        .parse(raw)
        .expect("test frame parses")
}

/// Tests that a well-formed frame validates cleanly.
#[test]
fn test_clean_frame_is_valid() {
    let report = validator().validate(&parse("⊕◊▶"), None);
    assert!(report.valid());
    assert!(report.warnings.is_empty());
}

/// Tests SR-001 for unrecognized segments.
#[test]
fn test_sr_001_unrecognized_segments_warn() {
    let report = validator().validate(&parse("⊕zz◊"), None);
    assert!(report.valid());
    assert!(report.contains_rule(rules::SR_001));
}

/// Tests SR-002 when the mode is not the first symbol.
#[test]
fn test_sr_002_mode_must_be_first() {
    let report = validator().validate(&parse("↑⊕◊"), None);
    assert!(!report.valid());
    assert!(report.contains_rule(rules::SR_002));
}

/// Tests SR-003 against a hand-constructed frame with two modes.
#[test]
fn test_sr_003_duplicate_modes_error() {
    let mut frame = parse("⊕◊");
    frame.symbols.push(Symbol::new('⊘'));
    let report = validator().validate(&frame, None);
    assert!(report.contains_rule(rules::SR_003));
}

/// Tests SR-004 for the empty frame.
#[test]
fn test_sr_004_empty_frame_errors() {
    let report = validator().validate(&parse(""), None);
    assert!(!report.valid());
    assert!(report.contains_rule(rules::SR_004));
}

/// Tests SM-001 against a hand-constructed strict-plus-flexible frame.
#[test]
fn test_sm_001_strict_flexible_exclusive() {
    let mut frame = parse("⊕◊▶");
    frame.symbols.push(Symbol::new('⊖'));
    let report = validator().validate(&frame, None);
    assert!(report.contains_rule(rules::SM_001));
}

/// Tests SM-002 for exploratory mode with an execute action.
#[test]
fn test_sm_002_exploratory_execute_errors() {
    let report = validator().validate(&parse("⊛◇▶"), None);
    assert!(!report.valid());
    assert!(report.contains_rule(rules::SM_002));
}

/// Tests SM-003 for conflicting priority modifiers.
#[test]
fn test_sm_003_priority_conflict_errors() {
    let report = validator().validate(&parse("⊘↑↓◇◎"), None);
    assert!(!report.valid());
    assert!(report.contains_rule(rules::SM_003));
}

/// Tests SM-006 as a warning for forbidden with execute.
#[test]
fn test_sm_006_forbidden_execute_warns() {
    let report = validator().validate(&parse("⊕◊⛔▶"), None);
    assert!(report.valid());
    assert!(report.contains_rule(rules::SM_006));
    assert!(report.warnings.iter().any(|finding| {
        finding.rule.as_str() == rules::SM_006 && finding.severity == RuleSeverity::Warning
    }));
}

/// Tests the chain scenario of a weaker child missing the forbidden
/// constraint: CH-001 and CH-003 both fire.
#[test]
fn test_chain_weaker_child_missing_forbidden() {
    let parent = parse("⊕◊⛔▶");
    let child = parse("⊖◈▶");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.valid());
    assert!(report.contains_rule(rules::CH_001));
    assert!(report.contains_rule(rules::CH_003));
}

/// Tests CH-001 passes when the child tightens the mode.
#[test]
fn test_ch_001_tightening_is_allowed() {
    let parent = parse("⊘◊▶");
    let child = parse("⊕◊▶");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.contains_rule(rules::CH_001));
}

/// Tests CH-002 domain mismatch is a warning.
#[test]
fn test_ch_002_domain_mismatch_warns() {
    let parent = parse("⊕◊▶");
    let child = parse("⊕◈▶");
    let report = validator().validate(&child, Some(&parent));
    assert!(report.valid());
    assert!(report.contains_rule(rules::CH_002));
}

/// Tests CH-003 passes when the child carries every inheritable
/// constraint.
#[test]
fn test_ch_003_carried_constraints_pass() {
    let parent = parse("⊕◊⛔⚖▶");
    let child = parse("⊕◊⛔⚖◎");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.contains_rule(rules::CH_003));
}

/// Tests CH-003 ignores non-inheritable constraints.
#[test]
fn test_ch_003_ignores_non_inheritable() {
    let parent = parse("⊕◊⏱▶");
    let child = parse("⊕◊◎");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.contains_rule(rules::CH_003));
}

/// Tests CH-005 warns when a child outranks its parent entity.
#[test]
fn test_ch_005_upward_delegation_warns() {
    let parent = parse("⊘◊▶β");
    let child = parse("⊘◊▶α");
    let report = validator().validate(&child, Some(&parent));
    assert!(report.valid());
    assert!(report.contains_rule(rules::CH_005));
}

/// Tests CH-005 passes for downward delegation.
#[test]
fn test_ch_005_downward_delegation_passes() {
    let parent = parse("⊘◊▶β");
    let child = parse("⊘◊▶γ");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.contains_rule(rules::CH_005));
}

/// Tests CH-006 requires the forbidden mode to propagate.
#[test]
fn test_ch_006_forbidden_mode_propagates() {
    let parent = parse("⊗◊◎");
    let child = parse("⊘◊◎");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.valid());
    assert!(report.contains_rule(rules::CH_006));

    let compliant = parse("⊗◊◎");
    let report = validator().validate(&compliant, Some(&parent));
    assert!(!report.contains_rule(rules::CH_006));
}

/// Tests that an empty parent skips the chain tier.
#[test]
fn test_empty_parent_skips_chain_rules() {
    let parent = parse("");
    let child = parse("⊖◈▶");
    let report = validator().validate(&child, Some(&parent));
    assert!(!report.contains_rule(rules::CH_001));
    assert!(!report.contains_rule(rules::CH_003));
}

/// Tests the parse-failed short-circuit report.
#[test]
fn test_parse_failed_report_shape() {
    let report = FrameValidator::parse_failed_report("⊕⊘");
    assert!(!report.valid());
    assert_eq!(report.errors.len(), 1);
    assert!(report.contains_rule(rules::PARSE_FAILED));
}
