// sigil-gate-core/src/runtime/validator.rs
// ============================================================================
// Module: Sigil Gate Three-Tier Validator
// Description: Structural, semantic, and chain validation rules.
// Purpose: Produce typed reports from pure rules over parsed frames.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Validation runs three tiers in order: structural rules check frame
//! shape, semantic rules check symbol coherence, and chain rules check a
//! child frame against its parent. Every rule is a pure function from
//! `(frame, parent?)` to findings with a stable rule id, so each invariant
//! is directly testable in isolation.
//!
//! Semantic rules identify symbols by their canonical ontology names
//! (`strict`, `flexible`, `exploratory`, `execute`, `forbidden`,
//! `priority_high`, `priority_low`), not by codepoint, so custom
//! ontologies participate as long as they keep the canonical names.
//!
//! # Edge cases
//! - An empty parent skips the chain tier entirely.
//! - An unparseable child short-circuits all rules with a single
//!   `PARSE_FAILED` error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::frame::ParsedFrame;
use crate::core::symbol::Symbol;
use crate::core::symbol::SymbolCategory;
use crate::core::symbol::SymbolRegistry;
use crate::core::validation::RuleSeverity;
use crate::core::validation::ValidationFinding;
use crate::core::validation::ValidationReport;
use crate::core::validation::rules;

// ============================================================================
// SECTION: Rule Registration
// ============================================================================

/// A structural or semantic rule.
type FrameRule = fn(&ParsedFrame, &SymbolRegistry) -> Vec<ValidationFinding>;

/// A chain rule over a child and its parent.
type ChainRule = fn(&ParsedFrame, &ParsedFrame, &SymbolRegistry) -> Vec<ValidationFinding>;

/// Structural tier, in application order.
const STRUCTURAL_RULES: &[FrameRule] = &[
    sr_001_all_recognized,
    sr_002_mode_first,
    sr_003_single_mode,
    sr_004_non_empty,
    sr_005_single_domain,
    sr_006_single_action,
];

/// Semantic tier, in application order.
const SEMANTIC_RULES: &[FrameRule] = &[
    sm_001_strict_flexible_exclusive,
    sm_002_exploratory_execute,
    sm_003_priority_exclusive,
    sm_006_forbidden_execute,
];

/// Chain tier, in application order.
const CHAIN_RULES: &[ChainRule] = &[
    ch_001_mode_strength,
    ch_002_domain_scope,
    ch_003_constraint_inheritance,
    ch_005_entity_hierarchy,
    ch_006_forbidden_mode,
];

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Applies the three rule tiers against a symbol registry.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    /// Ontology the rules consult for attributes.
    registry: SymbolRegistry,
}

impl FrameValidator {
    /// Creates a validator over the given registry.
    #[must_use]
    pub const fn new(registry: SymbolRegistry) -> Self {
        Self {
            registry,
        }
    }

    /// Returns the validator's registry.
    #[must_use]
    pub const fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    /// Validates a frame, optionally against a parent, compiling findings
    /// in tier order.
    #[must_use]
    pub fn validate(&self, frame: &ParsedFrame, parent: Option<&ParsedFrame>) -> ValidationReport {
        let mut report = ValidationReport::new();
        for rule in STRUCTURAL_RULES {
            for finding in rule(frame, &self.registry) {
                report.push(finding);
            }
        }
        for rule in SEMANTIC_RULES {
            for finding in rule(frame, &self.registry) {
                report.push(finding);
            }
        }
        if let Some(parent) = parent {
            if !parent.is_empty() {
                for rule in CHAIN_RULES {
                    for finding in rule(frame, parent, &self.registry) {
                        report.push(finding);
                    }
                }
            }
        }
        report
    }

    /// Builds the report for a child frame that failed to parse.
    #[must_use]
    pub fn parse_failed_report(raw: &str) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.push(ValidationFinding::new(
            rules::PARSE_FAILED,
            RuleSeverity::Error,
            format!("frame `{raw}` could not be parsed: duplicate singleton slot"),
        ));
        report
    }
}

// ============================================================================
// SECTION: Structural Rules
// ============================================================================

/// SR-001: every codepoint in the input was recognized.
fn sr_001_all_recognized(frame: &ParsedFrame, _registry: &SymbolRegistry) -> Vec<ValidationFinding> {
    if frame.unparsed_segments.is_empty() {
        return Vec::new();
    }
    vec![ValidationFinding::new(
        rules::SR_001,
        RuleSeverity::Warning,
        format!("unrecognized segments: {}", frame.unparsed_segments.join(", ")),
    )]
}

/// SR-002: the mode, when present, is first in input order.
fn sr_002_mode_first(frame: &ParsedFrame, _registry: &SymbolRegistry) -> Vec<ValidationFinding> {
    let Some(mode) = frame.mode else {
        return Vec::new();
    };
    if frame.symbols.first() == Some(&mode) {
        return Vec::new();
    }
    vec![
        ValidationFinding::new(
            rules::SR_002,
            RuleSeverity::Error,
            "mode must be the first symbol in the frame",
        )
        .with_symbol(mode),
    ]
}

/// SR-003: at most one mode-category symbol.
fn sr_003_single_mode(frame: &ParsedFrame, registry: &SymbolRegistry) -> Vec<ValidationFinding> {
    findings_for_duplicate_category(frame, registry, SymbolCategory::Mode, rules::SR_003)
}

/// SR-004: the frame carries at least one recognized symbol.
fn sr_004_non_empty(frame: &ParsedFrame, _registry: &SymbolRegistry) -> Vec<ValidationFinding> {
    if frame.is_empty() {
        return vec![ValidationFinding::new(
            rules::SR_004,
            RuleSeverity::Error,
            "frame is empty",
        )];
    }
    Vec::new()
}

/// SR-005: at most one domain-category symbol.
fn sr_005_single_domain(frame: &ParsedFrame, registry: &SymbolRegistry) -> Vec<ValidationFinding> {
    findings_for_duplicate_category(frame, registry, SymbolCategory::Domain, rules::SR_005)
}

/// SR-006: at most one action-category symbol.
fn sr_006_single_action(frame: &ParsedFrame, registry: &SymbolRegistry) -> Vec<ValidationFinding> {
    findings_for_duplicate_category(frame, registry, SymbolCategory::Action, rules::SR_006)
}

/// Emits an error when more than one symbol of `category` is present.
fn findings_for_duplicate_category(
    frame: &ParsedFrame,
    registry: &SymbolRegistry,
    category: SymbolCategory,
    rule: &str,
) -> Vec<ValidationFinding> {
    let in_category: Vec<Symbol> = frame
        .symbols
        .iter()
        .copied()
        .filter(|symbol| {
            frame
                .attributes_for(*symbol, registry)
                .is_some_and(|attrs| attrs.category == category)
        })
        .collect();
    if in_category.len() <= 1 {
        return Vec::new();
    }
    vec![
        ValidationFinding::new(
            rule,
            RuleSeverity::Error,
            format!("frame carries {} {} symbols; at most one allowed", in_category.len(), category.label()),
        )
        .with_symbol(in_category[1]),
    ]
}

// ============================================================================
// SECTION: Semantic Rules
// ============================================================================

/// SM-001: strict and flexible modes are mutually exclusive.
fn sm_001_strict_flexible_exclusive(
    frame: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let strict = symbol_named(frame, registry, SymbolCategory::Mode, "strict");
    let flexible = symbol_named(frame, registry, SymbolCategory::Mode, "flexible");
    match (strict, flexible) {
        (Some(_), Some(flexible)) => vec![
            ValidationFinding::new(
                rules::SM_001,
                RuleSeverity::Error,
                "strict and flexible modes are mutually exclusive",
            )
            .with_symbol(flexible),
        ],
        _ => Vec::new(),
    }
}

/// SM-002: exploratory mode may not combine with an execute action.
fn sm_002_exploratory_execute(
    frame: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let exploratory = symbol_named(frame, registry, SymbolCategory::Mode, "exploratory");
    let execute = symbol_named(frame, registry, SymbolCategory::Action, "execute");
    match (exploratory, execute) {
        (Some(_), Some(execute)) => vec![
            ValidationFinding::new(
                rules::SM_002,
                RuleSeverity::Error,
                "exploratory mode may not combine with an execute action",
            )
            .with_symbol(execute),
        ],
        _ => Vec::new(),
    }
}

/// SM-003: high and low priority modifiers are mutually exclusive.
fn sm_003_priority_exclusive(
    frame: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let high = symbol_named(frame, registry, SymbolCategory::Modifier, "priority_high");
    let low = symbol_named(frame, registry, SymbolCategory::Modifier, "priority_low");
    match (high, low) {
        (Some(_), Some(low)) => vec![
            ValidationFinding::new(
                rules::SM_003,
                RuleSeverity::Error,
                "high and low priority modifiers are mutually exclusive",
            )
            .with_symbol(low),
        ],
        _ => Vec::new(),
    }
}

/// SM-006: forbidden constraint alongside an execute action.
fn sm_006_forbidden_execute(
    frame: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let forbidden = symbol_named(frame, registry, SymbolCategory::Constraint, "forbidden");
    let execute = symbol_named(frame, registry, SymbolCategory::Action, "execute");
    match (forbidden, execute) {
        (Some(forbidden), Some(_)) => vec![
            ValidationFinding::new(
                rules::SM_006,
                RuleSeverity::Warning,
                "forbidden constraint combined with an execute action",
            )
            .with_symbol(forbidden),
        ],
        _ => Vec::new(),
    }
}

// ============================================================================
// SECTION: Chain Rules
// ============================================================================

/// CH-001: mode strength preservation. Smaller strength is stricter; a
/// child may only preserve or tighten its parent's mode.
fn ch_001_mode_strength(
    child: &ParsedFrame,
    parent: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let (Some(child_strength), Some(parent_strength)) =
        (child.mode_strength(registry), parent.mode_strength(registry))
    else {
        return Vec::new();
    };
    if child_strength <= parent_strength {
        return Vec::new();
    }
    let mut finding = ValidationFinding::new(
        rules::CH_001,
        RuleSeverity::Error,
        format!(
            "child mode strength {child_strength} weakens parent mode strength {parent_strength}"
        ),
    );
    if let Some(mode) = child.mode {
        finding = finding.with_symbol(mode);
    }
    vec![finding]
}

/// CH-002: when both frames declare a domain they should match.
fn ch_002_domain_scope(
    child: &ParsedFrame,
    parent: &ParsedFrame,
    _registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let (Some(child_domain), Some(parent_domain)) = (child.domain, parent.domain) else {
        return Vec::new();
    };
    if child_domain == parent_domain {
        return Vec::new();
    }
    vec![
        ValidationFinding::new(
            rules::CH_002,
            RuleSeverity::Warning,
            format!("child domain {child_domain} differs from parent domain {parent_domain}"),
        )
        .with_symbol(child_domain),
    ]
}

/// CH-003: every inheritable parent constraint must appear on the child.
fn ch_003_constraint_inheritance(
    child: &ParsedFrame,
    parent: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    parent
        .inheritable_constraints(registry)
        .into_iter()
        .filter(|constraint| !child.constraints.contains(constraint))
        .map(|constraint| {
            ValidationFinding::new(
                rules::CH_003,
                RuleSeverity::Error,
                format!("child frame drops inheritable parent constraint {constraint}"),
            )
            .with_symbol(constraint)
        })
        .collect()
}

/// CH-005: a parent cannot delegate upward in the entity hierarchy.
fn ch_005_entity_hierarchy(
    child: &ParsedFrame,
    parent: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let child_level = child
        .entity
        .and_then(|entity| child.attributes_for(entity, registry)?.entity_level);
    let parent_level = parent
        .entity
        .and_then(|entity| parent.attributes_for(entity, registry)?.entity_level);
    let (Some(child_level), Some(parent_level)) = (child_level, parent_level) else {
        return Vec::new();
    };
    if child_level >= parent_level {
        return Vec::new();
    }
    let mut finding = ValidationFinding::new(
        rules::CH_005,
        RuleSeverity::Warning,
        format!("child entity level {child_level} outranks parent entity level {parent_level}"),
    );
    if let Some(entity) = child.entity {
        finding = finding.with_symbol(entity);
    }
    vec![finding]
}

/// CH-006: the forbidden mode propagates like a forbidden constraint.
fn ch_006_forbidden_mode(
    child: &ParsedFrame,
    parent: &ParsedFrame,
    registry: &SymbolRegistry,
) -> Vec<ValidationFinding> {
    let parent_forbidden = parent.mode.filter(|mode| {
        parent.attributes_for(*mode, registry).is_some_and(|attrs| attrs.inherits)
    });
    let Some(forbidden_mode) = parent_forbidden else {
        return Vec::new();
    };
    if child.mode == Some(forbidden_mode) {
        return Vec::new();
    }
    vec![
        ValidationFinding::new(
            rules::CH_006,
            RuleSeverity::Error,
            format!("parent's forbidden mode {forbidden_mode} must propagate to the child"),
        )
        .with_symbol(forbidden_mode),
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Finds a frame symbol by category and canonical ontology name.
fn symbol_named(
    frame: &ParsedFrame,
    registry: &SymbolRegistry,
    category: SymbolCategory,
    name: &str,
) -> Option<Symbol> {
    frame.symbols.iter().copied().find(|symbol| {
        frame
            .attributes_for(*symbol, registry)
            .is_some_and(|attrs| attrs.category == category && attrs.name == name)
    })
}
