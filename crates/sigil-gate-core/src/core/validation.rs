// sigil-gate-core/src/core/validation.rs
// ============================================================================
// Module: Sigil Gate Validation Reports
// Description: Rule identifiers, severities, findings, and reports.
// Purpose: Provide the typed result surface of the three-tier validator.
// Dependencies: serde, crate::core::symbol
// ============================================================================

//! ## Overview
//! Validation findings carry a stable rule id, a severity, a human message,
//! and optionally the offending symbol. A report keeps errors and warnings
//! in disjoint ordered lists; a frame is valid exactly when the error list
//! is empty. Severities beyond plain error/warning exist so downstream
//! policy can react to them: `hold` findings force human review at the
//! gatekeeper, `unverifiable` marks checks the validator cannot decide.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::symbol::Symbol;

// ============================================================================
// SECTION: Rule Identifiers
// ============================================================================

/// Stable rule identifier (`SR-###` structural, `SM-###` semantic,
/// `CH-###` chain).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Creates a rule identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Stable rule id constants used by the built-in rule set.
pub mod rules {
    /// All symbols recognized.
    pub const SR_001: &str = "SR-001";
    /// Mode, if present, is first in input order.
    pub const SR_002: &str = "SR-002";
    /// At most one mode.
    pub const SR_003: &str = "SR-003";
    /// Frame non-empty.
    pub const SR_004: &str = "SR-004";
    /// At most one domain.
    pub const SR_005: &str = "SR-005";
    /// At most one action.
    pub const SR_006: &str = "SR-006";
    /// Strict and flexible modes are mutually exclusive.
    pub const SM_001: &str = "SM-001";
    /// Exploratory mode may not combine with an execute action.
    pub const SM_002: &str = "SM-002";
    /// High and low priority modifiers are mutually exclusive.
    pub const SM_003: &str = "SM-003";
    /// Forbidden constraint with execute action.
    pub const SM_006: &str = "SM-006";
    /// Mode strength preservation across delegation.
    pub const CH_001: &str = "CH-001";
    /// Domain scope match across delegation.
    pub const CH_002: &str = "CH-002";
    /// Inheritable constraint propagation.
    pub const CH_003: &str = "CH-003";
    /// Entity hierarchy direction.
    pub const CH_005: &str = "CH-005";
    /// Forbidden mode preservation.
    pub const CH_006: &str = "CH-006";
    /// Child frame could not be parsed; later rules short-circuit.
    pub const PARSE_FAILED: &str = "PARSE_FAILED";
}

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity attached to a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    /// Violation that invalidates the frame.
    Error,
    /// Suspicious but tolerated condition.
    Warning,
    /// Informational note.
    Info,
    /// Condition that must pause the operation for human review.
    Hold,
    /// Check the validator cannot decide from the data it has.
    Unverifiable,
    /// Check ran and passed; not recorded in reports.
    Pass,
}

// ============================================================================
// SECTION: Findings and Reports
// ============================================================================

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    /// Stable rule identifier.
    pub rule: RuleId,
    /// Finding severity.
    pub severity: RuleSeverity,
    /// Human-readable message.
    pub message: String,
    /// The offending symbol, when one can be named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
}

impl ValidationFinding {
    /// Creates a finding with the given rule, severity, and message.
    #[must_use]
    pub fn new(rule: &str, severity: RuleSeverity, message: impl Into<String>) -> Self {
        Self {
            rule: RuleId::new(rule),
            severity,
            message: message.into(),
            symbol: None,
        }
    }

    /// Attaches the offending symbol.
    #[must_use]
    pub const fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }
}

/// Ordered validation report with disjoint error and warning lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Findings with `error` severity, in rule-application order.
    pub errors: Vec<ValidationFinding>,
    /// Findings with any non-error, non-pass severity, in rule-application
    /// order.
    pub warnings: Vec<ValidationFinding>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finding, routing it by severity. `pass` findings are
    /// dropped.
    pub fn push(&mut self, finding: ValidationFinding) {
        match finding.severity {
            RuleSeverity::Error => self.errors.push(finding),
            RuleSeverity::Pass => {}
            RuleSeverity::Warning
            | RuleSeverity::Info
            | RuleSeverity::Hold
            | RuleSeverity::Unverifiable => self.warnings.push(finding),
        }
    }

    /// Returns true when the report carries no errors.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true when any finding carries the given rule id.
    #[must_use]
    pub fn contains_rule(&self, rule: &str) -> bool {
        self.errors.iter().chain(self.warnings.iter()).any(|finding| finding.rule.as_str() == rule)
    }

    /// Returns true when any warning carries `hold` severity.
    #[must_use]
    pub fn has_hold_severity(&self) -> bool {
        self.warnings.iter().any(|finding| finding.severity == RuleSeverity::Hold)
    }

    /// Returns the errors whose rule id is not in the given soft set.
    #[must_use]
    pub fn errors_excluding(&self, soft_rules: &[&str]) -> Vec<&ValidationFinding> {
        self.errors
            .iter()
            .filter(|finding| !soft_rules.contains(&finding.rule.as_str()))
            .collect()
    }
}
