// sigil-gate-core/src/core/frame.rs
// ============================================================================
// Module: Sigil Gate Parsed Frames
// Description: Structured form of a symbolic frame expression.
// Purpose: Provide the canonical frame record consumed by validators and engines.
// Dependencies: serde, crate::core::symbol
// ============================================================================

//! ## Overview
//! A frame string is a compact sequence of ontology codepoints expressing an
//! agent's mode, domain, constraints, and intended action. [`ParsedFrame`]
//! is its structured form: singleton slots are explicit options, ordered
//! sequences keep input order, and parse quality is reported as a
//! confidence value plus the unrecognized segments.
//!
//! # Invariants
//! - At most one mode, domain, source, action, and entity per frame.
//! - `symbols` lists every recognized symbol in original input order.
//! - `parse_confidence` is `1.0` exactly when every codepoint was
//!   classified, else `1 - unresolved/length` clamped to `[0, 1]`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::symbol::Symbol;
use crate::core::symbol::SymbolAttributes;
use crate::core::symbol::SymbolRegistry;

// ============================================================================
// SECTION: Parsed Frame
// ============================================================================

/// Structured form of a frame string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFrame {
    /// Operating mode, at most one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Symbol>,
    /// Domain, at most one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Symbol>,
    /// Source-role entity, at most one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Symbol>,
    /// Action verb, at most one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Symbol>,
    /// Actor entity, at most one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Symbol>,
    /// Constraints in input order.
    #[serde(default)]
    pub constraints: Vec<Symbol>,
    /// Modifiers in input order.
    #[serde(default)]
    pub modifiers: Vec<Symbol>,
    /// Every recognized symbol in original input order.
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Fraction of input codepoints that were classified, in `[0, 1]`.
    pub parse_confidence: f64,
    /// Runs of unrecognized codepoints, in input order.
    #[serde(default)]
    pub unparsed_segments: Vec<String>,
    /// Resolved attributes for the frame's symbols. Populated by the
    /// resolver; overlays land here without touching the registry.
    #[serde(default)]
    pub attributes: BTreeMap<char, SymbolAttributes>,
}

impl ParsedFrame {
    /// Returns true when the frame carries no recognized symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns true when the frame contains the given symbol.
    #[must_use]
    pub fn has_symbol(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }

    /// Returns the resolved attributes for a symbol, falling back to the
    /// registry for frames constructed without resolver involvement.
    #[must_use]
    pub fn attributes_for<'a>(
        &'a self,
        symbol: Symbol,
        registry: &'a SymbolRegistry,
    ) -> Option<&'a SymbolAttributes> {
        self.attributes.get(&symbol.codepoint()).or_else(|| registry.lookup(symbol))
    }

    /// Returns the resolved mode strength, if the frame has a mode.
    #[must_use]
    pub fn mode_strength(&self, registry: &SymbolRegistry) -> Option<u8> {
        self.mode.and_then(|mode| self.attributes_for(mode, registry)?.strength)
    }

    /// Returns the constraints whose resolved `inherits` flag is set.
    #[must_use]
    pub fn inheritable_constraints(&self, registry: &SymbolRegistry) -> Vec<Symbol> {
        self.constraints
            .iter()
            .copied()
            .filter(|constraint| {
                self.attributes_for(*constraint, registry)
                    .is_some_and(|attrs| attrs.inherits)
            })
            .collect()
    }

    /// Renders the frame in canonical order:
    /// `mode, modifiers*, domain, source?, constraints*, action?, entity?`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(mode) = self.mode {
            out.push(mode.codepoint());
        }
        for modifier in &self.modifiers {
            out.push(modifier.codepoint());
        }
        if let Some(domain) = self.domain {
            out.push(domain.codepoint());
        }
        if let Some(source) = self.source {
            out.push(source.codepoint());
        }
        for constraint in &self.constraints {
            out.push(constraint.codepoint());
        }
        if let Some(action) = self.action {
            out.push(action.codepoint());
        }
        if let Some(entity) = self.entity {
            out.push(entity.codepoint());
        }
        out
    }

    /// Recomputes `symbols` in canonical order and marks the frame fully
    /// classified. Used after programmatic construction, for example when a
    /// delegation materializes an effective child frame.
    pub fn rebuild_canonical(&mut self) {
        let mut symbols = Vec::new();
        if let Some(mode) = self.mode {
            symbols.push(mode);
        }
        symbols.extend(self.modifiers.iter().copied());
        if let Some(domain) = self.domain {
            symbols.push(domain);
        }
        if let Some(source) = self.source {
            symbols.push(source);
        }
        symbols.extend(self.constraints.iter().copied());
        if let Some(action) = self.action {
            symbols.push(action);
        }
        if let Some(entity) = self.entity {
            symbols.push(entity);
        }
        self.symbols = symbols;
        self.parse_confidence = 1.0;
        self.unparsed_segments.clear();
    }
}
