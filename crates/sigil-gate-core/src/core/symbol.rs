// sigil-gate-core/src/core/symbol.rs
// ============================================================================
// Module: Sigil Gate Symbol Ontology
// Description: Symbol categories, attributes, and the immutable registry.
// Purpose: Provide the authoritative lookup from raw codepoint to semantics.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Frames are sequences of codepoints drawn from a fixed ontology. Every
//! recognized codepoint belongs to exactly one of six categories and carries
//! immutable attributes: a display name, a mode strength (smaller is
//! stricter), an inheritance flag for symbols that must propagate across
//! delegation, an entity level and role, and a prose description.
//!
//! The registry is built once and is read-only afterwards, so concurrent
//! lookups need no synchronization. Per-call attribute overlays are applied
//! by the resolver without ever mutating the registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Symbol
// ============================================================================

/// A single ontology codepoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Symbol(char);

impl Symbol {
    /// Creates a symbol from a codepoint.
    #[must_use]
    pub const fn new(codepoint: char) -> Self {
        Self(codepoint)
    }

    /// Returns the underlying codepoint.
    #[must_use]
    pub const fn codepoint(self) -> char {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<char> for Symbol {
    fn from(value: char) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Categories and Attributes
// ============================================================================

/// The six disjoint symbol categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    /// Operating mode of the agent (strict, neutral, exploratory, ...).
    Mode,
    /// Subject-matter domain the operation touches.
    Domain,
    /// Intended action verb.
    Action,
    /// Behavioral constraint attached to the operation.
    Constraint,
    /// Qualifier adjusting priority or precision.
    Modifier,
    /// Acting or source entity referenced by the frame.
    Entity,
}

impl SymbolCategory {
    /// Returns a stable label for the category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Domain => "domain",
            Self::Action => "action",
            Self::Constraint => "constraint",
            Self::Modifier => "modifier",
            Self::Entity => "entity",
        }
    }
}

/// Role of an entity-category symbol within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRole {
    /// The acting entity the frame is executed on behalf of.
    Actor,
    /// A provenance marker filling the frame's source slot.
    Source,
}

/// Immutable attributes attached to a recognized symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAttributes {
    /// Display name, stable across releases.
    pub name: String,
    /// Category the symbol belongs to.
    pub category: SymbolCategory,
    /// Mode strength; smaller is stricter. Modes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<u8>,
    /// Whether the symbol must propagate from parent to child frames.
    /// Set on inheritable constraints and on the forbidden mode.
    #[serde(default)]
    pub inherits: bool,
    /// Hierarchy level for actor entities; smaller is more privileged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_level: Option<u8>,
    /// Role for entity-category symbols.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_role: Option<EntityRole>,
    /// Prose description of the symbol's meaning.
    pub description: String,
}

impl SymbolAttributes {
    /// Creates attributes with the given name and category; other fields
    /// start empty and are set through the builder helpers.
    #[must_use]
    pub fn new(name: impl Into<String>, category: SymbolCategory) -> Self {
        Self {
            name: name.into(),
            category,
            strength: None,
            inherits: false,
            entity_level: None,
            entity_role: None,
            description: String::new(),
        }
    }

    /// Sets the mode strength.
    #[must_use]
    pub const fn with_strength(mut self, strength: u8) -> Self {
        self.strength = Some(strength);
        self
    }

    /// Marks the symbol as inheritable across delegation.
    #[must_use]
    pub const fn with_inherits(mut self) -> Self {
        self.inherits = true;
        self
    }

    /// Sets the actor entity level.
    #[must_use]
    pub const fn with_entity_level(mut self, level: u8) -> Self {
        self.entity_level = Some(level);
        self.entity_role = Some(EntityRole::Actor);
        self
    }

    /// Marks the symbol as a source-role entity.
    #[must_use]
    pub const fn with_source_role(mut self) -> Self {
        self.entity_role = Some(EntityRole::Source);
        self
    }

    /// Sets the prose description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// SECTION: Symbol Registry
// ============================================================================

/// Immutable catalog of recognized symbols.
///
/// # Invariants
/// - Built once; never mutated afterwards.
/// - Every codepoint maps to exactly one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRegistry {
    /// Codepoint to attribute mapping.
    entries: BTreeMap<char, SymbolAttributes>,
}

impl SymbolRegistry {
    /// Creates an empty registry builder.
    #[must_use]
    pub fn builder() -> SymbolRegistryBuilder {
        SymbolRegistryBuilder {
            entries: BTreeMap::new(),
        }
    }

    /// Looks up the attributes for a symbol.
    #[must_use]
    pub fn lookup(&self, symbol: Symbol) -> Option<&SymbolAttributes> {
        self.entries.get(&symbol.codepoint())
    }

    /// Returns the category for a symbol, if recognized.
    #[must_use]
    pub fn category(&self, symbol: Symbol) -> Option<SymbolCategory> {
        self.lookup(symbol).map(|attrs| attrs.category)
    }

    /// Returns the mode strength for a symbol, if it is a mode.
    #[must_use]
    pub fn strength(&self, symbol: Symbol) -> Option<u8> {
        self.lookup(symbol).and_then(|attrs| attrs.strength)
    }

    /// Returns the maximum strength across all registered modes.
    ///
    /// Returns zero when the registry contains no modes.
    #[must_use]
    pub fn max_mode_strength(&self) -> u8 {
        self.entries
            .values()
            .filter_map(|attrs| attrs.strength)
            .max()
            .unwrap_or(0)
    }

    /// Returns every registered symbol in codepoint order.
    #[must_use]
    pub fn all_symbols(&self) -> Vec<Symbol> {
        self.entries.keys().copied().map(Symbol::new).collect()
    }

    /// Returns every registered symbol of the given category.
    #[must_use]
    pub fn symbols_in_category(&self, category: SymbolCategory) -> Vec<Symbol> {
        self.entries
            .iter()
            .filter(|(_, attrs)| attrs.category == category)
            .map(|(codepoint, _)| Symbol::new(*codepoint))
            .collect()
    }

    /// Builds the default ontology shipped with Sigil Gate.
    ///
    /// The grammar is fixed; this data set is the canonical codepoint
    /// assignment used across documentation and tests.
    #[must_use]
    #[allow(clippy::too_many_lines, reason = "Flat ontology data table.")]
    pub fn default_ontology() -> Self {
        Self::builder()
            // Modes, ordered by strength (smaller is stricter).
            .symbol(
                '⊗',
                SymbolAttributes::new("forbidden", SymbolCategory::Mode)
                    .with_strength(0)
                    .with_inherits()
                    .with_description("All operations denied; propagates to children"),
            )
            .symbol(
                '⊕',
                SymbolAttributes::new("strict", SymbolCategory::Mode)
                    .with_strength(1)
                    .with_description("Tight conformance; no speculative behavior"),
            )
            .symbol(
                '⊙',
                SymbolAttributes::new("cautious", SymbolCategory::Mode)
                    .with_strength(2)
                    .with_description("Conservative defaults with confirmations"),
            )
            .symbol(
                '⊘',
                SymbolAttributes::new("neutral", SymbolCategory::Mode)
                    .with_strength(3)
                    .with_description("Baseline operating mode"),
            )
            .symbol(
                '⊖',
                SymbolAttributes::new("flexible", SymbolCategory::Mode)
                    .with_strength(4)
                    .with_description("Relaxed conformance for routine work"),
            )
            .symbol(
                '⊛',
                SymbolAttributes::new("exploratory", SymbolCategory::Mode)
                    .with_strength(5)
                    .with_description("Open-ended investigation; may not execute"),
            )
            // Domains.
            .symbol(
                '◊',
                SymbolAttributes::new("financial", SymbolCategory::Domain)
                    .with_description("Financial instruments, transfers, and accounts"),
            )
            .symbol(
                '◇',
                SymbolAttributes::new("technical", SymbolCategory::Domain)
                    .with_description("Software systems and infrastructure"),
            )
            .symbol(
                '◈',
                SymbolAttributes::new("data", SymbolCategory::Domain)
                    .with_description("Datasets, pipelines, and storage"),
            )
            .symbol(
                '⬡',
                SymbolAttributes::new("legal", SymbolCategory::Domain)
                    .with_description("Contracts, filings, and regulatory material"),
            )
            .symbol(
                '⬢',
                SymbolAttributes::new("operations", SymbolCategory::Domain)
                    .with_description("Scheduling, logistics, and coordination"),
            )
            // Actions.
            .symbol(
                '▶',
                SymbolAttributes::new("execute", SymbolCategory::Action)
                    .with_description("Perform a side-effecting operation"),
            )
            .symbol(
                '▼',
                SymbolAttributes::new("delegate", SymbolCategory::Action)
                    .with_description("Hand work to a child agent"),
            )
            .symbol(
                '◎',
                SymbolAttributes::new("observe", SymbolCategory::Action)
                    .with_description("Read-only inspection"),
            )
            .symbol(
                '⟲',
                SymbolAttributes::new("transform", SymbolCategory::Action)
                    .with_description("Derive new data from existing inputs"),
            )
            .symbol(
                '⇗',
                SymbolAttributes::new("escalate", SymbolCategory::Action)
                    .with_description("Raise the operation to a human operator"),
            )
            // Constraints.
            .symbol(
                '⛔',
                SymbolAttributes::new("forbidden", SymbolCategory::Constraint)
                    .with_inherits()
                    .with_description("Operation class is prohibited; propagates to children"),
            )
            .symbol(
                '⚖',
                SymbolAttributes::new("compliance", SymbolCategory::Constraint)
                    .with_inherits()
                    .with_description("Regulated context; propagates to children"),
            )
            .symbol(
                '⏱',
                SymbolAttributes::new("time_boxed", SymbolCategory::Constraint)
                    .with_description("Bounded execution window"),
            )
            .symbol(
                '⚠',
                SymbolAttributes::new("caution", SymbolCategory::Constraint)
                    .with_description("Elevated care; no propagation requirement"),
            )
            // Modifiers.
            .symbol(
                '↑',
                SymbolAttributes::new("priority_high", SymbolCategory::Modifier)
                    .with_description("Urgent; excludes priority_low"),
            )
            .symbol(
                '↓',
                SymbolAttributes::new("priority_low", SymbolCategory::Modifier)
                    .with_description("Background work; excludes priority_high"),
            )
            .symbol(
                '≈',
                SymbolAttributes::new("approximate", SymbolCategory::Modifier)
                    .with_description("Best-effort precision is acceptable"),
            )
            .symbol(
                '⋯',
                SymbolAttributes::new("deferred", SymbolCategory::Modifier)
                    .with_description("May be scheduled rather than immediate"),
            )
            // Actor entities, ordered by level (smaller is more privileged).
            .symbol(
                'α',
                SymbolAttributes::new("primary", SymbolCategory::Entity)
                    .with_entity_level(1)
                    .with_description("Primary operator-facing agent"),
            )
            .symbol(
                'β',
                SymbolAttributes::new("secondary", SymbolCategory::Entity)
                    .with_entity_level(2)
                    .with_description("Delegated worker agent"),
            )
            .symbol(
                'γ',
                SymbolAttributes::new("tertiary", SymbolCategory::Entity)
                    .with_entity_level(3)
                    .with_description("Nested delegate"),
            )
            .symbol(
                'δ',
                SymbolAttributes::new("subordinate", SymbolCategory::Entity)
                    .with_entity_level(4)
                    .with_description("Deepest delegation tier"),
            )
            // Source entities.
            .symbol(
                '⊲',
                SymbolAttributes::new("internal_source", SymbolCategory::Entity)
                    .with_source_role()
                    .with_description("Operation originates inside the deployment"),
            )
            .symbol(
                '⊳',
                SymbolAttributes::new("external_source", SymbolCategory::Entity)
                    .with_source_role()
                    .with_description("Operation originates from an external caller"),
            )
            .build()
    }
}

/// Builder for [`SymbolRegistry`].
#[derive(Debug)]
pub struct SymbolRegistryBuilder {
    /// Accumulated entries.
    entries: BTreeMap<char, SymbolAttributes>,
}

impl SymbolRegistryBuilder {
    /// Registers a symbol, replacing any previous entry for the codepoint.
    #[must_use]
    pub fn symbol(mut self, codepoint: char, attributes: SymbolAttributes) -> Self {
        self.entries.insert(codepoint, attributes);
        self
    }

    /// Finalizes the registry.
    #[must_use]
    pub fn build(self) -> SymbolRegistry {
        SymbolRegistry {
            entries: self.entries,
        }
    }
}

// ============================================================================
// SECTION: Attribute Overlay
// ============================================================================

/// Per-call attribute override applied during frame resolution.
///
/// Overlays may adjust attributes but never identity: the category and name
/// of a symbol cannot be changed, and unknown codepoints cannot be
/// introduced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeOverlay {
    /// Overrides keyed by codepoint.
    entries: BTreeMap<char, OverlayEntry>,
}

/// A single overlay override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayEntry {
    /// Replacement mode strength.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<u8>,
    /// Replacement inheritance flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<bool>,
    /// Replacement entity level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_level: Option<u8>,
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeOverlay {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override for a codepoint.
    #[must_use]
    pub fn with_entry(mut self, codepoint: char, entry: OverlayEntry) -> Self {
        self.entries.insert(codepoint, entry);
        self
    }

    /// Returns true when the overlay contains no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies the overlay to a copy of the given attributes.
    #[must_use]
    pub fn apply(&self, symbol: Symbol, attributes: &SymbolAttributes) -> SymbolAttributes {
        let mut resolved = attributes.clone();
        if let Some(entry) = self.entries.get(&symbol.codepoint()) {
            if let Some(strength) = entry.strength {
                resolved.strength = Some(strength);
            }
            if let Some(inherits) = entry.inherits {
                resolved.inherits = inherits;
            }
            if let Some(level) = entry.entity_level {
                resolved.entity_level = Some(level);
            }
            if let Some(description) = &entry.description {
                resolved.description.clone_from(description);
            }
        }
        resolved
    }
}
