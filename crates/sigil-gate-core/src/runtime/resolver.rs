// sigil-gate-core/src/runtime/resolver.rs
// ============================================================================
// Module: Sigil Gate Frame Resolver
// Description: Total frame parsing, attribute resolution, and rendering.
// Purpose: Turn raw frame strings into structured frames deterministically.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The resolver scans a frame string codepoint by codepoint, classifying
//! each against the symbol registry. Parsing is total: malformed input
//! never raises. A duplicate singleton slot (mode, domain, source, action,
//! entity) is irreducible ambiguity and yields `None`, which higher layers
//! treat as a structural error. Unrecognized codepoints are collected into
//! unparsed segments and lower the parse confidence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::frame::ParsedFrame;
use crate::core::symbol::AttributeOverlay;
use crate::core::symbol::EntityRole;
use crate::core::symbol::Symbol;
use crate::core::symbol::SymbolCategory;
use crate::core::symbol::SymbolRegistry;

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Parses, resolves, and renders symbolic frames against a registry.
#[derive(Debug, Clone)]
pub struct FrameResolver {
    /// Ontology the resolver classifies against.
    registry: SymbolRegistry,
}

impl FrameResolver {
    /// Creates a resolver over the given registry.
    #[must_use]
    pub const fn new(registry: SymbolRegistry) -> Self {
        Self {
            registry,
        }
    }

    /// Returns the resolver's registry.
    #[must_use]
    pub const fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    /// Parses a raw frame string.
    ///
    /// Returns `None` when two symbols compete for the same singleton slot;
    /// every other input produces a frame, possibly with reduced
    /// confidence. ASCII whitespace separates segments and carries no
    /// meaning.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<ParsedFrame> {
        let mut frame = ParsedFrame::default();
        let mut pending_segment = String::new();
        let mut classified: usize = 0;
        let mut total: usize = 0;

        for codepoint in raw.chars() {
            if codepoint.is_ascii_whitespace() {
                flush_segment(&mut frame, &mut pending_segment);
                continue;
            }
            total += 1;

            let symbol = Symbol::new(codepoint);
            let Some(attrs) = self.registry.lookup(symbol) else {
                pending_segment.push(codepoint);
                continue;
            };
            flush_segment(&mut frame, &mut pending_segment);
            classified += 1;
            frame.symbols.push(symbol);
            frame.attributes.insert(codepoint, attrs.clone());

            match attrs.category {
                SymbolCategory::Mode => {
                    if frame.mode.is_some() {
                        return None;
                    }
                    frame.mode = Some(symbol);
                }
                SymbolCategory::Domain => {
                    if frame.domain.is_some() {
                        return None;
                    }
                    frame.domain = Some(symbol);
                }
                SymbolCategory::Action => {
                    if frame.action.is_some() {
                        return None;
                    }
                    frame.action = Some(symbol);
                }
                SymbolCategory::Constraint => frame.constraints.push(symbol),
                SymbolCategory::Modifier => frame.modifiers.push(symbol),
                SymbolCategory::Entity => {
                    if attrs.entity_role == Some(EntityRole::Source) {
                        if frame.source.is_some() {
                            return None;
                        }
                        frame.source = Some(symbol);
                    } else {
                        if frame.entity.is_some() {
                            return None;
                        }
                        frame.entity = Some(symbol);
                    }
                }
            }
        }
        flush_segment(&mut frame, &mut pending_segment);

        frame.parse_confidence = if total == 0 {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss, reason = "Frame lengths are tiny.")]
            let ratio = classified as f64 / total as f64;
            ratio.clamp(0.0, 1.0)
        };
        Some(frame)
    }

    /// Applies a per-call attribute overlay to a parsed frame.
    ///
    /// Overridden attributes flow to consumers through the returned frame;
    /// the registry itself is never mutated.
    #[must_use]
    pub fn resolve(&self, frame: &ParsedFrame, overlay: &AttributeOverlay) -> ParsedFrame {
        if overlay.is_empty() {
            return frame.clone();
        }
        let mut resolved = frame.clone();
        for symbol in &frame.symbols {
            if let Some(attrs) = self.registry.lookup(*symbol) {
                resolved.attributes.insert(symbol.codepoint(), overlay.apply(*symbol, attrs));
            }
        }
        resolved
    }

    /// Renders a frame back to its canonical string form.
    #[must_use]
    pub fn render(&self, frame: &ParsedFrame) -> String {
        frame.render()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Moves an accumulated unrecognized run into the frame's segment list.
fn flush_segment(frame: &mut ParsedFrame, segment: &mut String) {
    if !segment.is_empty() {
        frame.unparsed_segments.push(std::mem::take(segment));
    }
}
