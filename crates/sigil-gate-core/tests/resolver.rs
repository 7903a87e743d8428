// sigil-gate-core/tests/resolver.rs
// ============================================================================
// Module: Frame Resolver Tests
// Description: Tests for total parsing, confidence, and rendering.
// ============================================================================
//! ## Overview
//! Validates slot assignment, duplicate-slot failure, parse confidence,
//! overlay resolution, and canonical round-trips.

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
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use sigil_gate_core::AttributeOverlay;
use sigil_gate_core::FrameResolver;
use sigil_gate_core::OverlayEntry;
use sigil_gate_core::Symbol;
use sigil_gate_core::SymbolRegistry;

/// Builds a resolver over the default ontology.
fn resolver() -> FrameResolver {
    FrameResolver::new(SymbolRegistry::default_ontology())
}

/// Tests slot assignment for a full canonical frame.
#[test]
fn test_parse_assigns_all_slots() {
    let frame = resolver().parse("⊕↑◊⊲⛔▶α").expect("frame parses");
    assert_eq!(frame.mode, Some(Symbol::new('⊕')));
    assert_eq!(frame.modifiers, vec![Symbol::new('↑')]);
    assert_eq!(frame.domain, Some(Symbol::new('◊')));
    assert_eq!(frame.source, Some(Symbol::new('⊲')));
    assert_eq!(frame.constraints, vec![Symbol::new('⛔')]);
    assert_eq!(frame.action, Some(Symbol::new('▶')));
    assert_eq!(frame.entity, Some(Symbol::new('α')));
    assert_eq!(frame.parse_confidence, 1.0);
    assert!(frame.unparsed_segments.is_empty());
}

/// Tests that duplicate singleton slots fail the parse.
#[test]
fn test_duplicate_slots_return_none() {
    let resolver = resolver();
    assert!(resolver.parse("⊕⊘◊").is_none(), "two modes");
    assert!(resolver.parse("◊◇▶").is_none(), "two domains");
    assert!(resolver.parse("⊕▶◎").is_none(), "two actions");
    assert!(resolver.parse("αβ").is_none(), "two entities");
    assert!(resolver.parse("⊲⊳").is_none(), "two sources");
}

/// Tests that repeated constraints and modifiers are allowed.
#[test]
fn test_repeated_multi_slots_parse() {
    let frame = resolver().parse("⊘⛔⏱⚠▶").expect("frame parses");
    assert_eq!(frame.constraints.len(), 3);
}

/// Tests confidence and segment collection for unrecognized codepoints.
#[test]
fn test_unrecognized_codepoints_lower_confidence() {
    let frame = resolver().parse("⊕xy◊").expect("frame parses");
    assert_eq!(frame.unparsed_segments, vec!["xy".to_string()]);
    assert_eq!(frame.parse_confidence, 0.5);
    assert_eq!(frame.symbols.len(), 2);
}

/// Tests that whitespace separates segments without costing confidence.
#[test]
fn test_whitespace_is_neutral() {
    let spaced = resolver().parse("⊕ ◊ ▶").expect("frame parses");
    let dense = resolver().parse("⊕◊▶").expect("frame parses");
    assert_eq!(spaced.mode, dense.mode);
    assert_eq!(spaced.domain, dense.domain);
    assert_eq!(spaced.action, dense.action);
    assert_eq!(spaced.parse_confidence, 1.0);
}

/// Tests that the empty string parses to an empty frame.
#[test]
fn test_empty_input_parses_empty_frame() {
    let frame = resolver().parse("").expect("empty frame parses");
    assert!(frame.is_empty());
    assert_eq!(frame.parse_confidence, 1.0);
}

/// Tests canonical rendering order.
#[test]
fn test_render_canonical_order() {
    let frame = resolver().parse("⊕↑◊⊲⛔▶α").expect("frame parses");
    assert_eq!(frame.render(), "⊕↑◊⊲⛔▶α");
}

/// Tests the round-trip property on specific frames.
#[test]
fn test_round_trip_examples() {
    let resolver = resolver();
    for raw in ["⊕◊⛔▶", "⊘◇▼β", "⊛◈◎", "⊖⬡⚖⟲γ", "⊙↓⬢⏱⇗δ"] {
        let parsed = resolver.parse(raw).expect("frame parses");
        let reparsed = resolver.parse(&parsed.render()).expect("rendered frame parses");
        assert_eq!(parsed, reparsed, "round trip failed for `{raw}`");
    }
}

/// Tests that overlays override attributes without touching the registry.
#[test]
fn test_overlay_overrides_attributes() {
    let resolver = resolver();
    let frame = resolver.parse("⊕◊▶").expect("frame parses");
    let overlay = AttributeOverlay::new().with_entry('⊕', OverlayEntry {
        strength: Some(2),
        inherits: None,
        entity_level: None,
        description: None,
    });
    let resolved = resolver.resolve(&frame, &overlay);
    assert_eq!(resolved.mode_strength(resolver.registry()), Some(2));
    assert_eq!(resolver.registry().strength(Symbol::new('⊕')), Some(1));
    assert_eq!(frame.mode_strength(resolver.registry()), Some(1));
}
