// sigil-gate-core/tests/proptest_frames.rs
// ============================================================================
// Module: Frame Property Tests
// Description: Property-based round-trip and duplicate-slot checks.
// ============================================================================
//! ## Overview
//! Exercises the resolver over generated canonical frames: rendering then
//! reparsing is the identity, and any frame with two symbols in one
//! singleton slot fails to parse.

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

use proptest::prelude::*;
use sigil_gate_core::FrameResolver;
use sigil_gate_core::SymbolRegistry;

/// Mode codepoints from the default ontology.
const MODES: &[char] = &['⊗', '⊕', '⊙', '⊘', '⊖', '⊛'];
/// Domain codepoints from the default ontology.
const DOMAINS: &[char] = &['◊', '◇', '◈', '⬡', '⬢'];
/// Action codepoints from the default ontology.
const ACTIONS: &[char] = &['▶', '▼', '◎', '⟲', '⇗'];
/// Constraint codepoints from the default ontology.
const CONSTRAINTS: &[char] = &['⛔', '⚖', '⏱', '⚠'];
/// Modifier codepoints from the default ontology.
const MODIFIERS: &[char] = &['↑', '↓', '≈', '⋯'];
/// Actor entity codepoints from the default ontology.
const ENTITIES: &[char] = &['α', 'β', 'γ', 'δ'];
/// Source entity codepoints from the default ontology.
const SOURCES: &[char] = &['⊲', '⊳'];

/// Strategy for an optional pick from a codepoint set.
fn optional_pick(set: &'static [char]) -> impl Strategy<Value = Option<char>> {
    proptest::option::of(proptest::sample::select(set))
}

/// Strategy for a duplicate-free subset of a codepoint set, in order.
fn subset(set: &'static [char]) -> impl Strategy<Value = Vec<char>> {
    proptest::collection::vec(proptest::bool::ANY, set.len()).prop_map(move |mask| {
        set.iter().zip(mask).filter_map(|(symbol, keep)| keep.then_some(*symbol)).collect()
    })
}

/// Builds a canonical frame string from generated parts.
fn build_frame(
    mode: Option<char>,
    modifiers: &[char],
    domain: Option<char>,
    source: Option<char>,
    constraints: &[char],
    action: Option<char>,
    entity: Option<char>,
) -> String {
    let mut out = String::new();
    out.extend(mode);
    out.extend(modifiers.iter());
    out.extend(domain);
    out.extend(source);
    out.extend(constraints.iter());
    out.extend(action);
    out.extend(entity);
    out
}

proptest! {
    /// Rendering a parsed canonical frame and reparsing it is the identity.
    #[test]
    fn prop_round_trip(
        mode in optional_pick(MODES),
        modifiers in subset(MODIFIERS),
        domain in optional_pick(DOMAINS),
        source in optional_pick(SOURCES),
        constraints in subset(CONSTRAINTS),
        action in optional_pick(ACTIONS),
        entity in optional_pick(ENTITIES),
    ) {
        let raw = build_frame(mode, &modifiers, domain, source, &constraints, action, entity);
        let resolver = FrameResolver::new(SymbolRegistry::default_ontology());
        let parsed = resolver.parse(&raw).expect("canonical frames always parse");
        let rendered = parsed.render();
        prop_assert_eq!(&rendered, &raw);
        let reparsed = resolver.parse(&rendered).expect("rendered frames always parse");
        prop_assert_eq!(parsed, reparsed);
    }

    /// Any frame carrying two symbols of one singleton slot fails to parse.
    #[test]
    fn prop_duplicate_slot_fails(
        base in optional_pick(DOMAINS),
        slot in 0_usize..4,
        first in 0_usize..4,
        second in 0_usize..4,
    ) {
        let sets: [&[char]; 4] = [MODES, DOMAINS, ACTIONS, ENTITIES];
        let set = sets[slot];
        let first = set[first.min(set.len() - 1)];
        let second = set[second.min(set.len() - 1)];
        let mut raw = String::new();
        raw.push(first);
        if slot != 1 {
            raw.extend(base);
        }
        raw.push(second);
        let resolver = FrameResolver::new(SymbolRegistry::default_ontology());
        prop_assert!(resolver.parse(&raw).is_none());
    }
}
