// sigil-gate-config/tests/config_defaults.rs
// ============================================================================
// Module: Config Default Tests
// Description: Tests for default values and core-config conversion.
// ============================================================================
//! ## Overview
//! Validates the documented defaults and the conversion of sections into
//! the core's runtime configuration types.

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

use sigil_gate_config::SigilGateConfig;
use sigil_gate_core::runtime::InheritanceMode;

/// Tests the documented option defaults.
#[test]
fn test_documented_defaults() {
    let config = SigilGateConfig::default();
    config.validate().expect("defaults validate");

    assert_eq!(config.drift.warning_threshold, 0.15);
    assert_eq!(config.drift.critical_threshold, 0.30);
    assert_eq!(config.drift.window_size, 100);
    assert_eq!(config.drift.circuit_cooldown_ms, 30_000);
    assert_eq!(config.drift.consecutive_failure_ceiling, 3);
    assert_eq!(config.hold.hold_timeout_ms, 86_400_000);
    assert_eq!(config.delegation.max_delegation_depth, 3);
    assert_eq!(config.proposal.proposal_default_ttl_ms, 86_400_000);
    assert!(config.gatekeeper.hold_on_drift_prediction);
    assert!(!config.gatekeeper.hold_on_forbidden_with_override);
}

/// Tests conversion into core configuration types.
#[test]
fn test_core_conversions() {
    let config = SigilGateConfig::default();

    let drift = config.drift.to_core();
    assert_eq!(drift.window_size, 100);
    assert_eq!(drift.weights.sum(), 1.0);

    let hold = config.hold.to_core();
    assert_eq!(hold.default_timeout_ms, Some(86_400_000));

    let registry = config.registry_config();
    assert_eq!(registry.max_delegation_depth, 3);
    assert_eq!(registry.campaign_failure_ceiling, 3);

    assert_eq!(config.delegation.default_mode(), InheritanceMode::Strict);
}

/// Tests that an empty TOML document yields the defaults.
#[test]
fn test_empty_toml_is_default() {
    let config = SigilGateConfig::from_toml_str("").expect("empty config parses");
    assert_eq!(config.drift.window_size, 100);
}

/// Tests that a zero hold timeout disables expiry.
#[test]
fn test_zero_hold_timeout_disables_expiry() {
    let config =
        SigilGateConfig::from_toml_str("[hold]\nhold_timeout_ms = 0\n").expect("config parses");
    assert_eq!(config.hold.to_core().default_timeout_ms, None);
}
