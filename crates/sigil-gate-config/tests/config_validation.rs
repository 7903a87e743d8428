// sigil-gate-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Tests for fail-closed parsing and validation.
// ============================================================================
//! ## Overview
//! Validates that malformed or out-of-range configuration is rejected
//! before any conversion into runtime types.

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

use std::io::Write;

use sigil_gate_config::ConfigError;
use sigil_gate_config::SigilGateConfig;

/// Tests rejection of unknown fields.
#[test]
fn test_unknown_fields_are_rejected() {
    let error = SigilGateConfig::from_toml_str("[drift]\nmystery_knob = 1\n")
        .expect_err("unknown field fails");
    assert!(matches!(error, ConfigError::Parse(_)));
}

/// Tests threshold ordering validation.
#[test]
fn test_threshold_ordering_is_enforced() {
    let raw = "[drift]\nwarning_threshold = 0.5\ncritical_threshold = 0.2\n";
    let error = SigilGateConfig::from_toml_str(raw).expect_err("inverted thresholds fail");
    assert!(matches!(error, ConfigError::Invalid(_)));
}

/// Tests the weight-sum constraint.
#[test]
fn test_weights_must_sum_to_one() {
    let raw = "[drift]\nweight_mode_deviation = 0.5\nweight_domain_change = 0.5\n\
               weight_constraint_removal = 0.5\nweight_failure_rate = 0.5\n";
    let error = SigilGateConfig::from_toml_str(raw).expect_err("bad weights fail");
    assert!(matches!(error, ConfigError::Invalid(_)));
}

/// Tests range validation on the confidence floor.
#[test]
fn test_confidence_floor_range() {
    let raw = "[gatekeeper]\nallow_confidence_floor = 1.5\n";
    let error = SigilGateConfig::from_toml_str(raw).expect_err("out-of-range floor fails");
    assert!(matches!(error, ConfigError::Invalid(_)));
}

/// Tests the inheritance mode name check.
#[test]
fn test_inheritance_mode_name_check() {
    let raw = "[delegation]\nstrict_delegation_default = \"loose\"\n";
    let error = SigilGateConfig::from_toml_str(raw).expect_err("bad mode name fails");
    assert!(matches!(error, ConfigError::Invalid(_)));
}

/// Tests the delegation depth cap.
#[test]
fn test_delegation_depth_cap() {
    let raw = "[delegation]\nmax_delegation_depth = 64\n";
    let error = SigilGateConfig::from_toml_str(raw).expect_err("excessive depth fails");
    assert!(matches!(error, ConfigError::Invalid(_)));
}

/// Tests loading a valid file from disk.
#[test]
fn test_load_from_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sigil-gate.toml");
    let mut file = std::fs::File::create(&path).expect("file creates");
    writeln!(file, "[drift]\nwindow_size = 50\n\n[storage]\npath = \"gate.db\"")
        .expect("file writes");

    let config = SigilGateConfig::load_from_path(&path).expect("config loads");
    assert_eq!(config.drift.window_size, 50);
    assert_eq!(config.storage.path.to_string_lossy(), "gate.db");
}

/// Tests the missing-file behavior of the I/O path.
#[test]
fn test_missing_file_is_io_error() {
    let error = SigilGateConfig::load_from_path(std::path::Path::new("/nonexistent/sigil.toml"))
        .expect_err("missing file fails");
    assert!(matches!(error, ConfigError::Io(_)));
}
