// sigil-gate-config/src/config.rs
// ============================================================================
// Module: Sigil Gate Configuration
// Description: Configuration loading and validation for Sigil Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: sigil-gate-core, sigil-gate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits.
//! Missing or invalid configuration fails closed: every section is
//! validated before the config converts into the core's runtime config
//! types. Config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use sigil_gate_core::DriftConfig;
use sigil_gate_core::DriftWeights;
use sigil_gate_core::GatekeeperConfig;
use sigil_gate_core::HoldConfig;
use sigil_gate_core::ProposalConfig;
use sigil_gate_core::RegistryConfig;
use sigil_gate_core::identifiers::ToolName;
use sigil_gate_core::runtime::InheritanceMode;
use sigil_gate_store_sqlite::SqliteStoreConfig;
use sigil_gate_store_sqlite::SqliteStoreMode;
use sigil_gate_store_sqlite::SqliteSyncMode;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "sigil-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "SIGIL_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum allowed drift window size.
pub(crate) const MAX_DRIFT_WINDOW: usize = 10_000;
/// Maximum allowed cooldown in milliseconds.
pub(crate) const MAX_COOLDOWN_MS: u64 = 86_400_000;
/// Maximum allowed hold timeout in milliseconds (7 days).
pub(crate) const MAX_HOLD_TIMEOUT_MS: u64 = 604_800_000;
/// Maximum allowed proposal TTL in milliseconds (30 days).
pub(crate) const MAX_PROPOSAL_TTL_MS: u64 = 2_592_000_000;
/// Maximum allowed delegation depth.
pub(crate) const MAX_DELEGATION_DEPTH: u32 = 16;
/// Tolerance when checking that drift weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file exceeded the size limit.
    #[error("config file too large: {actual} bytes (max {max})")]
    TooLarge {
        /// Maximum allowed bytes.
        max: usize,
        /// Actual size in bytes.
        actual: usize,
    },
    /// Config file failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A config value failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Drift engine options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriftSection {
    /// Score at which a warning alert is raised.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
    /// Score at which the breaker trips.
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
    /// Rolling window length.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Open to half-open delay in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub circuit_cooldown_ms: u64,
    /// Consecutive-failure trip trigger.
    #[serde(default = "default_failure_ceiling")]
    pub consecutive_failure_ceiling: u32,
    /// Mode-deviation weight.
    #[serde(default = "default_weight_mode")]
    pub weight_mode_deviation: f64,
    /// Domain-change weight.
    #[serde(default = "default_weight_domain")]
    pub weight_domain_change: f64,
    /// Constraint-removal weight.
    #[serde(default = "default_weight_constraint")]
    pub weight_constraint_removal: f64,
    /// Failure-rate weight.
    #[serde(default = "default_weight_failure")]
    pub weight_failure_rate: f64,
}

impl Default for DriftSection {
    fn default() -> Self {
        Self {
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
            window_size: default_window_size(),
            circuit_cooldown_ms: default_cooldown_ms(),
            consecutive_failure_ceiling: default_failure_ceiling(),
            weight_mode_deviation: default_weight_mode(),
            weight_domain_change: default_weight_domain(),
            weight_constraint_removal: default_weight_constraint(),
            weight_failure_rate: default_weight_failure(),
        }
    }
}

impl DriftSection {
    /// Validates thresholds and weights.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.warning_threshold) {
            return Err(ConfigError::Invalid("drift.warning_threshold must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.critical_threshold) {
            return Err(ConfigError::Invalid("drift.critical_threshold must be in [0, 1]".into()));
        }
        if self.warning_threshold > self.critical_threshold {
            return Err(ConfigError::Invalid(
                "drift.warning_threshold must not exceed drift.critical_threshold".into(),
            ));
        }
        if self.window_size == 0 || self.window_size > MAX_DRIFT_WINDOW {
            return Err(ConfigError::Invalid(format!(
                "drift.window_size must be in [1, {MAX_DRIFT_WINDOW}]"
            )));
        }
        if self.circuit_cooldown_ms == 0 || self.circuit_cooldown_ms > MAX_COOLDOWN_MS {
            return Err(ConfigError::Invalid(format!(
                "drift.circuit_cooldown_ms must be in [1, {MAX_COOLDOWN_MS}]"
            )));
        }
        if self.consecutive_failure_ceiling == 0 {
            return Err(ConfigError::Invalid(
                "drift.consecutive_failure_ceiling must be at least 1".into(),
            ));
        }
        let sum = self.weight_mode_deviation
            + self.weight_domain_change
            + self.weight_constraint_removal
            + self.weight_failure_rate;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "drift weights must sum to 1.0 (got {sum})"
            )));
        }
        Ok(())
    }

    /// Converts the section into the core drift configuration.
    #[must_use]
    pub fn to_core(&self) -> DriftConfig {
        DriftConfig {
            warning_threshold: self.warning_threshold,
            critical_threshold: self.critical_threshold,
            window_size: self.window_size,
            cooldown_ms: self.circuit_cooldown_ms,
            consecutive_failure_ceiling: self.consecutive_failure_ceiling,
            weights: DriftWeights {
                mode_deviation: self.weight_mode_deviation,
                domain_change: self.weight_domain_change,
                constraint_removal: self.weight_constraint_removal,
                failure_rate: self.weight_failure_rate,
            },
        }
    }
}

/// Hold manager options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoldSection {
    /// Default expiry for new holds in milliseconds; zero disables expiry.
    #[serde(default = "default_hold_timeout_ms")]
    pub hold_timeout_ms: u64,
    /// Window during which identical holds are deduplicated.
    #[serde(default = "default_fingerprint_window_ms")]
    pub fingerprint_window_ms: u64,
}

impl Default for HoldSection {
    fn default() -> Self {
        Self {
            hold_timeout_ms: default_hold_timeout_ms(),
            fingerprint_window_ms: default_fingerprint_window_ms(),
        }
    }
}

impl HoldSection {
    /// Validates timeout bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hold_timeout_ms > MAX_HOLD_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "hold.hold_timeout_ms must not exceed {MAX_HOLD_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Converts the section into the core hold configuration.
    #[must_use]
    pub fn to_core(&self) -> HoldConfig {
        HoldConfig {
            default_timeout_ms: (self.hold_timeout_ms > 0).then_some(self.hold_timeout_ms),
            fingerprint_window_ms: self.fingerprint_window_ms,
        }
    }
}

/// Gatekeeper options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatekeeperSection {
    /// Whether warning-level drift alone forces a hold.
    #[serde(default = "default_true")]
    pub hold_on_drift_prediction: bool,
    /// Whether a forbidden-with-execute finding forces a hold.
    #[serde(default)]
    pub hold_on_forbidden_with_override: bool,
    /// Minimum coverage confidence an allow decision must reach.
    #[serde(default = "default_confidence_floor")]
    pub allow_confidence_floor: f64,
    /// Tools exempt from approval-required holds.
    #[serde(default)]
    pub approval_whitelist: Vec<String>,
}

impl Default for GatekeeperSection {
    fn default() -> Self {
        Self {
            hold_on_drift_prediction: default_true(),
            hold_on_forbidden_with_override: false,
            allow_confidence_floor: default_confidence_floor(),
            approval_whitelist: Vec::new(),
        }
    }
}

impl GatekeeperSection {
    /// Validates the confidence floor.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.allow_confidence_floor) {
            return Err(ConfigError::Invalid(
                "gatekeeper.allow_confidence_floor must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Converts the section into the core gatekeeper configuration.
    #[must_use]
    pub fn to_core(&self) -> GatekeeperConfig {
        GatekeeperConfig {
            hold_on_drift_prediction: self.hold_on_drift_prediction,
            hold_on_forbidden_with_override: self.hold_on_forbidden_with_override,
            allow_confidence_floor: self.allow_confidence_floor,
            approval_whitelist: self
                .approval_whitelist
                .iter()
                .map(|tool| ToolName::new(tool.clone()))
                .collect(),
            ..GatekeeperConfig::default()
        }
    }
}

/// Delegation options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationSection {
    /// Default inheritance mode (`strict` or `relaxed`).
    #[serde(default = "default_inheritance")]
    pub strict_delegation_default: String,
    /// Scope-level delegation depth cap.
    #[serde(default = "default_max_depth")]
    pub max_delegation_depth: u32,
}

impl Default for DelegationSection {
    fn default() -> Self {
        Self {
            strict_delegation_default: default_inheritance(),
            max_delegation_depth: default_max_depth(),
        }
    }
}

impl DelegationSection {
    /// Validates the mode name and depth cap.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.strict_delegation_default != "strict" && self.strict_delegation_default != "relaxed"
        {
            return Err(ConfigError::Invalid(
                "delegation.strict_delegation_default must be `strict` or `relaxed`".into(),
            ));
        }
        if self.max_delegation_depth == 0 || self.max_delegation_depth > MAX_DELEGATION_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "delegation.max_delegation_depth must be in [1, {MAX_DELEGATION_DEPTH}]"
            )));
        }
        Ok(())
    }

    /// Returns the configured default inheritance mode.
    #[must_use]
    pub fn default_mode(&self) -> InheritanceMode {
        if self.strict_delegation_default == "relaxed" {
            InheritanceMode::Relaxed
        } else {
            InheritanceMode::Strict
        }
    }
}

/// Proposal manager options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposalSection {
    /// Pending proposal expiry in milliseconds.
    #[serde(default = "default_proposal_ttl_ms")]
    pub proposal_default_ttl_ms: u64,
}

impl Default for ProposalSection {
    fn default() -> Self {
        Self {
            proposal_default_ttl_ms: default_proposal_ttl_ms(),
        }
    }
}

impl ProposalSection {
    /// Validates the TTL bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.proposal_default_ttl_ms == 0 || self.proposal_default_ttl_ms > MAX_PROPOSAL_TTL_MS
        {
            return Err(ConfigError::Invalid(format!(
                "proposal.proposal_default_ttl_ms must be in [1, {MAX_PROPOSAL_TTL_MS}]"
            )));
        }
        Ok(())
    }

    /// Converts the section into the core proposal configuration.
    #[must_use]
    pub const fn to_core(&self) -> ProposalConfig {
        ProposalConfig {
            default_ttl_ms: self.proposal_default_ttl_ms,
        }
    }
}

/// Storage options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// Sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StorageSection {
    /// Validates the database path.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.path must not be empty".into()));
        }
        Ok(())
    }

    /// Converts the section into the store configuration.
    #[must_use]
    pub fn to_store(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root Sigil Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigilGateConfig {
    /// Drift engine options.
    #[serde(default)]
    pub drift: DriftSection,
    /// Hold manager options.
    #[serde(default)]
    pub hold: HoldSection,
    /// Gatekeeper options.
    #[serde(default)]
    pub gatekeeper: GatekeeperSection,
    /// Delegation options.
    #[serde(default)]
    pub delegation: DelegationSection,
    /// Proposal options.
    #[serde(default)]
    pub proposal: ProposalSection,
    /// Registry options.
    #[serde(default)]
    pub registry: RegistrySection,
    /// Storage options.
    #[serde(default)]
    pub storage: StorageSection,
}

/// Registry options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Consecutive failed instances that open a campaign breaker.
    #[serde(default = "default_failure_ceiling")]
    pub campaign_failure_ceiling: u32,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            campaign_failure_ceiling: default_failure_ceiling(),
        }
    }
}

impl SigilGateConfig {
    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on parse or validation failure.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                max: MAX_CONFIG_FILE_SIZE,
                actual: raw.len(),
            });
        }
        let config: Self =
            toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_toml_str(&raw)
    }

    /// Resolves the config path from the environment or default name and
    /// loads it. A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an existing file fails to load.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_ENV_VAR)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first failing value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drift.validate()?;
        self.hold.validate()?;
        self.gatekeeper.validate()?;
        self.delegation.validate()?;
        self.proposal.validate()?;
        if self.registry.campaign_failure_ceiling == 0 {
            return Err(ConfigError::Invalid(
                "registry.campaign_failure_ceiling must be at least 1".into(),
            ));
        }
        self.storage.validate()?;
        Ok(())
    }

    /// Converts the registry section into the core registry configuration.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_delegation_depth: self.delegation.max_delegation_depth,
            campaign_failure_ceiling: self.registry.campaign_failure_ceiling,
            campaign_cooldown_ms: self.drift.circuit_cooldown_ms,
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default drift warning threshold.
const fn default_warning_threshold() -> f64 {
    0.15
}

/// Default drift critical threshold.
const fn default_critical_threshold() -> f64 {
    0.30
}

/// Default drift window size.
const fn default_window_size() -> usize {
    100
}

/// Default circuit cooldown in milliseconds.
const fn default_cooldown_ms() -> u64 {
    30_000
}

/// Default consecutive-failure ceiling.
const fn default_failure_ceiling() -> u32 {
    3
}

/// Default mode-deviation weight.
const fn default_weight_mode() -> f64 {
    0.3
}

/// Default domain-change weight.
const fn default_weight_domain() -> f64 {
    0.2
}

/// Default constraint-removal weight.
const fn default_weight_constraint() -> f64 {
    0.3
}

/// Default failure-rate weight.
const fn default_weight_failure() -> f64 {
    0.2
}

/// Default hold timeout in milliseconds (24 hours).
const fn default_hold_timeout_ms() -> u64 {
    86_400_000
}

/// Default hold fingerprint window in milliseconds.
const fn default_fingerprint_window_ms() -> u64 {
    10_000
}

/// Default boolean true.
const fn default_true() -> bool {
    true
}

/// Default allow-confidence floor.
const fn default_confidence_floor() -> f64 {
    0.5
}

/// Default inheritance mode name.
fn default_inheritance() -> String {
    "strict".to_string()
}

/// Default delegation depth cap.
const fn default_max_depth() -> u32 {
    3
}

/// Default proposal TTL in milliseconds (24 hours).
const fn default_proposal_ttl_ms() -> u64 {
    86_400_000
}

/// Default database path.
fn default_db_path() -> PathBuf {
    PathBuf::from("sigil-gate.db")
}

/// Default busy timeout in milliseconds.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}
