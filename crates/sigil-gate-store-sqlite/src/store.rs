// sigil-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Governance Store
// Description: Durable governance tables backed by SQLite WAL.
// Purpose: Persist campaigns, definitions, instances, proposals, and events.
// Dependencies: sigil-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements the [`RegistryStore`], [`ProposalStore`], and
//! [`AuditStore`] interfaces over `SQLite`. Composite fields (scope,
//! resource usage, risk assessment) are stored as JSON blobs alongside
//! the indexed columns the managers filter on. Every identifier is
//! checked against its required prefix at the Rust boundary; the store
//! fails closed on malformed rows. Database contents are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sigil_gate_core::AgentDefinition;
use sigil_gate_core::AgentInstance;
use sigil_gate_core::AgentProposal;
use sigil_gate_core::AuditEvent;
use sigil_gate_core::AuditStore;
use sigil_gate_core::Campaign;
use sigil_gate_core::DataSource;
use sigil_gate_core::InstanceStatus;
use sigil_gate_core::ProposalState;
use sigil_gate_core::ProposalStore;
use sigil_gate_core::RegistryStore;
use sigil_gate_core::StoreError;
use sigil_gate_core::identifiers::AgentId;
use sigil_gate_core::identifiers::CampaignId;
use sigil_gate_core::identifiers::InstanceId;
use sigil_gate_core::identifiers::ProposalId;
use sigil_gate_core::identifiers::SourceId;
use sigil_gate_core::identifiers::prefix;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the governance store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` governance store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Identifier violates its required prefix.
    #[error("identifier `{id}` missing required prefix `{prefix}`")]
    BadPrefix {
        /// The offending identifier.
        id: String,
        /// The required prefix.
        prefix: String,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) | SqliteStoreError::Invalid(message) => {
                Self::Invalid(message)
            }
            SqliteStoreError::BadPrefix {
                id,
                prefix,
            } => Self::BadPrefix {
                id,
                prefix,
            },
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed governance store.
#[derive(Clone)]
pub struct SqliteGovernanceStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteGovernanceStore {
    /// Opens an `SQLite`-backed governance store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        ensure_parent_dir(&config.path)?;
        let connection = open_connection(config)?;
        initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Runs a closure over the locked connection.
    fn with_connection<T>(
        &self,
        run: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("connection lock poisoned".to_string()))?;
        run(&connection)
    }

    /// Upserts a JSON row keyed by a single id column.
    fn upsert_row(
        &self,
        sql: &str,
        id: &str,
        extra: &[(&str, Option<String>)],
        body: &impl Serialize,
    ) -> Result<(), SqliteStoreError> {
        let body = serde_json::to_string(body)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.with_connection(|connection| {
            let mut statement = connection.prepare_cached(sql)?;
            let mut values: Vec<&dyn rusqlite::types::ToSql> = vec![&id];
            for (_, value) in extra {
                values.push(value);
            }
            values.push(&body);
            statement.execute(values.as_slice())?;
            Ok(())
        })
    }

    /// Loads and parses a JSON body column for an id.
    fn load_row<T: DeserializeOwned>(
        &self,
        sql: &str,
        id: &str,
    ) -> Result<Option<T>, SqliteStoreError> {
        let body: Option<String> = self.with_connection(|connection| {
            let mut statement = connection.prepare_cached(sql)?;
            Ok(statement.query_row(params![id], |row| row.get(0)).optional()?)
        })?;
        body.map(|body| {
            serde_json::from_str(&body).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
        })
        .transpose()
    }
}

// ============================================================================
// SECTION: RegistryStore Implementation
// ============================================================================

impl RegistryStore for SqliteGovernanceStore {
    fn save_campaign(&self, campaign: &Campaign) -> Result<(), StoreError> {
        require_prefix(campaign.campaign_id.as_str(), prefix::CAMPAIGN)?;
        self.upsert_row(
            "INSERT INTO campaigns (campaign_id, breaker, body) VALUES (?1, ?2, ?3) \
             ON CONFLICT(campaign_id) DO UPDATE SET breaker = ?2, body = ?3",
            campaign.campaign_id.as_str(),
            &[("breaker", Some(campaign.breaker.label().to_string()))],
            campaign,
        )
        .map_err(StoreError::from)
    }

    fn load_campaign(&self, campaign_id: &CampaignId) -> Result<Option<Campaign>, StoreError> {
        self.load_row("SELECT body FROM campaigns WHERE campaign_id = ?1", campaign_id.as_str())
            .map_err(StoreError::from)
    }

    fn save_definition(&self, definition: &AgentDefinition) -> Result<(), StoreError> {
        require_prefix(definition.agent_id.as_str(), prefix::AGENT_DEFINITION)?;
        self.upsert_row(
            "INSERT INTO agent_definitions (agent_id, version, body) VALUES (?1, ?2, ?3) \
             ON CONFLICT(agent_id) DO UPDATE SET version = ?2, body = ?3",
            definition.agent_id.as_str(),
            &[("version", Some(definition.version.clone()))],
            definition,
        )
        .map_err(StoreError::from)
    }

    fn load_definition(&self, agent_id: &AgentId) -> Result<Option<AgentDefinition>, StoreError> {
        self.load_row("SELECT body FROM agent_definitions WHERE agent_id = ?1", agent_id.as_str())
            .map_err(StoreError::from)
    }

    fn save_instance(&self, instance: &AgentInstance) -> Result<(), StoreError> {
        require_prefix(instance.instance_id.as_str(), prefix::INSTANCE)?;
        self.upsert_row(
            "INSERT INTO agent_instances (instance_id, definition_id, campaign_id, status, body) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(instance_id) DO UPDATE SET definition_id = ?2, campaign_id = ?3, \
             status = ?4, body = ?5",
            instance.instance_id.as_str(),
            &[
                ("definition_id", Some(instance.definition_id.to_string())),
                ("campaign_id", instance.campaign_id.as_ref().map(ToString::to_string)),
                ("status", Some(instance.status.label().to_string())),
            ],
            instance,
        )
        .map_err(StoreError::from)
    }

    fn load_instance(&self, instance_id: &InstanceId) -> Result<Option<AgentInstance>, StoreError> {
        self.load_row("SELECT body FROM agent_instances WHERE instance_id = ?1", instance_id.as_str())
            .map_err(StoreError::from)
    }

    fn list_instances(
        &self,
        status: Option<InstanceStatus>,
        campaign_id: Option<&CampaignId>,
    ) -> Result<Vec<AgentInstance>, StoreError> {
        let rows: Vec<String> = self
            .with_connection(|connection| {
                let mut statement = connection.prepare_cached(
                    "SELECT body FROM agent_instances \
                     WHERE (?1 IS NULL OR status = ?1) \
                     AND (?2 IS NULL OR campaign_id = ?2) \
                     ORDER BY instance_id",
                )?;
                let status = status.map(|status| status.label().to_string());
                let campaign = campaign_id.map(ToString::to_string);
                let rows = statement
                    .query_map(params![status, campaign], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|body| {
                serde_json::from_str(&body).map_err(|err| StoreError::Invalid(err.to_string()))
            })
            .collect()
    }

    fn save_data_source(&self, source: &DataSource) -> Result<(), StoreError> {
        require_prefix(source.source_id.as_str(), prefix::SOURCE)?;
        self.upsert_row(
            "INSERT INTO data_sources (source_id, source_type, body) VALUES (?1, ?2, ?3) \
             ON CONFLICT(source_id) DO UPDATE SET source_type = ?2, body = ?3",
            source.source_id.as_str(),
            &[("source_type", Some(source.source_type.clone()))],
            source,
        )
        .map_err(StoreError::from)
    }

    fn load_data_source(&self, source_id: &SourceId) -> Result<Option<DataSource>, StoreError> {
        self.load_row("SELECT body FROM data_sources WHERE source_id = ?1", source_id.as_str())
            .map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: ProposalStore Implementation
// ============================================================================

impl ProposalStore for SqliteGovernanceStore {
    fn save_proposal(&self, proposal: &AgentProposal) -> Result<(), StoreError> {
        require_prefix(proposal.proposal_id.as_str(), prefix::PROPOSAL)?;
        self.upsert_row(
            "INSERT INTO proposals (proposal_id, state, hold_id, expires_at, body) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(proposal_id) DO UPDATE SET state = ?2, hold_id = ?3, expires_at = ?4, \
             body = ?5",
            proposal.proposal_id.as_str(),
            &[
                ("state", Some(proposal.state.label().to_string())),
                ("hold_id", proposal.hold_id.as_ref().map(ToString::to_string)),
                (
                    "expires_at",
                    proposal.expires_at.map(|deadline| deadline.unix_millis().to_string()),
                ),
            ],
            proposal,
        )
        .map_err(StoreError::from)
    }

    fn load_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Option<AgentProposal>, StoreError> {
        self.load_row("SELECT body FROM proposals WHERE proposal_id = ?1", proposal_id.as_str())
            .map_err(StoreError::from)
    }

    fn list_proposals(
        &self,
        state: Option<ProposalState>,
    ) -> Result<Vec<AgentProposal>, StoreError> {
        let rows: Vec<String> = self
            .with_connection(|connection| {
                let mut statement = connection.prepare_cached(
                    "SELECT body FROM proposals WHERE (?1 IS NULL OR state = ?1) \
                     ORDER BY proposal_id",
                )?;
                let state = state.map(|state| state.label().to_string());
                let rows = statement
                    .query_map(params![state], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|body| {
                serde_json::from_str(&body).map_err(|err| StoreError::Invalid(err.to_string()))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: AuditStore Implementation
// ============================================================================

impl AuditStore for SqliteGovernanceStore {
    fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        require_prefix(event.event_id.as_str(), prefix::EVENT)?;
        let body = serde_json::to_string(event)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        self.with_connection(|connection| {
            let mut statement = connection.prepare_cached(
                "INSERT OR IGNORE INTO audit_events \
                 (seq, event_id, event_type, at_ms, agent_id, instance_id, campaign_id, \
                 proposal_id, body) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            #[allow(clippy::cast_possible_wrap, reason = "Sequence values stay far below i64::MAX.")]
            let seq = event.seq as i64;
            statement.execute(params![
                seq,
                event.event_id.as_str(),
                event.event_type.label(),
                event.at.unix_millis(),
                event.agent_id.as_ref().map(ToString::to_string),
                event.instance_id.as_ref().map(ToString::to_string),
                event.campaign_id.as_ref().map(ToString::to_string),
                event.proposal_id.as_ref().map(ToString::to_string),
                body,
            ])?;
            Ok(())
        })
        .map_err(StoreError::from)
    }

    fn load_events_from(&self, from_seq: u64) -> Result<Vec<AuditEvent>, StoreError> {
        let rows: Vec<String> = self
            .with_connection(|connection| {
                let mut statement = connection.prepare_cached(
                    "SELECT body FROM audit_events WHERE seq >= ?1 ORDER BY id",
                )?;
                #[allow(clippy::cast_possible_wrap, reason = "Sequence values stay far below i64::MAX.")]
                let from_seq = from_seq as i64;
                let rows = statement
                    .query_map(params![from_seq], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .map_err(StoreError::from)?;
        rows.into_iter()
            .map(|body| {
                serde_json::from_str(&body).map_err(|err| StoreError::Invalid(err.to_string()))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Initialization Helpers
// ============================================================================

/// Validates an identifier prefix at the store boundary.
fn require_prefix(id: &str, required: &str) -> Result<(), StoreError> {
    if id.starts_with(required) {
        return Ok(());
    }
    Err(StoreError::BadPrefix {
        id: id.to_string(),
        prefix: required.to_string(),
    })
}

/// Creates the parent directory of the database file when missing.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        }
    }
    Ok(())
}

/// Opens the connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open_with_flags(
        &config.path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    connection.pragma_update(None, "journal_mode", config.journal_mode.pragma_value())?;
    connection.pragma_update(None, "synchronous", config.sync_mode.pragma_value())?;
    connection.pragma_update(None, "foreign_keys", "on")?;
    Ok(connection)
}

/// Creates tables and indices, stamping the schema version.
fn initialize_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    let version: i64 = connection.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(SqliteStoreError::VersionMismatch(format!(
            "database schema version {version} is newer than supported {SCHEMA_VERSION}"
        )));
    }
    connection.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS campaigns (
             campaign_id TEXT PRIMARY KEY,
             breaker     TEXT NOT NULL,
             body        TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS agent_definitions (
             agent_id TEXT PRIMARY KEY,
             version  TEXT NOT NULL,
             body     TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS agent_instances (
             instance_id   TEXT PRIMARY KEY,
             definition_id TEXT NOT NULL,
             campaign_id   TEXT,
             status        TEXT NOT NULL,
             body          TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_instances_status
             ON agent_instances (status);
         CREATE INDEX IF NOT EXISTS idx_instances_campaign
             ON agent_instances (campaign_id);
         CREATE INDEX IF NOT EXISTS idx_instances_definition
             ON agent_instances (definition_id);
         CREATE TABLE IF NOT EXISTS proposals (
             proposal_id TEXT PRIMARY KEY,
             state       TEXT NOT NULL,
             hold_id     TEXT,
             expires_at  TEXT,
             body        TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_proposals_state_expiry
             ON proposals (state, expires_at);
         CREATE INDEX IF NOT EXISTS idx_proposals_hold
             ON proposals (hold_id);
         CREATE TABLE IF NOT EXISTS data_sources (
             source_id   TEXT PRIMARY KEY,
             source_type TEXT NOT NULL,
             body        TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS audit_events (
             id          INTEGER PRIMARY KEY AUTOINCREMENT,
             seq         INTEGER NOT NULL,
             event_id    TEXT NOT NULL UNIQUE,
             event_type  TEXT NOT NULL,
             at_ms       INTEGER NOT NULL,
             agent_id    TEXT,
             instance_id TEXT,
             campaign_id TEXT,
             proposal_id TEXT,
             body        TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_events_at
             ON audit_events (at_ms);
         COMMIT;",
    )?;
    connection.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
