// sigil-gate-cli/src/main.rs
// ============================================================================
// Module: Sigil Gate CLI Entry Point
// Description: Command dispatcher for offline governance workflows.
// Purpose: Parse frames, check configuration, and inspect persisted state.
// Dependencies: clap, sigil-gate-core, sigil-gate-config, sigil-gate-store-sqlite
// ============================================================================

//! ## Overview
//! The Sigil Gate CLI covers the offline operator tasks: parsing and
//! validating frame expressions, checking deployment configuration, and
//! querying the persisted audit and proposal tables. It is a thin shell
//! over the core; no governance decision logic lives here. The CLI is the
//! host in the core's time model and supplies wall-clock timestamps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Parser;
use clap::Subcommand;
use sigil_gate_config::SigilGateConfig;
use sigil_gate_core::AgentRegistry;
use sigil_gate_core::AuditLog;
use sigil_gate_core::AuditStore;
use sigil_gate_core::CapabilityToolMap;
use sigil_gate_core::FrameResolver;
use sigil_gate_core::FrameValidator;
use sigil_gate_core::HoldManager;
use sigil_gate_core::ProposalManager;
use sigil_gate_core::ProposalState;
use sigil_gate_core::SymbolRegistry;
use sigil_gate_core::Timestamp;
use sigil_gate_store_sqlite::SqliteGovernanceStore;
use sigil_gate_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sigil-gate", version, arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Frame parsing and validation.
    #[command(subcommand)]
    Frame(FrameCommand),
    /// Configuration checks.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Persisted audit event queries.
    #[command(subcommand)]
    Audit(AuditCommand),
    /// Proposal listing and expiry.
    #[command(subcommand)]
    Proposal(ProposalCommand),
}

/// Frame subcommands.
#[derive(Subcommand, Debug)]
enum FrameCommand {
    /// Parses a frame and prints its structured form as JSON.
    Parse {
        /// Frame expression to parse.
        frame: String,
    },
    /// Validates a frame, optionally against a parent frame.
    Validate {
        /// Frame expression to validate.
        frame: String,
        /// Parent frame for chain validation.
        #[arg(long)]
        parent: Option<String>,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Loads and validates a configuration file.
    Check {
        /// Path to the configuration file.
        path: PathBuf,
    },
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Prints persisted audit events as JSON lines.
    Query {
        /// Path to the `SQLite` database.
        #[arg(long)]
        db: PathBuf,
        /// Lowest sequence number to include.
        #[arg(long, default_value_t = 0)]
        from_seq: u64,
    },
}

/// Proposal subcommands.
#[derive(Subcommand, Debug)]
enum ProposalCommand {
    /// Lists persisted proposals as JSON lines.
    List {
        /// Path to the `SQLite` database.
        #[arg(long)]
        db: PathBuf,
        /// Filter by state (`pending`, `approved`, `rejected`, `expired`).
        #[arg(long)]
        state: Option<String>,
    },
    /// Expires pending proposals past their deadline.
    Expire {
        /// Path to the `SQLite` database.
        #[arg(long)]
        db: PathBuf,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI errors surfaced to the operator.
#[derive(Debug, Error)]
enum CliError {
    /// Frame could not be parsed.
    #[error("frame could not be parsed: duplicate singleton slot")]
    ParseFailed,
    /// Configuration failed to load or validate.
    #[error("{0}")]
    Config(String),
    /// Store access failed.
    #[error("store error: {0}")]
    Store(String),
    /// Output serialization failed.
    #[error("serialization error: {0}")]
    Serialize(String),
    /// Unknown proposal state filter.
    #[error("unknown proposal state `{0}`")]
    UnknownState(String),
    /// Writing to stdout failed.
    #[error("output error: {0}")]
    Output(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            let _ = write_stderr_line(&error.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<ExitCode, CliError> {
    match cli.command {
        Commands::Frame(command) => run_frame(command),
        Commands::Config(command) => run_config(command),
        Commands::Audit(command) => run_audit(command),
        Commands::Proposal(command) => run_proposal(command),
    }
}

// ============================================================================
// SECTION: Frame Commands
// ============================================================================

/// Handles `frame` subcommands.
fn run_frame(command: FrameCommand) -> Result<ExitCode, CliError> {
    let resolver = FrameResolver::new(SymbolRegistry::default_ontology());
    match command {
        FrameCommand::Parse {
            frame,
        } => {
            let parsed = resolver.parse(&frame).ok_or(CliError::ParseFailed)?;
            let rendered = serde_json::to_string_pretty(&parsed)
                .map_err(|err| CliError::Serialize(err.to_string()))?;
            write_stdout_line(&rendered)?;
            Ok(ExitCode::SUCCESS)
        }
        FrameCommand::Validate {
            frame,
            parent,
        } => {
            let validator = FrameValidator::new(SymbolRegistry::default_ontology());
            let parsed = resolver.parse(&frame).ok_or(CliError::ParseFailed)?;
            let parent = match parent {
                Some(parent) => Some(resolver.parse(&parent).ok_or(CliError::ParseFailed)?),
                None => None,
            };
            let report = validator.validate(&parsed, parent.as_ref());
            let rendered = serde_json::to_string_pretty(&report)
                .map_err(|err| CliError::Serialize(err.to_string()))?;
            write_stdout_line(&rendered)?;
            if report.valid() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
        }
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Handles `config` subcommands.
fn run_config(command: ConfigCommand) -> Result<ExitCode, CliError> {
    match command {
        ConfigCommand::Check {
            path,
        } => {
            SigilGateConfig::load_from_path(&path)
                .map_err(|err| CliError::Config(err.to_string()))?;
            write_stdout_line("configuration is valid")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Audit Commands
// ============================================================================

/// Handles `audit` subcommands.
fn run_audit(command: AuditCommand) -> Result<ExitCode, CliError> {
    match command {
        AuditCommand::Query {
            db,
            from_seq,
        } => {
            let store = open_store(&db)?;
            let events = store
                .load_events_from(from_seq)
                .map_err(|err| CliError::Store(err.to_string()))?;
            for event in events {
                let line = serde_json::to_string(&event)
                    .map_err(|err| CliError::Serialize(err.to_string()))?;
                write_stdout_line(&line)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Proposal Commands
// ============================================================================

/// Handles `proposal` subcommands.
fn run_proposal(command: ProposalCommand) -> Result<ExitCode, CliError> {
    match command {
        ProposalCommand::List {
            db,
            state,
        } => {
            let state = state.map(|state| parse_state(&state)).transpose()?;
            let manager = proposal_manager(&db)?;
            for proposal in manager.list(state) {
                let line = serde_json::to_string(&proposal)
                    .map_err(|err| CliError::Serialize(err.to_string()))?;
                write_stdout_line(&line)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        ProposalCommand::Expire {
            db,
        } => {
            let manager = proposal_manager(&db)?;
            let expired = manager.expire_stale(now_timestamp());
            write_stdout_line(&format!("expired {} proposal(s)", expired.len()))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Builds an offline proposal manager over the persisted store.
fn proposal_manager(db: &Path) -> Result<ProposalManager, CliError> {
    let audit = Arc::new(AuditLog::new());
    let registry = Arc::new(AgentRegistry::new(
        sigil_gate_core::RegistryConfig::default(),
        CapabilityToolMap::default_map(),
        Arc::clone(&audit),
    ));
    let holds = Arc::new(HoldManager::new(
        sigil_gate_core::HoldConfig::default(),
        Arc::clone(&audit),
    ));
    let store = open_store(db)?;
    Ok(ProposalManager::new(
        sigil_gate_core::ProposalConfig::default(),
        registry,
        holds,
        audit,
    )
    .with_store(Box::new(store)))
}

/// Parses a proposal state filter.
fn parse_state(raw: &str) -> Result<ProposalState, CliError> {
    match raw {
        "pending" => Ok(ProposalState::Pending),
        "approved" => Ok(ProposalState::Approved),
        "rejected" => Ok(ProposalState::Rejected),
        "expired" => Ok(ProposalState::Expired),
        other => Err(CliError::UnknownState(other.to_string())),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the governance store at the given path.
fn open_store(db: &Path) -> Result<SqliteGovernanceStore, CliError> {
    let config = SqliteStoreConfig {
        path: db.to_path_buf(),
        busy_timeout_ms: 5_000,
        journal_mode: sigil_gate_store_sqlite::SqliteStoreMode::Wal,
        sync_mode: sigil_gate_store_sqlite::SqliteSyncMode::Full,
    };
    SqliteGovernanceStore::new(&config).map_err(|err| CliError::Store(err.to_string()))
}

/// Reads the wall clock into a core timestamp.
fn now_timestamp() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    Timestamp::from_unix_millis(millis)
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::Output(err.to_string()))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
