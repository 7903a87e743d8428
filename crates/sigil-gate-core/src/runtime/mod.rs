// sigil-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Sigil Gate Runtime
// Description: Engines and managers composing the governance gateway.
// Purpose: Provide the resolver, validators, and stateful managers.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime layer holds the working parts of Sigil Gate: the pure
//! frame resolver and validator, the per-agent drift engine, the hold
//! manager, the agent registry, the delegation engine, the proposal
//! manager, the audit log, and the gatekeeper that composes them into a
//! decision per intercepted operation.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod delegation;
pub mod drift;
pub mod gatekeeper;
pub mod hold;
pub mod proposal;
pub mod registry;
pub mod resolver;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditLog;
pub use delegation::CustomInheritance;
pub use delegation::DelegateRequest;
pub use delegation::DelegationEngine;
pub use delegation::DelegationError;
pub use delegation::DelegationOutcome;
pub use delegation::DelegationRecord;
pub use delegation::DelegationStatus;
pub use delegation::InheritanceMode;
pub use drift::DriftEngine;
pub use gatekeeper::CancellationToken;
pub use gatekeeper::DEFAULT_DECISION_BUDGET_MS;
pub use gatekeeper::Gatekeeper;
pub use gatekeeper::GatekeeperConfig;
pub use hold::HoldCreateRequest;
pub use hold::HoldManager;
pub use proposal::ProposalConfig;
pub use proposal::ProposalError;
pub use proposal::ProposalManager;
pub use proposal::ProposalModifications;
pub use registry::AgentRegistry;
pub use registry::RegistryConfig;
pub use registry::RegistryError;
pub use registry::SpawnRequest;
pub use registry::build_scope;
pub use registry::glob_match;
pub use registry::intersect_patterns;
pub use registry::scope_admits_tool;
pub use resolver::FrameResolver;
pub use validator::FrameValidator;
