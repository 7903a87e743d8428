// sigil-gate-core/src/lib.rs
// ============================================================================
// Module: Sigil Gate Core Library
// Description: Public API surface for the Sigil Gate core.
// Purpose: Expose core types, interfaces, and runtime engines.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Sigil Gate core provides a governance gateway for tool-calling agents:
//! a symbolic frame language with a total resolver, a three-tier
//! validator, per-agent drift tracking with circuit breakers, an
//! at-most-once hold queue, delegation with frame inheritance, an agent
//! registry with scopes and quotas, risk-scored proposals, and an
//! append-only audit log. It is backend-agnostic and integrates through
//! explicit interfaces rather than embedding into agent frameworks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AuditStore;
pub use interfaces::HoldNotifier;
pub use interfaces::NotifyError;
pub use interfaces::ProposalNotifier;
pub use interfaces::ProposalStore;
pub use interfaces::RegistryStore;
pub use interfaces::StoreError;
pub use runtime::AgentRegistry;
pub use runtime::AuditLog;
pub use runtime::CancellationToken;
pub use runtime::CustomInheritance;
pub use runtime::DelegateRequest;
pub use runtime::DelegationEngine;
pub use runtime::DelegationError;
pub use runtime::DelegationOutcome;
pub use runtime::DelegationRecord;
pub use runtime::DelegationStatus;
pub use runtime::DriftEngine;
pub use runtime::FrameResolver;
pub use runtime::FrameValidator;
pub use runtime::Gatekeeper;
pub use runtime::GatekeeperConfig;
pub use runtime::HoldCreateRequest;
pub use runtime::HoldManager;
pub use runtime::InheritanceMode;
pub use runtime::ProposalConfig;
pub use runtime::ProposalError;
pub use runtime::ProposalManager;
pub use runtime::ProposalModifications;
pub use runtime::RegistryConfig;
pub use runtime::RegistryError;
pub use runtime::SpawnRequest;
