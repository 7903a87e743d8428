// sigil-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Sigil Gate Identifiers
// Description: Canonical opaque identifiers for agents, holds, and proposals.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used throughout
//! Sigil Gate. Identifiers are opaque and serialize as strings. Persisted
//! identifiers carry fixed prefixes (`agent.`, `inst_`, `prop_`, `camp_`,
//! `src_`, `evt_`); prefix validation happens at store and manager
//! boundaries rather than within these simple wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Prefixes
// ============================================================================

/// Stable prefixes for persisted identifier families.
pub mod prefix {
    /// Prefix for agent definition identifiers.
    pub const AGENT_DEFINITION: &str = "agent.";
    /// Prefix for agent instance identifiers.
    pub const INSTANCE: &str = "inst_";
    /// Prefix for proposal identifiers.
    pub const PROPOSAL: &str = "prop_";
    /// Prefix for campaign identifiers.
    pub const CAMPAIGN: &str = "camp_";
    /// Prefix for data source identifiers.
    pub const SOURCE: &str = "src_";
    /// Prefix for audit event identifiers.
    pub const EVENT: &str = "evt_";
    /// Prefix for hold identifiers.
    pub const HOLD: &str = "hold_";
    /// Prefix for delegation identifiers.
    pub const DELEGATION: &str = "del_";
}

/// Declares a string-backed identifier newtype with the shared impl surface.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true when the identifier starts with the given prefix.
            #[must_use]
            pub fn has_prefix(&self, prefix: &str) -> bool {
                self.0.starts_with(prefix)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id! {
    /// Agent identifier. Covers both catalogued definitions (prefixed
    /// `agent.`) and free-form caller identities seen at the gatekeeper.
    AgentId
}

string_id! {
    /// Runtime agent instance identifier (prefixed `inst_`).
    InstanceId
}

string_id! {
    /// Hold request identifier (prefixed `hold_`).
    HoldId
}

string_id! {
    /// Agent proposal identifier (prefixed `prop_`).
    ProposalId
}

string_id! {
    /// Campaign identifier (prefixed `camp_`).
    CampaignId
}

string_id! {
    /// Delegation record identifier (prefixed `del_`).
    DelegationId
}

string_id! {
    /// Audit event identifier (prefixed `evt_`).
    EventId
}

string_id! {
    /// Data source identifier (prefixed `src_`).
    SourceId
}

string_id! {
    /// Human operator identifier used on hold and proposal decisions.
    OperatorId
}

string_id! {
    /// Tool name as requested by an agent.
    ToolName
}

string_id! {
    /// Namespace identifier scoping instance symbol patterns.
    NamespaceId
}

string_id! {
    /// Proposal template identifier.
    TemplateId
}
