// sigil-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Sigil Gate Hashing
// Description: Canonical JSON serialization and SHA-256 fingerprints.
// Purpose: Provide deterministic fingerprints for deduplication and audit.
// Dependencies: serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! Fingerprints are SHA-256 digests over canonical JSON bytes. Canonical
//! here means `serde_json`'s default map representation, which keeps object
//! keys sorted; the helpers below exist so every call site shares the same
//! serialization path and the invariant is stated in one place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hashing errors.
#[derive(Debug, Error)]
pub enum HashError {
    /// Value could not be serialized to canonical JSON.
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Canonical Bytes
// ============================================================================

/// Serializes a value to canonical JSON bytes (sorted object keys).
///
/// # Errors
///
/// Returns [`HashError::Serialization`] when the value cannot be
/// serialized.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_json::to_vec(value).map_err(|err| HashError::Serialization(err.to_string()))
}

// ============================================================================
// SECTION: Digests
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of the given bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Returns the hex SHA-256 fingerprint of a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Serialization`] when the value cannot be
/// serialized.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, HashError> {
    Ok(sha256_hex(&canonical_json_bytes(value)?))
}
