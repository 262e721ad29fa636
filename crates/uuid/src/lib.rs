//! Stable file identifiers.
//!
//! Every file stored in a VFR repository is addressable by a stable identifier that survives
//! renames. Identifiers are random (RFC 4122 version 4) UUIDs.
//!
//! ## Canonical form
//! - Length: 36
//! - Lowercase hexadecimal in `8-4-4-4-12` groups
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! Externally supplied identifiers (CLI arguments) must already be canonical, see
//! [`StableId::parse`]. Identifiers read back from sidecar ledgers are normalised instead, so a
//! hand-edited ledger using uppercase or braces still resolves.

mod service;

pub use service::{StableId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
