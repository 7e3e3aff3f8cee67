// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! Hierarchical error taxonomy for the encryption core. Every failure mode
//! named by the tree model, the value cipher, the MAC engine, the Shamir
//! envelope and the master-key/key-service boundary surfaces here with a
//! stable variant, distinct from its human-readable message.

use thiserror::Error;

/// Domain-specific errors for the cryptree encryption core.
#[derive(Error, Debug, Clone)]
pub enum CryptreeError {
    /// Integrity check failed after decrypt: the recomputed MAC does not
    /// match the one stored (and decrypted) from metadata.
    #[error("MAC mismatch: integrity check failed")]
    MacMismatch,

    /// A file that claims to already be encrypted has no `sops`-style
    /// metadata block to recover it with.
    #[error("metadata missing: file is expected to carry an encryption metadata block")]
    MetadataMissing,

    /// Fewer than `threshold` key groups yielded a Shamir share during
    /// decrypt. Carries one message per group that failed.
    #[error("insufficient key groups: needed {threshold}, got {available} ({group_errors:?})")]
    InsufficientKeyGroups {
        threshold: usize,
        available: usize,
        group_errors: Vec<String>,
    },

    /// No configured key-service client could unwrap a share for a given
    /// master key. Carries one message per client that was tried.
    #[error("key service failure for key '{key_id}': {client_errors:?}")]
    KeyServiceFailure {
        key_id: String,
        client_errors: Vec<String>,
    },

    /// An AEAD decrypt returned an authentication failure: wrong key, wrong
    /// AAD, or tampered ciphertext.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// An `ENC[...]` ciphertext envelope could not be parsed.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// A path traversal hit a type/shape mismatch or an out-of-bounds index.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An explicit `unset`/`extract` operation addressed an absent node.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Top-level shape forbidden, unsupported key type, or a disallowed
    /// structural construct (e.g. YAML anchors/aliases).
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// Conflicting scope selectors, an empty key group, or a threshold
    /// outside `[1, n]`.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The entropy source failed while generating a data key, nonce, or
    /// Shamir coefficient.
    #[error("RNG failure: {0}")]
    RngFailure(String),

    /// A Shamir share was malformed (wrong length, zero-length secret).
    #[error("invalid share: {0}")]
    InvalidShare(String),

    /// Two or more Shamir shares presented for combination carry the same
    /// abscissa.
    #[error("duplicate share at abscissa {0}")]
    DuplicateShare(u8),

    /// An encrypted comment's ciphertext would itself match
    /// `unencrypted_comment_regex`, which would make decryption skip the
    /// comment and desync the MAC.
    #[error("selector trap: encrypted comment ciphertext matches the unencrypted-comment selector")]
    SelectorTrap,

    /// I/O failure from a format store.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Failure serializing or deserializing a structured document.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Unexpected internal failure that does not fit another category.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl CryptreeError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn invalid_structure(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn key_not_found(path: impl Into<String>) -> Self {
        Self::KeyNotFound(path.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Errors that indicate a transient condition worth retrying (I/O,
    /// entropy source hiccups). Everything else is a permanent failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CryptreeError::IoError(_) | CryptreeError::RngFailure(_))
    }

    /// Whether this error reflects a cryptographic integrity or
    /// confidentiality concern, as opposed to a structural/configuration one.
    pub fn is_security_error(&self) -> bool {
        matches!(
            self,
            CryptreeError::MacMismatch
                | CryptreeError::DecryptionFailed(_)
                | CryptreeError::SelectorTrap
                | CryptreeError::KeyServiceFailure { .. }
                | CryptreeError::InsufficientKeyGroups { .. }
        )
    }

    /// Stable category tag, distinct from the human-readable message, for
    /// surfacing layers that map errors to exit codes.
    pub fn category(&self) -> &'static str {
        match self {
            CryptreeError::MacMismatch => "integrity",
            CryptreeError::MetadataMissing => "metadata",
            CryptreeError::InsufficientKeyGroups { .. } => "key-groups",
            CryptreeError::KeyServiceFailure { .. } => "key-service",
            CryptreeError::DecryptionFailed(_) => "decryption",
            CryptreeError::MalformedCiphertext(_) => "ciphertext",
            CryptreeError::InvalidPath(_) => "path",
            CryptreeError::KeyNotFound(_) => "not-found",
            CryptreeError::InvalidStructure(_) => "structure",
            CryptreeError::InvalidConfiguration(_) => "configuration",
            CryptreeError::RngFailure(_) => "rng",
            CryptreeError::InvalidShare(_) => "shamir",
            CryptreeError::DuplicateShare(_) => "shamir",
            CryptreeError::SelectorTrap => "selector-trap",
            CryptreeError::IoError(_) => "io",
            CryptreeError::SerializationError(_) => "serialization",
            CryptreeError::InternalError(_) => "internal",
        }
    }
}

impl From<std::io::Error> for CryptreeError {
    fn from(err: std::io::Error) -> Self {
        CryptreeError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CryptreeError {
    fn from(err: serde_json::Error) -> Self {
        CryptreeError::SerializationError(err.to_string())
    }
}

// NOTE: YAML/TOML/dotenv/INI error conversions live in the infrastructure
// crate. Serialization format is an infrastructure concern; the domain only
// needs JSON for canonical descriptor structuring.
