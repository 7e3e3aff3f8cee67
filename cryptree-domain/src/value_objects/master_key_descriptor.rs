// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The wire-level record a master key leaves behind in metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the core knows about one master key, opaque beyond the fields
/// named here: identifier, wrapped share bytes, creation timestamp,
/// and a stable type tag. Backend-specific identifiers (fingerprints, key
/// IDs, ARNs, recipients, ...) are carried verbatim in `extra` and
/// round-tripped without interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterKeyDescriptor {
    /// Stable backend tag, e.g. "age", "pgp", "kms", "gcp_kms", "hc_vault".
    pub type_tag: String,
    /// Identifier string the backend uses to find its own key material
    /// (fingerprint, key id, ARN, recipient, ...). Never the key itself.
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// The Shamir share (or, for a single key group, the full data key)
    /// wrapped by this master key. Backend-specific encoding (base64, PGP
    /// armor, ...) — the core treats it as an opaque byte string.
    pub enc: Vec<u8>,
    /// Backend-specific identifiers preserved verbatim across round-trips.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl MasterKeyDescriptor {
    pub fn new(type_tag: impl Into<String>, id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            type_tag: type_tag.into(),
            id: id.into(),
            created_at,
            enc: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_enc(mut self, enc: Vec<u8>) -> Self {
        self.enc = enc;
        self
    }
}
