// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The out-of-band record that travels alongside a [`Tree`](super::Tree).

use chrono::{DateTime, Utc};

use crate::error::CryptreeError;
use crate::value_objects::{DataKey, KeyGroup, ScopeSelector};

/// Carries everything needed to interpret and re-encrypt a tree: which
/// selector governs scope, the encrypted MAC, the key groups, the Shamir
/// threshold, and (while the tree is open) the recovered data key.
///
/// Construction happens two ways: fresh, from a creation-rule configuration
/// (a brand new file), or loaded verbatim from an already-encrypted file's
/// `sops`-style block. The cached data key is never serialized; it is
/// populated by a successful decrypt or generation and lives only for the
/// duration of one encrypt/decrypt call.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub last_modified: DateTime<Utc>,
    pub scope_selector: Option<ScopeSelector>,
    /// The AEAD-encrypted, uppercase-hex SHA-512 MAC. Empty until the first
    /// successful encrypt.
    pub mac: String,
    pub mac_only_encrypted: bool,
    pub version: String,
    pub key_groups: Vec<KeyGroup>,
    pub shamir_threshold: usize,
    /// Backend-specific top-level fields this core does not interpret, kept
    /// so round-tripping does not silently drop them.
    pub unrecognized: std::collections::BTreeMap<String, String>,

    data_key: Option<DataKey>,
}

impl Metadata {
    pub fn new(key_groups: Vec<KeyGroup>, shamir_threshold: usize, version: impl Into<String>) -> Result<Self, CryptreeError> {
        Self::validate_groups_and_threshold(&key_groups, shamir_threshold)?;
        Ok(Self {
            last_modified: Utc::now(),
            scope_selector: None,
            mac: String::new(),
            mac_only_encrypted: false,
            version: version.into(),
            key_groups,
            shamir_threshold,
            unrecognized: Default::default(),
            data_key: None,
        })
    }

    pub fn validate_groups_and_threshold(key_groups: &[KeyGroup], threshold: usize) -> Result<(), CryptreeError> {
        if key_groups.is_empty() {
            return Err(CryptreeError::invalid_configuration(
                "encryption with zero key groups is rejected",
            ));
        }
        for group in key_groups {
            if group.is_empty() {
                return Err(CryptreeError::invalid_configuration("a key group may not be empty"));
            }
        }
        let n = key_groups.len();
        if threshold < 1 || threshold > n {
            return Err(CryptreeError::invalid_configuration(format!(
                "shamir threshold {threshold} must satisfy 1 <= t <= {n}"
            )));
        }
        Ok(())
    }

    pub fn effective_selector(&self) -> ScopeSelector {
        self.scope_selector.clone().unwrap_or_else(ScopeSelector::default_selector)
    }

    pub fn data_key(&self) -> Option<&DataKey> {
        self.data_key.as_ref()
    }

    pub fn set_data_key(&mut self, key: DataKey) {
        self.data_key = Some(key);
    }

    pub fn take_data_key(&mut self) -> Option<DataKey> {
        self.data_key.take()
    }

    pub fn wipe_data_key(&mut self) {
        self.data_key = None;
    }

    pub fn uses_shamir(&self) -> bool {
        self.key_groups.len() >= 2
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}
