// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Creation rules
//!
//! The rule file that tells the core how to build [`Metadata`] for a brand
//! new document: which scope selector governs it, its key groups and Shamir
//! threshold. Loaded with the `config` crate layered over a YAML document,
//! the same way the teacher layers its environment configuration.
//!
//! A freshly loaded [`CreationRules`] names master keys by `type_tag`/`id`
//! only; each descriptor's `enc` is populated later, once the application
//! layer has generated a data key and wrapped it (or its Shamir shares)
//! through the key service.

use std::path::Path;

use chrono::Utc;
use config::{Config, File};
use serde::Deserialize;

use cryptree_domain::entities::Metadata;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor, ScopeSelector};

/// One master key a key group should be wrapped under: a backend tag and
/// the identifier that backend uses to find its own key material.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterKeyRule {
    pub type_tag: String,
    pub id: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Deserialized shape of the rule file.
#[derive(Debug, Clone, Deserialize)]
pub struct CreationRules {
    #[serde(default)]
    pub unencrypted_suffix: Option<String>,
    #[serde(default)]
    pub encrypted_suffix: Option<String>,
    #[serde(default)]
    pub unencrypted_regex: Option<String>,
    #[serde(default)]
    pub encrypted_regex: Option<String>,
    #[serde(default)]
    pub unencrypted_comment_regex: Option<String>,
    #[serde(default)]
    pub encrypted_comment_regex: Option<String>,
    #[serde(default)]
    pub mac_only_encrypted: bool,
    pub shamir_threshold: usize,
    pub key_groups: Vec<Vec<MasterKeyRule>>,
    #[serde(default = "default_version")]
    pub version: String,
}

impl CreationRules {
    pub fn load(path: &Path) -> Result<Self, CryptreeError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .build()
            .map_err(|e| CryptreeError::invalid_configuration(format!("failed to read creation rules at {}: {e}", path.display())))?;
        settings
            .try_deserialize()
            .map_err(|e| CryptreeError::invalid_configuration(format!("malformed creation rules: {e}")))
    }

    /// Builds fresh [`Metadata`] for a new document: one [`KeyGroup`] per
    /// configured group, the configured Shamir threshold, and the single
    /// scope selector these rules name (validated to be at most one,
    /// per [`ScopeSelector::from_config_fields`]).
    pub fn new_metadata(&self) -> Result<Metadata, CryptreeError> {
        let key_groups = self
            .key_groups
            .iter()
            .map(|group| {
                let descriptors = group
                    .iter()
                    .map(|rule| MasterKeyDescriptor::new(rule.type_tag.clone(), rule.id.clone(), Utc::now()))
                    .collect();
                KeyGroup::new(descriptors)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut metadata = Metadata::new(key_groups, self.shamir_threshold, self.version.clone())?;
        metadata.scope_selector = ScopeSelector::from_config_fields(
            self.unencrypted_suffix.clone(),
            self.encrypted_suffix.clone(),
            self.unencrypted_regex.clone(),
            self.encrypted_regex.clone(),
            self.unencrypted_comment_regex.clone(),
            self.encrypted_comment_regex.clone(),
        )?;
        metadata.mac_only_encrypted = self.mac_only_encrypted;
        Ok(metadata)
    }
}
