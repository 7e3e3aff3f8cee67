// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata wire shape
//!
//! The `sops`-style block every structured store embeds under its top-level
//! `sops` key. One format-agnostic Serde type, shared by the
//! YAML, JSON, dotenv and INI stores: each converts its own document value
//! type to/from `serde_json::Value` for this sub-tree only (the bulk of the
//! document stays in the store's native representation).
//!
//! Accepts both the modern `key_groups` form and the legacy flat per-type
//! top-level lists (an implicit single key group) on load; always emits the
//! modern form, per the teacher's "loaders accept both, emitters may
//! standardize" note.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use cryptree_domain::entities::Metadata;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor, ScopeSelector};

const LEGACY_TYPE_TAGS: &[&str] = &["pgp", "age", "kms", "gcp_kms", "azure_kv", "hc_vault", "hc_kms", "local"];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DescriptorWire {
    created_at: String,
    enc: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

impl DescriptorWire {
    fn from_domain(d: &MasterKeyDescriptor) -> Self {
        Self {
            created_at: d.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            enc: BASE64.encode(&d.enc),
            id: d.id.clone(),
            extra: d.extra.clone(),
        }
    }

    fn into_domain(self, type_tag: &str) -> Result<MasterKeyDescriptor, CryptreeError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| CryptreeError::SerializationError(format!("bad created_at: {e}")))?
            .with_timezone(&Utc);
        let enc = BASE64
            .decode(&self.enc)
            .map_err(|e| CryptreeError::SerializationError(format!("bad enc base64: {e}")))?;
        Ok(MasterKeyDescriptor {
            type_tag: type_tag.to_string(),
            id: self.id,
            created_at,
            enc,
            extra: self.extra,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetadataWire {
    lastmodified: String,
    mac: String,
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unencrypted_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unencrypted_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unencrypted_comment_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted_comment_regex: Option<String>,
    #[serde(default)]
    mac_only_encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shamir_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_groups: Option<Vec<BTreeMap<String, Vec<DescriptorWire>>>>,
    /// Legacy flat per-type lists (single implicit key group), plus any
    /// backend-specific top-level field this core does not interpret.
    #[serde(flatten)]
    legacy_and_unrecognized: BTreeMap<String, serde_json::Value>,
}

/// Converts a domain [`Metadata`] into the `serde_json::Value` stored under
/// a structured document's `sops` key.
pub fn metadata_to_value(metadata: &Metadata) -> Result<serde_json::Value, CryptreeError> {
    let key_groups = metadata
        .key_groups
        .iter()
        .map(|group| {
            let mut by_type: BTreeMap<String, Vec<DescriptorWire>> = BTreeMap::new();
            for key in group.keys() {
                by_type.entry(key.type_tag.clone()).or_default().push(DescriptorWire::from_domain(key));
            }
            by_type
        })
        .collect();

    let mut unrecognized = BTreeMap::new();
    for (k, v) in &metadata.unrecognized {
        unrecognized.insert(k.clone(), serde_json::Value::String(v.clone()));
    }

    let (unencrypted_suffix, encrypted_suffix, unencrypted_regex, encrypted_regex, unencrypted_comment_regex, encrypted_comment_regex) =
        selector_fields(metadata.scope_selector.as_ref());

    let wire = MetadataWire {
        lastmodified: metadata.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        mac: metadata.mac.clone(),
        version: metadata.version.clone(),
        unencrypted_suffix,
        encrypted_suffix,
        unencrypted_regex,
        encrypted_regex,
        unencrypted_comment_regex,
        encrypted_comment_regex,
        mac_only_encrypted: metadata.mac_only_encrypted,
        shamir_threshold: Some(metadata.shamir_threshold),
        key_groups: Some(key_groups),
        legacy_and_unrecognized: unrecognized,
    };

    serde_json::to_value(wire).map_err(|e| CryptreeError::SerializationError(e.to_string()))
}

/// Reconstructs a domain [`Metadata`] from a loaded `sops` value. Errors
/// with [`CryptreeError::MetadataMissing`] via the caller when the key is
/// absent entirely (this function assumes the value was found).
pub fn metadata_from_value(value: serde_json::Value) -> Result<Metadata, CryptreeError> {
    let wire: MetadataWire = serde_json::from_value(value).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;

    let last_modified = DateTime::parse_from_rfc3339(&wire.lastmodified)
        .map_err(|e| CryptreeError::SerializationError(format!("bad lastmodified: {e}")))?
        .with_timezone(&Utc);

    let scope_selector = ScopeSelector::from_config_fields(
        wire.unencrypted_suffix,
        wire.encrypted_suffix,
        wire.unencrypted_regex,
        wire.encrypted_regex,
        wire.unencrypted_comment_regex,
        wire.encrypted_comment_regex,
    )?;

    let key_groups = if let Some(groups) = wire.key_groups {
        groups
            .into_iter()
            .map(|by_type| {
                let mut keys = Vec::new();
                for (type_tag, descriptors) in by_type {
                    for d in descriptors {
                        keys.push(d.into_domain(&type_tag)?);
                    }
                }
                KeyGroup::new(keys)
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        // Legacy: flat top-level per-type lists are one implicit key group.
        let mut keys = Vec::new();
        for tag in LEGACY_TYPE_TAGS {
            if let Some(value) = wire.legacy_and_unrecognized.get(*tag) {
                let descriptors: Vec<DescriptorWire> =
                    serde_json::from_value(value.clone()).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
                for d in descriptors {
                    keys.push(d.into_domain(tag)?);
                }
            }
        }
        if keys.is_empty() {
            vec![]
        } else {
            vec![KeyGroup::new(keys)?]
        }
    };

    let shamir_threshold = wire.shamir_threshold.unwrap_or(key_groups.len().max(1));

    let mut unrecognized = std::collections::BTreeMap::new();
    for (k, v) in &wire.legacy_and_unrecognized {
        if LEGACY_TYPE_TAGS.contains(&k.as_str()) {
            continue;
        }
        if let serde_json::Value::String(s) = v {
            unrecognized.insert(k.clone(), s.clone());
        }
    }

    if key_groups.is_empty() {
        return Err(CryptreeError::invalid_configuration("metadata block carries no key groups"));
    }

    let mut metadata = Metadata::new(key_groups, shamir_threshold, wire.version)?;
    metadata.last_modified = last_modified;
    metadata.scope_selector = scope_selector;
    metadata.mac = wire.mac;
    metadata.mac_only_encrypted = wire.mac_only_encrypted;
    metadata.unrecognized = unrecognized;
    Ok(metadata)
}

type SelectorFields = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn selector_fields(selector: Option<&ScopeSelector>) -> SelectorFields {
    match selector {
        None => (None, None, None, None, None, None),
        Some(ScopeSelector::UnencryptedSuffix(s)) => (Some(s.clone()), None, None, None, None, None),
        Some(ScopeSelector::EncryptedSuffix(s)) => (None, Some(s.clone()), None, None, None, None),
        Some(ScopeSelector::UnencryptedRegex(s)) => (None, None, Some(s.clone()), None, None, None),
        Some(ScopeSelector::EncryptedRegex(s)) => (None, None, None, Some(s.clone()), None, None),
        Some(ScopeSelector::UnencryptedCommentRegex(s)) => (None, None, None, None, Some(s.clone()), None),
        Some(ScopeSelector::EncryptedCommentRegex(s)) => (None, None, None, None, None, Some(s.clone())),
    }
}
