// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Binary store
//!
//! An arbitrary byte stream (a PEM file, a keystore, a TLS certificate)
//! has no internal structure for the tree model to walk, so the whole
//! input becomes a single `bytes` leaf under key `data`,
//! wrapped in a one-key JSON envelope alongside the `sops` metadata block
//! so the format is self-describing on disk.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use cryptree_domain::entities::{Metadata, Tree, TreeBranch, TreeItem};
use cryptree_domain::error::CryptreeError;
use cryptree_domain::repositories::FormatStore;
use cryptree_domain::value_objects::TreeValue;

use super::metadata_wire::{metadata_from_value, metadata_to_value};

const DATA_KEY: &str = "data";

#[derive(Serialize, Deserialize)]
struct Envelope {
    data: serde_json::Value,
    sops: serde_json::Value,
}

pub struct BinaryStore;

impl BinaryStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BinaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormatStore for BinaryStore {
    fn format_tag(&self) -> &'static str {
        "binary"
    }

    async fn load(&self, bytes: &[u8]) -> Result<Tree, CryptreeError> {
        let envelope: Envelope =
            serde_json::from_slice(bytes).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        let metadata = metadata_from_value(envelope.sops)?;

        let leaf = match envelope.data {
            serde_json::Value::String(s) => {
                // `ENC[...]` strings stay strings so the walker can recognize
                // already-encrypted leaves; anything else is the base64 form
                // of the original raw bytes.
                if s.starts_with("ENC[") && s.ends_with(']') {
                    TreeValue::Str(s)
                } else {
                    TreeValue::Bytes(BASE64.decode(&s).map_err(|e| CryptreeError::SerializationError(e.to_string()))?)
                }
            }
            other => return Err(CryptreeError::invalid_structure(format!("unexpected binary envelope shape: {other}"))),
        };

        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry(DATA_KEY, leaf));
        Ok(Tree::single(branch, metadata))
    }

    async fn save(&self, tree: &Tree) -> Result<Vec<u8>, CryptreeError> {
        let item = tree
            .branch()
            .get(DATA_KEY)
            .ok_or_else(|| CryptreeError::invalid_structure("binary document is missing its 'data' leaf"))?;

        let data = match &item.value {
            TreeValue::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
            TreeValue::Str(s) => serde_json::Value::String(s.clone()),
            other => return Err(CryptreeError::invalid_structure(format!("binary store cannot hold a {} leaf", other.type_tag()))),
        };

        let envelope = Envelope {
            data,
            sops: metadata_to_value(&tree.metadata)?,
        };
        serde_json::to_vec_pretty(&envelope).map_err(|e| CryptreeError::SerializationError(e.to_string()))
    }

    /// A brand-new binary document is just the raw input bytes — there is
    /// no envelope to strip, unlike the structured formats.
    async fn load_new(&self, bytes: &[u8], metadata: Metadata) -> Result<Tree, CryptreeError> {
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry(DATA_KEY, TreeValue::Bytes(bytes.to_vec())));
        Ok(Tree::single(branch, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cryptree_domain::entities::Metadata;
    use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor};

    fn sample_metadata() -> Metadata {
        let descriptor = MasterKeyDescriptor::new("local", "k1", Utc::now()).with_enc(vec![1]);
        Metadata::new(vec![KeyGroup::new(vec![descriptor]).unwrap()], 1, "1.0").unwrap()
    }

    #[tokio::test]
    async fn round_trips_raw_bytes() {
        let store = BinaryStore::new();
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry(DATA_KEY, TreeValue::Bytes(vec![0, 159, 146, 150, 255])));
        let tree = Tree::single(branch, sample_metadata());

        let bytes = store.save(&tree).await.unwrap();
        let loaded = store.load(&bytes).await.unwrap();
        assert_eq!(loaded.branch().get(DATA_KEY).unwrap().value, TreeValue::Bytes(vec![0, 159, 146, 150, 255]));
    }

    #[tokio::test]
    async fn preserves_already_encrypted_string_leaves() {
        let store = BinaryStore::new();
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry(DATA_KEY, TreeValue::Str("ENC[AES256_GCM,data:AA==,iv:AA==,tag:AA==,type:bytes]".into())));
        let tree = Tree::single(branch, sample_metadata());

        let bytes = store.save(&tree).await.unwrap();
        let loaded = store.load(&bytes).await.unwrap();
        assert!(matches!(loaded.branch().get(DATA_KEY).unwrap().value, TreeValue::Str(_)));
    }
}
