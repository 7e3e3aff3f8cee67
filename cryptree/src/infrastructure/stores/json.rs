// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # JSON store
//!
//! JSON has no comment syntax, so loaded trees never carry `Comment` items
//! and the `*_comment_regex` scope selectors are meaningless against it
//!. The `sops` key at the top level carries metadata exactly as
//! in the YAML store, via the shared [`metadata_wire`](super::metadata_wire)
//! conversion.

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use cryptree_domain::entities::{Metadata, Tree, TreeBranch, TreeItem};
use cryptree_domain::error::CryptreeError;
use cryptree_domain::repositories::FormatStore;
use cryptree_domain::value_objects::TreeValue;

use super::metadata_wire::{metadata_from_value, metadata_to_value};

const SOPS_KEY: &str = "sops";

pub struct JsonStore;

impl JsonStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonStore {
    fn default() -> Self {
        Self::new()
    }
}

fn value_to_tree(value: &Value) -> Result<TreeValue, CryptreeError> {
    match value {
        Value::Null => Ok(TreeValue::Null),
        Value::Bool(b) => Ok(TreeValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(TreeValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(TreeValue::Float(f))
            } else {
                Err(CryptreeError::invalid_structure("number out of representable range"))
            }
        }
        Value::String(s) => Ok(TreeValue::Str(s.clone())),
        Value::Array(items) => {
            let converted = items.iter().map(value_to_tree).collect::<Result<Vec<_>, _>>()?;
            Ok(TreeValue::List(converted))
        }
        Value::Object(map) => {
            let mut branch = TreeBranch::new();
            for (k, v) in map {
                branch.push(TreeItem::entry(k.clone(), value_to_tree(v)?));
            }
            Ok(TreeValue::Branch(branch))
        }
    }
}

fn tree_to_value(value: &TreeValue) -> Result<Value, CryptreeError> {
    Ok(match value {
        TreeValue::Null => Value::Null,
        TreeValue::Bool(b) => Value::Bool(*b),
        TreeValue::Int(i) => Value::Number((*i).into()),
        TreeValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| CryptreeError::invalid_structure("non-finite float cannot be represented in JSON"))?,
        TreeValue::Str(s) => Value::String(s.clone()),
        TreeValue::Bytes(b) => Value::String(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)),
        TreeValue::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        TreeValue::Comment(_) => return Err(CryptreeError::invalid_structure("JSON cannot represent a comment item")),
        TreeValue::List(items) => Value::Array(items.iter().map(tree_to_value).collect::<Result<_, _>>()?),
        TreeValue::Branch(branch) => {
            let mut map = Map::new();
            for item in branch.items() {
                if item.is_comment() {
                    return Err(CryptreeError::invalid_structure("JSON cannot represent a comment item"));
                }
                map.insert(item.key.as_str().to_string(), tree_to_value(&item.value)?);
            }
            Value::Object(map)
        }
    })
}

#[async_trait]
impl FormatStore for JsonStore {
    fn format_tag(&self) -> &'static str {
        "json"
    }

    async fn load(&self, bytes: &[u8]) -> Result<Tree, CryptreeError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(CryptreeError::invalid_structure("top level of a JSON document must be an object"));
        };

        let sops = map
            .remove(SOPS_KEY)
            .ok_or(CryptreeError::MetadataMissing)?;
        let metadata = metadata_from_value(sops)?;

        let mut branch = TreeBranch::new();
        for (k, v) in map {
            branch.push(TreeItem::entry(k, value_to_tree(&v)?));
        }

        Ok(Tree::single(branch, metadata))
    }

    async fn save(&self, tree: &Tree) -> Result<Vec<u8>, CryptreeError> {
        let branch = tree.branch();
        let mut map = Map::new();
        for item in branch.items() {
            if item.is_comment() {
                return Err(CryptreeError::invalid_structure("JSON cannot represent a comment item"));
            }
            map.insert(item.key.as_str().to_string(), tree_to_value(&item.value)?);
        }
        map.insert(SOPS_KEY.to_string(), metadata_to_value(&tree.metadata)?);

        serde_json::to_vec_pretty(&Value::Object(map)).map_err(|e| CryptreeError::SerializationError(e.to_string()))
    }

    async fn load_new(&self, bytes: &[u8], metadata: Metadata) -> Result<Tree, CryptreeError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(CryptreeError::invalid_structure("top level of a JSON document must be an object"));
        };
        map.remove(SOPS_KEY);

        let mut branch = TreeBranch::new();
        for (k, v) in map {
            branch.push(TreeItem::entry(k, value_to_tree(&v)?));
        }

        Ok(Tree::single(branch, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cryptree_domain::entities::Metadata;
    use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor};

    fn sample_tree() -> Tree {
        let descriptor = MasterKeyDescriptor::new("local", "k1", Utc::now()).with_enc(vec![9, 9, 9]);
        let metadata = Metadata::new(vec![KeyGroup::new(vec![descriptor]).unwrap()], 1, "1.0").unwrap();
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry("username", TreeValue::Str("alice".into())));
        branch.push(TreeItem::entry("retries", TreeValue::Int(3)));
        Tree::single(branch, metadata)
    }

    #[tokio::test]
    async fn round_trips_a_document() {
        let store = JsonStore::new();
        let tree = sample_tree();
        let bytes = store.save(&tree).await.unwrap();
        let loaded = store.load(&bytes).await.unwrap();
        assert_eq!(loaded.branch().get("username").unwrap().value, TreeValue::Str("alice".into()));
        assert_eq!(loaded.metadata.key_groups[0].keys()[0].id, "k1");
    }

    #[tokio::test]
    async fn rejects_non_object_top_level() {
        let store = JsonStore::new();
        let err = store.load(b"[1, 2, 3]").await.unwrap_err();
        assert!(matches!(err, CryptreeError::InvalidStructure(_)));
    }

    #[tokio::test]
    async fn rejects_missing_metadata() {
        let store = JsonStore::new();
        let err = store.load(br#"{"a": 1}"#).await.unwrap_err();
        assert!(matches!(err, CryptreeError::MetadataMissing));
    }
}
