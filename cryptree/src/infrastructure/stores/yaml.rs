// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # YAML store
//!
//! `serde_yaml::Value::Mapping` preserves insertion order, so the key
//! ordering invariant comes for free from parsing. Comments do
//! not: YAML comments aren't part of `serde_yaml`'s data model at all, so
//! this store runs a line-oriented pass over the raw source associating
//! each comment with the key that immediately follows it (by dotted path),
//! and a second pass on save that re-interleaves those comments while
//! re-emitting scalars through `serde_yaml` for correct quoting.
//!
//! YAML anchors and aliases are rejected outright (spec's non-goals):
//! resolving them would let one ciphertext leaf alias another's plaintext,
//! silently breaking the per-value AAD binding.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;

use cryptree_domain::entities::{Metadata, Tree, TreeBranch, TreeItem};
use cryptree_domain::error::CryptreeError;
use cryptree_domain::repositories::FormatStore;
use cryptree_domain::value_objects::TreeValue;

use super::metadata_wire::{metadata_from_value, metadata_to_value};

const SOPS_KEY: &str = "sops";

pub struct YamlStore {
    anchor_alias_re: Regex,
    key_line_re: Regex,
}

impl YamlStore {
    pub fn new() -> Self {
        Self {
            anchor_alias_re: Regex::new(r"(^|[\s,\[{])[&*][A-Za-z0-9_.-]+").expect("static regex"),
            key_line_re: Regex::new(r"^(?P<indent>\s*)(?P<key>[^\s:#'\x22][^:]*):(\s+.*)?$").expect("static regex"),
        }
    }

    fn reject_anchors_and_aliases(&self, source: &str) -> Result<(), CryptreeError> {
        for line in source.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                continue;
            }
            // Crude quote stripping: anchors/aliases inside quoted scalars are
            // not real YAML anchors. Good enough for the common case without
            // a full tokenizer.
            let unquoted: String = line.chars().filter(|c| *c != '\'' && *c != '"').collect();
            if self.anchor_alias_re.is_match(&unquoted) {
                return Err(CryptreeError::invalid_structure(
                    "YAML anchors and aliases are not supported",
                ));
            }
        }
        Ok(())
    }

    /// Scans raw source for comment lines, associating each with the dotted
    /// path of the mapping key that follows it. Comments with no following
    /// key at the same or a shallower indent become trailing comments on
    /// the deepest path still open at end of file.
    fn scan_comments(&self, source: &str) -> (HashMap<String, Vec<String>>, HashMap<String, Vec<String>>) {
        let mut leading: HashMap<String, Vec<String>> = HashMap::new();
        let mut trailing: HashMap<String, Vec<String>> = HashMap::new();
        let mut stack: Vec<(usize, String)> = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for line in source.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('#') {
                pending.push(trimmed.to_string());
                continue;
            }
            if let Some(caps) = self.key_line_re.captures(line) {
                let indent = caps.name("indent").unwrap().as_str().len();
                let key = caps.name("key").unwrap().as_str().trim().to_string();
                while let Some((top_indent, _)) = stack.last() {
                    if *top_indent >= indent {
                        stack.pop();
                    } else {
                        break;
                    }
                }
                let path = path_for(&stack, &key);
                if !pending.is_empty() {
                    leading.insert(path.clone(), std::mem::take(&mut pending));
                }
                stack.push((indent, key));
            }
            // Sequence item lines ("- value") and anything else: comments
            // accumulated before them are not re-homed; they stay pending
            // until the next mapping key or end of file.
        }

        if !pending.is_empty() {
            let parent_path = if stack.is_empty() {
                String::new()
            } else {
                path_of(&stack[..stack.len() - 1])
            };
            trailing.entry(parent_path).or_default().extend(pending);
        }

        (leading, trailing)
    }
}

fn path_of(stack: &[(usize, String)]) -> String {
    stack.iter().map(|(_, k)| k.as_str()).collect::<Vec<_>>().join(".")
}

fn path_for(stack: &[(usize, String)], leaf: &str) -> String {
    let prefix = path_of(stack);
    if prefix.is_empty() {
        leaf.to_string()
    } else {
        format!("{prefix}.{leaf}")
    }
}

impl Default for YamlStore {
    fn default() -> Self {
        Self::new()
    }
}

fn value_to_tree(
    value: &serde_yaml::Value,
    path: &str,
    leading: &HashMap<String, Vec<String>>,
    trailing: &HashMap<String, Vec<String>>,
) -> Result<TreeValue, CryptreeError> {
    match value {
        serde_yaml::Value::Null => Ok(TreeValue::Null),
        serde_yaml::Value::Bool(b) => Ok(TreeValue::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(TreeValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(TreeValue::Float(f))
            } else {
                Err(CryptreeError::invalid_structure("number out of representable range"))
            }
        }
        serde_yaml::Value::String(s) => Ok(TreeValue::Str(s.clone())),
        serde_yaml::Value::Sequence(items) => {
            let converted = items
                .iter()
                .map(|item| value_to_tree(item, path, &HashMap::new(), &HashMap::new()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TreeValue::List(converted))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut branch = TreeBranch::new();
            for (k, v) in map {
                let serde_yaml::Value::String(key) = k else {
                    return Err(CryptreeError::invalid_structure("YAML mapping keys must be strings"));
                };
                let child_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                if let Some(comments) = leading.get(&child_path) {
                    for c in comments {
                        branch.push(TreeItem::comment(c.clone()));
                    }
                }
                branch.push(TreeItem::entry(key.clone(), value_to_tree(v, &child_path, leading, trailing)?));
            }
            if let Some(comments) = trailing.get(path) {
                for c in comments {
                    branch.push(TreeItem::comment(c.clone()));
                }
            }
            Ok(TreeValue::Branch(branch))
        }
        serde_yaml::Value::Tagged(_) => Err(CryptreeError::invalid_structure("YAML tagged values are not supported")),
    }
}

fn scalar_repr(value: &TreeValue) -> Result<String, CryptreeError> {
    let yaml_value = match value {
        TreeValue::Str(s) => serde_yaml::Value::String(s.clone()),
        TreeValue::Int(i) => serde_yaml::Value::Number((*i).into()),
        TreeValue::Float(f) => serde_yaml::Value::Number((*f).into()),
        TreeValue::Bool(b) => serde_yaml::Value::Bool(*b),
        TreeValue::Null => serde_yaml::Value::Null,
        TreeValue::Bytes(b) => serde_yaml::Value::String(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)),
        TreeValue::Timestamp(ts) => serde_yaml::Value::String(ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        other => return Err(CryptreeError::internal(format!("{} has no scalar representation", other.type_tag()))),
    };
    let rendered = serde_yaml::to_string(&yaml_value).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
    Ok(rendered.trim_end_matches('\n').to_string())
}

fn write_branch(branch: &TreeBranch, indent: usize, out: &mut String) -> Result<(), CryptreeError> {
    let pad = " ".repeat(indent);
    for item in branch.items() {
        if item.is_comment() {
            out.push_str(&pad);
            out.push_str(item.key.as_str());
            out.push('\n');
            continue;
        }
        let key = item.key.as_str();
        match &item.value {
            TreeValue::Branch(sub) if !sub.is_empty() => {
                out.push_str(&pad);
                out.push_str(key);
                out.push_str(":\n");
                write_branch(sub, indent + 2, out)?;
            }
            TreeValue::Branch(_) => {
                out.push_str(&pad);
                out.push_str(key);
                out.push_str(": {}\n");
            }
            TreeValue::List(items) => {
                out.push_str(&pad);
                out.push_str(key);
                out.push_str(":\n");
                for element in items {
                    out.push_str(&pad);
                    out.push_str("- ");
                    out.push_str(&scalar_repr(element)?);
                    out.push('\n');
                }
            }
            scalar => {
                out.push_str(&pad);
                out.push_str(key);
                out.push_str(": ");
                out.push_str(&scalar_repr(scalar)?);
                out.push('\n');
            }
        }
    }
    Ok(())
}

#[async_trait]
impl FormatStore for YamlStore {
    fn format_tag(&self) -> &'static str {
        "yaml"
    }

    async fn load(&self, bytes: &[u8]) -> Result<Tree, CryptreeError> {
        let source = std::str::from_utf8(bytes).map_err(|e| CryptreeError::SerializationError(format!("non-utf8 YAML: {e}")))?;
        self.reject_anchors_and_aliases(source)?;

        let value: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        let serde_yaml::Value::Mapping(mut map) = value else {
            return Err(CryptreeError::invalid_structure("top level of a YAML document must be a mapping"));
        };

        let sops_key = serde_yaml::Value::String(SOPS_KEY.to_string());
        let sops = map.remove(&sops_key).ok_or(CryptreeError::MetadataMissing)?;
        let sops_json: serde_json::Value =
            serde_json::to_value(sops).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        let metadata = metadata_from_value(sops_json)?;

        let (leading, trailing) = self.scan_comments(source);
        let mut branch = TreeBranch::new();
        for (k, v) in &map {
            let serde_yaml::Value::String(key) = k else {
                return Err(CryptreeError::invalid_structure("YAML mapping keys must be strings"));
            };
            if let Some(comments) = leading.get(key.as_str()) {
                for c in comments {
                    branch.push(TreeItem::comment(c.clone()));
                }
            }
            branch.push(TreeItem::entry(key.clone(), value_to_tree(v, key, &leading, &trailing)?));
        }
        if let Some(comments) = trailing.get("") {
            for c in comments {
                branch.push(TreeItem::comment(c.clone()));
            }
        }

        Ok(Tree::single(branch, metadata))
    }

    async fn save(&self, tree: &Tree) -> Result<Vec<u8>, CryptreeError> {
        let mut out = String::new();
        write_branch(tree.branch(), 0, &mut out)?;

        let sops_value = metadata_to_value(&tree.metadata)?;
        let sops_yaml: serde_yaml::Value =
            serde_json::from_value(sops_value).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        out.push_str("sops:\n");
        let rendered = serde_yaml::to_string(&sops_yaml).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        for line in rendered.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }

        Ok(out.into_bytes())
    }

    async fn load_new(&self, bytes: &[u8], metadata: Metadata) -> Result<Tree, CryptreeError> {
        let source = std::str::from_utf8(bytes).map_err(|e| CryptreeError::SerializationError(format!("non-utf8 YAML: {e}")))?;
        self.reject_anchors_and_aliases(source)?;

        let value: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        let mut map = match value {
            serde_yaml::Value::Mapping(map) => map,
            serde_yaml::Value::Null => serde_yaml::Mapping::new(),
            _ => return Err(CryptreeError::invalid_structure("top level of a YAML document must be a mapping")),
        };
        map.remove(serde_yaml::Value::String(SOPS_KEY.to_string()));

        let (leading, trailing) = self.scan_comments(source);
        let mut branch = TreeBranch::new();
        for (k, v) in &map {
            let serde_yaml::Value::String(key) = k else {
                return Err(CryptreeError::invalid_structure("YAML mapping keys must be strings"));
            };
            if let Some(comments) = leading.get(key.as_str()) {
                for c in comments {
                    branch.push(TreeItem::comment(c.clone()));
                }
            }
            branch.push(TreeItem::entry(key.clone(), value_to_tree(v, key, &leading, &trailing)?));
        }
        if let Some(comments) = trailing.get("") {
            for c in comments {
                branch.push(TreeItem::comment(c.clone()));
            }
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

    fn sample_metadata() -> Metadata {
        let descriptor = MasterKeyDescriptor::new("local", "k1", Utc::now()).with_enc(vec![1, 2, 3]);
        Metadata::new(vec![KeyGroup::new(vec![descriptor]).unwrap()], 1, "1.0").unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_document_with_comments() {
        let store = YamlStore::new();
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::comment("# database credentials".to_string()));
        branch.push(TreeItem::entry("username", TreeValue::Str("alice".into())));
        branch.push(TreeItem::entry("retries", TreeValue::Int(3)));
        let tree = Tree::single(branch, sample_metadata());

        let bytes = store.save(&tree).await.unwrap();
        let loaded = store.load(&bytes).await.unwrap();

        let items = loaded.branch().items();
        assert!(items.iter().any(|i| i.is_comment() && i.key.as_str() == "# database credentials"));
        assert_eq!(loaded.branch().get("username").unwrap().value, TreeValue::Str("alice".into()));
    }

    #[tokio::test]
    async fn rejects_anchors() {
        let store = YamlStore::new();
        let source = b"defaults: &defaults\n  retries: 3\nprod:\n  <<: *defaults\nsops:\n  mac: ''\n";
        let err = store.load(source).await.unwrap_err();
        assert!(matches!(err, CryptreeError::InvalidStructure(_)));
    }

    #[tokio::test]
    async fn rejects_non_mapping_top_level() {
        let store = YamlStore::new();
        let err = store.load(b"- 1\n- 2\n").await.unwrap_err();
        assert!(matches!(err, CryptreeError::InvalidStructure(_)));
    }

    #[tokio::test]
    async fn rejects_missing_metadata() {
        let store = YamlStore::new();
        let err = store.load(b"a: 1\n").await.unwrap_err();
        assert!(matches!(err, CryptreeError::MetadataMissing));
    }
}
