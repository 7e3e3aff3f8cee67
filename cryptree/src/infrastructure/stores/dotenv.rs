// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # dotenv store
//!
//! `.env` files have no nesting and no typed scalars: every value is a
//! string leaf. A blank line is preserved as an empty comment
//! item so round-tripping a file with deliberate paragraph breaks does not
//! silently compact it; `#`-prefixed lines are ordinary comments. The
//! metadata block has nowhere structural to live, so it is carried as one
//! reserved `SOPS_METADATA` assignment holding the JSON-encoded block,
//! always written last.
//!
//! No crate in the dependency graph parses dotenv files into a structured,
//! order-preserving, comment-aware form (`dotenvy` only loads variables
//! into the process environment), so parsing here is hand-rolled.

use async_trait::async_trait;
use regex::Regex;

use cryptree_domain::entities::{Metadata, Tree, TreeBranch, TreeItem};
use cryptree_domain::error::CryptreeError;
use cryptree_domain::repositories::FormatStore;
use cryptree_domain::value_objects::TreeValue;

use super::metadata_wire::{metadata_from_value, metadata_to_value};

const SOPS_KEY: &str = "SOPS_METADATA";

pub struct DotenvStore {
    assignment_re: Regex,
}

impl DotenvStore {
    pub fn new() -> Self {
        Self {
            assignment_re: Regex::new(r"^(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("static regex"),
        }
    }

    fn parse_value(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.len() >= 2 {
            let bytes = trimmed.as_bytes();
            let quote = bytes[0];
            if (quote == b'"' || quote == b'\'') && bytes[trimmed.len() - 1] == quote {
                let inner = &trimmed[1..trimmed.len() - 1];
                if quote == b'"' {
                    return unescape_double_quoted(inner);
                }
                return inner.to_string();
            }
        }
        trimmed.to_string()
    }
}

fn unescape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '#' || c == '\'')
}

fn quote_value(value: &str) -> String {
    if !needs_quoting(value) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{escaped}\"")
}

fn value_to_display(value: &TreeValue) -> Result<String, CryptreeError> {
    Ok(match value {
        TreeValue::Str(s) => s.clone(),
        TreeValue::Int(i) => i.to_string(),
        TreeValue::Float(f) => f.to_string(),
        TreeValue::Bool(b) => b.to_string(),
        TreeValue::Null => String::new(),
        TreeValue::Bytes(b) => base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b),
        TreeValue::Timestamp(ts) => ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        other => {
            return Err(CryptreeError::invalid_structure(format!(
                "dotenv cannot represent a {} value",
                other.type_tag()
            )))
        }
    })
}

impl Default for DotenvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormatStore for DotenvStore {
    fn format_tag(&self) -> &'static str {
        "dotenv"
    }

    async fn load(&self, bytes: &[u8]) -> Result<Tree, CryptreeError> {
        let source = std::str::from_utf8(bytes).map_err(|e| CryptreeError::SerializationError(format!("non-utf8 dotenv: {e}")))?;

        let mut branch = TreeBranch::new();
        let mut metadata = None;

        for line in source.lines() {
            if line.trim().is_empty() {
                branch.push(TreeItem::comment(String::new()));
                continue;
            }
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                branch.push(TreeItem::comment(trimmed.to_string()));
                continue;
            }
            let Some(caps) = self.assignment_re.captures(line) else {
                return Err(CryptreeError::invalid_structure(format!("malformed dotenv line: '{line}'")));
            };
            let key = caps.get(1).unwrap().as_str();
            let value = self.parse_value(caps.get(2).unwrap().as_str());

            if key == SOPS_KEY {
                let json: serde_json::Value =
                    serde_json::from_str(&value).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
                metadata = Some(metadata_from_value(json)?);
                continue;
            }
            branch.push(TreeItem::entry(key, TreeValue::Str(value)));
        }

        let metadata = metadata.ok_or(CryptreeError::MetadataMissing)?;
        Ok(Tree::single(branch, metadata))
    }

    async fn save(&self, tree: &Tree) -> Result<Vec<u8>, CryptreeError> {
        let mut out = String::new();
        for item in tree.branch().items() {
            if item.is_comment() {
                let text = item.key.as_str();
                if text.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(text);
                    out.push('\n');
                }
                continue;
            }
            let value = value_to_display(&item.value)?;
            out.push_str(item.key.as_str());
            out.push('=');
            out.push_str(&quote_value(&value));
            out.push('\n');
        }

        let metadata_json = metadata_to_value(&tree.metadata)?;
        let metadata_str = serde_json::to_string(&metadata_json).map_err(|e| CryptreeError::SerializationError(e.to_string()))?;
        out.push_str(SOPS_KEY);
        out.push('=');
        out.push_str(&quote_value(&metadata_str));
        out.push('\n');

        Ok(out.into_bytes())
    }

    async fn load_new(&self, bytes: &[u8], metadata: Metadata) -> Result<Tree, CryptreeError> {
        let source = std::str::from_utf8(bytes).map_err(|e| CryptreeError::SerializationError(format!("non-utf8 dotenv: {e}")))?;

        let mut branch = TreeBranch::new();
        for line in source.lines() {
            if line.trim().is_empty() {
                branch.push(TreeItem::comment(String::new()));
                continue;
            }
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                branch.push(TreeItem::comment(trimmed.to_string()));
                continue;
            }
            let Some(caps) = self.assignment_re.captures(line) else {
                return Err(CryptreeError::invalid_structure(format!("malformed dotenv line: '{line}'")));
            };
            let key = caps.get(1).unwrap().as_str();
            if key == SOPS_KEY {
                continue;
            }
            let value = self.parse_value(caps.get(2).unwrap().as_str());
            branch.push(TreeItem::entry(key, TreeValue::Str(value)));
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
        let descriptor = MasterKeyDescriptor::new("local", "k1", Utc::now()).with_enc(vec![4, 5, 6]);
        Metadata::new(vec![KeyGroup::new(vec![descriptor]).unwrap()], 1, "1.0").unwrap()
    }

    #[tokio::test]
    async fn round_trips_with_comments_and_blank_lines() {
        let store = DotenvStore::new();
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::comment("# database credentials".to_string()));
        branch.push(TreeItem::entry("DB_USER", TreeValue::Str("alice".into())));
        branch.push(TreeItem::comment(String::new()));
        branch.push(TreeItem::entry("DB_PASSWORD", TreeValue::Str("hunter 2".into())));
        let tree = Tree::single(branch, sample_metadata());

        let bytes = store.save(&tree).await.unwrap();
        let loaded = store.load(&bytes).await.unwrap();

        let items = loaded.branch().items();
        assert!(items.iter().any(|i| i.is_comment() && i.key.as_str() == "# database credentials"));
        assert!(items.iter().any(|i| i.is_comment() && i.key.as_str().is_empty()));
        assert_eq!(loaded.branch().get("DB_USER").unwrap().value, TreeValue::Str("alice".into()));
        assert_eq!(loaded.branch().get("DB_PASSWORD").unwrap().value, TreeValue::Str("hunter 2".into()));
    }

    #[tokio::test]
    async fn rejects_missing_metadata() {
        let store = DotenvStore::new();
        let err = store.load(b"FOO=bar\n").await.unwrap_err();
        assert!(matches!(err, CryptreeError::MetadataMissing));
    }

    #[tokio::test]
    async fn rejects_malformed_line() {
        let store = DotenvStore::new();
        let err = store.load(b"not an assignment\n").await.unwrap_err();
        assert!(matches!(err, CryptreeError::InvalidStructure(_)));
    }
}
