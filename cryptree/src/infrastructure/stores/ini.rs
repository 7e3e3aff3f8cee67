// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # INI store
//!
//! `[section]` headers become first-level branch keys holding a nested
//! branch of their own key/value pairs; keys that appear before any
//! section header live at the top level under a reserved default-section
//! name, `__default__`. Both `;` and `#` introduce a comment.
//!
//! No crate in the dependency graph gives us an order-preserving,
//! comment-aware INI parser, so this is hand-rolled, mirroring the
//! dotenv store's approach.

use async_trait::async_trait;
use regex::Regex;

use cryptree_domain::entities::{Metadata, Tree, TreeBranch, TreeItem};
use cryptree_domain::error::CryptreeError;
use cryptree_domain::repositories::FormatStore;
use cryptree_domain::value_objects::TreeValue;

use super::metadata_wire::{metadata_from_value, metadata_to_value};

const SOPS_SECTION: &str = "sops";
const DEFAULT_SECTION: &str = "__default__";

pub struct IniStore {
    section_re: Regex,
    assignment_re: Regex,
}

impl IniStore {
    pub fn new() -> Self {
        Self {
            section_re: Regex::new(r"^\[(?P<name>[^\]]+)\]\s*$").expect("static regex"),
            assignment_re: Regex::new(r"^(?P<key>[^=;#]+?)\s*=\s*(?P<value>.*)$").expect("static regex"),
        }
    }
}

impl Default for IniStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with(';') || trimmed.starts_with('#')
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
                "INI cannot represent a {} value",
                other.type_tag()
            )))
        }
    })
}

fn write_section(name: Option<&str>, branch: &TreeBranch, out: &mut String) -> Result<(), CryptreeError> {
    if let Some(name) = name {
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");
    }
    for item in branch.items() {
        if item.is_comment() {
            out.push_str(item.key.as_str());
            out.push('\n');
            continue;
        }
        out.push_str(item.key.as_str());
        out.push_str(" = ");
        out.push_str(&value_to_display(&item.value)?);
        out.push('\n');
    }
    Ok(())
}

fn parse_scalar(raw: &str) -> serde_json::Value {
    if raw == "true" {
        return serde_json::Value::Bool(true);
    }
    if raw == "false" {
        return serde_json::Value::Bool(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return serde_json::Value::Number(i.into());
    }
    // key_groups (and anything else the sops section serializes as a nested
    // structure) round-trips through a scalar INI line as inline JSON.
    if raw.starts_with('[') || raw.starts_with('{') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    serde_json::Value::String(raw.to_string())
}

fn scalar_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl FormatStore for IniStore {
    fn format_tag(&self) -> &'static str {
        "ini"
    }

    async fn load(&self, bytes: &[u8]) -> Result<Tree, CryptreeError> {
        let source = std::str::from_utf8(bytes).map_err(|e| CryptreeError::SerializationError(format!("non-utf8 INI: {e}")))?;

        // sections[0] is the implicit default (unheaded) section.
        let mut sections: Vec<(Option<String>, TreeBranch)> = vec![(None, TreeBranch::new())];
        let mut current = 0usize;
        let mut in_sops = false;
        let mut sops_branch = TreeBranch::new();

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !in_sops {
                    sections[current].1.push(TreeItem::comment(String::new()));
                }
                continue;
            }
            if is_comment_line(trimmed) {
                if !in_sops {
                    sections[current].1.push(TreeItem::comment(trimmed.to_string()));
                }
                continue;
            }
            if let Some(caps) = self.section_re.captures(trimmed) {
                let name = caps.name("name").unwrap().as_str().to_string();
                if name.eq_ignore_ascii_case(SOPS_SECTION) {
                    in_sops = true;
                    continue;
                }
                in_sops = false;
                sections.push((Some(name), TreeBranch::new()));
                current = sections.len() - 1;
                continue;
            }
            let Some(caps) = self.assignment_re.captures(trimmed) else {
                return Err(CryptreeError::invalid_structure(format!("malformed INI line: '{line}'")));
            };
            let key = caps.name("key").unwrap().as_str().trim().to_string();
            let value = caps.name("value").unwrap().as_str().trim().to_string();

            if in_sops {
                sops_branch.push(TreeItem::entry(key, TreeValue::Str(value)));
            } else {
                sections[current].1.push(TreeItem::entry(key, TreeValue::Str(value)));
            }
        }

        let mut sops_json = serde_json::Map::new();
        for item in sops_branch.items() {
            if let TreeValue::Str(s) = &item.value {
                sops_json.insert(item.key.as_str().to_string(), parse_scalar(s));
            }
        }
        if sops_json.is_empty() {
            return Err(CryptreeError::MetadataMissing);
        }
        let metadata = metadata_from_value(serde_json::Value::Object(sops_json))?;

        let mut root = TreeBranch::new();
        for (name, branch) in sections {
            match name {
                None if !branch.is_empty() => root.push(TreeItem::entry(DEFAULT_SECTION, TreeValue::Branch(branch))),
                None => {}
                Some(name) => root.push(TreeItem::entry(name, TreeValue::Branch(branch))),
            }
        }

        Ok(Tree::single(root, metadata))
    }

    async fn save(&self, tree: &Tree) -> Result<Vec<u8>, CryptreeError> {
        let mut out = String::new();

        for item in tree.branch().items() {
            if item.is_comment() {
                return Err(CryptreeError::invalid_structure("INI top level may only hold sections"));
            }
            let TreeValue::Branch(sub) = &item.value else {
                return Err(CryptreeError::invalid_structure("INI top level may only hold sections"));
            };
            if item.key.as_str() == DEFAULT_SECTION {
                write_section(None, sub, &mut out)?;
            } else {
                write_section(Some(item.key.as_str()), sub, &mut out)?;
            }
        }

        out.push('[');
        out.push_str(SOPS_SECTION);
        out.push_str("]\n");
        let metadata_value = metadata_to_value(&tree.metadata)?;
        if let serde_json::Value::Object(map) = metadata_value {
            for (k, v) in map {
                out.push_str(&k);
                out.push_str(" = ");
                out.push_str(&scalar_display(&v));
                out.push('\n');
            }
        }

        Ok(out.into_bytes())
    }

    async fn load_new(&self, bytes: &[u8], metadata: Metadata) -> Result<Tree, CryptreeError> {
        let source = std::str::from_utf8(bytes).map_err(|e| CryptreeError::SerializationError(format!("non-utf8 INI: {e}")))?;

        let mut sections: Vec<(Option<String>, TreeBranch)> = vec![(None, TreeBranch::new())];
        let mut current = 0usize;
        let mut in_sops = false;

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if !in_sops {
                    sections[current].1.push(TreeItem::comment(String::new()));
                }
                continue;
            }
            if is_comment_line(trimmed) {
                if !in_sops {
                    sections[current].1.push(TreeItem::comment(trimmed.to_string()));
                }
                continue;
            }
            if let Some(caps) = self.section_re.captures(trimmed) {
                let name = caps.name("name").unwrap().as_str().to_string();
                if name.eq_ignore_ascii_case(SOPS_SECTION) {
                    in_sops = true;
                    continue;
                }
                in_sops = false;
                sections.push((Some(name), TreeBranch::new()));
                current = sections.len() - 1;
                continue;
            }
            let Some(caps) = self.assignment_re.captures(trimmed) else {
                return Err(CryptreeError::invalid_structure(format!("malformed INI line: '{line}'")));
            };
            if in_sops {
                continue;
            }
            let key = caps.name("key").unwrap().as_str().trim().to_string();
            let value = caps.name("value").unwrap().as_str().trim().to_string();
            sections[current].1.push(TreeItem::entry(key, TreeValue::Str(value)));
        }

        let mut root = TreeBranch::new();
        for (name, branch) in sections {
            match name {
                None if !branch.is_empty() => root.push(TreeItem::entry(DEFAULT_SECTION, TreeValue::Branch(branch))),
                None => {}
                Some(name) => root.push(TreeItem::entry(name, TreeValue::Branch(branch))),
            }
        }

        Ok(Tree::single(root, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cryptree_domain::entities::Metadata;
    use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor};

    fn sample_metadata() -> Metadata {
        let descriptor = MasterKeyDescriptor::new("local", "k1", Utc::now()).with_enc(vec![7, 8, 9]);
        Metadata::new(vec![KeyGroup::new(vec![descriptor]).unwrap()], 1, "1.0").unwrap()
    }

    #[tokio::test]
    async fn round_trips_sections_and_default_keys() {
        let store = IniStore::new();
        let mut root = TreeBranch::new();

        let mut default_branch = TreeBranch::new();
        default_branch.push(TreeItem::comment("; top-level notes".to_string()));
        default_branch.push(TreeItem::entry("debug", TreeValue::Str("true".into())));
        root.push(TreeItem::entry(DEFAULT_SECTION, TreeValue::Branch(default_branch)));

        let mut db_section = TreeBranch::new();
        db_section.push(TreeItem::entry("host", TreeValue::Str("localhost".into())));
        db_section.push(TreeItem::entry("password", TreeValue::Str("hunter2".into())));
        root.push(TreeItem::entry("database", TreeValue::Branch(db_section)));

        let tree = Tree::single(root, sample_metadata());
        let bytes = store.save(&tree).await.unwrap();
        let loaded = store.load(&bytes).await.unwrap();

        let default = loaded.branch().get(DEFAULT_SECTION).unwrap().value.as_branch().unwrap();
        assert_eq!(default.get("debug").unwrap().value, TreeValue::Str("true".into()));
        let db = loaded.branch().get("database").unwrap().value.as_branch().unwrap();
        assert_eq!(db.get("host").unwrap().value, TreeValue::Str("localhost".into()));
        assert_eq!(loaded.metadata.key_groups[0].keys()[0].id, "k1");
    }

    #[tokio::test]
    async fn rejects_missing_metadata() {
        let store = IniStore::new();
        let err = store.load(b"[database]\nhost=localhost\n").await.unwrap_err();
        assert!(matches!(err, CryptreeError::MetadataMissing));
    }
}
