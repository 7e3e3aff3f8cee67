// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `set`/`unset`/`extract` path-addressed operations, run against an
//! already-decrypted tree's primary branch.
//!
//! A dot-joined path string (`address.city`, `tags.0`) is the CLI-facing
//! form; numeric components address a list index, everything else a map
//! key.

use cryptree_domain::entities::Tree;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::TreeWalker;
use cryptree_domain::value_objects::{PathComponent, TreePath, TreeValue};

pub fn parse_path(raw: &str) -> TreePath {
    if raw.is_empty() {
        return TreePath::root();
    }
    let components = raw
        .split('.')
        .map(|part| match part.parse::<usize>() {
            Ok(index) => PathComponent::Index(index),
            Err(_) => PathComponent::Str(part.to_string()),
        })
        .collect();
    TreePath::from_components(components)
}

pub struct SetUseCase;

impl SetUseCase {
    /// Writes `value` at `raw_path`, materializing intermediate containers
    /// as needed. Returns whether the tree actually changed.
    pub fn execute(tree: &mut Tree, raw_path: &str, value: TreeValue) -> Result<bool, CryptreeError> {
        let path = parse_path(raw_path);
        let changed = TreeWalker::set(tree.branch_mut(), &path, value)?;
        if changed {
            tree.metadata.touch();
        }
        Ok(changed)
    }
}

pub struct UnsetUseCase;

impl UnsetUseCase {
    pub fn execute(tree: &mut Tree, raw_path: &str) -> Result<TreeValue, CryptreeError> {
        let path = parse_path(raw_path);
        let removed = TreeWalker::unset(tree.branch_mut(), &path)?;
        tree.metadata.touch();
        Ok(removed)
    }
}

pub struct ExtractUseCase;

impl ExtractUseCase {
    /// Reads the whole primary branch (empty path) or the subtree at
    /// `raw_path`, cloned.
    pub fn execute(tree: &Tree, raw_path: &str) -> Result<TreeValue, CryptreeError> {
        let path = parse_path(raw_path);
        TreeWalker::truncate(tree.branch(), &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptree_domain::entities::{Metadata, TreeBranch, TreeItem};
    use cryptree_domain::value_objects::KeyGroup;
    use chrono::Utc;
    use cryptree_domain::value_objects::MasterKeyDescriptor;

    fn sample_tree() -> Tree {
        let mut inner = TreeBranch::new();
        inner.push(TreeItem::entry("city", TreeValue::Str("nyc".into())));
        let mut root = TreeBranch::new();
        root.push(TreeItem::entry("address", TreeValue::Branch(inner)));
        let metadata = Metadata::new(vec![KeyGroup::new(vec![MasterKeyDescriptor::new("local", "k1", Utc::now())]).unwrap()], 1, "1.0").unwrap();
        Tree::single(root, metadata)
    }

    #[test]
    fn set_unset_extract_round_trip() {
        let mut tree = sample_tree();
        assert!(SetUseCase::execute(&mut tree, "address.zip", TreeValue::Str("10001".into())).unwrap());
        assert_eq!(
            ExtractUseCase::execute(&tree, "address.zip").unwrap(),
            TreeValue::Str("10001".into())
        );
        let removed = UnsetUseCase::execute(&mut tree, "address.zip").unwrap();
        assert_eq!(removed, TreeValue::Str("10001".into()));
        assert!(UnsetUseCase::execute(&mut tree, "address.zip").is_err());
    }

    #[test]
    fn parse_path_distinguishes_indices_from_keys() {
        let path = parse_path("tags.0.name");
        assert_eq!(
            path.components().to_vec(),
            vec![
                PathComponent::Str("tags".to_string()),
                PathComponent::Index(0),
                PathComponent::Str("name".to_string()),
            ]
        );
    }
}
