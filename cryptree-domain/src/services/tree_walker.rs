// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Depth-first, order-preserving traversal and path-addressed access
//!.

use crate::entities::TreeBranch;
use crate::error::CryptreeError;
use crate::value_objects::{PathComponent, TreeKey, TreePath, TreeValue};

/// Per-leaf callback the walker drives. Implementations read the leaf's
/// current value, path, and the comments active in its enclosing frame, and
/// return its replacement — encrypting, decrypting, or passing through
/// unchanged, and accumulating a MAC on the side if they choose to.
pub trait ValueTransform {
    fn visit_leaf(
        &mut self,
        path: &TreePath,
        value: &TreeValue,
        active_comments: &[String],
        self_is_last_comment: bool,
    ) -> Result<TreeValue, CryptreeError>;
}

/// Stateless traversal and path-addressing operations over a [`TreeBranch`].
pub struct TreeWalker;

impl TreeWalker {
    /// Walks every leaf, in order, applying `transform`. `encrypt_walk` and
    /// `decrypt_walk` are the same traversal; direction lives entirely in
    /// the transform supplied by the caller.
    pub fn encrypt_walk(branch: &mut TreeBranch, transform: &mut dyn ValueTransform) -> Result<(), CryptreeError> {
        Self::walk_branch(branch, &TreePath::root(), transform)
    }

    pub fn decrypt_walk(branch: &mut TreeBranch, transform: &mut dyn ValueTransform) -> Result<(), CryptreeError> {
        Self::walk_branch(branch, &TreePath::root(), transform)
    }

    fn walk_branch(branch: &mut TreeBranch, path: &TreePath, transform: &mut dyn ValueTransform) -> Result<(), CryptreeError> {
        let mut active_comments: Vec<String> = Vec::new();
        let len = branch.items().len();
        for i in 0..len {
            if branch.items()[i].is_comment() {
                let text = match &branch.items()[i].value {
                    TreeValue::Comment(s) => s.clone(),
                    other => {
                        return Err(CryptreeError::invalid_structure(format!(
                            "comment key paired with non-comment value of type '{}'",
                            other.type_tag()
                        )))
                    }
                };
                active_comments.push(text);
                let current = branch.items()[i].value.clone();
                let replaced = transform.visit_leaf(path, &current, &active_comments, true)?;
                let TreeValue::Comment(new_text) = &replaced else {
                    return Err(CryptreeError::internal("comment transform must produce a comment"));
                };
                if let Some(last) = active_comments.last_mut() {
                    *last = new_text.clone();
                }
                let item = &mut branch.items_mut()[i];
                item.key = TreeKey::Comment(new_text.clone());
                item.value = replaced;
                continue;
            }

            let key = match &branch.items()[i].key {
                TreeKey::Str(s) => s.clone(),
                TreeKey::Comment(_) => unreachable!("comment items are handled above"),
            };
            let item_path = path.pushed_str(key);
            let snapshot = active_comments.clone();
            Self::walk_value(&mut branch.items_mut()[i].value, &item_path, &snapshot, transform)?;
            active_comments.clear();
        }
        Ok(())
    }

    fn walk_list(list: &mut [TreeValue], path: &TreePath, transform: &mut dyn ValueTransform) -> Result<(), CryptreeError> {
        let mut active_comments: Vec<String> = Vec::new();
        for (idx, element) in list.iter_mut().enumerate() {
            let item_path = path.pushed_index(idx);
            if let TreeValue::Comment(text) = element {
                active_comments.push(text.clone());
                let current = element.clone();
                let replaced = transform.visit_leaf(&item_path, &current, &active_comments, true)?;
                let TreeValue::Comment(new_text) = &replaced else {
                    return Err(CryptreeError::internal("comment transform must produce a comment"));
                };
                if let Some(last) = active_comments.last_mut() {
                    *last = new_text.clone();
                }
                *element = replaced;
                continue;
            }

            let snapshot = active_comments.clone();
            match element {
                TreeValue::Branch(branch) => Self::walk_branch(branch, &item_path, transform)?,
                TreeValue::List(nested) => Self::walk_list(nested, &item_path, transform)?,
                TreeValue::Null => {}
                leaf => {
                    let current = leaf.clone();
                    *leaf = transform.visit_leaf(&item_path, &current, &snapshot, false)?;
                }
            }
            active_comments.clear();
        }
        Ok(())
    }

    fn walk_value(
        value: &mut TreeValue,
        path: &TreePath,
        active_comments: &[String],
        transform: &mut dyn ValueTransform,
    ) -> Result<(), CryptreeError> {
        match value {
            TreeValue::Branch(branch) => Self::walk_branch(branch, path, transform),
            TreeValue::List(list) => Self::walk_list(list, path, transform),
            TreeValue::Null => Ok(()),
            leaf => {
                let current = leaf.clone();
                *leaf = transform.visit_leaf(path, &current, active_comments, false)?;
                Ok(())
            }
        }
    }

    /// Reads the value at `path`. The root path (empty) is invalid for
    /// `get`; use [`TreeWalker::truncate`] to read a whole branch.
    pub fn get<'a>(branch: &'a TreeBranch, path: &TreePath) -> Result<&'a TreeValue, CryptreeError> {
        let components = path.components();
        let (head, rest) = components
            .split_first()
            .ok_or_else(|| CryptreeError::invalid_path("path must not be empty"))?;
        let key = match head {
            PathComponent::Str(key) => key,
            PathComponent::Index(_) => return Err(CryptreeError::invalid_path("root is a branch, not a list")),
        };
        let item = branch
            .get(key)
            .ok_or_else(|| CryptreeError::key_not_found(path.to_string()))?;
        Self::navigate(&item.value, rest, path)
    }

    fn navigate<'a>(value: &'a TreeValue, components: &[PathComponent], full_path: &TreePath) -> Result<&'a TreeValue, CryptreeError> {
        let Some((head, rest)) = components.split_first() else {
            return Ok(value);
        };
        match (head, value) {
            (PathComponent::Str(key), TreeValue::Branch(branch)) => {
                let item = branch
                    .get(key)
                    .ok_or_else(|| CryptreeError::key_not_found(full_path.to_string()))?;
                Self::navigate(&item.value, rest, full_path)
            }
            (PathComponent::Index(i), TreeValue::List(list)) => {
                let element = list
                    .get(*i)
                    .ok_or_else(|| CryptreeError::invalid_path(format!("index {i} out of bounds")))?;
                Self::navigate(element, rest, full_path)
            }
            _ => Err(CryptreeError::invalid_path(format!(
                "path component type mismatch at '{full_path}'"
            ))),
        }
    }

    /// Returns the whole branch (empty path) or the subtree at `path`,
    /// cloned — the `extract` operation's underlying primitive.
    pub fn truncate(branch: &TreeBranch, path: &TreePath) -> Result<TreeValue, CryptreeError> {
        if path.is_empty() {
            return Ok(TreeValue::Branch(branch.clone()));
        }
        Self::get(branch, path).map(|v| v.clone())
    }

    /// Writes `value` at `path`, materializing intermediate branches/lists
    /// as needed. Returns whether the tree actually changed.
    pub fn set(branch: &mut TreeBranch, path: &TreePath, value: TreeValue) -> Result<bool, CryptreeError> {
        let components = path.components();
        if components.is_empty() {
            return Err(CryptreeError::invalid_path("path must not be empty for set"));
        }
        Self::set_in_branch(branch, components, value)
    }

    fn set_in_branch(branch: &mut TreeBranch, components: &[PathComponent], value: TreeValue) -> Result<bool, CryptreeError> {
        let key = match &components[0] {
            PathComponent::Str(s) => s.clone(),
            PathComponent::Index(_) => return Err(CryptreeError::invalid_path("a branch requires a string key")),
        };
        if components.len() == 1 {
            return Ok(branch.upsert(&key, value));
        }
        if branch.get(&key).is_none() {
            let child = Self::empty_container_for(&components[1]);
            branch.upsert(&key, child);
        }
        let item = branch.get_mut(&key).expect("just inserted or already present");
        Self::set_in_value(&mut item.value, &components[1..], value)
    }

    fn set_in_value(value: &mut TreeValue, components: &[PathComponent], new_value: TreeValue) -> Result<bool, CryptreeError> {
        match &components[0] {
            PathComponent::Str(_) => {
                let branch = value
                    .as_branch_mut()
                    .ok_or_else(|| CryptreeError::invalid_path("expected a branch at this position"))?;
                Self::set_in_branch(branch, components, new_value)
            }
            PathComponent::Index(i) => {
                let i = *i;
                let list = value
                    .as_list_mut()
                    .ok_or_else(|| CryptreeError::invalid_path("expected a list at this position"))?;
                if i > list.len() {
                    return Err(CryptreeError::invalid_path(format!("index {i} out of bounds")));
                }
                if components.len() == 1 {
                    if i == list.len() {
                        list.push(new_value);
                        return Ok(true);
                    }
                    let changed = list[i] != new_value;
                    list[i] = new_value;
                    return Ok(changed);
                }
                if i == list.len() {
                    list.push(Self::empty_container_for(&components[1]));
                }
                Self::set_in_value(&mut list[i], &components[1..], new_value)
            }
        }
    }

    fn empty_container_for(next: &PathComponent) -> TreeValue {
        match next {
            PathComponent::Str(_) => TreeValue::Branch(TreeBranch::new()),
            PathComponent::Index(_) => TreeValue::List(Vec::new()),
        }
    }

    /// Removes exactly one item at `path`, returning its value. Fails with
    /// `KeyNotFound` when the path addresses nothing.
    pub fn unset(branch: &mut TreeBranch, path: &TreePath) -> Result<TreeValue, CryptreeError> {
        let components = path.components();
        if components.is_empty() {
            return Err(CryptreeError::invalid_path("path must not be empty for unset"));
        }
        Self::unset_in_branch(branch, components, path)
    }

    fn unset_in_branch(branch: &mut TreeBranch, components: &[PathComponent], full_path: &TreePath) -> Result<TreeValue, CryptreeError> {
        let key = match &components[0] {
            PathComponent::Str(s) => s.clone(),
            PathComponent::Index(_) => return Err(CryptreeError::invalid_path("a branch requires a string key")),
        };
        if components.len() == 1 {
            return branch
                .remove(&key)
                .map(|item| item.value)
                .ok_or_else(|| CryptreeError::key_not_found(full_path.to_string()));
        }
        let item = branch
            .get_mut(&key)
            .ok_or_else(|| CryptreeError::key_not_found(full_path.to_string()))?;
        Self::unset_in_value(&mut item.value, &components[1..], full_path)
    }

    fn unset_in_value(value: &mut TreeValue, components: &[PathComponent], full_path: &TreePath) -> Result<TreeValue, CryptreeError> {
        match &components[0] {
            PathComponent::Str(_) => {
                let branch = value
                    .as_branch_mut()
                    .ok_or_else(|| CryptreeError::invalid_path("expected a branch at this position"))?;
                Self::unset_in_branch(branch, components, full_path)
            }
            PathComponent::Index(i) => {
                let i = *i;
                let list = value
                    .as_list_mut()
                    .ok_or_else(|| CryptreeError::invalid_path("expected a list at this position"))?;
                if i >= list.len() {
                    return Err(CryptreeError::key_not_found(full_path.to_string()));
                }
                if components.len() == 1 {
                    return Ok(list.remove(i));
                }
                Self::unset_in_value(&mut list[i], &components[1..], full_path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TreeItem;

    struct UppercaseStrings {
        visited: Vec<String>,
    }

    impl ValueTransform for UppercaseStrings {
        fn visit_leaf(
            &mut self,
            path: &TreePath,
            value: &TreeValue,
            _active_comments: &[String],
            _self_is_last_comment: bool,
        ) -> Result<TreeValue, CryptreeError> {
            match value {
                TreeValue::Comment(text) => {
                    self.visited.push(text.clone());
                    Ok(value.clone())
                }
                TreeValue::Str(s) => {
                    self.visited.push(path.to_string());
                    Ok(TreeValue::Str(s.to_uppercase()))
                }
                other => {
                    self.visited.push(path.to_string());
                    Ok(other.clone())
                }
            }
        }
    }

    fn sample_branch() -> TreeBranch {
        let mut inner = TreeBranch::new();
        inner.push(TreeItem::entry("city", TreeValue::Str("nyc".into())));

        let mut root = TreeBranch::new();
        root.push(TreeItem::comment(" top comment".to_string()));
        root.push(TreeItem::entry("name", TreeValue::Str("alice".into())));
        root.push(TreeItem::entry("address", TreeValue::Branch(inner)));
        root.push(TreeItem::entry(
            "tags",
            TreeValue::List(vec![TreeValue::Str("a".into()), TreeValue::Str("b".into())]),
        ));
        root
    }

    #[test]
    fn walk_visits_leaves_in_order_and_transforms() {
        let mut branch = sample_branch();
        let mut transform = UppercaseStrings { visited: Vec::new() };
        TreeWalker::encrypt_walk(&mut branch, &mut transform).unwrap();

        assert_eq!(
            transform.visited,
            vec![" top comment", "name:", "address:city:", "tags:0:", "tags:1:"]
        );
        assert_eq!(branch.get("name").unwrap().value, TreeValue::Str("ALICE".into()));
        let TreeValue::Branch(address) = &branch.get("address").unwrap().value else {
            panic!("expected branch");
        };
        assert_eq!(address.get("city").unwrap().value, TreeValue::Str("NYC".into()));
    }

    #[test]
    fn get_set_unset_path_addressing() {
        let mut branch = sample_branch();
        let path = TreePath::root().pushed_str("address").pushed_str("city");
        assert_eq!(*TreeWalker::get(&branch, &path).unwrap(), TreeValue::Str("nyc".into()));

        let changed = TreeWalker::set(&mut branch, &path, TreeValue::Str("sf".into())).unwrap();
        assert!(changed);
        let unchanged = TreeWalker::set(&mut branch, &path, TreeValue::Str("sf".into())).unwrap();
        assert!(!unchanged);

        let new_path = TreePath::root().pushed_str("address").pushed_str("zip");
        assert!(TreeWalker::set(&mut branch, &new_path, TreeValue::Str("10001".into())).unwrap());
        assert_eq!(*TreeWalker::get(&branch, &new_path).unwrap(), TreeValue::Str("10001".into()));

        let removed = TreeWalker::unset(&mut branch, &new_path).unwrap();
        assert_eq!(removed, TreeValue::Str("10001".into()));
        assert!(matches!(
            TreeWalker::unset(&mut branch, &new_path),
            Err(CryptreeError::KeyNotFound(_))
        ));
    }

    #[test]
    fn set_materializes_list_append() {
        let mut branch = sample_branch();
        let append_path = TreePath::root().pushed_str("tags").pushed_index(2);
        assert!(TreeWalker::set(&mut branch, &append_path, TreeValue::Str("c".into())).unwrap());
        let TreeValue::List(tags) = &branch.get("tags").unwrap().value else {
            panic!("expected list");
        };
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn comment_regex_trap_sees_full_frame_for_following_leaf() {
        struct RecordFrames(Vec<Vec<String>>);
        impl ValueTransform for RecordFrames {
            fn visit_leaf(
                &mut self,
                _path: &TreePath,
                value: &TreeValue,
                active_comments: &[String],
                _self_is_last_comment: bool,
            ) -> Result<TreeValue, CryptreeError> {
                self.0.push(active_comments.to_vec());
                Ok(value.clone())
            }
        }
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::comment("first".to_string()));
        branch.push(TreeItem::comment("second".to_string()));
        branch.push(TreeItem::entry("leaf", TreeValue::Str("v".into())));

        let mut recorder = RecordFrames(Vec::new());
        TreeWalker::encrypt_walk(&mut branch, &mut recorder).unwrap();

        assert_eq!(recorder.0[0], vec!["first".to_string()]);
        assert_eq!(recorder.0[1], vec!["first".to_string(), "second".to_string()]);
        assert_eq!(recorder.0[2], vec!["first".to_string(), "second".to_string()]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `set` at a single top-level key followed by `get` at the same
        /// path always returns the value just written.
        #[test]
        fn set_then_get_returns_same_value(
            key in "[a-z]{1,8}",
            value in ".*",
        ) {
            let mut branch = TreeBranch::new();
            let path = TreePath::root().pushed_str(key);
            TreeWalker::set(&mut branch, &path, TreeValue::Str(value.clone())).unwrap();
            prop_assert_eq!(TreeWalker::get(&branch, &path).unwrap().clone(), TreeValue::Str(value));
        }
    }
}
