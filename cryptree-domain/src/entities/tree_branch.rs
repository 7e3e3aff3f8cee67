// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! An ordered sequence of [`TreeItem`]s.

use crate::entities::TreeItem;
use crate::value_objects::TreeKey;

/// An ordered map-like container. Stored as a `Vec` rather than an
/// associative container so that Comment keys, duplicate-looking keys, and
/// insertion order all survive round-tripping — ordering is part of the
/// authenticated data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeBranch(pub Vec<TreeItem>);

impl TreeBranch {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.0
    }

    pub fn items_mut(&mut self) -> &mut Vec<TreeItem> {
        &mut self.0
    }

    pub fn push(&mut self, item: TreeItem) {
        self.0.push(item);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finds the index of the first non-comment item with the given string
    /// key. Lookup is a linear scan, matching the sequence-not-map
    /// representation.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|item| !item.is_comment() && item.key.as_str() == key)
    }

    pub fn get(&self, key: &str) -> Option<&TreeItem> {
        self.index_of(key).map(|i| &self.0[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TreeItem> {
        if let Some(i) = self.index_of(key) {
            Some(&mut self.0[i])
        } else {
            None
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<TreeItem> {
        self.index_of(key).map(|i| self.0.remove(i))
    }

    /// Inserts or replaces the value for `key`, preserving position on
    /// replace and appending on insert. Returns whether the tree actually
    /// changed (the `set` idempotence signal at the walker layer).
    pub fn upsert(&mut self, key: &str, value: crate::value_objects::TreeValue) -> bool {
        if let Some(i) = self.index_of(key) {
            if self.0[i].value == value {
                false
            } else {
                self.0[i].value = value;
                true
            }
        } else {
            self.0.push(TreeItem::new(TreeKey::Str(key.to_string()), value));
            true
        }
    }
}
