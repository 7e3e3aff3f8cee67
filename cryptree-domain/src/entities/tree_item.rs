// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A single (key, value) pair within a [`TreeBranch`](super::TreeBranch).

use crate::value_objects::{TreeKey, TreeValue};

/// One entry of an ordered branch. Map entries and standalone comments are
/// both `TreeItem`s so their relative order is preserved without a separate
/// side-channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    pub key: TreeKey,
    pub value: TreeValue,
}

impl TreeItem {
    pub fn new(key: TreeKey, value: TreeValue) -> Self {
        Self { key, value }
    }

    pub fn entry(key: impl Into<String>, value: TreeValue) -> Self {
        Self {
            key: TreeKey::Str(key.into()),
            value,
        }
    }

    /// A standalone or key-position comment: key and value both carry the
    /// same text, matching how the walker threads comments through the
    /// `commentsStack`.
    pub fn comment(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            key: TreeKey::Comment(text.clone()),
            value: TreeValue::Comment(text),
        }
    }

    pub fn is_comment(&self) -> bool {
        self.key.is_comment()
    }
}
