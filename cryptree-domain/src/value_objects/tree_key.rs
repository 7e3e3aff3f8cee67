// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The key half of a [`TreeItem`](crate::entities::TreeItem).

use std::fmt;

/// A map key or a comment marker occupying a key slot.
///
/// Keys are never encrypted (invariant I1), except that a `Comment` key's
/// wrapped text may itself be ciphertext once the comment has been
/// encrypted by the walker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeKey {
    /// An ordinary string label.
    Str(String),
    /// A comment line, stored as a first-class key so position is
    /// preserved deterministically alongside real entries.
    Comment(String),
}

impl TreeKey {
    pub fn as_str(&self) -> &str {
        match self {
            TreeKey::Str(s) => s,
            TreeKey::Comment(s) => s,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TreeKey::Comment(_))
    }
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
