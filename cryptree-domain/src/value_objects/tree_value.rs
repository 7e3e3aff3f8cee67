// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The value half of a [`TreeItem`](crate::entities::TreeItem).

use chrono::{DateTime, Utc};

use crate::entities::TreeBranch;

/// Every shape a tree node can take.
///
/// `Branch` and `List` are containers; every other variant is a leaf as far
/// as the walker and the value cipher are concerned. `Null` passes through
/// encrypt/decrypt unchanged and never contributes to the MAC. `Comment`
/// leaves participate in the MAC only through the scope predicate's normal
/// rules — they are never hashed (the MAC engine excludes them explicitly).
#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Comment(String),
    Null,
    Branch(TreeBranch),
    List(Vec<TreeValue>),
}

impl TreeValue {
    /// A node is a leaf, for walker purposes, unless it is a container.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, TreeValue::Branch(_) | TreeValue::List(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TreeValue::Null)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TreeValue::Comment(_))
    }

    pub fn as_branch(&self) -> Option<&TreeBranch> {
        match self {
            TreeValue::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_branch_mut(&mut self) -> Option<&mut TreeBranch> {
        match self {
            TreeValue::Branch(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<TreeValue>> {
        match self {
            TreeValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<TreeValue>> {
        match self {
            TreeValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Stable wire type tag used by the `ENC[...,type:<tag>]` envelope and by
    /// the canonical byte-form encoder. `timestamp` extends the six core
    /// scalar tags — see DESIGN.md for why.
    pub fn type_tag(&self) -> &'static str {
        match self {
            TreeValue::Str(_) => "str",
            TreeValue::Bytes(_) => "bytes",
            TreeValue::Int(_) => "int",
            TreeValue::Float(_) => "float",
            TreeValue::Bool(_) => "bool",
            TreeValue::Timestamp(_) => "timestamp",
            TreeValue::Comment(_) => "comment",
            TreeValue::Null => "null",
            TreeValue::Branch(_) => "branch",
            TreeValue::List(_) => "list",
        }
    }
}
