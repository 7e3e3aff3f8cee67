// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The document: one or more branches plus its metadata.

use crate::entities::{Metadata, TreeBranch};

/// A loaded document. Most formats produce exactly one branch; streaming
/// formats that support multiple documents in one file produce more than
/// one, each walked and MAC'd independently in declaration order.
#[derive(Debug, Clone)]
pub struct Tree {
    pub branches: Vec<TreeBranch>,
    pub metadata: Metadata,
    pub path: Option<String>,
}

impl Tree {
    pub fn new(branches: Vec<TreeBranch>, metadata: Metadata) -> Self {
        Self {
            branches,
            metadata,
            path: None,
        }
    }

    pub fn single(branch: TreeBranch, metadata: Metadata) -> Self {
        Self::new(vec![branch], metadata)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The primary branch, for single-document formats and for metadata
    /// reconstruction in the binary store.
    pub fn branch(&self) -> &TreeBranch {
        &self.branches[0]
    }

    pub fn branch_mut(&mut self) -> &mut TreeBranch {
        &mut self.branches[0]
    }
}
