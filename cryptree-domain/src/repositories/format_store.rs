// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Converting byte streams to and from the tree model.

use async_trait::async_trait;

use crate::entities::{Metadata, Tree};
use crate::error::CryptreeError;

/// One document format (YAML, JSON, dotenv, INI, binary, ...). Stores never
/// touch the filesystem directly — that is an infrastructure/bootstrap
/// concern — they only convert between bytes and a [`Tree`].
#[async_trait]
pub trait FormatStore: Send + Sync {
    /// Stable tag used for format auto-detection by file extension, and in
    /// diagnostics.
    fn format_tag(&self) -> &'static str;

    /// Parses `bytes` into a tree. Structured stores reject a non-map top
    /// level and disallowed structural constructs (e.g. YAML anchors); the
    /// binary store instead wraps the whole input as one leaf under key
    /// `data`.
    async fn load(&self, bytes: &[u8]) -> Result<Tree, CryptreeError>;

    /// Serializes a tree back to bytes, round-tripping metadata through the
    /// format's own `sops`-style block.
    async fn save(&self, tree: &Tree) -> Result<Vec<u8>, CryptreeError>;

    /// Parses `bytes` as a brand-new document that carries no metadata
    /// block of its own yet, attaching `metadata` (built from a creation
    /// rule file) instead of requiring one in the bytes. Any metadata
    /// block already present in `bytes` is discarded.
    async fn load_new(&self, bytes: &[u8], metadata: Metadata) -> Result<Tree, CryptreeError>;
}
