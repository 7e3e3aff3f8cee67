// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The single scope-selector a [`Metadata`](crate::entities::Metadata) carries.

use serde::{Deserialize, Serialize};

use crate::error::CryptreeError;

/// Exactly one of these governs which leaves get encrypted.
/// Absence of a selector in metadata is equivalent to
/// `UnencryptedSuffix("_unencrypted")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeSelector {
    UnencryptedSuffix(String),
    EncryptedSuffix(String),
    UnencryptedRegex(String),
    EncryptedRegex(String),
    UnencryptedCommentRegex(String),
    EncryptedCommentRegex(String),
}

impl ScopeSelector {
    pub const DEFAULT_UNENCRYPTED_SUFFIX: &'static str = "_unencrypted";

    pub fn default_selector() -> Self {
        ScopeSelector::UnencryptedSuffix(Self::DEFAULT_UNENCRYPTED_SUFFIX.to_string())
    }

    /// Validates that at most one of each unencrypted/encrypted suffix-or-
    /// regex pair is active — trivially true here since `Metadata` only
    /// stores a single `Option<ScopeSelector>`, but kept as the seam the
    /// emitter uses when constructing one from several config fields.
    pub fn from_config_fields(
        unencrypted_suffix: Option<String>,
        encrypted_suffix: Option<String>,
        unencrypted_regex: Option<String>,
        encrypted_regex: Option<String>,
        unencrypted_comment_regex: Option<String>,
        encrypted_comment_regex: Option<String>,
    ) -> Result<Option<Self>, CryptreeError> {
        let candidates = [
            unencrypted_suffix.clone().map(ScopeSelector::UnencryptedSuffix),
            encrypted_suffix.clone().map(ScopeSelector::EncryptedSuffix),
            unencrypted_regex.clone().map(ScopeSelector::UnencryptedRegex),
            encrypted_regex.clone().map(ScopeSelector::EncryptedRegex),
            unencrypted_comment_regex
                .clone()
                .map(ScopeSelector::UnencryptedCommentRegex),
            encrypted_comment_regex
                .clone()
                .map(ScopeSelector::EncryptedCommentRegex),
        ];
        let mut present: Vec<ScopeSelector> = candidates.into_iter().flatten().collect();
        match present.len() {
            0 => Ok(None),
            1 => Ok(Some(present.remove(0))),
            _ => Err(CryptreeError::invalid_configuration(
                "at most one scope selector may be configured",
            )),
        }
    }
}
