// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Decides, per leaf, whether it is in scope for encryption.

use regex::Regex;

use crate::error::CryptreeError;
use crate::value_objects::{PathComponent, ScopeSelector, TreePath};

/// Evaluates a [`ScopeSelector`] against one leaf.
///
/// Suffix and regex selectors look at the path's components; comment-regex
/// selectors look at the comments currently active in the walker's
/// `commentsStack` frame for the container holding this leaf. A selector is "unencrypted-*" or "encrypted-*"; the unencrypted
/// forms default to `true` (encrypt) and flip to `false` on a match, the
/// encrypted forms do the reverse.
pub struct ScopePredicate;

impl ScopePredicate {
    /// Returns whether `path` is in scope for encryption under `selector`.
    ///
    /// `active_comments` is the ordered list of comments currently
    /// accumulated in the enclosing container's frame. `self_is_last_comment`
    /// is set when the node under evaluation is itself a standalone comment
    /// that is also the most recently pushed entry of `active_comments`: the
    /// comment-regex rules look at the comments that *precede* a node, so a
    /// comment's own text is excluded when judging itself.
    pub fn is_in_scope(
        selector: &ScopeSelector,
        path: &TreePath,
        active_comments: &[String],
        self_is_last_comment: bool,
    ) -> Result<bool, CryptreeError> {
        match selector {
            ScopeSelector::UnencryptedSuffix(suffix) => Ok(!Self::any_component_has_suffix(path, suffix)),
            ScopeSelector::EncryptedSuffix(suffix) => Ok(Self::any_component_has_suffix(path, suffix)),
            ScopeSelector::UnencryptedRegex(pattern) => {
                let re = Self::compile(pattern)?;
                Ok(!Self::any_component_matches(path, &re))
            }
            ScopeSelector::EncryptedRegex(pattern) => {
                let re = Self::compile(pattern)?;
                Ok(Self::any_component_matches(path, &re))
            }
            ScopeSelector::UnencryptedCommentRegex(pattern) => {
                let re = Self::compile(pattern)?;
                let comments = Self::relevant_comments(active_comments, self_is_last_comment);
                Ok(!comments.iter().any(|c| re.is_match(c)))
            }
            ScopeSelector::EncryptedCommentRegex(pattern) => {
                let re = Self::compile(pattern)?;
                let comments = Self::relevant_comments(active_comments, self_is_last_comment);
                Ok(comments.iter().any(|c| re.is_match(c)))
            }
        }
    }

    /// Checks a just-produced ciphertext comment against an active
    /// `unencrypted_comment_regex` selector: if the ciphertext itself would
    /// match, a later decrypt pass would treat the comment as already
    /// cleartext and skip it, desyncing the MAC.
    pub fn check_selector_trap(selector: &ScopeSelector, encrypted_comment_text: &str) -> Result<(), CryptreeError> {
        if let ScopeSelector::UnencryptedCommentRegex(pattern) = selector {
            let re = Self::compile(pattern)?;
            if re.is_match(encrypted_comment_text) {
                return Err(CryptreeError::SelectorTrap);
            }
        }
        Ok(())
    }

    fn relevant_comments(active_comments: &[String], self_is_last_comment: bool) -> &[String] {
        if self_is_last_comment && !active_comments.is_empty() {
            &active_comments[..active_comments.len() - 1]
        } else {
            active_comments
        }
    }

    fn any_component_has_suffix(path: &TreePath, suffix: &str) -> bool {
        path.components().iter().any(|c| match c {
            PathComponent::Str(s) => s.ends_with(suffix),
            PathComponent::Index(_) => false,
        })
    }

    fn any_component_matches(path: &TreePath, re: &Regex) -> bool {
        path.components().iter().any(|c| match c {
            PathComponent::Str(s) => re.is_match(s),
            PathComponent::Index(_) => false,
        })
    }

    fn compile(pattern: &str) -> Result<Regex, CryptreeError> {
        Regex::new(pattern)
            .map_err(|e| CryptreeError::invalid_configuration(format!("bad selector regex '{pattern}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(components: &[&str]) -> TreePath {
        TreePath::from_components(components.iter().map(|s| PathComponent::Str(s.to_string())).collect())
    }

    #[test]
    fn unencrypted_suffix_defaults_to_encrypt() {
        let selector = ScopeSelector::UnencryptedSuffix("_unencrypted".to_string());
        assert!(ScopePredicate::is_in_scope(&selector, &path(&["password"]), &[], false).unwrap());
        assert!(!ScopePredicate::is_in_scope(&selector, &path(&["note_unencrypted"]), &[], false).unwrap());
    }

    #[test]
    fn encrypted_regex_defaults_to_plaintext() {
        let selector = ScopeSelector::EncryptedRegex("^secret_".to_string());
        assert!(!ScopePredicate::is_in_scope(&selector, &path(&["other"]), &[], false).unwrap());
        assert!(ScopePredicate::is_in_scope(&selector, &path(&["secret_key"]), &[], false).unwrap());
    }

    #[test]
    fn comment_regex_excludes_self() {
        let selector = ScopeSelector::UnencryptedCommentRegex("plain".to_string());
        let comments = vec!["plain".to_string()];
        // Evaluating the comment itself: its own text is excluded, so no match -> stays in scope.
        assert!(ScopePredicate::is_in_scope(&selector, &path(&["x"]), &comments, true).unwrap());
        // Evaluating a later leaf under the same frame: the comment applies.
        assert!(!ScopePredicate::is_in_scope(&selector, &path(&["x"]), &comments, false).unwrap());
    }

    #[test]
    fn selector_trap_detected() {
        let selector = ScopeSelector::UnencryptedCommentRegex("^ENC\\[".to_string());
        assert!(ScopePredicate::check_selector_trap(&selector, "ENC[AES256_GCM,...]").is_err());
        assert!(ScopePredicate::check_selector_trap(&selector, "plain text").is_ok());
    }
}
