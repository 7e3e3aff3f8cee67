// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `encrypt` use case: walk a plaintext tree, encrypting every in-scope
//! leaf under its data key, sealing a fresh data key into the key groups
//! first if none is cached yet.

use cryptree_domain::entities::Tree;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::{KeyServiceClient, MacEngine, ScopePredicate, TreeWalker, ValueCipher, ValueTransform};
use cryptree_domain::value_objects::{DataKey, ScopeSelector, TreePath, TreeValue};

use crate::application::services::DataKeyEnvelope;

pub struct EncryptUseCase<'a> {
    cipher: &'a dyn ValueCipher,
    key_service: DataKeyEnvelope<'a>,
}

impl<'a> EncryptUseCase<'a> {
    pub fn new(cipher: &'a dyn ValueCipher, clients: Vec<&'a dyn KeyServiceClient>) -> Self {
        Self {
            cipher,
            key_service: DataKeyEnvelope::new(clients),
        }
    }

    /// Encrypts every branch of `tree` in place and stores the resulting
    /// MAC. Generates and seals a fresh data key first if `tree.metadata`
    /// does not already cache one (the brand-new-document path).
    pub async fn execute(&self, tree: &mut Tree) -> Result<(), CryptreeError> {
        if tree.metadata.data_key().is_none() {
            let data_key = DataKeyEnvelope::generate();
            self.key_service
                .seal(&data_key, &mut tree.metadata.key_groups, tree.metadata.shamir_threshold)
                .await?;
            tree.metadata.set_data_key(data_key);
        }
        let data_key = tree.metadata.data_key().expect("set above").clone();
        let selector = tree.metadata.effective_selector();
        let mut mac = MacEngine::new(tree.metadata.mac_only_encrypted);

        for branch in tree.branches.iter_mut() {
            let mut transform = EncryptTransform {
                cipher: self.cipher,
                data_key: &data_key,
                selector: &selector,
                mac: &mut mac,
            };
            TreeWalker::encrypt_walk(branch, &mut transform)?;
        }

        tree.metadata.mac = mac.seal(self.cipher, &data_key)?;
        tree.metadata.touch();
        Ok(())
    }
}

struct EncryptTransform<'a> {
    cipher: &'a dyn ValueCipher,
    data_key: &'a DataKey,
    selector: &'a ScopeSelector,
    mac: &'a mut MacEngine,
}

impl ValueTransform for EncryptTransform<'_> {
    fn visit_leaf(
        &mut self,
        path: &TreePath,
        value: &TreeValue,
        active_comments: &[String],
        self_is_last_comment: bool,
    ) -> Result<TreeValue, CryptreeError> {
        if value.is_null() {
            return Ok(value.clone());
        }

        let in_scope = ScopePredicate::is_in_scope(self.selector, path, active_comments, self_is_last_comment)?;
        let is_comment = value.is_comment();

        let replacement = if in_scope {
            let ciphertext = self.cipher.encrypt_value(value, self.data_key, &path.as_aad())?;
            if is_comment {
                ScopePredicate::check_selector_trap(self.selector, &ciphertext)?;
                TreeValue::Comment(ciphertext)
            } else {
                TreeValue::Str(ciphertext)
            }
        } else {
            value.clone()
        };

        if !is_comment {
            // The MAC is computed over the plaintext form on both sides of the
            // round trip: the value as it went into encryption here, and the
            // value as it comes out of decryption in `DecryptTransform`.
            self.mac.absorb_leaf(value, in_scope)?;
        }
        Ok(replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::key_service::{LocalKeyServiceClient, LocalMasterKeyBackend};
    use crate::infrastructure::value_cipher::AesGcmValueCipher;
    use chrono::Utc;
    use cryptree_domain::entities::{Metadata, TreeBranch, TreeItem};
    use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor};
    use std::sync::Arc;

    fn fresh_tree() -> Tree {
        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry("password", TreeValue::Str("hunter2".into())));
        branch.push(TreeItem::entry("note_unencrypted", TreeValue::Str("plain".into())));
        let metadata = Metadata::new(vec![KeyGroup::new(vec![MasterKeyDescriptor::new("local", "k1", Utc::now())]).unwrap()], 1, "1.0").unwrap();
        Tree::single(branch, metadata)
    }

    #[tokio::test]
    async fn encrypts_in_scope_leaves_and_leaves_unencrypted_suffix_alone() {
        let cipher = AesGcmValueCipher::new();
        let client = LocalKeyServiceClient::new().with_backend(Arc::new(LocalMasterKeyBackend::from_passphrase("pw")));
        let use_case = EncryptUseCase::new(&cipher, vec![&client]);

        let mut tree = fresh_tree();
        use_case.execute(&mut tree).await.unwrap();

        let TreeValue::Str(password) = &tree.branch().get("password").unwrap().value else {
            panic!("expected a string leaf");
        };
        assert!(cipher.looks_like_ciphertext(password));
        assert_eq!(tree.branch().get("note_unencrypted").unwrap().value, TreeValue::Str("plain".into()));
        assert!(!tree.metadata.mac.is_empty());
        assert!(!tree.metadata.key_groups[0].keys()[0].enc.is_empty());
    }
}
