// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `decrypt` use case: recover the data key (from a cache or by
//! unsealing the key groups), walk the tree decrypting every ciphertext
//! leaf, and verify the stored MAC against a freshly recomputed one
//!.

use cryptree_domain::entities::Tree;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::{KeyServiceClient, MacEngine, TreeWalker, ValueCipher, ValueTransform};
use cryptree_domain::value_objects::{DataKey, TreePath, TreeValue};

use crate::application::services::DataKeyEnvelope;

pub struct DecryptUseCase<'a> {
    cipher: &'a dyn ValueCipher,
    key_service: DataKeyEnvelope<'a>,
}

impl<'a> DecryptUseCase<'a> {
    pub fn new(cipher: &'a dyn ValueCipher, clients: Vec<&'a dyn KeyServiceClient>) -> Self {
        Self {
            cipher,
            key_service: DataKeyEnvelope::new(clients),
        }
    }

    /// Decrypts every branch of `tree` in place and verifies its MAC.
    /// Unseals the data key from `tree.metadata.key_groups` first unless
    /// one is already cached.
    pub async fn execute(&self, tree: &mut Tree) -> Result<(), CryptreeError> {
        let data_key = match tree.metadata.data_key() {
            Some(key) => key.clone(),
            None => {
                let key = self
                    .key_service
                    .unseal(&tree.metadata.key_groups, tree.metadata.shamir_threshold)
                    .await?;
                tree.metadata.set_data_key(key.clone());
                key
            }
        };

        let mut mac = MacEngine::new(tree.metadata.mac_only_encrypted);
        for branch in tree.branches.iter_mut() {
            let mut transform = DecryptTransform {
                cipher: self.cipher,
                data_key: &data_key,
                mac: &mut mac,
            };
            TreeWalker::decrypt_walk(branch, &mut transform)?;
        }

        let computed = mac.finalize_hex();
        MacEngine::verify(&tree.metadata.mac, self.cipher, &data_key, &computed)?;
        Ok(())
    }
}

struct DecryptTransform<'a> {
    cipher: &'a dyn ValueCipher,
    data_key: &'a DataKey,
    mac: &'a mut MacEngine,
}

impl ValueTransform for DecryptTransform<'_> {
    fn visit_leaf(
        &mut self,
        path: &TreePath,
        value: &TreeValue,
        _active_comments: &[String],
        _self_is_last_comment: bool,
    ) -> Result<TreeValue, CryptreeError> {
        if value.is_null() {
            return Ok(value.clone());
        }
        let is_comment = value.is_comment();

        let candidate = match value {
            TreeValue::Str(s) => Some(s.as_str()),
            TreeValue::Comment(s) => Some(s.as_str()),
            _ => None,
        };

        let (replacement, was_encrypted) = match candidate {
            Some(s) if self.cipher.looks_like_ciphertext(s) => {
                match self.cipher.decrypt_value(s, self.data_key, &path.as_aad()) {
                    Ok(decrypted) => {
                        if is_comment && !decrypted.is_comment() {
                            return Err(CryptreeError::internal("decrypted comment produced a non-comment leaf"));
                        }
                        (decrypted, true)
                    }
                    // Legacy accommodation: an unparseable encrypted comment is
                    // treated as pre-existing cleartext rather than a hard
                    // failure.
                    Err(e) if is_comment => {
                        tracing::warn!(path = %path, error = %e, "treating unparseable encrypted comment as cleartext");
                        (value.clone(), false)
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => (value.clone(), false),
        };

        if !is_comment {
            self.mac.absorb_leaf(&replacement, was_encrypted)?;
        }
        Ok(replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::encrypt::EncryptUseCase;
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
    async fn round_trips_a_freshly_encrypted_tree() {
        let cipher = AesGcmValueCipher::new();
        let client = LocalKeyServiceClient::new().with_backend(Arc::new(LocalMasterKeyBackend::from_passphrase("pw")));
        let encrypt = EncryptUseCase::new(&cipher, vec![&client]);
        let decrypt = DecryptUseCase::new(&cipher, vec![&client]);

        let mut tree = fresh_tree();
        encrypt.execute(&mut tree).await.unwrap();
        tree.metadata.wipe_data_key();

        decrypt.execute(&mut tree).await.unwrap();
        assert_eq!(tree.branch().get("password").unwrap().value, TreeValue::Str("hunter2".into()));
        assert_eq!(tree.branch().get("note_unencrypted").unwrap().value, TreeValue::Str("plain".into()));
    }

    #[tokio::test]
    async fn tampered_leaf_fails_mac_verification() {
        let cipher = AesGcmValueCipher::new();
        let client = LocalKeyServiceClient::new().with_backend(Arc::new(LocalMasterKeyBackend::from_passphrase("pw")));
        let encrypt = EncryptUseCase::new(&cipher, vec![&client]);
        let decrypt = DecryptUseCase::new(&cipher, vec![&client]);

        let mut tree = fresh_tree();
        encrypt.execute(&mut tree).await.unwrap();
        tree.metadata.wipe_data_key();

        tree.branch_mut().upsert("note_unencrypted", TreeValue::Str("tampered".into()));

        let err = decrypt.execute(&mut tree).await.unwrap_err();
        assert!(matches!(err, CryptreeError::MacMismatch));
    }
}
