// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The `rotate` use case: re-roll a tree's data key and re-encrypt every
//! leaf under it, re-wrapping the fresh key into the same key groups
//! (invariant I3). The tree must already be decrypted — callers run
//! [`DecryptUseCase`](super::decrypt::DecryptUseCase) first.

use cryptree_domain::entities::Tree;
use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::{KeyServiceClient, ValueCipher};

use super::encrypt::EncryptUseCase;

pub struct RotateUseCase<'a> {
    encrypt: EncryptUseCase<'a>,
}

impl<'a> RotateUseCase<'a> {
    pub fn new(cipher: &'a dyn ValueCipher, clients: Vec<&'a dyn KeyServiceClient>) -> Self {
        Self {
            encrypt: EncryptUseCase::new(cipher, clients),
        }
    }

    pub async fn execute(&self, tree: &mut Tree) -> Result<(), CryptreeError> {
        tree.metadata.wipe_data_key();
        for group in tree.metadata.key_groups.iter_mut() {
            for descriptor in group.keys_mut() {
                descriptor.enc.clear();
            }
        }
        self.encrypt.execute(tree).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::decrypt::DecryptUseCase;
    use crate::infrastructure::key_service::{LocalKeyServiceClient, LocalMasterKeyBackend};
    use crate::infrastructure::value_cipher::AesGcmValueCipher;
    use chrono::Utc;
    use cryptree_domain::entities::{Metadata, Tree, TreeBranch, TreeItem};
    use cryptree_domain::value_objects::{KeyGroup, MasterKeyDescriptor, TreeValue};
    use std::sync::Arc;

    #[tokio::test]
    async fn rotate_changes_the_wrapped_share_and_keeps_plaintext_recoverable() {
        let cipher = AesGcmValueCipher::new();
        let client = LocalKeyServiceClient::new().with_backend(Arc::new(LocalMasterKeyBackend::from_passphrase("pw")));
        let encrypt = EncryptUseCase::new(&cipher, vec![&client]);
        let decrypt = DecryptUseCase::new(&cipher, vec![&client]);
        let rotate = RotateUseCase::new(&cipher, vec![&client]);

        let mut branch = TreeBranch::new();
        branch.push(TreeItem::entry("password", TreeValue::Str("hunter2".into())));
        let metadata = Metadata::new(vec![KeyGroup::new(vec![MasterKeyDescriptor::new("local", "k1", Utc::now())]).unwrap()], 1, "1.0").unwrap();
        let mut tree = Tree::single(branch, metadata);

        encrypt.execute(&mut tree).await.unwrap();
        let first_mac = tree.metadata.mac.clone();
        let first_enc = tree.metadata.key_groups[0].keys()[0].enc.clone();

        tree.metadata.wipe_data_key();
        decrypt.execute(&mut tree).await.unwrap();
        rotate.execute(&mut tree).await.unwrap();

        assert_ne!(tree.metadata.mac, first_mac);
        assert_ne!(tree.metadata.key_groups[0].keys()[0].enc, first_enc);

        tree.metadata.wipe_data_key();
        decrypt.execute(&mut tree).await.unwrap();
        assert_eq!(tree.branch().get("password").unwrap().value, TreeValue::Str("hunter2".into()));
    }
}
