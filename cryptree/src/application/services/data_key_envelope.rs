// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Data-key envelope
//!
//! Generates a tree's per-file data key, splits it into one Shamir share
//! per key group, wraps each share under every master key in its group, and
//! reverses the process on decrypt: unwrap whatever shares the configured
//! key-service clients can recover, then recombine.
//!
//! Key-service clients are tried in order for each master key; the first
//! client to succeed wins. Within a group, any single master key
//! successfully unwrapping its share is enough to recover that group's
//! share — the group degenerates to "any one of N".

use rand::RngCore;

use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::{DecryptRequest, EncryptRequest, KeyServiceClient, ShamirSecretSharing};
use cryptree_domain::value_objects::{DataKey, MasterKeyDescriptor};

/// Wraps/unwraps a [`DataKey`] across a tree's key groups via an ordered
/// list of key-service clients.
pub struct DataKeyEnvelope<'a> {
    clients: Vec<&'a dyn KeyServiceClient>,
}

impl<'a> DataKeyEnvelope<'a> {
    pub fn new(clients: Vec<&'a dyn KeyServiceClient>) -> Self {
        Self { clients }
    }

    /// Generates a fresh random 256-bit data key (invariant I3).
    pub fn generate() -> DataKey {
        let mut bytes = [0u8; DataKey::LEN];
        rand::rng().fill_bytes(&mut bytes);
        DataKey::from_bytes(bytes)
    }

    /// Splits `data_key` into one Shamir share per group in `key_groups`
    /// and wraps each group's share under every descriptor in that group,
    /// writing the result into `descriptor.enc`.
    pub async fn seal(
        &self,
        data_key: &DataKey,
        key_groups: &mut [cryptree_domain::value_objects::KeyGroup],
        threshold: usize,
    ) -> Result<(), CryptreeError> {
        let shares = ShamirSecretSharing::split(data_key.as_bytes(), threshold, key_groups.len())?;
        for (group, share) in key_groups.iter_mut().zip(shares.iter()) {
            let share_bytes = share.to_bytes();
            for descriptor in group.keys_mut() {
                descriptor.enc = self.wrap_one(descriptor, &share_bytes).await?;
            }
        }
        Ok(())
    }

    async fn wrap_one(&self, descriptor: &MasterKeyDescriptor, plaintext: &[u8]) -> Result<Vec<u8>, CryptreeError> {
        let mut errors = Vec::new();
        for client in &self.clients {
            match client
                .encrypt(EncryptRequest {
                    key_descriptor: descriptor.clone(),
                    plaintext: plaintext.to_vec(),
                })
                .await
            {
                Ok(enc) => return Ok(enc),
                Err(e) => errors.push(e.to_string()),
            }
        }
        Err(CryptreeError::KeyServiceFailure {
            key_id: descriptor.id.clone(),
            client_errors: errors,
        })
    }

    /// Recovers the data key from `key_groups`: for each group, tries every
    /// descriptor in turn until one unwraps; recombines as soon as
    /// `threshold` groups have yielded a share.
    pub async fn unseal(
        &self,
        key_groups: &[cryptree_domain::value_objects::KeyGroup],
        threshold: usize,
    ) -> Result<DataKey, CryptreeError> {
        let mut shares = Vec::new();
        let mut group_errors = Vec::new();
        for (index, group) in key_groups.iter().enumerate() {
            match self.unwrap_group(group, index + 1).await {
                Ok(share) => shares.push(share),
                Err(e) => group_errors.push(e.to_string()),
            }
        }

        if shares.len() < threshold {
            return Err(CryptreeError::InsufficientKeyGroups {
                threshold,
                available: shares.len(),
                group_errors,
            });
        }

        let secret = ShamirSecretSharing::combine(&shares, threshold)?;
        if secret.len() != DataKey::LEN {
            return Err(CryptreeError::MalformedCiphertext("recovered data key has the wrong length".to_string()));
        }
        let mut bytes = [0u8; DataKey::LEN];
        bytes.copy_from_slice(&secret);
        Ok(DataKey::from_bytes(bytes))
    }

    async fn unwrap_group(
        &self,
        group: &cryptree_domain::value_objects::KeyGroup,
        expected_abscissa: usize,
    ) -> Result<cryptree_domain::services::Share, CryptreeError> {
        let mut errors = Vec::new();
        for descriptor in group.keys() {
            match self.unwrap_one(descriptor).await {
                Ok(share_bytes) => {
                    let mut share = cryptree_domain::services::Share::from_bytes(&share_bytes)?;
                    share.abscissa = expected_abscissa as u8;
                    return Ok(share);
                }
                Err(e) => errors.push(format!("{}: {e}", descriptor.id)),
            }
        }
        Err(CryptreeError::KeyServiceFailure {
            key_id: group.keys().first().map(|d| d.id.clone()).unwrap_or_default(),
            client_errors: errors,
        })
    }

    async fn unwrap_one(&self, descriptor: &MasterKeyDescriptor) -> Result<Vec<u8>, CryptreeError> {
        let mut errors = Vec::new();
        for client in &self.clients {
            match client
                .decrypt(DecryptRequest {
                    key_descriptor: descriptor.clone(),
                    ciphertext: descriptor.enc.clone(),
                })
                .await
            {
                Ok(plaintext) => return Ok(plaintext),
                Err(e) => errors.push(e.to_string()),
            }
        }
        Err(CryptreeError::KeyServiceFailure {
            key_id: descriptor.id.clone(),
            client_errors: errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::key_service::{LocalKeyServiceClient, LocalMasterKeyBackend};
    use chrono::Utc;
    use cryptree_domain::value_objects::KeyGroup;
    use std::sync::Arc;

    fn client() -> LocalKeyServiceClient {
        LocalKeyServiceClient::new().with_backend(Arc::new(LocalMasterKeyBackend::from_passphrase("pw")))
    }

    #[tokio::test]
    async fn seals_and_unseals_a_single_group() {
        let client = client();
        let envelope = DataKeyEnvelope::new(vec![&client]);
        let data_key = DataKeyEnvelope::generate();

        let mut groups = vec![KeyGroup::new(vec![MasterKeyDescriptor::new("local", "k1", Utc::now())]).unwrap()];
        envelope.seal(&data_key, &mut groups, 1).await.unwrap();
        assert!(!groups[0].keys()[0].enc.is_empty());

        let recovered = envelope.unseal(&groups, 1).await.unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());
    }

    #[tokio::test]
    async fn seals_and_unseals_across_multiple_groups() {
        let client = client();
        let envelope = DataKeyEnvelope::new(vec![&client]);
        let data_key = DataKeyEnvelope::generate();

        let mut groups = vec![
            KeyGroup::new(vec![MasterKeyDescriptor::new("local", "alice", Utc::now())]).unwrap(),
            KeyGroup::new(vec![MasterKeyDescriptor::new("local", "bob", Utc::now())]).unwrap(),
            KeyGroup::new(vec![MasterKeyDescriptor::new("local", "carol", Utc::now())]).unwrap(),
        ];
        envelope.seal(&data_key, &mut groups, 2).await.unwrap();

        let recovered = envelope.unseal(&groups, 2).await.unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());
    }

    #[tokio::test]
    async fn missing_groups_below_threshold_fails() {
        let client = client();
        let envelope = DataKeyEnvelope::new(vec![&client]);
        let data_key = DataKeyEnvelope::generate();

        let mut groups = vec![
            KeyGroup::new(vec![MasterKeyDescriptor::new("local", "alice", Utc::now())]).unwrap(),
            KeyGroup::new(vec![MasterKeyDescriptor::new("local", "bob", Utc::now())]).unwrap(),
            KeyGroup::new(vec![MasterKeyDescriptor::new("local", "carol", Utc::now())]).unwrap(),
        ];
        envelope.seal(&data_key, &mut groups, 2).await.unwrap();

        // Corrupt two groups' wrapped shares so only one can unwrap.
        groups[1].keys_mut()[0].enc = vec![0u8; 4];
        groups[2].keys_mut()[0].enc = vec![0u8; 4];

        let err = envelope.unseal(&groups, 2).await.unwrap_err();
        assert!(matches!(err, CryptreeError::InsufficientKeyGroups { available: 1, .. }));
    }

    #[tokio::test]
    async fn any_one_key_in_a_group_recovers_the_share() {
        let client = client();
        let envelope = DataKeyEnvelope::new(vec![&client]);
        let data_key = DataKeyEnvelope::generate();

        let mut groups = vec![KeyGroup::new(vec![
            MasterKeyDescriptor::new("local", "alice", Utc::now()),
            MasterKeyDescriptor::new("local", "alice-backup", Utc::now()),
        ])
        .unwrap()];
        envelope.seal(&data_key, &mut groups, 1).await.unwrap();

        // Corrupt the first key in the group; the second should still work.
        groups[0].keys_mut()[0].enc = vec![0u8; 4];
        let recovered = envelope.unseal(&groups, 1).await.unwrap();
        assert_eq!(recovered.as_bytes(), data_key.as_bytes());
    }
}
