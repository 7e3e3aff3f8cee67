// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local key service
//!
//! The in-process implementation of the key-service contract:
//! a registry of [`MasterKeyBackend`] implementations dispatched by a
//! descriptor's `type_tag`, exposed to the application layer through the
//! same [`KeyServiceClient`] seam a remote (gRPC, CLI-shelling-out) client
//! would implement.
//!
//! Concrete cloud KMS/PGP/age/Vault backends are out of scope;
//! the one backend provided here, `"local"`, wraps shares under a
//! passphrase-derived AES-256-GCM key for local testing and as a worked
//! example of the `MasterKeyBackend` extension seam.

use std::collections::HashMap;
use std::sync::Arc;

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::{DecryptRequest, EncryptRequest, KeyServiceClient, MasterKeyBackend};
use cryptree_domain::value_objects::MasterKeyDescriptor;

const NONCE_LEN: usize = 12;

/// Demo/test backend: a master key is a passphrase. The share is wrapped
/// under `SHA-256(passphrase)` with AES-256-GCM, wire-encoded as
/// `nonce || ciphertext || tag` since [`MasterKeyDescriptor::enc`] is an
/// opaque byte string the core never interprets.
pub struct LocalMasterKeyBackend {
    key_bytes: [u8; 32],
    rng: SystemRandom,
}

impl LocalMasterKeyBackend {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        Self {
            key_bytes: hasher.finalize().into(),
            rng: SystemRandom::new(),
        }
    }
}

impl MasterKeyBackend for LocalMasterKeyBackend {
    fn type_tag(&self) -> &'static str {
        "local"
    }

    fn encrypt(&self, descriptor: &mut MasterKeyDescriptor, share: &[u8]) -> Result<(), CryptreeError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptreeError::RngFailure("failed to generate master-key wrap nonce".to_string()))?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key_bytes));
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut buffer = share.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(nonce, descriptor.id.as_bytes(), &mut buffer)
            .map_err(|e| CryptreeError::DecryptionFailed(format!("local master-key wrap failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + buffer.len() + tag.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&buffer);
        out.extend_from_slice(&tag);
        descriptor.enc = out;
        Ok(())
    }

    fn decrypt(&self, descriptor: &MasterKeyDescriptor) -> Result<Vec<u8>, CryptreeError> {
        if descriptor.enc.len() < NONCE_LEN + 16 {
            return Err(CryptreeError::MalformedCiphertext("local master-key envelope too short".to_string()));
        }
        let (nonce_bytes, rest) = descriptor.enc.split_at(NONCE_LEN);
        let (ciphertext, tag_bytes) = rest.split_at(rest.len() - 16);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key_bytes));
        let nonce = Nonce::from_slice(nonce_bytes);
        let tag = Tag::from_slice(tag_bytes);
        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(nonce, descriptor.id.as_bytes(), &mut buffer, tag)
            .map_err(|_| {
                CryptreeError::KeyServiceFailure {
                    key_id: descriptor.id.clone(),
                    client_errors: vec!["local master-key unwrap: authentication failed".to_string()],
                }
            })?;
        Ok(buffer)
    }
}

/// Dispatches to whichever [`MasterKeyBackend`] matches a descriptor's
/// `type_tag`. This is the local (in-process) key-service implementation;
/// a remote client implementing the same [`KeyServiceClient`] trait is
/// indistinguishable to the application layer.
pub struct LocalKeyServiceClient {
    backends: HashMap<&'static str, Arc<dyn MasterKeyBackend>>,
}

impl LocalKeyServiceClient {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    pub fn with_backend(mut self, backend: Arc<dyn MasterKeyBackend>) -> Self {
        self.backends.insert(backend.type_tag(), backend);
        self
    }

    fn backend_for(&self, type_tag: &str) -> Result<&Arc<dyn MasterKeyBackend>, CryptreeError> {
        self.backends.get(type_tag).ok_or_else(|| CryptreeError::KeyServiceFailure {
            key_id: type_tag.to_string(),
            client_errors: vec![format!("no local backend registered for type '{type_tag}'")],
        })
    }
}

impl Default for LocalKeyServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyServiceClient for LocalKeyServiceClient {
    async fn encrypt(&self, request: EncryptRequest) -> Result<Vec<u8>, CryptreeError> {
        let backend = self.backend_for(&request.key_descriptor.type_tag)?;
        let mut descriptor = request.key_descriptor;
        backend.encrypt(&mut descriptor, &request.plaintext)?;
        Ok(descriptor.enc)
    }

    async fn decrypt(&self, request: DecryptRequest) -> Result<Vec<u8>, CryptreeError> {
        let backend = self.backend_for(&request.key_descriptor.type_tag)?;
        let mut descriptor = request.key_descriptor;
        descriptor.enc = request.ciphertext;
        backend.decrypt(&descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn local_backend_round_trips_a_share() {
        let backend = LocalMasterKeyBackend::from_passphrase("correct horse battery staple");
        let mut descriptor = MasterKeyDescriptor::new("local", "demo-key-1", Utc::now());
        backend.encrypt(&mut descriptor, b"0123456789abcdef0123456789abcdef").unwrap();
        assert_ne!(descriptor.enc, b"0123456789abcdef0123456789abcdef");
        let recovered = backend.decrypt(&descriptor).unwrap();
        assert_eq!(recovered, b"0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn wrong_passphrase_fails_to_unwrap() {
        let backend = LocalMasterKeyBackend::from_passphrase("correct horse battery staple");
        let mut descriptor = MasterKeyDescriptor::new("local", "demo-key-1", Utc::now());
        backend.encrypt(&mut descriptor, b"secretshare").unwrap();

        let other = LocalMasterKeyBackend::from_passphrase("wrong passphrase");
        assert!(other.decrypt(&descriptor).is_err());
    }

    #[tokio::test]
    async fn key_service_client_dispatches_by_type_tag() {
        let client = LocalKeyServiceClient::new()
            .with_backend(Arc::new(LocalMasterKeyBackend::from_passphrase("pw")));
        let descriptor = MasterKeyDescriptor::new("local", "k1", Utc::now());
        let wrapped = client
            .encrypt(EncryptRequest {
                key_descriptor: descriptor.clone(),
                plaintext: b"share-bytes".to_vec(),
            })
            .await
            .unwrap();

        let unwrapped = client
            .decrypt(DecryptRequest {
                key_descriptor: descriptor,
                ciphertext: wrapped,
            })
            .await
            .unwrap();
        assert_eq!(unwrapped, b"share-bytes");
    }

    #[tokio::test]
    async fn unknown_type_tag_fails() {
        let client = LocalKeyServiceClient::new();
        let descriptor = MasterKeyDescriptor::new("pgp", "k1", Utc::now());
        let err = client
            .encrypt(EncryptRequest { key_descriptor: descriptor, plaintext: vec![1] })
            .await
            .unwrap_err();
        assert!(matches!(err, CryptreeError::KeyServiceFailure { .. }));
    }
}
