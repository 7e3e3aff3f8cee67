// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The master-key capability and the key-service boundary.

use async_trait::async_trait;

use crate::error::CryptreeError;
use crate::value_objects::MasterKeyDescriptor;

/// What a backend (age, PGP, a KMS, a vault, ...) knows how to do with one
/// of its own descriptors. The core never inspects private key material; it
/// only calls through this capability.
pub trait MasterKeyBackend: Send + Sync {
    fn type_tag(&self) -> &'static str;

    /// Wraps `share` (a Shamir share, or the full data key for a single-group
    /// file) and records the result on `descriptor.enc`.
    fn encrypt(&self, descriptor: &mut MasterKeyDescriptor, share: &[u8]) -> Result<(), CryptreeError>;

    /// Unwraps `descriptor.enc` back into the share it carries.
    fn decrypt(&self, descriptor: &MasterKeyDescriptor) -> Result<Vec<u8>, CryptreeError>;

    /// Whether this descriptor's backing key material is due for rotation.
    /// Advisory only; the core never acts on it automatically.
    fn needs_rotation(&self, _descriptor: &MasterKeyDescriptor) -> bool {
        false
    }

    fn identify(&self, descriptor: &MasterKeyDescriptor) -> String {
        descriptor.id.clone()
    }
}

/// Request to wrap `plaintext` (a share or full data key) under the key
/// named by `key_descriptor`. Carries only identifiers and the plaintext to
/// wrap — never master private material.
#[derive(Debug, Clone)]
pub struct EncryptRequest {
    pub key_descriptor: MasterKeyDescriptor,
    pub plaintext: Vec<u8>,
}

/// Request to unwrap `ciphertext` back into its plaintext share.
#[derive(Debug, Clone)]
pub struct DecryptRequest {
    pub key_descriptor: MasterKeyDescriptor,
    pub ciphertext: Vec<u8>,
}

/// A key-service client: local (dispatches straight to a
/// [`MasterKeyBackend`]) or remote (an RPC/CLI-shelling-out boundary) —
/// indistinguishable from the core's point of view. The core holds an
/// ordered list of clients and tries each in turn, moving on when one
/// errors.
#[async_trait]
pub trait KeyServiceClient: Send + Sync {
    async fn encrypt(&self, request: EncryptRequest) -> Result<Vec<u8>, CryptreeError>;
    async fn decrypt(&self, request: DecryptRequest) -> Result<Vec<u8>, CryptreeError>;
}
