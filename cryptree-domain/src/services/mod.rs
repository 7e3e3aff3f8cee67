// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain services: stateless operations over the tree and its envelope.

mod mac_engine;
mod master_key_service;
mod scope_predicate;
mod shamir;
mod tree_walker;
mod value_cipher;

pub use mac_engine::MacEngine;
pub use master_key_service::{DecryptRequest, EncryptRequest, KeyServiceClient, MasterKeyBackend};
pub use scope_predicate::ScopePredicate;
pub use shamir::{Share, ShamirSecretSharing};
pub use tree_walker::{TreeWalker, ValueTransform};
pub use value_cipher::{CanonicalValue, ValueCipher};
