// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cryptree Domain
//!
//! Pure business logic for the structural-encryption encryption core: the
//! tree model, the walker that drives encrypt/decrypt/MAC/path-addressed
//! access over it, the scope predicate, the AEAD and MAC service seams, the
//! Shamir Secret Sharing math, and the master-key/key-service capability
//! traits external backends implement against.
//!
//! This crate has no I/O and no async runtime dependency beyond the
//! `async_trait`-based ports ([`FormatStore`](repositories::FormatStore),
//! [`KeyServiceClient`](services::KeyServiceClient)) that infrastructure
//! implements. Everything that touches the filesystem, a concrete cipher
//! library's wire format, or a concrete KMS/PGP/age backend lives in the
//! `cryptree` crate.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;
