// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A set of master keys wrapping the same Shamir share.

use serde::{Deserialize, Serialize};

use crate::error::CryptreeError;
use crate::value_objects::MasterKeyDescriptor;

/// An ordered list of master keys that all wrap the same share (or, for a
/// single-group file, the same full data key). Any one can recover it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyGroup(pub Vec<MasterKeyDescriptor>);

impl KeyGroup {
    pub fn new(keys: Vec<MasterKeyDescriptor>) -> Result<Self, CryptreeError> {
        if keys.is_empty() {
            return Err(CryptreeError::invalid_configuration(
                "a key group may not be empty",
            ));
        }
        Ok(Self(keys))
    }

    pub fn keys(&self) -> &[MasterKeyDescriptor] {
        &self.0
    }

    pub fn keys_mut(&mut self) -> &mut [MasterKeyDescriptor] {
        &mut self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
