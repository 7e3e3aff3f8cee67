// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The per-file random data key.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A fresh 256-bit symmetric key used by the AEAD value cipher on every leaf
/// of one tree (invariant I3). Automatically wiped on drop, and `re_roll`ed
/// (wiped and replaced) on rotate.
#[derive(Clone, ZeroizeOnDrop)]
pub struct DataKey([u8; 32]);

impl DataKey {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Overwrites this key's bytes with `new_key`'s and zeroes the old ones,
    /// used on rotate (invariant I3).
    pub fn re_roll(&mut self, new_key: DataKey) {
        self.0.zeroize();
        self.0 = new_key.0;
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKey(..)")
    }
}
