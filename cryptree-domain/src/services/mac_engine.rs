// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The tree-wide integrity tag.

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::error::CryptreeError;
use crate::services::value_cipher::CanonicalValue;
use crate::services::ValueCipher;
use crate::value_objects::{DataKey, TreeValue};

/// Accumulates the canonical bytes of every non-Comment, non-Null leaf the
/// walker visits, in visitation order, into a single SHA-512 digest.
pub struct MacEngine {
    hasher: Sha512,
    mac_only_encrypted: bool,
}

impl MacEngine {
    /// Distinguishes a `mac_only_encrypted` digest from a normal one so the
    /// two modes can never collide on the same tree (invariant I8).
    pub const MAC_ONLY_ENCRYPTED_INIT: [u8; 32] = [
        0x43, 0x72, 0x79, 0x70, 0x74, 0x72, 0x65, 0x65, 0x2d, 0x4d, 0x4f, 0x45, 0x2d, 0x49, 0x4e, 0x49, 0x54, 0x2d,
        0x76, 0x31, 0x00, 0x4d, 0x41, 0x43, 0x2d, 0x4f, 0x4e, 0x4c, 0x59, 0x2d, 0x45, 0x4e,
    ];

    /// Fixed sentinel AAD for the stored MAC's own encryption, distinct from
    /// any real tree path (a path always ends in a colon, this never starts
    /// with one component's worth of text).
    pub const MAC_AAD: &'static str = "--";

    pub fn new(mac_only_encrypted: bool) -> Self {
        let mut hasher = Sha512::new();
        if mac_only_encrypted {
            hasher.update(Self::MAC_ONLY_ENCRYPTED_INIT);
        }
        Self {
            hasher,
            mac_only_encrypted,
        }
    }

    /// Feeds one leaf's post-operation value into the accumulator. Comments
    /// and `Null` never contribute; under `mac_only_encrypted`, a leaf that
    /// was not actually encrypted (out of scope) is skipped too.
    pub fn absorb_leaf(&mut self, value: &TreeValue, was_encrypted: bool) -> Result<(), CryptreeError> {
        if value.is_comment() || value.is_null() {
            return Ok(());
        }
        if self.mac_only_encrypted && !was_encrypted {
            return Ok(());
        }
        let (_, bytes) = CanonicalValue::encode(value)?;
        self.hasher.update(&bytes);
        Ok(())
    }

    pub fn finalize_hex(self) -> String {
        hex::encode_upper(self.hasher.finalize())
    }

    /// Finalizes the digest and seals it under `data_key` with the fixed
    /// sentinel AAD, producing the string stored as metadata's `mac` field.
    pub fn seal(self, cipher: &dyn ValueCipher, data_key: &DataKey) -> Result<String, CryptreeError> {
        let hex_digest = self.finalize_hex();
        cipher.encrypt_bytes("mac", hex_digest.as_bytes(), data_key, Self::MAC_AAD)
    }

    /// Decrypts a stored `mac` field and compares it, in constant time,
    /// against a freshly computed digest.
    pub fn verify(stored_mac: &str, cipher: &dyn ValueCipher, data_key: &DataKey, computed_hex: &str) -> Result<(), CryptreeError> {
        let (_, plaintext) = cipher.decrypt_bytes(stored_mac, data_key, Self::MAC_AAD)?;
        let stored_hex = String::from_utf8(plaintext)
            .map_err(|e| CryptreeError::MalformedCiphertext(format!("mac plaintext not utf8: {e}")))?;
        if bool::from(stored_hex.as_bytes().ct_eq(computed_hex.as_bytes())) {
            Ok(())
        } else {
            Err(CryptreeError::MacMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_only_encrypted_changes_initial_state() {
        let plain = MacEngine::new(false).finalize_hex();
        let only_encrypted = MacEngine::new(true).finalize_hex();
        assert_ne!(plain, only_encrypted);
    }

    #[test]
    fn comments_and_null_do_not_contribute() {
        let mut a = MacEngine::new(false);
        a.absorb_leaf(&TreeValue::Comment("hello".into()), true).unwrap();
        a.absorb_leaf(&TreeValue::Null, true).unwrap();
        let empty = MacEngine::new(false).finalize_hex();
        assert_eq!(a.finalize_hex(), empty);
    }

    #[test]
    fn mac_only_encrypted_skips_unencrypted_leaves() {
        let mut engine = MacEngine::new(true);
        engine.absorb_leaf(&TreeValue::Str("skip me".into()), false).unwrap();
        assert_eq!(engine.finalize_hex(), MacEngine::new(true).finalize_hex());
    }
}
