// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The per-value AEAD seam and its canonical byte encoding.
//!
//! The concrete AES-256-GCM implementation and the `ENC[...]` wire envelope
//! live in the infrastructure crate; this trait is the capability the
//! walker and MAC engine depend on.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::entities::TreeBranch;
use crate::error::CryptreeError;
use crate::value_objects::{DataKey, TreeValue};

/// Reduces a leaf to the canonical `(type_tag, bytes)` form the cipher and
/// the MAC engine both hash/encrypt, and reconstructs a leaf from it.
pub struct CanonicalValue;

impl CanonicalValue {
    /// Fails on containers and on `Null`, which never reaches the cipher or
    /// the MAC accumulator.
    pub fn encode(value: &TreeValue) -> Result<(&'static str, Vec<u8>), CryptreeError> {
        match value {
            TreeValue::Str(s) => Ok(("str", s.clone().into_bytes())),
            TreeValue::Bytes(b) => Ok(("bytes", b.clone())),
            TreeValue::Int(i) => Ok(("int", i.to_string().into_bytes())),
            TreeValue::Float(f) => Ok(("float", format!("{f}").into_bytes())),
            TreeValue::Bool(b) => Ok(("bool", if *b { "True" } else { "False" }.as_bytes().to_vec())),
            TreeValue::Timestamp(ts) => Ok(("timestamp", ts.to_rfc3339_opts(SecondsFormat::Secs, true).into_bytes())),
            TreeValue::Comment(s) => Ok(("comment", s.clone().into_bytes())),
            TreeValue::Null => Err(CryptreeError::internal("null has no canonical byte form")),
            TreeValue::Branch(_) | TreeValue::List(_) => {
                Err(CryptreeError::internal("containers have no canonical byte form"))
            }
        }
    }

    pub fn decode(type_tag: &str, bytes: &[u8]) -> Result<TreeValue, CryptreeError> {
        let text = || {
            String::from_utf8(bytes.to_vec())
                .map_err(|e| CryptreeError::MalformedCiphertext(format!("non-utf8 plaintext: {e}")))
        };
        match type_tag {
            "str" => Ok(TreeValue::Str(text()?)),
            "bytes" => Ok(TreeValue::Bytes(bytes.to_vec())),
            "int" => text()?
                .parse::<i64>()
                .map(TreeValue::Int)
                .map_err(|e| CryptreeError::MalformedCiphertext(format!("invalid int: {e}"))),
            "float" => text()?
                .parse::<f64>()
                .map(TreeValue::Float)
                .map_err(|e| CryptreeError::MalformedCiphertext(format!("invalid float: {e}"))),
            "bool" => match text()?.as_str() {
                "True" => Ok(TreeValue::Bool(true)),
                "False" => Ok(TreeValue::Bool(false)),
                other => Err(CryptreeError::MalformedCiphertext(format!("invalid bool literal: {other}"))),
            },
            "timestamp" => {
                let text = text()?;
                DateTime::parse_from_rfc3339(&text)
                    .map(|dt| TreeValue::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|e| CryptreeError::MalformedCiphertext(format!("invalid timestamp: {e}")))
            }
            "comment" => Ok(TreeValue::Comment(text()?)),
            other => Err(CryptreeError::MalformedCiphertext(format!("unknown type tag '{other}'"))),
        }
    }

    /// Canonical byte form used by the MAC engine for an entire branch's
    /// ordering (keys are never encrypted but do contribute their text).
    pub fn encode_branch_shape(branch: &TreeBranch) -> Vec<u8> {
        let mut out = Vec::new();
        for item in branch.items() {
            out.extend_from_slice(item.key.as_str().as_bytes());
            out.push(0);
        }
        out
    }
}

/// Per-value authenticated encryption, bound to a tree path via `aad`
///. Implementations own the wire envelope format and algorithm;
/// the domain only ever sees canonical bytes in, ciphertext string out.
pub trait ValueCipher {
    /// Encrypts `plaintext` (the canonical byte form of some leaf carrying
    /// `type_tag`) under `data_key`, authenticating `aad`, and returns the
    /// wire-format ciphertext string.
    fn encrypt_bytes(
        &self,
        type_tag: &str,
        plaintext: &[u8],
        data_key: &DataKey,
        aad: &str,
    ) -> Result<String, CryptreeError>;

    /// Parses and decrypts a wire-format ciphertext string, returning the
    /// type tag it carried and the recovered plaintext bytes.
    fn decrypt_bytes(&self, ciphertext: &str, data_key: &DataKey, aad: &str) -> Result<(String, Vec<u8>), CryptreeError>;

    /// Whether a string looks like this cipher's ciphertext envelope, used
    /// by the walker to tell an already-encrypted leaf from plaintext.
    fn looks_like_ciphertext(&self, candidate: &str) -> bool;

    fn encrypt_value(&self, value: &TreeValue, data_key: &DataKey, aad: &str) -> Result<String, CryptreeError> {
        let (type_tag, bytes) = CanonicalValue::encode(value)?;
        self.encrypt_bytes(type_tag, &bytes, data_key, aad)
    }

    fn decrypt_value(&self, ciphertext: &str, data_key: &DataKey, aad: &str) -> Result<TreeValue, CryptreeError> {
        let (type_tag, bytes) = self.decrypt_bytes(ciphertext, data_key, aad)?;
        CanonicalValue::decode(&type_tag, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_round_trips_shortest_form() {
        let (tag, bytes) = CanonicalValue::encode(&TreeValue::Float(0.1)).unwrap();
        assert_eq!(tag, "float");
        assert_eq!(CanonicalValue::decode(tag, &bytes).unwrap(), TreeValue::Float(0.1));
    }

    #[test]
    fn bool_uses_fixed_spelling() {
        let (_, bytes) = CanonicalValue::encode(&TreeValue::Bool(true)).unwrap();
        assert_eq!(bytes, b"True");
        let (_, bytes) = CanonicalValue::encode(&TreeValue::Bool(false)).unwrap();
        assert_eq!(bytes, b"False");
    }

    #[test]
    fn null_has_no_canonical_form() {
        assert!(CanonicalValue::encode(&TreeValue::Null).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn str_round_trips(s in ".*") {
            let (tag, bytes) = CanonicalValue::encode(&TreeValue::Str(s.clone())).unwrap();
            prop_assert_eq!(CanonicalValue::decode(tag, &bytes).unwrap(), TreeValue::Str(s));
        }

        #[test]
        fn int_round_trips(i in any::<i64>()) {
            let (tag, bytes) = CanonicalValue::encode(&TreeValue::Int(i)).unwrap();
            prop_assert_eq!(CanonicalValue::decode(tag, &bytes).unwrap(), TreeValue::Int(i));
        }

        #[test]
        fn bool_round_trips(b in any::<bool>()) {
            let (tag, bytes) = CanonicalValue::encode(&TreeValue::Bool(b)).unwrap();
            prop_assert_eq!(CanonicalValue::decode(tag, &bytes).unwrap(), TreeValue::Bool(b));
        }

        #[test]
        fn bytes_round_trip(b in prop::collection::vec(any::<u8>(), 0..64)) {
            let (tag, bytes) = CanonicalValue::encode(&TreeValue::Bytes(b.clone())).unwrap();
            prop_assert_eq!(CanonicalValue::decode(tag, &bytes).unwrap(), TreeValue::Bytes(b));
        }
    }
}
