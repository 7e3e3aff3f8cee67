// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AES-256-GCM value cipher
//!
//! Concrete implementation of [`ValueCipher`] using `aes-gcm`. Every leaf is
//! sealed individually with a fresh 96-bit nonce, authenticating the tree
//! path as additional data, and wire-encoded as the `ENC[...]` envelope
//! described by the `ENC[...]` envelope format.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ring::rand::{SecureRandom, SystemRandom};

use cryptree_domain::error::CryptreeError;
use cryptree_domain::services::ValueCipher;
use cryptree_domain::value_objects::DataKey;

const ALG_TAG: &str = "AES256_GCM";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The only AEAD the wire format names: AES-256-GCM with a
/// fresh nonce per value.
pub struct AesGcmValueCipher {
    rng: SystemRandom,
}

impl AesGcmValueCipher {
    pub fn new() -> Self {
        Self { rng: SystemRandom::new() }
    }

    fn random_nonce(&self) -> Result<[u8; NONCE_LEN], CryptreeError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| CryptreeError::RngFailure("failed to generate AEAD nonce".to_string()))?;
        Ok(nonce)
    }
}

impl Default for AesGcmValueCipher {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses one `ENC[<ALG>,key:value,...]` envelope. Tolerates additional
/// comma-separated fields and any field order.
struct ParsedEnvelope {
    alg: String,
    data: Vec<u8>,
    iv: Vec<u8>,
    tag: Vec<u8>,
    type_tag: String,
}

fn parse_envelope(candidate: &str) -> Result<ParsedEnvelope, CryptreeError> {
    let inner = candidate
        .strip_prefix("ENC[")
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| CryptreeError::MalformedCiphertext("missing ENC[...] envelope".to_string()))?;

    let mut parts = inner.splitn(2, ',');
    let alg = parts
        .next()
        .ok_or_else(|| CryptreeError::MalformedCiphertext("missing algorithm field".to_string()))?
        .to_string();
    let rest = parts.next().unwrap_or("");

    let mut data = None;
    let mut iv = None;
    let mut tag = None;
    let mut type_tag = None;
    for field in rest.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let (key, value) = field
            .split_once(':')
            .ok_or_else(|| CryptreeError::MalformedCiphertext(format!("malformed field '{field}'")))?;
        match key {
            "data" => data = Some(BASE64.decode(value).map_err(|e| b64_err(e))?),
            "iv" => iv = Some(BASE64.decode(value).map_err(|e| b64_err(e))?),
            "tag" => tag = Some(BASE64.decode(value).map_err(|e| b64_err(e))?),
            "type" => type_tag = Some(value.to_string()),
            // "aad" and any unrecognized field are echoed diagnostics only;
            // the cryptographic binding comes from the caller-supplied aad.
            _ => {}
        }
    }

    Ok(ParsedEnvelope {
        alg,
        data: data.ok_or_else(|| CryptreeError::MalformedCiphertext("missing data field".to_string()))?,
        iv: iv.ok_or_else(|| CryptreeError::MalformedCiphertext("missing iv field".to_string()))?,
        tag: tag.ok_or_else(|| CryptreeError::MalformedCiphertext("missing tag field".to_string()))?,
        type_tag: type_tag.ok_or_else(|| CryptreeError::MalformedCiphertext("missing type field".to_string()))?,
    })
}

fn b64_err(e: base64::DecodeError) -> CryptreeError {
    CryptreeError::MalformedCiphertext(format!("invalid base64: {e}"))
}

impl ValueCipher for AesGcmValueCipher {
    fn encrypt_bytes(&self, type_tag: &str, plaintext: &[u8], data_key: &DataKey, aad: &str) -> Result<String, CryptreeError> {
        let nonce_bytes = self.random_nonce()?;
        let key = Key::<Aes256Gcm>::from_slice(data_key.as_bytes());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(nonce, aad.as_bytes(), &mut buffer)
            .map_err(|e| CryptreeError::DecryptionFailed(format!("AEAD seal failed: {e}")))?;

        Ok(format!(
            "ENC[{ALG_TAG},data:{},iv:{},aad:{},tag:{},type:{type_tag}]",
            BASE64.encode(&buffer),
            BASE64.encode(nonce_bytes),
            BASE64.encode(aad.as_bytes()),
            BASE64.encode(tag),
        ))
    }

    fn decrypt_bytes(&self, ciphertext: &str, data_key: &DataKey, aad: &str) -> Result<(String, Vec<u8>), CryptreeError> {
        let envelope = parse_envelope(ciphertext)?;
        if envelope.alg != ALG_TAG {
            return Err(CryptreeError::MalformedCiphertext(format!("unsupported algorithm '{}'", envelope.alg)));
        }
        if envelope.iv.len() != NONCE_LEN {
            return Err(CryptreeError::MalformedCiphertext("iv has wrong length".to_string()));
        }
        if envelope.tag.len() != TAG_LEN {
            return Err(CryptreeError::MalformedCiphertext("tag has wrong length".to_string()));
        }

        let key = Key::<Aes256Gcm>::from_slice(data_key.as_bytes());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&envelope.iv);
        let tag = Tag::from_slice(&envelope.tag);

        let mut buffer = envelope.data;
        cipher
            .decrypt_in_place_detached(nonce, aad.as_bytes(), &mut buffer, tag)
            .map_err(|_| CryptreeError::DecryptionFailed("AEAD authentication failed".to_string()))?;

        Ok((envelope.type_tag, buffer))
    }

    fn looks_like_ciphertext(&self, candidate: &str) -> bool {
        candidate.starts_with("ENC[") && candidate.ends_with(']')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptree_domain::value_objects::TreeValue;

    fn key() -> DataKey {
        DataKey::from_bytes([7u8; 32])
    }

    #[test]
    fn round_trips_a_string_value() {
        let cipher = AesGcmValueCipher::new();
        let data_key = key();
        let enc = cipher.encrypt_value(&TreeValue::Str("hunter2".into()), &data_key, "password:").unwrap();
        assert!(cipher.looks_like_ciphertext(&enc));
        let dec = cipher.decrypt_value(&enc, &data_key, "password:").unwrap();
        assert_eq!(dec, TreeValue::Str("hunter2".into()));
    }

    #[test]
    fn wrong_aad_is_rejected() {
        let cipher = AesGcmValueCipher::new();
        let data_key = key();
        let enc = cipher.encrypt_value(&TreeValue::Str("hunter2".into()), &data_key, "password:").unwrap();
        let err = cipher.decrypt_value(&enc, &data_key, "other:").unwrap_err();
        assert!(matches!(err, CryptreeError::DecryptionFailed(_)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let cipher = AesGcmValueCipher::new();
        let enc = cipher.encrypt_value(&TreeValue::Str("hunter2".into()), &key(), "password:").unwrap();
        let other = DataKey::from_bytes([9u8; 32]);
        let err = cipher.decrypt_value(&enc, &other, "password:").unwrap_err();
        assert!(matches!(err, CryptreeError::DecryptionFailed(_)));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = AesGcmValueCipher::new();
        let data_key = key();
        let enc = cipher.encrypt_value(&TreeValue::Str("hunter2".into()), &data_key, "x:").unwrap();
        let tampered = enc.replace("data:", "data:AA");
        let err = cipher.decrypt_bytes(&tampered, &data_key, "x:");
        assert!(err.is_err());
    }

    #[test]
    fn malformed_envelope_is_rejected() {
        let cipher = AesGcmValueCipher::new();
        let err = cipher.decrypt_bytes("not an envelope", &key(), "x:").unwrap_err();
        assert!(matches!(err, CryptreeError::MalformedCiphertext(_)));
    }

    #[test]
    fn tolerates_additional_fields() {
        let cipher = AesGcmValueCipher::new();
        let data_key = key();
        let enc = cipher.encrypt_value(&TreeValue::Int(42), &data_key, "n:").unwrap();
        let with_extra = enc.replace(']', ",unknown:field]");
        let dec = cipher.decrypt_value(&with_extra, &data_key, "n:").unwrap();
        assert_eq!(dec, TreeValue::Int(42));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use cryptree_domain::value_objects::TreeValue;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary string values, bound to arbitrary AAD, round-trip
        /// through the real AES-256-GCM envelope.
        #[test]
        fn string_round_trips_under_any_aad(s in ".*", aad in "[a-z0-9:]{1,16}") {
            let cipher = AesGcmValueCipher::new();
            let data_key = DataKey::from_bytes([11u8; 32]);
            let enc = cipher.encrypt_value(&TreeValue::Str(s.clone()), &data_key, &aad).unwrap();
            let dec = cipher.decrypt_value(&enc, &data_key, &aad).unwrap();
            prop_assert_eq!(dec, TreeValue::Str(s));
        }

        /// Decrypting under any AAD other than the one used to encrypt
        /// always fails closed.
        #[test]
        fn mismatched_aad_never_decrypts(s in ".*", aad in "[a-z]{1,8}", other in "[A-Z]{1,8}") {
            let cipher = AesGcmValueCipher::new();
            let data_key = DataKey::from_bytes([11u8; 32]);
            let enc = cipher.encrypt_value(&TreeValue::Str(s), &data_key, &aad).unwrap();
            prop_assert!(cipher.decrypt_value(&enc, &data_key, &other).is_err());
        }
    }
}
