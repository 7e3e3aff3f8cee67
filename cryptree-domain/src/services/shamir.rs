// /////////////////////////////////////////////////////////////////////////////
// Cryptree
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shamir Secret Sharing over GF(256) for the data key envelope.

use std::collections::HashSet;

use rand::RngCore;

use crate::error::CryptreeError;

/// One group's share of a secret: per-byte evaluations plus the abscissa
/// the share was generated at, as a trailing tag byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub abscissa: u8,
    pub ys: Vec<u8>,
}

impl Share {
    /// Wire encoding: the per-byte y values followed by the one-byte
    /// abscissa tag.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.ys.clone();
        out.push(self.abscissa);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptreeError> {
        if bytes.len() < 2 {
            return Err(CryptreeError::InvalidShare("share too short".to_string()));
        }
        let (ys, tag) = bytes.split_at(bytes.len() - 1);
        Ok(Self {
            abscissa: tag[0],
            ys: ys.to_vec(),
        })
    }
}

/// GF(256) arithmetic under the primitive polynomial `x^8+x^4+x^3+x+1`
/// (0x11b), and the split/combine operations built on it.
pub struct ShamirSecretSharing;

impl ShamirSecretSharing {
    const MODULUS: u16 = 0x11b;

    fn gf_mul(a: u8, b: u8) -> u8 {
        let mut a = a as u16;
        let mut b = b as u16;
        let mut result: u16 = 0;
        while b > 0 {
            if b & 1 != 0 {
                result ^= a;
            }
            a <<= 1;
            if a & 0x100 != 0 {
                a ^= Self::MODULUS;
            }
            b >>= 1;
        }
        result as u8
    }

    fn gf_pow(mut base: u8, mut exp: u32) -> u8 {
        let mut result: u8 = 1;
        while exp > 0 {
            if exp & 1 != 0 {
                result = Self::gf_mul(result, base);
            }
            base = Self::gf_mul(base, base);
            exp >>= 1;
        }
        result
    }

    fn gf_inv(a: u8) -> Result<u8, CryptreeError> {
        if a == 0 {
            return Err(CryptreeError::internal("GF(256) inverse of zero is undefined"));
        }
        // a^254 == a^-1 for the multiplicative group of GF(2^8).
        Ok(Self::gf_pow(a, 254))
    }

    fn gf_div(a: u8, b: u8) -> Result<u8, CryptreeError> {
        Ok(Self::gf_mul(a, Self::gf_inv(b)?))
    }

    /// Splits `secret` into `shares` shares with recovery threshold
    /// `threshold`, one independent polynomial per byte of the secret
    ///. Each share's abscissa is `1..=shares` (never zero: `f(0)`
    /// is the secret itself).
    pub fn split(secret: &[u8], threshold: usize, shares: usize) -> Result<Vec<Share>, CryptreeError> {
        if secret.is_empty() {
            return Err(CryptreeError::InvalidShare("zero-length secret".to_string()));
        }
        if threshold == 0 || threshold > shares || shares == 0 || shares > 255 {
            return Err(CryptreeError::invalid_configuration(format!(
                "shamir split requires 1 <= threshold ({threshold}) <= shares ({shares}) <= 255"
            )));
        }

        let mut rng = rand::rng();
        let mut coefficients: Vec<Vec<u8>> = Vec::with_capacity(secret.len());
        for &byte in secret {
            let mut poly = vec![0u8; threshold];
            poly[0] = byte;
            if threshold > 1 {
                let mut random_tail = vec![0u8; threshold - 1];
                rng.fill_bytes(&mut random_tail);
                poly[1..].copy_from_slice(&random_tail);
            }
            coefficients.push(poly);
        }

        let mut out = Vec::with_capacity(shares);
        for share_index in 1..=shares {
            let x = share_index as u8;
            let mut ys = Vec::with_capacity(secret.len());
            for poly in &coefficients {
                ys.push(Self::eval_poly(poly, x));
            }
            out.push(Share { abscissa: x, ys });
        }
        Ok(out)
    }

    fn eval_poly(coefficients: &[u8], x: u8) -> u8 {
        // Horner's method, accumulating in GF(256).
        let mut acc: u8 = 0;
        for &c in coefficients.iter().rev() {
            acc = Self::gf_mul(acc, x) ^ c;
        }
        acc
    }

    /// Recombines a secret from at least `threshold` shares via Lagrange
    /// interpolation at x = 0.
    pub fn combine(shares: &[Share], threshold: usize) -> Result<Vec<u8>, CryptreeError> {
        if shares.len() < threshold {
            return Err(CryptreeError::InsufficientKeyGroups {
                threshold,
                available: shares.len(),
                group_errors: Vec::new(),
            });
        }
        let mut seen = HashSet::new();
        for share in shares {
            if !seen.insert(share.abscissa) {
                return Err(CryptreeError::DuplicateShare(share.abscissa));
            }
        }
        let used = &shares[..threshold];
        let secret_len = used[0].ys.len();
        if used.iter().any(|s| s.ys.len() != secret_len) {
            return Err(CryptreeError::InvalidShare("share length mismatch".to_string()));
        }
        if secret_len == 0 {
            return Err(CryptreeError::InvalidShare("zero-length secret".to_string()));
        }

        let mut secret = Vec::with_capacity(secret_len);
        for byte_index in 0..secret_len {
            let mut acc: u8 = 0;
            for i in 0..used.len() {
                let xi = used[i].abscissa;
                let yi = used[i].ys[byte_index];
                let mut term = yi;
                for (j, other) in used.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let xj = other.abscissa;
                    // Lagrange basis term at x=0: xj / (xj XOR xi).
                    let denom = xj ^ xi;
                    if denom == 0 {
                        return Err(CryptreeError::DuplicateShare(xi));
                    }
                    term = Self::gf_mul(term, Self::gf_div(xj, denom)?);
                }
                acc ^= term;
            }
            secret.push(acc);
        }
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_then_combine_recovers_secret() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let shares = ShamirSecretSharing::split(secret, 3, 5).unwrap();
        let recovered = ShamirSecretSharing::combine(&shares[..3], 3).unwrap();
        assert_eq!(recovered, secret);
        // Any 3-of-5 subset works, not just a prefix.
        let subset = vec![shares[1].clone(), shares[3].clone(), shares[4].clone()];
        assert_eq!(ShamirSecretSharing::combine(&subset, 3).unwrap(), secret);
    }

    #[test]
    fn single_group_degenerates_to_identity() {
        let secret = b"thirtytwobytelongdatakeyvalue!!!";
        let shares = ShamirSecretSharing::split(secret, 1, 1).unwrap();
        assert_eq!(ShamirSecretSharing::combine(&shares, 1).unwrap(), secret.to_vec());
    }

    #[test]
    fn insufficient_shares_rejected() {
        let secret = b"abcdefgh";
        let shares = ShamirSecretSharing::split(secret, 3, 5).unwrap();
        let err = ShamirSecretSharing::combine(&shares[..2], 3).unwrap_err();
        assert!(matches!(err, CryptreeError::InsufficientKeyGroups { .. }));
    }

    #[test]
    fn duplicate_abscissas_rejected() {
        let secret = b"abcdefgh";
        let shares = ShamirSecretSharing::split(secret, 2, 3).unwrap();
        let dup = vec![shares[0].clone(), shares[0].clone()];
        assert!(matches!(
            ShamirSecretSharing::combine(&dup, 2),
            Err(CryptreeError::DuplicateShare(_))
        ));
    }

    #[test]
    fn zero_length_secret_rejected() {
        assert!(matches!(
            ShamirSecretSharing::split(b"", 2, 3),
            Err(CryptreeError::InvalidShare(_))
        ));
    }

    #[test]
    fn share_round_trips_through_bytes() {
        let share = Share {
            abscissa: 7,
            ys: vec![1, 2, 3, 4],
        };
        let bytes = share.to_bytes();
        assert_eq!(Share::from_bytes(&bytes).unwrap(), share);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any `threshold`-of-`shares` subset recombines to the original
        /// secret, for arbitrary secret bytes and group sizes.
        #[test]
        fn split_combine_recovers_secret_for_any_subset(
            secret in prop::collection::vec(any::<u8>(), 1..64),
            shares in 2u8..12,
            threshold_offset in 0u8..11,
            seed in any::<u8>(),
        ) {
            let threshold = (1 + (threshold_offset % shares)) as usize;
            let shares = shares as usize;
            let all = ShamirSecretSharing::split(&secret, threshold, shares).unwrap();

            // Deterministically pick `threshold` distinct shares via `seed`
            // so the subset varies across cases without needing an RNG.
            let mut indices: Vec<usize> = (0..shares).collect();
            for i in (1..indices.len()).rev() {
                let j = (seed as usize).wrapping_add(i) % (i + 1);
                indices.swap(i, j);
            }
            let subset: Vec<Share> = indices[..threshold].iter().map(|&i| all[i].clone()).collect();

            let recovered = ShamirSecretSharing::combine(&subset, threshold).unwrap();
            prop_assert_eq!(recovered, secret);
        }
    }
}
