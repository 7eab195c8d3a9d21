//! Byte-level cipher codecs.
//!
//! Two stateless codecs share one calling convention: `encrypt(&str, key)`
//! returns a self-describing record, `decrypt(record, key)` returns the
//! original string. Records are versionless, so the caller must remember which
//! [`Algorithm`] produced each one.
//!
//! ```text
//! AES-CBC: [ iv (16) ][ ciphertext, PKCS#7 padded to 16 ]
//! AES-GCM: [ nonce (12) ][ ciphertext ][ tag (16) ]
//! ```
//!
//! `ring::rand::SystemRandom` is the only source of randomness in the crate.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, KeyError};

pub mod cbc;
pub mod gcm;

/// Size of every key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// The cipher a gate uses for every record it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// AES-256-CBC with PKCS#7 padding. Confidentiality only.
    #[serde(rename = "AES-CBC")]
    AesCbc,
    /// AES-256-GCM. Authenticated: any tampering fails decryption.
    #[default]
    #[serde(rename = "AES-GCM")]
    AesGcm,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AesCbc => "AES-CBC",
            Self::AesGcm => "AES-GCM",
        }
    }

    /// Smallest record this algorithm can produce.
    pub fn min_ciphertext_len(&self) -> usize {
        match self {
            Self::AesCbc => cbc::MIN_CIPHERTEXT_LEN,
            Self::AesGcm => gcm::MIN_CIPHERTEXT_LEN,
        }
    }

    pub fn encrypt(&self, plaintext: &str, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            Self::AesCbc => cbc::encrypt(plaintext, key),
            Self::AesGcm => gcm::encrypt(plaintext, key),
        }
    }

    pub fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<String, CryptoError> {
        match self {
            Self::AesCbc => cbc::decrypt(data, key),
            Self::AesGcm => gcm::decrypt(data, key),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reject any key that is not exactly [`KEY_LEN`] bytes.
pub(crate) fn check_key_len(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() != KEY_LEN {
        return Err(KeyError::WrongLength {
            expected: KEY_LEN,
            actual: key.len(),
        }
        .into());
    }
    Ok(())
}

/// Fill `buf` from the system CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| CryptoError::RandomnessFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_dispatch_roundtrip() {
        let key = [7u8; KEY_LEN];
        for algorithm in [Algorithm::AesCbc, Algorithm::AesGcm] {
            let sealed = algorithm.encrypt("dispatch", &key).unwrap();
            assert!(sealed.len() >= algorithm.min_ciphertext_len());
            assert_eq!(algorithm.decrypt(&sealed, &key).unwrap(), "dispatch");
        }
    }

    #[test]
    fn test_algorithm_serde_names() {
        assert_eq!(serde_json::to_string(&Algorithm::AesCbc).unwrap(), "\"AES-CBC\"");
        let parsed: Algorithm = serde_json::from_str("\"AES-GCM\"").unwrap();
        assert_eq!(parsed, Algorithm::AesGcm);
        assert_eq!(Algorithm::default(), Algorithm::AesGcm);
    }

    #[test]
    fn test_cross_algorithm_records_do_not_decrypt() {
        let key = [9u8; KEY_LEN];
        let sealed = Algorithm::AesGcm.encrypt("hello world, hello world", &key).unwrap();
        // A GCM record read as CBC is garbage; it must not produce a plaintext.
        let result = Algorithm::AesCbc.decrypt(&sealed, &key);
        assert!(result.is_err());
    }
}
