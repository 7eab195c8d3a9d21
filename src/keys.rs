//! Key generation, validation and decoding.
//!
//! Keys travel as standard padded base64 of exactly 32 bytes. That is the
//! only external representation accepted anywhere in the crate. Decoded key
//! material lives in [`SecretKey`], which is:
//!
//! - Not `Clone`. Duplicating it requires an explicit re-encode.
//! - Zeroised on drop.
//! - Redacted in `Debug` output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::codec::{fill_random, KEY_LEN};
use crate::error::{CryptoError, KeyError};

// ---------------------------------------------------------------------------
// Secret key
// ---------------------------------------------------------------------------

/// A 256-bit symmetric key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
}

impl SecretKey {
    /// Draw a fresh key from the system CSPRNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        fill_random(&mut bytes)?;
        Ok(Self { bytes })
    }

    /// Construct a key from raw bytes.
    ///
    /// In production, source these bytes from a KMS or OS key store.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Borrow the raw key bytes for a codec call.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Encode to the canonical transport form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &KEY_LEN)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Encoded key lifecycle
// ---------------------------------------------------------------------------

/// Generate a new key and return its canonical base64 form.
pub fn generate_key() -> Result<String, CryptoError> {
    Ok(SecretKey::generate()?.to_base64())
}

/// Check that `encoded` is a canonical base64 key of exactly 32 bytes.
///
/// Only format and length are inspected. The decoded bytes are wiped before
/// returning.
pub fn validate_key(encoded: &str) -> Result<(), KeyError> {
    decode_raw(encoded).map(drop)
}

/// Validate and decode a base64 key.
pub fn decode_key(encoded: &str) -> Result<SecretKey, KeyError> {
    let raw = decode_raw(encoded)?;
    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&raw);
    Ok(SecretKey { bytes })
}

fn decode_raw(encoded: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    if encoded.is_empty() {
        return Err(KeyError::Empty);
    }

    let raw = Zeroizing::new(STANDARD.decode(encoded).map_err(|_| KeyError::Malformed)?);
    if raw.len() != KEY_LEN {
        return Err(KeyError::WrongLength {
            expected: KEY_LEN,
            actual: raw.len(),
        });
    }
    Ok(raw)
}
