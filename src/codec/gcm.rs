//! AES-256-GCM codec.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM (authenticated encryption), no associated data
//! - **Nonce**: 96-bit (12 bytes), generated fresh per operation
//! - **Tag**: 128-bit (16 bytes), appended after the ciphertext

use ring::aead::{self, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};

use super::{check_key_len, fill_random};
use crate::error::CryptoError;

/// The AEAD algorithm used by this codec.
const ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// An empty plaintext still carries a nonce and a tag.
pub const MIN_CIPHERTEXT_LEN: usize = NONCE_LEN + TAG_LEN;

/// A nonce generated for a single encryption operation.
/// Newtype to prevent accidental reuse: each `Nonce` is consumed on use.
struct OwnedNonce(Nonce);

fn generate_nonce() -> Result<OwnedNonce, CryptoError> {
    let mut buf = [0u8; NONCE_LEN];
    fill_random(&mut buf)?;
    Ok(OwnedNonce(Nonce::assume_unique_for_key(buf)))
}

fn aead_key(key: &[u8]) -> Result<LessSafeKey, CryptoError> {
    check_key_len(key)?;
    let unbound = UnboundKey::new(ALGORITHM, key).map_err(|_| CryptoError::EncryptionFailure)?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt a string with AES-256-GCM.
///
/// # Layout of returned bytes
/// ```text
/// [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
/// ```
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = aead_key(key)?;
    let nonce = generate_nonce()?;

    let mut output = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
    output.extend_from_slice(nonce.0.as_ref());
    output.extend_from_slice(plaintext.as_bytes());

    // Encrypts `output[NONCE_LEN..]` in place and appends the tag.
    let tag = key
        .seal_in_place_separate_tag(nonce.0, aead::Aad::empty(), &mut output[NONCE_LEN..])
        .map_err(|_| CryptoError::EncryptionFailure)?;
    output.extend_from_slice(tag.as_ref());

    Ok(output)
}

/// Decrypt a record produced by [`encrypt`].
///
/// The tag is verified before any plaintext is released. A wrong key or any
/// flipped bit in the nonce, body or tag yields `DecryptFailure`.
pub fn decrypt(data: &[u8], key: &[u8]) -> Result<String, CryptoError> {
    let key = aead_key(key).map_err(|err| match err {
        CryptoError::EncryptionFailure => CryptoError::DecryptFailure,
        other => other,
    })?;

    if data.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            minimum: MIN_CIPHERTEXT_LEN,
            actual: data.len(),
        });
    }

    let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
    let nonce_bytes: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| CryptoError::DecryptFailure)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut buffer = sealed.to_vec();
    let plaintext = key
        .open_in_place(nonce, aead::Aad::empty(), &mut buffer)
        .map_err(|_| CryptoError::DecryptFailure)?;

    String::from_utf8(plaintext.to_vec()).map_err(|_| CryptoError::DecryptFailure)
}
