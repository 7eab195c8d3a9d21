//! AES-256-CBC codec with PKCS#7 padding.
//!
//! CBC gives confidentiality only. A wrong key or corrupted body usually
//! surfaces as a padding or UTF-8 failure, and both are reported as the same
//! `DecryptFailure` so callers cannot tell which check tripped.

use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::{check_key_len, fill_random};
use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Size of the initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// IV plus at least one padded block.
pub const MIN_CIPHERTEXT_LEN: usize = IV_LEN + BLOCK_LEN;

/// Encrypt a string with AES-256-CBC under a fresh random IV.
///
/// # Layout of returned bytes
/// ```text
/// [ iv (16 bytes) ][ ciphertext (multiple of 16 bytes) ]
/// ```
pub fn encrypt(plaintext: &str, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_key_len(key)?;

    let mut iv = [0u8; IV_LEN];
    fill_random(&mut iv)?;

    let cipher =
        Aes256CbcEnc::new_from_slices(key, &iv).map_err(|_| CryptoError::EncryptionFailure)?;
    let body = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut output = Vec::with_capacity(IV_LEN + body.len());
    output.extend_from_slice(&iv);
    output.extend_from_slice(&body);
    Ok(output)
}

/// Decrypt a record produced by [`encrypt`].
pub fn decrypt(data: &[u8], key: &[u8]) -> Result<String, CryptoError> {
    check_key_len(key)?;

    if data.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            minimum: MIN_CIPHERTEXT_LEN,
            actual: data.len(),
        });
    }

    let (iv, body) = data.split_at(IV_LEN);
    if body.len() % BLOCK_LEN != 0 {
        return Err(CryptoError::DecryptFailure);
    }

    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| CryptoError::DecryptFailure)?;
    let padded = cipher
        .decrypt_padded_vec_mut::<NoPadding>(body)
        .map_err(|_| CryptoError::DecryptFailure)?;

    let unpadded = strip_pkcs7(&padded)?;
    String::from_utf8(unpadded.to_vec()).map_err(|_| CryptoError::DecryptFailure)
}

/// Validate and remove PKCS#7 padding.
///
/// The pad value must be in `1..=16` and every padding byte must equal it.
/// All candidate padding bytes are inspected regardless of where the first
/// mismatch is.
fn strip_pkcs7(padded: &[u8]) -> Result<&[u8], CryptoError> {
    let last = *padded.last().ok_or(CryptoError::DecryptFailure)?;
    let pad = last as usize;
    if pad == 0 || pad > BLOCK_LEN || pad > padded.len() {
        return Err(CryptoError::DecryptFailure);
    }

    let mismatch = padded[padded.len() - pad..]
        .iter()
        .fold(0u8, |acc, byte| acc | (byte ^ last));
    if mismatch != 0 {
        return Err(CryptoError::DecryptFailure);
    }

    Ok(&padded[..padded.len() - pad])
}
