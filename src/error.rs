//! Error types for sealgate.
//!
//! Every variant is a distinct failure mode. Messages signal *what* failed
//! without revealing *why* in ways that could leak cryptographic state: the
//! decrypt path deliberately collapses wrong keys, tampered bytes, bad padding,
//! bad UTF-8 and bad JSON into one `DecryptFailure`.

use thiserror::Error;

/// Why an externally supplied key was rejected.
///
/// None of the variants carry key content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The encoded key was an empty string.
    #[error("key is empty")]
    Empty,

    /// The encoded key is not valid standard base64.
    #[error("key is not valid base64")]
    Malformed,

    /// The key decoded (or was supplied) with the wrong number of bytes.
    #[error("key must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Failures raised by key handling and the cipher codecs.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key was empty, malformed, or not 32 bytes.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    /// The input is smaller than the smallest structurally valid record.
    #[error("ciphertext too short: need at least {minimum} bytes, got {actual}")]
    CiphertextTooShort { minimum: usize, actual: usize },

    /// Decryption failed. Covers wrong key, tampered ciphertext, GCM tag
    /// mismatch, invalid padding, non-UTF-8 plaintext and undecodable JSON.
    #[error("decryption failed")]
    DecryptFailure,

    /// Serializing or encoding a value on the write path failed.
    #[error("encoding failed: {0}")]
    EncodingFailure(String),

    /// The underlying cipher refused to seal the plaintext.
    #[error("encryption failed")]
    EncryptionFailure,

    /// The system's random number generator failed to produce bytes.
    #[error("randomness source failed")]
    RandomnessFailure,
}

/// A pipeline-level abort raised by the gate.
///
/// The message names the logical key only. The underlying codec error is
/// available through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to encrypt value for `{key}`")]
    Encrypt {
        key: String,
        #[source]
        source: CryptoError,
    },

    #[error("failed to decrypt value for `{key}`")]
    Decrypt {
        key: String,
        #[source]
        source: CryptoError,
    },
}

impl GateError {
    /// The logical key of the payload that failed.
    pub fn key(&self) -> &str {
        match self {
            Self::Encrypt { key, .. } | Self::Decrypt { key, .. } => key,
        }
    }

    /// The codec or encoding error that caused the abort.
    pub fn cause(&self) -> &CryptoError {
        match self {
            Self::Encrypt { source, .. } | Self::Decrypt { source, .. } => source,
        }
    }

    pub fn is_decrypt(&self) -> bool {
        matches!(self, Self::Decrypt { .. })
    }
}
