//! # sealgate
//!
//! Transparent encryption-at-rest for key-value storage pipelines.
//!
//! A storage engine emits events around each operation. An [`EncryptionGate`]
//! installs hooks on those events: values are sealed (JSON, AES, base64)
//! before they are persisted and opened again after they are loaded. Decrypted
//! values are kept in a small insertion-ordered cache, and every read reports
//! success or failure through callbacks so a caller can drive key rotation.
//!
//! ## Quick start
//!
//! ```rust
//! use sealgate::{decode_key, generate_key, Algorithm, EncryptionGate, GateOptions, Payload};
//! use serde_json::json;
//!
//! let key = decode_key(&generate_key().unwrap()).unwrap();
//! let gate = EncryptionGate::new(
//!     "app",
//!     key,
//!     GateOptions::default().with_algorithm(Algorithm::AesGcm),
//! );
//!
//! let mut payload = Payload::new("secret", Some(json!("hello world")));
//! gate.handle_event("set", &mut payload).unwrap();
//! assert_ne!(payload.value, Some(json!("hello world")));
//!
//! gate.handle_event("get", &mut payload).unwrap();
//! assert_eq!(payload.value, Some(json!("hello world")));
//! ```
//!
//! ## Wire formats
//!
//! ```text
//! AES-CBC: base64( iv (16) || ciphertext (PKCS#7, multiple of 16) )
//! AES-GCM: base64( nonce (12) || ciphertext || tag (16) )
//! ```
//!
//! Records carry no algorithm or version marker.

pub mod cache;
pub mod callbacks;
pub mod codec;
pub mod config;
pub mod error;
pub mod gate;
pub mod keys;
pub mod pipeline;

pub use cache::{CacheStats, DecryptCache};
pub use callbacks::{Callbacks, FailureCallback, SuccessCallback};
pub use codec::{Algorithm, KEY_LEN};
pub use config::GateOptions;
pub use error::{CryptoError, GateError, KeyError};
pub use gate::{Behavior, EncryptionGate, EventClass, GateBuilder, GateStats};
pub use keys::{decode_key, generate_key, validate_key, SecretKey};
pub use pipeline::{Hook, HookContext, HookOutcome, Payload, Phase, Pipeline};
