//! Gate options.
//!
//! Everything a gate needs except the key. Options are plain data so they can
//! live in an application's config file; key material never does.

use serde::{Deserialize, Serialize};

use crate::codec::Algorithm;
use crate::error::CryptoError;

/// Default upper bound on cached decrypted values.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateOptions {
    pub algorithm: Algorithm,
    /// Events whose payload is about to be persisted.
    pub write_events: Vec<String>,
    /// Events whose payload was just loaded from storage.
    pub read_events: Vec<String>,
    /// Events that remove a single key.
    pub delete_events: Vec<String>,
    /// Events that wipe the whole store.
    pub clear_events: Vec<String>,
    pub cache_enabled: bool,
    /// `0` means unbounded.
    pub max_cache_size: usize,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            write_events: vec!["set".into()],
            read_events: vec!["get".into()],
            delete_events: vec!["delete".into()],
            clear_events: vec!["clear".into()],
            cache_enabled: true,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
        }
    }
}

impl GateOptions {
    /// Parse options from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(json).map_err(|e| CryptoError::EncodingFailure(e.to_string()))
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_cache(mut self, enabled: bool, max_size: usize) -> Self {
        self.cache_enabled = enabled;
        self.max_cache_size = max_size;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}
