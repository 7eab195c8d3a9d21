//! The encryption gate.
//!
//! A gate binds one key, one algorithm, an optional decrypt cache and the
//! success/failure callbacks to a set of pipeline events:
//!
//! 1. Write events: invalidate the cache entry, then seal the value
//!    (JSON, encrypt, base64) before it reaches storage.
//! 2. Read events: serve from cache, or open the stored string (base64,
//!    decrypt, JSON) and notify callbacks. A failed open aborts the read.
//! 3. Delete events: invalidate the one cache entry.
//! 4. Clear events: drop the whole cache.
//!
//! The cache lock is held only for the cache operation itself. Callbacks run
//! with no lock held, so a failure callback may install a replacement gate or
//! issue further reads and writes from inside the failing read.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStats, DecryptCache};
use crate::callbacks::Callbacks;
use crate::codec::Algorithm;
use crate::config::GateOptions;
use crate::error::{CryptoError, GateError};
use crate::keys::SecretKey;
use crate::pipeline::{Hook, HookContext, HookOutcome, Payload, Phase, Pipeline};

/// Which transition an event name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Write,
    Read,
    Delete,
    Clear,
}

/// The three hooks a gate installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Encrypt,
    Decrypt,
    Invalidate,
}

impl Behavior {
    pub const ALL: [Behavior; 3] = [Behavior::Encrypt, Behavior::Decrypt, Behavior::Invalidate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Invalidate => "invalidate",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Encrypt | Self::Invalidate => Phase::BeforeStorage,
            Self::Decrypt => Phase::AfterStorage,
        }
    }
}

/// Point-in-time view of a gate's counters.
#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    pub environment: String,
    pub algorithm: Algorithm,
    /// `None` when caching is disabled.
    pub cache: Option<CacheStats>,
    pub decrypt_failures: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct FailureLog {
    count: u64,
    last_at: Option<DateTime<Utc>>,
}

/// Builds an [`EncryptionGate`]. Configuration is frozen by [`GateBuilder::build`].
pub struct GateBuilder {
    environment: String,
    key: SecretKey,
    options: GateOptions,
    callbacks: Callbacks,
}

impl GateBuilder {
    pub fn options(mut self, options: GateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.options.algorithm = algorithm;
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.callbacks.on_success(callback);
        self
    }

    pub fn on_failure<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &CryptoError) + Send + Sync + 'static,
    {
        self.callbacks.on_failure(callback);
        self
    }

    pub fn build(self) -> Arc<EncryptionGate> {
        let cache = self
            .options
            .cache_enabled
            .then(|| Mutex::new(DecryptCache::new(self.options.max_cache_size)));

        Arc::new(EncryptionGate {
            environment: self.environment,
            key: self.key,
            options: self.options,
            cache,
            callbacks: self.callbacks,
            failures: Mutex::new(FailureLog::default()),
        })
    }
}

/// Transparent encrypt-on-write / decrypt-on-read for one storage environment.
#[derive(Debug)]
pub struct EncryptionGate {
    environment: String,
    key: SecretKey,
    options: GateOptions,
    cache: Option<Mutex<DecryptCache>>,
    callbacks: Callbacks,
    failures: Mutex<FailureLog>,
}

impl EncryptionGate {
    pub fn builder(environment: impl Into<String>, key: SecretKey) -> GateBuilder {
        GateBuilder {
            environment: environment.into(),
            key,
            options: GateOptions::default(),
            callbacks: Callbacks::new(),
        }
    }

    /// Shorthand for a gate without callbacks.
    pub fn new(environment: impl Into<String>, key: SecretKey, options: GateOptions) -> Arc<Self> {
        Self::builder(environment, key).options(options).build()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn algorithm(&self) -> Algorithm {
        self.options.algorithm
    }

    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    pub fn classify(&self, event: &str) -> Option<EventClass> {
        let has = |names: &[String]| names.iter().any(|n| n == event);
        if has(&self.options.write_events) {
            Some(EventClass::Write)
        } else if has(&self.options.read_events) {
            Some(EventClass::Read)
        } else if has(&self.options.delete_events) {
            Some(EventClass::Delete)
        } else if has(&self.options.clear_events) {
            Some(EventClass::Clear)
        } else {
            None
        }
    }

    /// Apply the transition for `event` directly, without a pipeline.
    /// Unknown events pass through.
    pub fn handle_event(&self, event: &str, payload: &mut Payload) -> Result<(), GateError> {
        match self.classify(event) {
            Some(EventClass::Write) => self.encrypt_payload(payload),
            Some(EventClass::Read) => self.decrypt_payload(payload),
            Some(EventClass::Delete) => {
                self.invalidate(&payload.key);
                Ok(())
            }
            Some(EventClass::Clear) => {
                self.clear_cache();
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Write transition: replace the payload value with its sealed form.
    pub fn encrypt_payload(&self, payload: &mut Payload) -> Result<(), GateError> {
        self.invalidate(&payload.key);

        let value = match &payload.value {
            None | Some(Value::Null) => return Ok(()),
            Some(value) => value,
        };

        let sealed = self.seal(value).map_err(|source| GateError::Encrypt {
            key: payload.key.clone(),
            source,
        })?;
        payload.value = Some(Value::String(sealed));
        Ok(())
    }

    /// Read transition: replace a stored string with the decrypted value.
    ///
    /// Absent and non-string values pass through untouched.
    pub fn decrypt_payload(&self, payload: &mut Payload) -> Result<(), GateError> {
        let encoded = match &payload.value {
            Some(Value::String(encoded)) => encoded,
            _ => return Ok(()),
        };

        let mut epoch = None;
        if let Some(cache) = &self.cache {
            let mut cache = cache.lock();
            match cache.get(&payload.key) {
                Some(hit) => {
                    drop(cache);
                    debug!(env = %self.environment, key = %payload.key, "decrypt cache hit");
                    self.callbacks.notify_success(&payload.key, &hit);
                    payload.value = Some(hit);
                    return Ok(());
                }
                None => epoch = Some(cache.epoch()),
            }
        }

        match self.open(encoded) {
            Ok(value) => {
                self.callbacks.notify_success(&payload.key, &value);
                if let (Some(cache), Some(epoch)) = (&self.cache, epoch) {
                    self.remember(cache, &payload.key, &value, epoch);
                }
                payload.value = Some(value);
                Ok(())
            }
            Err(source) => {
                {
                    let mut failures = self.failures.lock();
                    failures.count += 1;
                    failures.last_at = Some(Utc::now());
                }
                warn!(
                    env = %self.environment,
                    key = %payload.key,
                    algorithm = %self.options.algorithm,
                    error = %source,
                    "decrypt failed"
                );
                self.callbacks.notify_failure(&payload.key, &source);
                Err(GateError::Decrypt {
                    key: payload.key.clone(),
                    source,
                })
            }
        }
    }

    /// Drop one cached value. No-op when caching is disabled.
    pub fn invalidate(&self, key: &str) {
        if let Some(cache) = &self.cache {
            cache.lock().invalidate(key);
        }
    }

    /// Drop every cached value. No-op when caching is disabled.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
            debug!(env = %self.environment, "decrypt cache cleared");
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().size())
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|cache| cache.lock().contains(key))
    }

    pub fn stats(&self) -> GateStats {
        let failures = self.failures.lock();
        GateStats {
            environment: self.environment.clone(),
            algorithm: self.options.algorithm,
            cache: self.cache.as_ref().map(|cache| cache.lock().stats()),
            decrypt_failures: failures.count,
            last_failure_at: failures.last_at,
        }
    }

    /// Stable pipeline id for one of this gate's hooks.
    pub fn hook_id(&self, behavior: Behavior) -> String {
        format!("{}:{}", self.environment, behavior.as_str())
    }

    /// The encrypt, decrypt and invalidate hooks for this gate.
    pub fn hooks(self: &Arc<Self>) -> Vec<Arc<dyn Hook>> {
        Behavior::ALL
            .into_iter()
            .map(|behavior| {
                let events = match behavior {
                    Behavior::Encrypt => self.options.write_events.clone(),
                    Behavior::Decrypt => self.options.read_events.clone(),
                    Behavior::Invalidate => self
                        .options
                        .delete_events
                        .iter()
                        .chain(&self.options.clear_events)
                        .cloned()
                        .collect(),
                };
                Arc::new(GateHook {
                    id: self.hook_id(behavior),
                    gate: Arc::clone(self),
                    behavior,
                    events,
                }) as Arc<dyn Hook>
            })
            .collect()
    }

    /// Register this gate's hooks. Installing again replaces the previous
    /// registration, including one from an earlier gate for the same
    /// environment.
    pub fn install(self: &Arc<Self>, pipeline: &Pipeline) {
        for hook in self.hooks() {
            pipeline.register(hook);
        }
        debug!(env = %self.environment, algorithm = %self.options.algorithm, "gate installed");
    }

    /// Remove this environment's hooks. Safe to call when not installed.
    pub fn uninstall(&self, pipeline: &Pipeline) {
        for behavior in Behavior::ALL {
            pipeline.unregister(&self.hook_id(behavior));
        }
        debug!(env = %self.environment, "gate uninstalled");
    }

    /// Uninstall and drop all cached plaintext. Callbacks are released when the
    /// last handle to the gate is dropped.
    pub fn dispose(&self, pipeline: &Pipeline) {
        self.uninstall(pipeline);
        self.clear_cache();
    }

    fn seal(&self, value: &Value) -> Result<String, CryptoError> {
        let json =
            serde_json::to_string(value).map_err(|e| CryptoError::EncodingFailure(e.to_string()))?;
        let sealed = self.options.algorithm.encrypt(&json, self.key.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    }

    fn open(&self, encoded: &str) -> Result<Value, CryptoError> {
        let sealed = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::DecryptFailure)?;
        let json = self.options.algorithm.decrypt(&sealed, self.key.as_bytes())?;
        serde_json::from_str(&json).map_err(|_| CryptoError::DecryptFailure)
    }

    fn remember(&self, cache: &Mutex<DecryptCache>, key: &str, value: &Value, epoch: u64) {
        let mut cache = cache.lock();
        if cache.epoch() != epoch {
            debug!(env = %self.environment, key = %key, "skipping cache insert after invalidation");
            return;
        }
        if let Some(evicted) = cache.put(key, value.clone()) {
            debug!(env = %self.environment, key = %evicted, "decrypt cache evicted");
        }
    }
}

/// One of the three pipeline hooks backed by a gate.
struct GateHook {
    id: String,
    gate: Arc<EncryptionGate>,
    behavior: Behavior,
    events: Vec<String>,
}

impl Hook for GateHook {
    fn id(&self) -> &str {
        &self.id
    }

    fn events(&self) -> &[String] {
        &self.events
    }

    fn phase(&self) -> Phase {
        self.behavior.phase()
    }

    fn handle(&self, payload: &mut Payload, ctx: &HookContext) -> HookOutcome {
        let result = match self.behavior {
            Behavior::Encrypt => self.gate.encrypt_payload(payload),
            Behavior::Decrypt => self.gate.decrypt_payload(payload),
            Behavior::Invalidate => {
                // An empty logical key means "everything".
                let clear_all = self.gate.classify(&ctx.event) == Some(EventClass::Clear)
                    || payload.key.is_empty();
                if clear_all {
                    self.gate.clear_cache();
                } else {
                    self.gate.invalidate(&payload.key);
                }
                Ok(())
            }
        };

        match result {
            Ok(()) => HookOutcome::Continue,
            Err(err) => HookOutcome::Abort(err),
        }
    }
}
