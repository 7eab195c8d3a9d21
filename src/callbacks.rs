//! Success and failure notifications for decrypt operations.
//!
//! Callbacks are how a caller layers a rotation policy on top of the gate:
//! a failure callback can install a gate with a new key, or queue the
//! affected logical key for re-encryption. They are invoked synchronously,
//! in registration order, with no gate lock held.

use std::sync::Arc;

use serde_json::Value;

use crate::error::CryptoError;

/// Called with `(logical_key, value)` after a successful decrypt or cache hit.
pub type SuccessCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Called with `(logical_key, error)` when a read fails to decrypt.
pub type FailureCallback = Arc<dyn Fn(&str, &CryptoError) + Send + Sync>;

/// Ordered callback lists. Fixed once the owning gate is built.
#[derive(Clone, Default)]
pub struct Callbacks {
    success: Vec<SuccessCallback>,
    failure: Vec<FailureCallback>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("success", &self.success.len())
            .field("failure", &self.failure.len())
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success<F>(&mut self, callback: F)
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.success.push(Arc::new(callback));
    }

    pub fn on_failure<F>(&mut self, callback: F)
    where
        F: Fn(&str, &CryptoError) + Send + Sync + 'static,
    {
        self.failure.push(Arc::new(callback));
    }

    pub fn notify_success(&self, key: &str, value: &Value) {
        for callback in &self.success {
            callback(key, value);
        }
    }

    pub fn notify_failure(&self, key: &str, error: &CryptoError) {
        for callback in &self.failure {
            callback(key, error);
        }
    }

    pub fn success_count(&self) -> usize {
        self.success.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failure.len()
    }
}
