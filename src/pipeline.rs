//! The event pipeline contract the gate plugs into.
//!
//! A storage engine emits named events (`"set"`, `"get"`, ...) around each
//! storage operation and runs the hooks registered for that event and phase.
//! Hooks see a mutable [`Payload`] and either let it continue or abort the
//! operation.
//!
//! [`Pipeline`] is a small in-process dispatcher that implements this
//! contract. Storage engines with their own hook engine only need the
//! [`Hook`] trait.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GateError;

/// Where a hook runs relative to the storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Before the value is persisted or the key is deleted.
    BeforeStorage,
    /// After the value has been loaded, before it is handed to the caller.
    AfterStorage,
}

/// A logical (key, value, metadata) triple flowing through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Identifier the value is stored under. Also the cache index.
    pub key: String,
    /// The data being transformed. `None` and `Some(Value::Null)` both mean
    /// "nothing here".
    pub value: Option<Value>,
    /// Passed through untouched.
    pub metadata: Option<Value>,
}

impl Payload {
    pub fn new(key: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            value,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// True when there is no value, or the value is JSON `null`.
    pub fn is_absent(&self) -> bool {
        matches!(self.value, None | Some(Value::Null))
    }
}

/// Opaque per-call context handed to every hook.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Name of the event being dispatched.
    pub event: String,
    /// Free-form data supplied by the storage engine.
    pub extras: serde_json::Map<String, Value>,
}

impl HookContext {
    pub fn for_event(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            extras: serde_json::Map::new(),
        }
    }
}

/// Result of running one hook.
#[derive(Debug)]
pub enum HookOutcome {
    /// Continue to the next hook, with the payload as the hook left it.
    Continue,
    /// Stop the operation and report the error to the caller.
    Abort(GateError),
}

/// An installable unit of pipeline behavior.
pub trait Hook: Send + Sync {
    /// Stable identifier. Registering a hook with an id already present
    /// replaces the earlier one.
    fn id(&self) -> &str;

    /// Event names that trigger this hook.
    fn events(&self) -> &[String];

    fn phase(&self) -> Phase;

    fn handle(&self, payload: &mut Payload, ctx: &HookContext) -> HookOutcome;

    fn triggers_on(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }
}

/// In-process hook dispatcher.
///
/// The hook list is snapshotted before handlers run, so a handler (or a
/// callback it fires) may register, unregister or dispatch on the same
/// pipeline without deadlocking.
#[derive(Default)]
pub struct Pipeline {
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("hooks", &self.hook_ids())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. An existing hook with the same id is replaced in place.
    pub fn register(&self, hook: Arc<dyn Hook>) {
        let mut hooks = self.hooks.write();
        match hooks.iter_mut().find(|h| h.id() == hook.id()) {
            Some(slot) => *slot = hook,
            None => hooks.push(hook),
        }
    }

    /// Remove a hook by id. Returns whether it was present.
    pub fn unregister(&self, id: &str) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|h| h.id() != id);
        hooks.len() != before
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.hooks.read().iter().any(|h| h.id() == id)
    }

    pub fn hook_ids(&self) -> Vec<String> {
        self.hooks.read().iter().map(|h| h.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Run every hook registered for `event` in `phase`, in registration
    /// order. The first abort stops the phase and is returned.
    pub fn run(
        &self,
        phase: Phase,
        event: &str,
        payload: &mut Payload,
        ctx: &HookContext,
    ) -> Result<(), GateError> {
        let matching: Vec<Arc<dyn Hook>> = self
            .hooks
            .read()
            .iter()
            .filter(|h| h.phase() == phase && h.triggers_on(event))
            .cloned()
            .collect();

        for hook in matching {
            if let HookOutcome::Abort(err) = hook.handle(payload, ctx) {
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use serde_json::json;

    struct Tagger {
        id: String,
        events: Vec<String>,
        phase: Phase,
        suffix: &'static str,
        abort: bool,
    }

    impl Tagger {
        fn new(id: &str, phase: Phase, suffix: &'static str) -> Self {
            Self {
                id: id.into(),
                events: vec!["set".into()],
                phase,
                suffix,
                abort: false,
            }
        }
    }

    impl Hook for Tagger {
        fn id(&self) -> &str {
            &self.id
        }
        fn events(&self) -> &[String] {
            &self.events
        }
        fn phase(&self) -> Phase {
            self.phase
        }
        fn handle(&self, payload: &mut Payload, _ctx: &HookContext) -> HookOutcome {
            if self.abort {
                return HookOutcome::Abort(GateError::Encrypt {
                    key: payload.key.clone(),
                    source: CryptoError::EncryptionFailure,
                });
            }
            let current = payload.value.as_ref().and_then(Value::as_str).unwrap_or("");
            payload.value = Some(json!(format!("{current}{}", self.suffix)));
            HookOutcome::Continue
        }
    }

    #[test]
    fn test_hooks_run_in_registration_order_per_phase() {
        let pipeline = Pipeline::new();
        pipeline.register(Arc::new(Tagger::new("a", Phase::BeforeStorage, "a")));
        pipeline.register(Arc::new(Tagger::new("b", Phase::BeforeStorage, "b")));
        pipeline.register(Arc::new(Tagger::new("c", Phase::AfterStorage, "c")));

        let mut payload = Payload::new("k", Some(json!("")));
        let ctx = HookContext::for_event("set");
        pipeline.run(Phase::BeforeStorage, "set", &mut payload, &ctx).unwrap();
        assert_eq!(payload.value, Some(json!("ab")));

        // Unknown events touch nothing.
        pipeline.run(Phase::BeforeStorage, "get", &mut payload, &ctx).unwrap();
        assert_eq!(payload.value, Some(json!("ab")));
    }

    #[test]
    fn test_reregistering_replaces_hook() {
        let pipeline = Pipeline::new();
        pipeline.register(Arc::new(Tagger::new("a", Phase::BeforeStorage, "1")));
        pipeline.register(Arc::new(Tagger::new("a", Phase::BeforeStorage, "2")));
        assert_eq!(pipeline.len(), 1);

        let mut payload = Payload::new("k", None);
        pipeline
            .run(Phase::BeforeStorage, "set", &mut payload, &HookContext::for_event("set"))
            .unwrap();
        assert_eq!(payload.value, Some(json!("2")));

        assert!(pipeline.unregister("a"));
        assert!(!pipeline.unregister("a"));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_abort_stops_later_hooks() {
        let pipeline = Pipeline::new();
        let mut failing = Tagger::new("fail", Phase::BeforeStorage, "x");
        failing.abort = true;
        pipeline.register(Arc::new(failing));
        pipeline.register(Arc::new(Tagger::new("after", Phase::BeforeStorage, "y")));

        let mut payload = Payload::new("k", Some(json!("")));
        let err = pipeline
            .run(Phase::BeforeStorage, "set", &mut payload, &HookContext::for_event("set"))
            .unwrap_err();
        assert_eq!(err.key(), "k");
        assert_eq!(payload.value, Some(json!("")));
    }

    #[test]
    fn test_payload_absence() {
        assert!(Payload::new("k", None).is_absent());
        assert!(Payload::new("k", Some(Value::Null)).is_absent());
        assert!(!Payload::new("k", Some(json!(0))).is_absent());
    }
}
