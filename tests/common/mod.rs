//! Shared fixtures: a HashMap-backed store that drives a `Pipeline` the way a
//! real storage engine would.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sealgate::{GateError, HookContext, Payload, Phase, Pipeline};
use serde_json::Value;

pub struct MemoryStore {
    pipeline: Arc<Pipeline>,
    data: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            data: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), GateError> {
        let mut payload = Payload::new(key, Some(value));
        self.pipeline
            .run(Phase::BeforeStorage, "set", &mut payload, &HookContext::for_event("set"))?;

        let mut data = self.data.lock();
        match payload.value {
            Some(value) => data.insert(key.to_string(), value),
            None => data.remove(key),
        };
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, GateError> {
        // Released before hooks run so callbacks can touch the store.
        let raw = self.data.lock().get(key).cloned();

        let mut payload = Payload::new(key, raw);
        self.pipeline
            .run(Phase::AfterStorage, "get", &mut payload, &HookContext::for_event("get"))?;
        Ok(payload.value)
    }

    pub fn delete(&self, key: &str) -> Result<(), GateError> {
        let mut payload = Payload::new(key, None);
        self.pipeline.run(
            Phase::BeforeStorage,
            "delete",
            &mut payload,
            &HookContext::for_event("delete"),
        )?;
        self.data.lock().remove(key);
        Ok(())
    }

    pub fn clear(&self) -> Result<(), GateError> {
        let mut payload = Payload::new("", None);
        self.pipeline
            .run(Phase::BeforeStorage, "clear", &mut payload, &HookContext::for_event("clear"))?;
        self.data.lock().clear();
        Ok(())
    }

    /// The stored value, bypassing every hook.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Overwrite the stored value, bypassing every hook.
    pub fn put_raw(&self, key: &str, value: Value) {
        self.data.lock().insert(key.to_string(), value);
    }
}

/// Fresh pipeline plus a store wired to it.
pub fn store() -> (Arc<Pipeline>, Arc<MemoryStore>) {
    let pipeline = Arc::new(Pipeline::new());
    let store = Arc::new(MemoryStore::new(Arc::clone(&pipeline)));
    (pipeline, store)
}
