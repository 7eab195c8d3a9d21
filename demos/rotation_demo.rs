//! Minimal example: sealgate over a toy key-value store, with a failure
//! callback that rotates the key.
//!
//! Run with: `RUST_LOG=sealgate=debug cargo run --example rotation_demo`
//!
//! - A value is written through the pipeline and lands in storage encrypted
//! - Reading it back goes through the decrypt hook and the cache
//! - Stored bytes are corrupted behind the gate's back
//! - The next read fails; the failure callback installs a fresh key and
//!   reissues the value before the failing read returns

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sealgate::{
    decode_key, generate_key, Algorithm, EncryptionGate, GateError, GateOptions, HookContext,
    Payload, Phase, Pipeline,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// A storage engine in a dozen lines: a map plus the two pipeline phases.
struct ToyStore {
    pipeline: Arc<Pipeline>,
    data: Mutex<HashMap<String, Value>>,
}

impl ToyStore {
    fn set(&self, key: &str, value: Value) -> Result<(), GateError> {
        let mut payload = Payload::new(key, Some(value));
        self.pipeline
            .run(Phase::BeforeStorage, "set", &mut payload, &HookContext::for_event("set"))?;
        if let Some(value) = payload.value {
            self.data.lock().insert(key.to_string(), value);
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, GateError> {
        let raw = self.data.lock().get(key).cloned();
        let mut payload = Payload::new(key, raw);
        self.pipeline
            .run(Phase::AfterStorage, "get", &mut payload, &HookContext::for_event("get"))?;
        Ok(payload.value)
    }
}

fn options() -> GateOptions {
    GateOptions::default()
        .with_algorithm(Algorithm::AesCbc)
        .without_cache()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Setup
    let pipeline = Arc::new(Pipeline::new());
    let store = Arc::new(ToyStore {
        pipeline: Arc::clone(&pipeline),
        data: Mutex::new(HashMap::new()),
    });

    let weak_store = Arc::downgrade(&store);
    let weak_pipeline = Arc::downgrade(&pipeline);
    let gate = EncryptionGate::builder("demo", decode_key(&generate_key()?)?)
        .options(options())
        .on_failure(move |key, err| {
            println!("Read of `{key}` failed ({err}); rotating key");
            let (Some(store), Some(pipeline)) = (weak_store.upgrade(), weak_pipeline.upgrade())
            else {
                return;
            };
            let Ok(encoded) = generate_key() else { return };
            let Ok(fresh_key) = decode_key(&encoded) else { return };
            EncryptionGate::new("demo", fresh_key, options()).install(&pipeline);
            if let Err(err) = store.set(key, json!("reissued after rotation")) {
                println!("Reissue failed: {err}");
            }
        })
        .build();
    gate.install(&pipeline);

    // 2. Write and read through the gate
    store.set("secret", json!("hello world"))?;
    println!("Stored: {}", store.data.lock()["secret"]);
    println!("Read back: {:?}", store.get("secret")?);

    // 3. Corrupt the stored record
    store
        .data
        .lock()
        .insert("secret".into(), json!("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="));

    // 4. The failing read triggers rotation
    match store.get("secret") {
        Ok(value) => println!("Unexpected value: {value:?}"),
        Err(err) => println!("Read failed as expected: {err}"),
    }
    println!("After rotation: {:?}", store.get("secret")?);
    println!("Original gate stats: {}", serde_json::to_string(&gate.stats())?);

    Ok(())
}
