//! Gate read path: cold decrypt vs. cache hit.
//!
//! Run with: `cargo bench --bench gate_benchmark`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sealgate::{EncryptionGate, GateOptions, Payload, SecretKey};
use serde_json::json;

fn benchmark_gate_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_read");
    let value = json!({"user": "alice", "scopes": ["read", "write"], "note": "x".repeat(512)});

    let uncached = EncryptionGate::new(
        "bench-cold",
        SecretKey::generate().unwrap(),
        GateOptions::default().without_cache(),
    );
    let mut stored = Payload::new("profile", Some(value.clone()));
    uncached.encrypt_payload(&mut stored).unwrap();

    group.bench_function("decrypt_miss", |b| {
        b.iter(|| {
            let mut payload = stored.clone();
            uncached.decrypt_payload(black_box(&mut payload)).unwrap();
            payload
        });
    });

    let cached = EncryptionGate::new("bench-hot", SecretKey::generate().unwrap(), GateOptions::default());
    let mut stored = Payload::new("profile", Some(value));
    cached.encrypt_payload(&mut stored).unwrap();
    cached.decrypt_payload(&mut stored.clone()).unwrap();

    group.bench_function("cache_hit", |b| {
        b.iter(|| {
            let mut payload = stored.clone();
            cached.decrypt_payload(black_box(&mut payload)).unwrap();
            payload
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_gate_reads);
criterion_main!(benches);
