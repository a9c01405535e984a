//! Performance benchmarks for the hot paths of the mesh runtime:
//! pattern compilation and matching, canonical encoding, payload
//! fingerprints, and event signing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mesh_crypto::{canonical_bytes, schema_fingerprint, sign_bytes, KeyPair, SignedSubset};
use mesh_pattern::{compile_cached, Matcher};
use mesh_types::{CorrelationId, EventId, NodeId, Separator};
use serde_json::json;

fn bench_pattern_compile(c: &mut Criterion) {
    c.bench_function("pattern_compile_cold", |b| {
        b.iter(|| Matcher::compile(black_box("user.profile.*"), Separator::Dot).unwrap())
    });

    c.bench_function("pattern_compile_cached", |b| {
        b.iter(|| compile_cached(black_box("user.profile.*"), Separator::Dot).unwrap())
    });
}

fn bench_pattern_match(c: &mut Criterion) {
    let matcher = Matcher::compile("order.{created,updated}.*", Separator::Dot).unwrap();
    c.bench_function("pattern_match", |b| {
        b.iter(|| matcher.matches(black_box("order.created.v2")))
    });
}

fn bench_canonical_encoding(c: &mut Criterion) {
    let payload = json!({
        "order": {"sku": "A-1", "qty": 3, "tags": ["rush", "gift"]},
        "customer": {"id": "c-42", "tier": "gold"},
        "totals": {"net": 109.5, "tax": 21.9},
    });

    c.bench_function("canonical_bytes", |b| {
        b.iter(|| canonical_bytes(black_box(&payload)).unwrap())
    });

    c.bench_function("schema_fingerprint", |b| {
        b.iter(|| schema_fingerprint(black_box(&payload)).unwrap())
    });
}

fn bench_signing(c: &mut Criterion) {
    let keypair = KeyPair::generate();
    let payload = json!({"sku": "A-1", "qty": 3});
    let subset = SignedSubset {
        id: EventId::generate(),
        sender: NodeId::new("bench-node"),
        timestamp: 1_700_000_000_000,
        causation_id: None,
        correlation_id: Some(CorrelationId::from_string("bench")),
    };
    let bytes = sign_bytes("order.created", &payload, &subset).unwrap();
    let signature = keypair.sign(&bytes);

    c.bench_function("event_sign", |b| b.iter(|| keypair.sign(black_box(&bytes))));

    c.bench_function("event_verify", |b| {
        b.iter(|| {
            keypair
                .public_key()
                .verify(black_box(&bytes), &signature)
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_pattern_compile,
    bench_pattern_match,
    bench_canonical_encoding,
    bench_signing
);
criterion_main!(benches);
