//! # Cross-Crate Property Tests
//!
//! The quantified laws of the runtime: id uniqueness, the causality
//! algebra, signed-subset round-tripping, signature laws against the gate
//! pipeline, and exactly-once handler invocation under overlapping routes.

#[cfg(test)]
use super::harness::{open, quiet_runtime};
#[cfg(test)]
use mesh_continuum::{handler_fn, Flow};
#[cfg(test)]
use mesh_crypto::{sign_bytes, KeyPair, SignedSubset};
#[cfg(test)]
use mesh_fabric::Fabric;
#[cfg(test)]
use mesh_runtime::{EventShell, NodeId, Separator};
#[cfg(test)]
use mesh_types::Event;
#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

/// Every observed event id is unique within the process lifetime.
#[cfg(test)]
#[tokio::test]
async fn property_event_ids_unique() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let producer = runtime.create_node("producer", open()).await.unwrap();
    let listener = runtime.create_node("listener", open()).await.unwrap();

    let ids: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = ids.clone();
    let _sub = listener
        .on(
            "tick.minor",
            handler_fn(move |event: Event, _| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(event.context.causal.id.to_string());
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    for i in 0..50 {
        producer
            .emit(EventShell::new("tick.minor").with_payload(json!(i)))
            .await
            .unwrap();
    }
    settle().await;

    let ids = ids.lock().clone();
    assert_eq!(ids.len(), 50);
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 50);

    runtime.shutdown().await;
}

/// For a handler-caused emit: `causation_id` is the inbound id and
/// `correlation_id` falls back to the inbound id when the inbound carried
/// none of its own interaction.
#[cfg(test)]
#[tokio::test]
async fn property_causality_algebra() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let origin_node = runtime.create_node("origin", open()).await.unwrap();
    let relay = runtime.create_node("relay", open()).await.unwrap();
    let terminus = runtime.create_node("terminus", open()).await.unwrap();

    let pair: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));

    let relay_handle = relay.clone();
    let first = pair.clone();
    let _hop = relay
        .on(
            "hop.one",
            handler_fn(move |event: Event, _| {
                let node = relay_handle.clone();
                let first = first.clone();
                async move {
                    first.lock().push(event.clone());
                    node.emit_from(&event, EventShell::new("hop.two"))
                        .await
                        .map_err(|e| mesh_continuum::FlowError::message(e.to_string()))?;
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    let second = pair.clone();
    let _end = terminus
        .on(
            "hop.two",
            handler_fn(move |event: Event, _| {
                let second = second.clone();
                async move {
                    second.lock().push(event.clone());
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    origin_node.emit(EventShell::new("hop.one")).await.unwrap();
    settle().await;

    let pair = pair.lock().clone();
    assert_eq!(pair.len(), 2);
    let (e1, e2) = (&pair[0], &pair[1]);

    assert_eq!(
        e2.context.causal.causation_id.as_ref().unwrap(),
        &e1.context.causal.id
    );
    // The root emit set its correlation to its own id, and the chain
    // preserves it.
    assert_eq!(
        e2.context.causal.correlation_id.as_ref().unwrap().as_str(),
        e1.context.causal.correlation_id.as_ref().unwrap().as_str()
    );
    assert_eq!(
        e1.context.causal.correlation_id.as_ref().unwrap().as_str(),
        e1.context.causal.id.as_str()
    );

    runtime.shutdown().await;
}

/// `decode(encode(e))` preserves the signed metadata subset bit-exactly:
/// the canonical sign bytes before and after the round trip are equal, so
/// the signature still verifies.
#[cfg(test)]
#[tokio::test]
async fn property_roundtrip_preserves_signed_subset() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let producer = runtime.create_node("producer", open()).await.unwrap();
    let listener = runtime.create_node("listener", open()).await.unwrap();

    let captured: Arc<Mutex<Option<Event>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();
    let _sub = listener
        .on(
            "audit.entry",
            handler_fn(move |event: Event, _| {
                let sink = sink.clone();
                async move {
                    *sink.lock() = Some(event);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    producer
        .emit(
            EventShell::new("audit.entry")
                .with_payload(json!({"z": [3, 1], "a": {"nested": true}})),
        )
        .await
        .unwrap();
    settle().await;

    let received = captured.lock().clone().expect("event delivered");
    let re_encoded = received.encode().unwrap();
    let decoded = Event::decode(&re_encoded).unwrap();

    let before = sign_bytes(
        &received.event_type,
        &received.payload,
        &SignedSubset::from(&received.context.causal),
    )
    .unwrap();
    let after = sign_bytes(
        &decoded.event_type,
        &decoded.payload,
        &SignedSubset::from(&decoded.context.causal),
    )
    .unwrap();
    assert_eq!(before, after);

    // The original signature still verifies over the round-tripped bytes.
    let integrity = decoded.context.integrity.as_ref().unwrap();
    let public_key = mesh_crypto::PublicKey::from_base64(&integrity.public_key).unwrap();
    let signature = mesh_crypto::Signature::from_base64(&integrity.signature).unwrap();
    assert!(public_key.verify(&after, &signature).is_ok());

    runtime.shutdown().await;
}

/// Signature law: `verify(pub, sign(priv, m), m)` holds and fails for any
/// other message.
#[cfg(test)]
#[test]
fn property_signature_law() {
    let keypair = KeyPair::generate();
    let message = b"law-abiding message";
    let signature = keypair.sign(message);

    assert!(keypair.public_key().verify(message, &signature).is_ok());
    assert!(keypair
        .public_key()
        .verify(b"some other message", &signature)
        .is_err());
}

/// A handler is invoked exactly once per event even when multiple fabric
/// routes carry the same event to the node.
#[cfg(test)]
#[tokio::test]
async fn property_exactly_once_per_matching_event() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let producer = runtime.create_node("producer", open()).await.unwrap();
    let listener = runtime.create_node("listener", open()).await.unwrap();

    let exact = Arc::new(AtomicUsize::new(0));
    let broad = Arc::new(AtomicUsize::new(0));

    let exact_counter = exact.clone();
    let _one = listener
        .on(
            "metric.cpu.load",
            handler_fn(move |_, _| {
                let counter = exact_counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    let broad_counter = broad.clone();
    let _two = listener
        .on(
            "metric.cpu.*",
            handler_fn(move |_, _| {
                let counter = broad_counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    for _ in 0..10 {
        producer
            .emit(EventShell::new("metric.cpu.load"))
            .await
            .unwrap();
    }
    settle().await;

    assert_eq!(exact.load(Ordering::SeqCst), 10);
    assert_eq!(broad.load(Ordering::SeqCst), 10);

    runtime.shutdown().await;
}

/// A duplicate envelope re-injected into the fabric is not re-delivered.
#[cfg(test)]
#[tokio::test]
async fn property_duplicate_suppressed() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let producer = runtime.create_node("producer", open()).await.unwrap();
    let listener = runtime.create_node("listener", open()).await.unwrap();

    let count = Arc::new(AtomicUsize::new(0));
    let captured: Arc<Mutex<Option<Event>>> = Arc::new(Mutex::new(None));

    let counter = count.clone();
    let sink = captured.clone();
    let _sub = listener
        .on(
            "ledger.append",
            handler_fn(move |event: Event, _| {
                let counter = counter.clone();
                let sink = sink.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    *sink.lock() = Some(event);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    producer.emit(EventShell::new("ledger.append")).await.unwrap();
    settle().await;

    // Replay the exact same envelope straight onto the fabric.
    let replayed = captured.lock().clone().expect("event delivered");
    runtime
        .fabric()
        .publish("events.ledger.append", replayed.encode().unwrap())
        .await
        .unwrap();
    settle().await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    runtime.shutdown().await;
}
