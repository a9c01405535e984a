//! # End-to-End Interaction Scenarios
//!
//! The canonical flows driven over a live runtime: ping-pong with a
//! completion signal, causal chains across three nodes, accept-policy
//! filtering, wildcard subscriptions, the self-returning continuum loop,
//! and group fan-out with per-member error isolation.

#[cfg(test)]
use super::harness::{open, quiet_runtime};
#[cfg(test)]
use mesh_continuum::{handler_fn, Flow, FlowContext};
#[cfg(test)]
use mesh_node::{for_group, AcceptPolicy, NodeOptions, Reply};
#[cfg(test)]
use mesh_runtime::{EventShell, NodeId, Separator};
#[cfg(test)]
use mesh_types::{CorrelationId, Event};
#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
async fn settle() {
    tokio::time::sleep(Duration::from_millis(120)).await;
}

/// Scenario: ping-pong with a completion signal.
///
/// `A` broadcasts `basic-event` with a signal request; `B` handles it; the
/// runtime publishes `_signal.S`; `A`'s signal subscription fires exactly
/// once. Final state: `A.pings = 1`, `B.received = 1`, trace length 2.
#[cfg(test)]
#[tokio::test]
async fn scenario_ping_pong_with_signal() {
    let runtime = quiet_runtime(Separator::Hyphen).await;
    let node_a = runtime.create_node("node-a", open()).await.unwrap();
    let node_b = runtime.create_node("node-b", open()).await.unwrap();
    node_a.set_state(json!({"pings": 0}));
    node_b.set_state(json!({"received": 0}));

    let trace: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let b_trace = trace.clone();
    let b_handle = node_b.clone();
    let _on_basic = node_b
        .on(
            "basic-event",
            handler_fn(move |event: Event, _| {
                let trace = b_trace.clone();
                let node = b_handle.clone();
                async move {
                    trace.lock().push(event.event_type.clone());
                    node.update_state(|state| {
                        state["received"] = json!(state["received"].as_u64().unwrap_or(0) + 1);
                    });
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    let a_trace = trace.clone();
    let a_handle = node_a.clone();
    let _on_signal = node_a
        .on(
            "_signal.S",
            handler_fn(move |event: Event, _| {
                let trace = a_trace.clone();
                let node = a_handle.clone();
                async move {
                    trace.lock().push(event.event_type.clone());
                    node.update_state(|state| {
                        state["pings"] = json!(state["pings"].as_u64().unwrap_or(0) + 1);
                    });
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    node_a
        .broadcast(EventShell::new("basic-event").with_signal("S"))
        .await
        .unwrap();
    settle().await;

    let trace = trace.lock().clone();
    assert_eq!(trace, vec!["basic-event", "_signal.S"]);

    let views = runtime.views();
    let pings = views
        .get(&NodeId::new("node-a"), &mesh_views::Selector::field("pings"))
        .unwrap();
    let received = views
        .get(
            &NodeId::new("node-b"),
            &mesh_views::Selector::field("received"),
        )
        .unwrap();
    assert_eq!(pings, json!(1));
    assert_eq!(received, json!(1));

    runtime.shutdown().await;
}

/// Scenario: chained A → B → C under one correlation.
///
/// Every event in the chain shares `correlationId = C0`; each hop's
/// `causationId` is the id of the event that triggered it; senders come
/// out `[A, B, C]`.
#[cfg(test)]
#[tokio::test]
async fn scenario_chained_causality() {
    let runtime = quiet_runtime(Separator::Hyphen).await;
    let node_a = runtime.create_node("chain-a", open()).await.unwrap();
    let node_b = runtime.create_node("chain-b", open()).await.unwrap();
    let node_c = runtime.create_node("chain-c", open()).await.unwrap();

    let observed: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));

    let b_observed = observed.clone();
    let b_handle = node_b.clone();
    let _on_a = node_b
        .on(
            "event-A",
            handler_fn(move |event: Event, _| {
                let observed = b_observed.clone();
                let node = b_handle.clone();
                async move {
                    observed.lock().push(event.clone());
                    node.emit_from(&event, EventShell::new("event-B"))
                        .await
                        .map_err(|e| mesh_continuum::FlowError::message(e.to_string()))?;
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    let c_observed = observed.clone();
    let c_handle = node_c.clone();
    let _on_b = node_c
        .on(
            "event-B",
            handler_fn(move |event: Event, _| {
                let observed = c_observed.clone();
                let node = c_handle.clone();
                async move {
                    observed.lock().push(event.clone());
                    node.emit_from(&event, EventShell::new("_signal.chain-done"))
                        .await
                        .map_err(|e| mesh_continuum::FlowError::message(e.to_string()))?;
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    let a_observed = observed.clone();
    let _on_done = node_a
        .on(
            "_signal.chain-done",
            handler_fn(move |event: Event, _| {
                let observed = a_observed.clone();
                async move {
                    observed.lock().push(event.clone());
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    let correlation = CorrelationId::from_string("C0");
    node_a
        .emit(EventShell::new("event-A").with_correlation(correlation.clone()))
        .await
        .unwrap();
    settle().await;

    let observed = observed.lock().clone();
    let types: Vec<&str> = observed.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, vec!["event-A", "event-B", "_signal.chain-done"]);

    let senders: Vec<&str> = observed
        .iter()
        .map(|e| e.sender().as_str())
        .collect();
    assert_eq!(senders, vec!["chain-a", "chain-b", "chain-c"]);

    for event in &observed {
        assert_eq!(
            event.context.causal.correlation_id.as_ref().unwrap(),
            &correlation
        );
        assert_eq!(event.context.causal.path[0], *event.sender());
    }
    assert_eq!(
        observed[1].context.causal.causation_id.as_ref().unwrap(),
        &observed[0].context.causal.id
    );
    assert_eq!(
        observed[2].context.causal.causation_id.as_ref().unwrap(),
        &observed[1].context.causal.id
    );

    runtime.shutdown().await;
}

/// Scenario: accept policy filters by sender pattern.
#[cfg(test)]
#[tokio::test]
async fn scenario_accept_policy() {
    let runtime = quiet_runtime(Separator::Hyphen).await;
    let policy =
        AcceptPolicy::from_patterns(&["order-service-*", "admin-*"], Separator::Hyphen).unwrap();
    let protected = runtime
        .create_node(
            "protected",
            NodeOptions {
                accept_policy: Some(policy),
                ..NodeOptions::default()
            },
        )
        .await
        .unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();
    let _sub = protected
        .on(
            "inventory-check",
            handler_fn(move |_, _| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    for sender in ["order-service-v1", "admin-root", "inventory-service"] {
        let node = runtime.create_node(sender, open()).await.unwrap();
        node.emit(EventShell::new("inventory-check")).await.unwrap();
    }
    settle().await;

    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    runtime.shutdown().await;
}

/// Scenario: single-segment wildcard boundaries.
#[cfg(test)]
#[tokio::test]
async fn scenario_pattern_wildcard() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let producer = runtime.create_node("producer", open()).await.unwrap();
    let listener = runtime.create_node("listener", open()).await.unwrap();

    let matched: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = matched.clone();
    let _sub = listener
        .on(
            "user.profile.*",
            handler_fn(move |event: Event, _| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(event.event_type.clone());
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    for event_type in ["user.profile.updated", "user.profile", "user.settings.updated"] {
        producer.emit(EventShell::new(event_type)).await.unwrap();
    }
    settle().await;

    assert_eq!(matched.lock().clone(), vec!["user.profile.updated"]);
    runtime.shutdown().await;
}

/// Scenario: a handler processes items by returning itself until all are
/// consumed, accumulating into the shared dispatch context.
#[cfg(test)]
#[tokio::test]
async fn scenario_continuum_loop() {
    let runtime = quiet_runtime(Separator::Hyphen).await;
    let client = runtime.create_node("loop-client", open()).await.unwrap();
    let worker = runtime.create_node("loop-worker", open()).await.unwrap();

    fn process_items() -> mesh_continuum::Handler {
        handler_fn(|event: Event, ctx: FlowContext| async move {
            let items = event.payload["items"].as_array().cloned().unwrap_or_default();
            let index = ctx.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;

            if index >= items.len() {
                let processed = ctx.get("processed").unwrap_or(json!([]));
                return Ok(Flow::done(json!({ "processed": processed })));
            }

            let mut processed = ctx
                .get("processed")
                .and_then(|v| v.as_array().cloned())
                .unwrap_or_default();
            let item = items[index].as_str().unwrap_or_default();
            processed.push(json!(format!("processed-{item}")));

            ctx.set("processed", json!(processed));
            ctx.set("index", json!(index as u64 + 1));
            Ok(Flow::Continue(process_items()))
        })
    }

    let _sub = worker.on("process-batch", process_items()).await.unwrap();

    let result = client
        .send(
            &NodeId::new("loop-worker"),
            EventShell::new("process-batch").with_payload(json!({"items": ["A", "B", "C"]})),
        )
        .await
        .unwrap();
    let reply = result.resolve(Duration::from_secs(1)).await.unwrap();

    assert_eq!(
        reply.into_value(),
        Some(json!({"processed": ["processed-A", "processed-B", "processed-C"]}))
    );
    runtime.shutdown().await;
}

/// Scenario: an authorization-gate rejection surfaces to the sender as a
/// typed security error instead of a timeout.
#[cfg(test)]
#[tokio::test]
async fn scenario_gate_rejection_reaches_sender() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let intern = runtime.create_node("intern.sandbox", open()).await.unwrap();
    let ledger = runtime.create_node("ledger.primary", open()).await.unwrap();

    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();
    let _sub = ledger
        .on(
            "ledger.post",
            handler_fn(move |_, _| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::done(json!("posted")))
                }
            }),
        )
        .await
        .unwrap();

    let gates = runtime.gates();
    gates.acl().allow("*", &["ledger.*"], 100).unwrap();
    gates.acl().deny("intern.*", &["ledger.*"], 10).unwrap();

    let result = intern
        .send(&NodeId::new("ledger.primary"), EventShell::new("ledger.post"))
        .await
        .unwrap();
    let err = result.resolve(Duration::from_secs(1)).await.unwrap_err();

    assert!(matches!(err, mesh_node::NodeError::Security(_)));
    assert_eq!(handled.load(Ordering::SeqCst), 0, "handler never ran");

    runtime.shutdown().await;
}

/// Scenario: group send aggregates per-member results and isolates
/// failures.
#[cfg(test)]
#[tokio::test]
async fn scenario_group_send_isolates_errors() {
    let runtime = quiet_runtime(Separator::Hyphen).await;
    let worker = runtime.create_node("group-worker", open()).await.unwrap();
    let good = runtime.create_node("member-good", open()).await.unwrap();
    let bad = runtime.create_node("member-bad", open()).await.unwrap();

    let _sub = worker
        .on(
            "task-run",
            handler_fn(|event: Event, _| async move { Ok(Flow::Done(event.payload)) }),
        )
        .await
        .unwrap();
    // Shut the bad member down so its sends fail while the good member's
    // succeed.
    bad.shutdown().await;

    let group = for_group(&[good, bad]);
    let aggregate = group
        .send(
            &NodeId::new("group-worker"),
            EventShell::new("task-run").with_payload(json!("unit")),
        )
        .await;
    let results = aggregate.resolve(Duration::from_secs(1)).await;

    match results.get(&NodeId::new("member-good")).unwrap() {
        Ok(reply) => match reply {
            Reply::Value(value) => assert_eq!(value, &json!("unit")),
            other => panic!("expected value reply, got {other:?}"),
        },
        Err(e) => panic!("good member failed: {e}"),
    }
    assert!(results.get(&NodeId::new("member-bad")).unwrap().is_err());

    runtime.shutdown().await;
}

/// Scenario: group broadcast produces k*k deliveries when every member
/// subscribes.
#[cfg(test)]
#[tokio::test]
async fn scenario_group_broadcast_fan_out() {
    let runtime = quiet_runtime(Separator::Hyphen).await;
    let one = runtime.create_node("member-one", open()).await.unwrap();
    let two = runtime.create_node("member-two", open()).await.unwrap();

    let deliveries = Arc::new(AtomicUsize::new(0));
    let group = for_group(&[one, two]);
    let counter = deliveries.clone();
    let _subs = group
        .on(
            "pulse",
            handler_fn(move |_, ctx: FlowContext| {
                let counter = counter.clone();
                async move {
                    // The group-installed handler sees which member is
                    // handling through the dispatch context.
                    assert!(ctx.node().is_some());
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    group.broadcast(EventShell::new("pulse")).await;
    settle().await;

    assert_eq!(deliveries.load(Ordering::SeqCst), 4);
    runtime.shutdown().await;
}
