//! # Flow-Balance Detection Over a Live Fabric
//!
//! Drives the monitor against real consumer counters: a raw fabric
//! subscriber plays the struggling consumer while a runtime node observes
//! the emitted `node.down` events.

#[cfg(test)]
use super::harness::{open, quiet_runtime};
#[cfg(test)]
use mesh_continuum::{handler_fn, Flow};
#[cfg(test)]
use mesh_crypto::NodeIdentity;
#[cfg(test)]
use mesh_fabric::Fabric;
#[cfg(test)]
use mesh_flow_balance::{FlowBalanceConfig, FlowBalanceMonitor};
#[cfg(test)]
use mesh_runtime::{EventShell, NodeId, Separator};
#[cfg(test)]
use mesh_types::Event;
#[cfg(test)]
use parking_lot::Mutex;
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
async fn settle() {
    tokio::time::sleep(Duration::from_millis(120)).await;
}

/// Scenario: a consumer holds moderate lag with positive throughput; the
/// monitor calls it a bottleneck at degraded severity, exactly once; after
/// the backlog drains it returns to healthy with no further events.
#[cfg(test)]
#[tokio::test]
async fn scenario_bottleneck_detection_and_recovery() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let fabric = runtime.memory_fabric();

    // The observer node consumes the monitor's system events.
    let observer = runtime.create_node("observer", open()).await.unwrap();
    let alerts: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = alerts.clone();
    let _sub = observer
        .on(
            "node.down",
            handler_fn(move |event: Event, _| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(event);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    // A raw consumer that we drive by hand to shape its lag.
    let mut slowpoke = fabric
        .subscribe_as("slow-worker:orders.created", "events.orders.created")
        .await
        .unwrap();

    let monitor = Arc::new(FlowBalanceMonitor::new(
        fabric.clone(),
        fabric.admin(),
        NodeIdentity::generate(NodeId::new("flow-balance")),
        FlowBalanceConfig::default(),
    ));

    // Build up 70 pending messages, then work off 10 so the rate is
    // positive while lag holds at 60.
    let producer = runtime.create_node("producer", open()).await.unwrap();
    for i in 0..70 {
        producer
            .emit(EventShell::new("orders.created").with_payload(json!({"seq": i})))
            .await
            .unwrap();
    }
    settle().await;
    for _ in 0..10 {
        let message = slowpoke.recv().await.unwrap();
        message.ack();
    }

    monitor.poll_once().await;

    // Next window: consume exactly what arrives so lag holds.
    for i in 0..10 {
        producer
            .emit(EventShell::new("orders.created").with_payload(json!({"seq": 70 + i})))
            .await
            .unwrap();
    }
    settle().await;
    for _ in 0..10 {
        let message = slowpoke.recv().await.unwrap();
        message.ack();
    }
    monitor.poll_once().await;
    settle().await;

    {
        let alerts = alerts.lock();
        assert_eq!(alerts.len(), 1, "exactly one alert within two polls");
        let alert = &alerts[0];
        assert_eq!(alert.event_type, "node.down");
        assert_eq!(alert.payload["pattern"], "bottleneck");
        assert_eq!(alert.payload["severity"], "degraded");
        assert_eq!(alert.payload["nodeId"], "slow-worker");
        assert!(alert.context.integrity.is_some());
    }

    // Drain the backlog; two healthy samples restore the consumer with no
    // further emissions.
    loop {
        match tokio::time::timeout(Duration::from_millis(50), slowpoke.recv()).await {
            Ok(Some(message)) => message.ack(),
            _ => break,
        }
    }
    monitor.poll_once().await;
    settle().await;
    monitor.poll_once().await;
    settle().await;

    assert_eq!(alerts.lock().len(), 1, "no further events after recovery");
    runtime.shutdown().await;
}

/// Scenario: a consumer past critical lag with zero throughput raises
/// `node.down` with the node-failure pattern within two polls.
#[cfg(test)]
#[tokio::test]
async fn scenario_node_failure_detection() {
    let runtime = quiet_runtime(Separator::Dot).await;
    let fabric = runtime.memory_fabric();

    let observer = runtime.create_node("observer", open()).await.unwrap();
    let alerts: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = alerts.clone();
    let _sub = observer
        .on(
            "node.down",
            handler_fn(move |event: Event, _| {
                let sink = sink.clone();
                async move {
                    sink.lock().push(event);
                    Ok(Flow::End)
                }
            }),
        )
        .await
        .unwrap();

    // A consumer that never reads: its pending count is pure lag.
    let _stalled = fabric
        .subscribe_as("dead-worker:audit.trail", "events.audit.trail")
        .await
        .unwrap();

    let monitor = Arc::new(FlowBalanceMonitor::new(
        fabric.clone(),
        fabric.admin(),
        NodeIdentity::generate(NodeId::new("flow-balance")),
        FlowBalanceConfig::default(),
    ));

    let producer = runtime.create_node("producer", open()).await.unwrap();
    for i in 0..520 {
        producer
            .emit(EventShell::new("audit.trail").with_payload(json!({"seq": i})))
            .await
            .unwrap();
    }
    settle().await;

    monitor.poll_once().await;
    monitor.poll_once().await;
    settle().await;

    let alerts = alerts.lock();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].payload["pattern"], "node-failure");
    assert_eq!(alerts[0].payload["severity"], "unhealthy");
    assert_eq!(alerts[0].payload["nodeId"], "dead-worker");

    runtime.shutdown().await;
}
