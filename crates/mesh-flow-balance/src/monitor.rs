//! # Flow-Balance Monitor
//!
//! The out-of-band polling loop. Each tick reads every consumer's counters
//! from the fabric admin surface, derives flow metrics, feeds the health
//! machines, and emits `node.down` / `system.down` events when a pattern is
//! confirmed. One emission per incident: the alert latch clears only after
//! the hysteresis machine returns to healthy.

use crate::config::FlowBalanceConfig;
use crate::health::{HealthMachine, NodeHealth};
use crate::patterns::{assess, detect_consumer, detect_system, ConsumerSample, FlowPattern};
use crate::{HISTORY_DEPTH, NODE_DOWN_EVENT, SYSTEM_DOWN_EVENT};
use mesh_crypto::{schema_fingerprint, sign_bytes, NodeIdentity, SignedSubset};
use mesh_fabric::subjects::flow_balance_subject;
use mesh_fabric::{ConsumerInfo, Fabric, FabricAdmin};
use mesh_types::{now_millis, CausalContext, Event, EventContext, Integrity};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct ConsumerRecord {
    node: String,
    event_type: String,
    history: VecDeque<ConsumerSample>,
    machine: HealthMachine,
    alerted: bool,
    last_delivered: u64,
    last_at: u64,
}

/// The flow-balance monitor. Owns its state; observers consume the emitted
/// events only.
pub struct FlowBalanceMonitor {
    fabric: Arc<dyn Fabric>,
    admin: Arc<dyn FabricAdmin>,
    identity: NodeIdentity,
    config: FlowBalanceConfig,
    records: Mutex<HashMap<String, ConsumerRecord>>,
    system_latch: Mutex<Option<FlowPattern>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FlowBalanceMonitor {
    /// Create a monitor polling `admin` and emitting through `fabric`,
    /// signing its events with `identity`.
    #[must_use]
    pub fn new(
        fabric: Arc<dyn Fabric>,
        admin: Arc<dyn FabricAdmin>,
        identity: NodeIdentity,
        config: FlowBalanceConfig,
    ) -> Self {
        Self {
            fabric,
            admin,
            identity,
            config,
            records: Mutex::new(HashMap::new()),
            system_latch: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Start the polling loop.
    pub fn start(self: &Arc<Self>) {
        let monitor = self.clone();
        let interval = Duration::from_millis(self.config.polling_interval_ms.max(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.poll_once().await;
            }
        });
        *self.task.lock() = Some(handle);
        info!(
            interval_ms = self.config.polling_interval_ms,
            "Flow-balance monitor started"
        );
    }

    /// Stop the polling loop.
    pub fn shutdown(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!("Flow-balance monitor stopped");
        }
    }

    /// One polling tick. Public so tests can drive the monitor without the
    /// timer.
    pub async fn poll_once(&self) {
        let consumers = match self.admin.list_consumers().await {
            Ok(consumers) => consumers,
            Err(e) => {
                warn!(error = %e, "Flow-balance poll failed");
                return;
            }
        };
        let now = now_millis();

        let mut node_alerts: Vec<(String, ConsumerSample, FlowPattern, NodeHealth)> = Vec::new();
        let mut latest: Vec<(String, ConsumerSample)> = Vec::new();

        {
            let mut records = self.records.lock();

            for info in &consumers {
                let Some((node, event_type)) = split_consumer(&info.consumer) else {
                    continue;
                };
                // Internal reply consumers are not business flow.
                if event_type.starts_with('_') {
                    continue;
                }

                let record = records
                    .entry(info.consumer.clone())
                    .or_insert_with(|| ConsumerRecord {
                        node: node.to_string(),
                        event_type: event_type.to_string(),
                        history: VecDeque::with_capacity(HISTORY_DEPTH),
                        machine: HealthMachine::new(),
                        alerted: false,
                        last_delivered: 0,
                        last_at: 0,
                    });

                let sample = derive_sample(info, record, now);
                record.last_delivered = info.delivered;
                record.last_at = now;
                if record.history.len() >= HISTORY_DEPTH {
                    record.history.pop_front();
                }
                record.history.push_back(sample);

                let confirmed = record.machine.observe(assess(&sample, &self.config.thresholds));
                if confirmed == NodeHealth::Healthy {
                    if record.alerted {
                        debug!(
                            node = %record.node,
                            event_type = %record.event_type,
                            "Consumer recovered"
                        );
                    }
                    record.alerted = false;
                }

                if let Some(pattern) = detect_consumer(&record.history, &self.config.thresholds) {
                    if !record.alerted {
                        record.alerted = true;
                        node_alerts.push((record.node.clone(), sample, pattern, confirmed));
                    }
                }

                latest.push((info.consumer.clone(), sample));
            }

            // Forget consumers that disappeared from the admin surface.
            records.retain(|consumer, _| consumers.iter().any(|c| &c.consumer == consumer));
        }

        for (node, sample, pattern, severity) in node_alerts {
            self.emit_node_down(&node, &sample, pattern, severity).await;
        }

        self.evaluate_system(&latest).await;
    }

    async fn evaluate_system(&self, latest: &[(String, ConsumerSample)]) {
        let detection = detect_system(latest, &self.config.thresholds);

        let to_emit = {
            let mut latch = self.system_latch.lock();
            match (&detection, *latch) {
                (Some((pattern, _, _)), Some(active)) if *pattern == active => None,
                (Some((pattern, affected, confidence)), _) => {
                    *latch = Some(*pattern);
                    Some((*pattern, affected.clone(), *confidence))
                }
                (None, _) => {
                    *latch = None;
                    None
                }
            }
        };

        if let Some((pattern, affected, confidence)) = to_emit {
            self.emit_system_down(pattern, &affected, confidence, latest)
                .await;
        }
    }

    async fn emit_node_down(
        &self,
        node: &str,
        sample: &ConsumerSample,
        pattern: FlowPattern,
        severity: NodeHealth,
    ) {
        let payload = json!({
            "nodeId": node,
            "lagMetrics": {
                "lag": sample.lag,
                "processingRate": sample.processing_rate,
                "ackRate": sample.ack_rate,
                "deliveryFailures": sample.delivery_failures,
            },
            "pattern": pattern.to_string(),
            "severity": severity.to_string(),
        });
        info!(node, pattern = %pattern, severity = %severity, "Emitting node.down");
        self.emit(NODE_DOWN_EVENT, pattern, payload).await;
    }

    async fn emit_system_down(
        &self,
        pattern: FlowPattern,
        affected: &[String],
        confidence: f64,
        latest: &[(String, ConsumerSample)],
    ) {
        let affected_nodes: Vec<String> = affected
            .iter()
            .filter_map(|consumer| split_consumer(consumer).map(|(node, _)| node.to_string()))
            .collect();
        let max_lag = latest.iter().map(|(_, s)| s.lag).max().unwrap_or(0);
        let avg_lag = if latest.is_empty() {
            0.0
        } else {
            latest.iter().map(|(_, s)| s.lag).sum::<u64>() as f64 / latest.len() as f64
        };
        let level = if max_lag >= self.config.thresholds.severe_lag {
            "severe"
        } else {
            "degraded"
        };

        let payload = json!({
            "level": level,
            "pattern": pattern.to_string(),
            "affectedNodes": affected_nodes,
            "metrics": { "maxLag": max_lag, "avgLag": avg_lag, "consumers": latest.len() },
            "confidence": confidence,
        });
        info!(pattern = %pattern, level, "Emitting system.down");
        self.emit(SYSTEM_DOWN_EVENT, pattern, payload).await;
    }

    async fn emit(&self, event_type: &str, pattern: FlowPattern, payload: Value) {
        let event = match self.build_event(event_type, payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to build flow-balance event");
                return;
            }
        };
        let subject = flow_balance_subject(&pattern.to_string());
        let bytes = match event.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode flow-balance event");
                return;
            }
        };
        if let Err(e) = self.fabric.publish(&subject, bytes).await {
            warn!(subject = %subject, error = %e, "Failed to publish flow-balance event");
        }
    }

    fn build_event(&self, event_type: &str, payload: Value) -> Result<Event, String> {
        let mut causal = CausalContext::root(self.identity.node_id().clone(), now_millis());
        causal.hash = schema_fingerprint(&payload).ok();

        let subset = SignedSubset::from(&causal);
        let bytes =
            sign_bytes(event_type, &payload, &subset).map_err(|e| e.to_string())?;
        let signature = self.identity.sign(&bytes);

        Ok(Event {
            event_type: event_type.to_string(),
            payload,
            context: EventContext {
                causal,
                origin: None,
                integrity: Some(Integrity {
                    signature: signature.to_base64(),
                    public_key: self.identity.public_key().to_base64(),
                }),
                metadata: serde_json::Map::new(),
            },
        })
    }
}

fn derive_sample(info: &ConsumerInfo, record: &ConsumerRecord, now: u64) -> ConsumerSample {
    let elapsed_secs = if record.last_at == 0 {
        0.0
    } else {
        (now.saturating_sub(record.last_at)) as f64 / 1000.0
    };
    let delivered_delta = info.delivered.saturating_sub(record.last_delivered);
    let processing_rate = if elapsed_secs > 0.0 {
        delivered_delta as f64 / elapsed_secs
    } else {
        0.0
    };
    let ack_rate = if info.delivered == 0 {
        1.0
    } else {
        info.acked as f64 / info.delivered as f64
    };

    ConsumerSample {
        lag: info.pending,
        processing_rate,
        ack_rate,
        delivery_failures: info.redelivered,
        at: now,
    }
}

fn split_consumer(consumer: &str) -> Option<(&str, &str)> {
    consumer.split_once(':')
}
