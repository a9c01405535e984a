//! # Inbound Dispatch
//!
//! The pipeline every inbound event runs before any business handler, in
//! the authoritative order: authentication, duplicate suppression, accept
//! policy, schema and authorization gates, pattern match, continuum, and
//! the completion signal for reply-expecting events.
//!
//! Dispatch order is preserved per sink; matched continuums run in a
//! spawned task so a slow handler never stalls the node's intake.

use crate::node::NodeInner;
use crate::pending::Reply;
use mesh_continuum::{run, FlowContext, FlowOutcome, Handler, LazySequence};
use mesh_fabric::Fabric;
use mesh_gates::{Gate, SecurityError};
use mesh_types::{Event, EventShell, SIGNAL_SUBJECT_PREFIX};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

enum FirstOutcome {
    Value(Value),
    Stream(LazySequence),
}

impl NodeInner {
    /// Run one inbound event through the pipeline.
    ///
    /// `already_seen` marks local-loop deliveries whose id was recorded at
    /// emit time; the duplicate check is skipped for those.
    pub(crate) async fn dispatch_event(self: &Arc<Self>, event: Event, already_seen: bool) {
        if self.ensure_live().is_err() {
            return;
        }

        if let Err(rejection) = self.gates.authenticate(&event) {
            debug!(node_id = %self.id, event_type = %event.event_type, reason = %rejection, "Rejected at authentication");
            self.reject_with_signal(&event, &rejection).await;
            return;
        }

        if !already_seen && !self.seen.check_and_insert(&event.context.causal.id) {
            debug!(node_id = %self.id, event_id = %event.context.causal.id, "Duplicate suppressed");
            return;
        }

        if !self
            .accept
            .accepts(event.sender(), event.context.origin.as_ref())
        {
            debug!(node_id = %self.id, sender = %event.sender(), "Rejected by accept policy");
            return;
        }

        if let Err(rejection) = self.gates.check_schema(&event) {
            debug!(node_id = %self.id, event_type = %event.event_type, reason = %rejection, "Rejected at schema gate");
            self.reject_with_signal(&event, &rejection).await;
            return;
        }
        if let Err(rejection) = self.gates.authorize(&event) {
            debug!(node_id = %self.id, event_type = %event.event_type, reason = %rejection, "Rejected at authorization gate");
            self.reject_with_signal(&event, &rejection).await;
            return;
        }

        if let Some(token) = event.event_type.strip_prefix(SIGNAL_SUBJECT_PREFIX) {
            // Only the node holding the slot decodes the reply; everyone
            // else sees signal events as ordinary subscribable traffic.
            if self.pending.contains(token) {
                let reply = self.parse_reply(token, &event.payload);
                self.pending.complete(token, reply);
            }
        }

        let matched: Vec<Handler> = {
            let subscriptions = self.subscriptions.read();
            subscriptions
                .iter()
                .filter(|entry| entry.matcher.matches(&event.event_type))
                .map(|entry| entry.handler.clone())
                .collect()
        };
        if matched.is_empty() {
            return;
        }

        let inner = self.clone();
        tokio::spawn(async move {
            inner.run_matched(event, matched).await;
        });
    }

    /// Run every matched handler chain (registration order) with one shared
    /// dispatch context, then publish the completion signal if requested.
    async fn run_matched(self: &Arc<Self>, event: Event, matched: Vec<Handler>) {
        let ctx = FlowContext::for_node(self.id.clone());
        let mut first: Option<FirstOutcome> = None;
        let mut failure: Option<String> = None;

        for handler in matched {
            match run(&handler, &event, &ctx).await {
                Ok(FlowOutcome::Value(value)) => {
                    if first.is_none() {
                        first = Some(FirstOutcome::Value(value));
                    }
                }
                Ok(FlowOutcome::Stream(sequence)) => {
                    if first.is_none() {
                        first = Some(FirstOutcome::Stream(sequence));
                    }
                }
                Ok(FlowOutcome::None) => {}
                Err(e) => {
                    warn!(node_id = %self.id, event_type = %event.event_type, error = %e, "Handler chain failed");
                    if failure.is_none() {
                        failure = Some(e.to_string());
                    }
                }
            }
        }

        let Some(token) = event.signal_token().map(str::to_string) else {
            return;
        };

        let payload = match (first, failure) {
            (Some(FirstOutcome::Stream(sequence)), _) => {
                self.handoff.park(token.clone(), sequence);
                json!({ "stream": true })
            }
            (Some(FirstOutcome::Value(value)), _) => json!({ "ok": value }),
            (None, Some(message)) => json!({ "error": { "kind": "handler", "message": message } }),
            (None, None) => Value::Null,
        };
        self.publish_signal(&token, payload, &event).await;
    }

    /// Publish the synthetic completion signal for a handled event.
    pub(crate) async fn publish_signal(self: &Arc<Self>, token: &str, payload: Value, inbound: &Event) {
        let shell =
            EventShell::new(format!("{SIGNAL_SUBJECT_PREFIX}{token}")).with_payload(payload);
        let event = match self.stamp(shell, Some(inbound)) {
            Ok(event) => event,
            Err(e) => {
                warn!(node_id = %self.id, error = %e, "Failed to stamp completion signal");
                return;
            }
        };

        let subject = mesh_fabric::subjects::signal_subject(token);
        let bytes = match event.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(node_id = %self.id, error = %e, "Failed to encode completion signal");
                return;
            }
        };
        if let Err(e) = self.fabric.publish(&subject, bytes).await {
            warn!(node_id = %self.id, subject = %subject, error = %e, "Failed to publish completion signal");
        }
    }

    /// A reply-expecting event failed a gate: surface the typed error to
    /// the sender instead of letting it time out.
    async fn reject_with_signal(self: &Arc<Self>, event: &Event, rejection: &SecurityError) {
        let Some(token) = event.signal_token().map(str::to_string) else {
            return;
        };
        let payload = json!({
            "error": {
                "kind": "security",
                "gate": rejection.gate.to_string(),
                "message": rejection.reason,
            }
        });
        self.publish_signal(&token, payload, event).await;
    }

    /// Decode a signal payload into the sender-side reply.
    pub(crate) fn parse_reply(&self, token: &str, payload: &Value) -> Result<Reply, crate::NodeError> {
        if payload.is_null() {
            return Ok(Reply::None);
        }

        if let Some(object) = payload.as_object() {
            if let Some(ok) = object.get("ok") {
                return Ok(Reply::Value(ok.clone()));
            }
            if object.get("stream").and_then(Value::as_bool) == Some(true) {
                return Ok(self
                    .handoff
                    .claim(token)
                    .map_or(Reply::None, Reply::Stream));
            }
            if let Some(error) = object.get("error") {
                let kind = error.get("kind").and_then(Value::as_str).unwrap_or("handler");
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown failure")
                    .to_string();
                return Err(match kind {
                    "security" => {
                        let gate = error
                            .get("gate")
                            .and_then(Value::as_str)
                            .and_then(Gate::from_name)
                            .unwrap_or(Gate::Authorization);
                        crate::NodeError::Security(SecurityError::new(gate, message))
                    }
                    _ => crate::NodeError::Handler(message),
                });
            }
        }

        Ok(Reply::Value(payload.clone()))
    }
}
