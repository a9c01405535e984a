//! # Node
//!
//! The participant type: identity, state, subscription table, accept
//! policy, and the emit/send/broadcast surface. A node exclusively owns
//! its state; cross-node reads go through the view registry.

use crate::accept::AcceptPolicy;
use crate::errors::NodeError;
use crate::pending::{PendingResponses, SendResult, StreamHandoff};
use crate::seen::SeenCache;
use mesh_continuum::Handler;
use mesh_crypto::{schema_fingerprint, sign_bytes, NodeIdentity, SignedSubset};
use mesh_fabric::subjects::{event_subject, node_subject, subjects_for_pattern};
use mesh_fabric::{Backoff, Fabric, FabricError, FabricSubscription};
use mesh_gates::GatePipeline;
use mesh_pattern::{compile_cached, Matcher};
use mesh_types::{
    now_millis, CausalContext, Event, EventContext, EventShell, Integrity, NodeId, Separator,
    BROADCAST_SUBJECT,
};
use mesh_views::ViewRegistry;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Node lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed but not wired to the fabric.
    New,
    /// Live: subscriptions and emits are accepted.
    Initialised,
    /// Shut down: every operation fails.
    Shutdown,
}

/// Options applied at node creation.
#[derive(Debug, Default)]
pub struct NodeOptions {
    /// Accept policy; absent means accept all senders.
    pub accept_policy: Option<AcceptPolicy>,
    /// Duplicate-suppression capacity override (clamped to the minimum).
    pub seen_capacity: Option<usize>,
}

pub(crate) struct SubscriptionEntry {
    pub(crate) id: u64,
    pub(crate) matcher: Matcher,
    pub(crate) handler: Handler,
    pub(crate) tasks: Vec<JoinHandle<()>>,
}

pub(crate) struct NodeInner {
    pub(crate) id: NodeId,
    pub(crate) identity: NodeIdentity,
    pub(crate) separator: Separator,
    pub(crate) fabric: Arc<dyn Fabric>,
    pub(crate) views: Arc<ViewRegistry>,
    pub(crate) gates: Arc<GatePipeline>,
    pub(crate) handoff: Arc<StreamHandoff>,
    pub(crate) state: RwLock<Value>,
    pub(crate) subscriptions: RwLock<Vec<SubscriptionEntry>>,
    pub(crate) next_subscription_id: AtomicU64,
    pub(crate) seen: SeenCache,
    pub(crate) accept: AcceptPolicy,
    pub(crate) pending: Arc<PendingResponses>,
    pub(crate) lifecycle: RwLock<Lifecycle>,
    pub(crate) sink_tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Disposes one subscription when invoked (or dropped).
pub struct Disposer {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer").finish_non_exhaustive()
    }
}

impl Disposer {
    pub(crate) fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Explicitly dispose the subscription.
    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

/// An identified mesh participant.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Arc<NodeInner>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("id", &self.inner.id).finish()
    }
}

impl Node {
    /// Create a node, generate its identity, and wire its fabric sinks
    /// (directed, broadcast, signal).
    pub async fn start(
        id: NodeId,
        fabric: Arc<dyn Fabric>,
        views: Arc<ViewRegistry>,
        gates: Arc<GatePipeline>,
        handoff: Arc<StreamHandoff>,
        separator: Separator,
        options: NodeOptions,
    ) -> Result<Self, NodeError> {
        let identity = NodeIdentity::generate(id.clone());
        let inner = Arc::new(NodeInner {
            id: id.clone(),
            identity,
            separator,
            fabric,
            views,
            gates,
            handoff,
            state: RwLock::new(Value::Null),
            subscriptions: RwLock::new(Vec::new()),
            next_subscription_id: AtomicU64::new(0),
            seen: options
                .seen_capacity
                .map_or_else(SeenCache::new, SeenCache::with_capacity),
            accept: options.accept_policy.unwrap_or_default(),
            pending: Arc::new(PendingResponses::new()),
            lifecycle: RwLock::new(Lifecycle::New),
            sink_tasks: Mutex::new(Vec::new()),
        });

        let sinks = [
            (format!("{id}:direct"), node_subject(&id)),
            (format!("{id}:broadcast"), BROADCAST_SUBJECT.to_string()),
            (format!("{id}:_signal"), "_signal.>".to_string()),
        ];
        for (consumer, subject) in sinks {
            let subscription = subscribe_with_retry(&inner.fabric, &consumer, &subject).await?;
            let task = tokio::spawn(NodeInner::run_sink(inner.clone(), subscription));
            inner.sink_tasks.lock().push(task);
        }

        *inner.lifecycle.write() = Lifecycle::Initialised;
        info!(node_id = %id, "Node initialised");
        Ok(Self { inner })
    }

    /// The node's id.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    /// The node's current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        *self.inner.lifecycle.read()
    }

    /// The node's distributable public key, url-safe base64.
    #[must_use]
    pub fn public_key(&self) -> String {
        self.inner.identity.public_key().to_base64()
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Replace the node's state and publish the new view snapshot.
    pub fn set_state(&self, state: Value) {
        *self.inner.state.write() = state.clone();
        self.inner.views.publish(&self.inner.id, state);
    }

    /// Mutate the node's state in place and publish the new view snapshot.
    pub fn update_state(&self, mutate: impl FnOnce(&mut Value)) {
        let snapshot = {
            let mut state = self.inner.state.write();
            mutate(&mut state);
            state.clone()
        };
        self.inner.views.publish(&self.inner.id, snapshot);
    }

    /// The node's current state snapshot.
    #[must_use]
    pub fn state(&self) -> Value {
        self.inner.state.read().clone()
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Install a handler for event types matching `pattern`.
    ///
    /// Fails at registration for bad patterns and on nodes that are not
    /// initialised. The returned disposer removes the subscription.
    pub async fn on(&self, pattern: &str, handler: Handler) -> Result<Disposer, NodeError> {
        let matcher = compile_cached(pattern, self.inner.separator)?;
        self.install(matcher, Some(pattern), handler).await
    }

    /// Install a handler behind a predicate matcher over event types.
    pub async fn on_predicate(
        &self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        handler: Handler,
    ) -> Result<Disposer, NodeError> {
        self.install(Matcher::predicate(predicate), None, handler)
            .await
    }

    async fn install(
        &self,
        matcher: Matcher,
        pattern: Option<&str>,
        handler: Handler,
    ) -> Result<Disposer, NodeError> {
        self.inner.ensure_live()?;

        let id = self
            .inner
            .next_subscription_id
            .fetch_add(1, Ordering::AcqRel);
        let consumer = format!("{}:{}", self.inner.id, pattern.unwrap_or("<predicate>"));

        let mut tasks = Vec::new();
        for subject in subjects_for_pattern(pattern, self.inner.separator) {
            let subscription =
                subscribe_with_retry(&self.inner.fabric, &consumer, &subject).await?;
            tasks.push(tokio::spawn(NodeInner::run_sink(
                self.inner.clone(),
                subscription,
            )));
        }

        self.inner.subscriptions.write().push(SubscriptionEntry {
            id,
            matcher,
            handler,
            tasks,
        });
        debug!(node_id = %self.inner.id, pattern = ?pattern, "Subscription installed");

        let inner = self.inner.clone();
        Ok(Disposer::new(move || {
            let mut subscriptions = inner.subscriptions.write();
            if let Some(position) = subscriptions.iter().position(|entry| entry.id == id) {
                let entry = subscriptions.remove(position);
                for task in entry.tasks {
                    task.abort();
                }
                debug!(node_id = %inner.id, "Subscription disposed");
            }
        }))
    }

    // =========================================================================
    // EMIT / SEND / BROADCAST
    // =========================================================================

    /// Publish an event and deliver it to this node's own matching
    /// subscriptions.
    pub async fn emit(&self, shell: EventShell) -> Result<(), NodeError> {
        self.emit_inner(shell, None).await
    }

    /// Publish an event caused by `inbound`: causation, correlation, and
    /// origin chain through automatically.
    pub async fn emit_from(&self, inbound: &Event, shell: EventShell) -> Result<(), NodeError> {
        self.emit_inner(shell, Some(inbound)).await
    }

    async fn emit_inner(&self, shell: EventShell, inbound: Option<&Event>) -> Result<(), NodeError> {
        self.inner.ensure_live()?;
        let event = self.inner.stamp(shell, inbound)?;

        // Mark before publishing so the fabric echo is suppressed and only
        // the local loop delivers.
        self.inner.seen.insert(&event.context.causal.id);

        let subject = event_subject(&event.event_type, self.inner.separator);
        self.inner.fabric.publish(&subject, event.encode()?).await?;

        let inner = self.inner.clone();
        let local = event;
        tokio::spawn(async move {
            inner.dispatch_event(local, true).await;
        });
        Ok(())
    }

    /// Directed delivery to a node id. The returned handle resolves to the
    /// remote continuum's final result; sends to self route locally.
    pub async fn send(&self, target: &NodeId, shell: EventShell) -> Result<SendResult, NodeError> {
        self.send_inner(target, shell, None).await
    }

    /// Directed delivery caused by `inbound` (used from handlers).
    pub async fn send_from(
        &self,
        inbound: &Event,
        target: &NodeId,
        shell: EventShell,
    ) -> Result<SendResult, NodeError> {
        self.send_inner(target, shell, Some(inbound)).await
    }

    async fn send_inner(
        &self,
        target: &NodeId,
        shell: EventShell,
        inbound: Option<&Event>,
    ) -> Result<SendResult, NodeError> {
        self.inner.ensure_live()?;

        let token = Uuid::new_v4().to_string();
        let shell = shell.with_signal(token.clone());
        let event = self.inner.stamp(shell, inbound)?;

        let receiver = self.inner.pending.open(token.clone());
        let result = SendResult::new(token.clone(), receiver, self.inner.pending.clone());

        if target == &self.inner.id {
            self.inner.seen.insert(&event.context.causal.id);
            let inner = self.inner.clone();
            tokio::spawn(async move {
                inner.dispatch_event(event, true).await;
            });
            return Ok(result);
        }

        let subject = node_subject(target);
        match self.inner.fabric.publish(&subject, event.encode()?).await {
            Ok(()) => Ok(result),
            Err(e) => {
                self.inner.pending.discard(&token);
                Err(e.into())
            }
        }
    }

    /// Send an ordered batch of events to one target. The batch form is
    /// reply-unaware; callers that need per-event replies send
    /// individually.
    pub async fn send_batch(
        &self,
        target: &NodeId,
        shells: Vec<EventShell>,
    ) -> Result<(), NodeError> {
        self.inner.ensure_live()?;

        for shell in shells {
            let event = self.inner.stamp(shell, None)?;
            if target == &self.inner.id {
                self.inner.seen.insert(&event.context.causal.id);
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    inner.dispatch_event(event, true).await;
                });
            } else {
                let subject = node_subject(target);
                self.inner.fabric.publish(&subject, event.encode()?).await?;
            }
        }
        Ok(())
    }

    /// Publish to the broker fan-out subject; every node, including this
    /// one, receives.
    pub async fn broadcast(&self, shell: EventShell) -> Result<(), NodeError> {
        self.inner.ensure_live()?;
        let event = self.inner.stamp(shell, None)?;
        self.inner
            .fabric
            .publish(BROADCAST_SUBJECT, event.encode()?)
            .await?;
        Ok(())
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    /// Dispose subscriptions, cancel pending responses, and withdraw the
    /// node's view snapshot. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut lifecycle = self.inner.lifecycle.write();
            if *lifecycle == Lifecycle::Shutdown {
                return;
            }
            *lifecycle = Lifecycle::Shutdown;
        }

        for task in self.inner.sink_tasks.lock().drain(..) {
            task.abort();
        }
        {
            let mut subscriptions = self.inner.subscriptions.write();
            for entry in subscriptions.drain(..) {
                for task in entry.tasks {
                    task.abort();
                }
            }
        }
        self.inner.pending.cancel_all();
        self.inner.views.remove(&self.inner.id);
        info!(node_id = %self.inner.id, "Node shut down");
    }
}

/// Install a fabric subscription, retrying transient failures with bounded
/// exponential back-off. Permanent failures (closed fabric, invalid
/// subjects) surface immediately.
async fn subscribe_with_retry(
    fabric: &Arc<dyn Fabric>,
    consumer: &str,
    subject: &str,
) -> Result<FabricSubscription, FabricError> {
    let mut backoff = Backoff::new();
    loop {
        match fabric.subscribe_as(consumer, subject).await {
            Ok(subscription) => return Ok(subscription),
            Err(e @ (FabricError::Closed | FabricError::InvalidSubject { .. })) => return Err(e),
            Err(e) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        subject = %subject,
                        attempt = backoff.attempts(),
                        error = %e,
                        "Subscribe failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
        }
    }
}

impl NodeInner {
    pub(crate) fn ensure_live(&self) -> Result<(), NodeError> {
        match *self.lifecycle.read() {
            Lifecycle::Initialised => Ok(()),
            Lifecycle::New => Err(NodeError::Lifecycle(format!(
                "node `{}` is not initialised",
                self.id
            ))),
            Lifecycle::Shutdown => Err(NodeError::Lifecycle(format!(
                "node `{}` is shut down",
                self.id
            ))),
        }
    }

    /// Assemble and sign an outbound event from a shell.
    pub(crate) fn stamp(
        &self,
        shell: EventShell,
        inbound: Option<&Event>,
    ) -> Result<Event, NodeError> {
        let mut causal = match inbound {
            Some(event) => {
                CausalContext::caused_by(self.id.clone(), now_millis(), &event.context.causal)
            }
            None => CausalContext::root(self.id.clone(), now_millis()),
        };
        if let Some(correlation) = shell.correlation_id {
            causal.correlation_id = Some(correlation);
        }
        causal.hash = Some(schema_fingerprint(&shell.payload)?);

        // Origin is preserved end-to-end: an explicit origin wins, else the
        // inbound origin is copied unchanged.
        let origin = shell
            .origin
            .or_else(|| inbound.and_then(|event| event.context.origin.clone()));

        let subset = SignedSubset::from(&causal);
        let bytes = sign_bytes(&shell.event_type, &shell.payload, &subset)?;
        let signature = self.identity.sign(&bytes);

        Ok(Event {
            event_type: shell.event_type,
            payload: shell.payload,
            context: EventContext {
                causal,
                origin,
                integrity: Some(Integrity {
                    signature: signature.to_base64(),
                    public_key: self.identity.public_key().to_base64(),
                }),
                metadata: shell.metadata,
            },
        })
    }

    pub(crate) async fn run_sink(
        inner: Arc<NodeInner>,
        mut subscription: mesh_fabric::FabricSubscription,
    ) {
        while let Some(message) = subscription.recv().await {
            match Event::decode(&message.payload) {
                Ok(event) => {
                    inner.dispatch_event(event, false).await;
                }
                Err(e) => {
                    warn!(node_id = %inner.id, error = %e, "Undecodable event dropped");
                }
            }
            message.ack();
        }
    }
}
