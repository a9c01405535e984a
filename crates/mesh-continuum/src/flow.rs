//! # Flow Protocol
//!
//! Handlers return a `Flow` value selecting the next stage; the driver
//! loops until the chain yields a final result, a stream, or nothing.

use crate::context::FlowContext;
use crate::stream::LazySequence;
use mesh_types::Event;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised inside a handler chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A handler failed. Propagates out of the continuum unless an
    /// error-handling combinator replaces it.
    #[error("Handler failed: {0}")]
    Handler(String),

    /// A lazy-sequence producer failed mid-stream.
    #[error("Stream failed: {0}")]
    Stream(String),
}

impl FlowError {
    /// Shorthand for a handler failure with a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Future type produced by handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Flow, FlowError>> + Send>>;

/// An event handler: one stage of a continuum chain.
pub type Handler = Arc<dyn Fn(Event, FlowContext) -> HandlerFuture + Send + Sync>;

/// What a handler returns: the continuation decision.
pub enum Flow {
    /// Continue with the given handler, same event, shared context.
    Continue(Handler),
    /// Return a lazy sequence to the requester.
    Stream(LazySequence),
    /// End the flow with a final value.
    Done(Value),
    /// End the flow with no value.
    End,
}

impl Flow {
    /// Shorthand for `Done` on any serialisable value.
    pub fn done(value: impl Into<Value>) -> Self {
        Self::Done(value.into())
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Continue(_) => f.write_str("Flow::Continue(..)"),
            Self::Stream(_) => f.write_str("Flow::Stream(..)"),
            Self::Done(value) => write!(f, "Flow::Done({value})"),
            Self::End => f.write_str("Flow::End"),
        }
    }
}

/// The terminal state of one continuum run.
#[derive(Debug)]
pub enum FlowOutcome {
    /// The chain produced a final value.
    Value(Value),
    /// The chain produced a lazy sequence.
    Stream(LazySequence),
    /// The chain ended with no value.
    None,
}

impl FlowOutcome {
    /// The final value, when there is one.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Wrap an async closure as a `Handler`.
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Event, FlowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, FlowError>> + Send + 'static,
{
    Arc::new(move |event, ctx| Box::pin(f(event, ctx)))
}

/// Drive a handler chain to completion.
///
/// Each `Continue` re-invokes with the same event and the shared context.
/// Errors propagate to the caller unless a combinator in the chain absorbs
/// them.
pub async fn run(
    handler: &Handler,
    event: &Event,
    ctx: &FlowContext,
) -> Result<FlowOutcome, FlowError> {
    let mut current = handler(event.clone(), ctx.clone()).await?;
    let mut stages = 1u32;

    loop {
        match current {
            Flow::Continue(next) => {
                stages += 1;
                current = next(event.clone(), ctx.clone()).await?;
            }
            Flow::Stream(sequence) => {
                debug!(event_type = %event.event_type, stages, "Continuum yielded stream");
                return Ok(FlowOutcome::Stream(sequence));
            }
            Flow::Done(value) => {
                debug!(event_type = %event.event_type, stages, "Continuum completed");
                return Ok(FlowOutcome::Value(value));
            }
            Flow::End => {
                debug!(event_type = %event.event_type, stages, "Continuum ended bare");
                return Ok(FlowOutcome::None);
            }
        }
    }
}
