//! # Combinators
//!
//! Building blocks for handler chains: ordered fallback, predicate
//! branching, side-effect taps, and error conversion back into flow
//! decisions.

use crate::context::FlowContext;
use crate::flow::{handler_fn, Flow, FlowError, Handler, HandlerFuture};
use mesh_types::Event;
use std::future::Future;
use std::sync::Arc;

/// Predicate over the event and context, used by `conditional`.
pub type Predicate = Arc<dyn Fn(&Event, &FlowContext) -> bool + Send + Sync>;

/// Error branch: receives the failure and decides the next flow step.
pub type ErrorHandler =
    Arc<dyn Fn(FlowError, Event, FlowContext) -> HandlerFuture + Send + Sync>;

/// Try handlers in order; the first that produces anything other than a
/// bare end wins.
#[must_use]
pub fn compose(handlers: Vec<Handler>) -> Handler {
    handler_fn(move |event: Event, ctx: FlowContext| {
        let handlers = handlers.clone();
        async move {
            for handler in &handlers {
                match handler(event.clone(), ctx.clone()).await? {
                    Flow::End => continue,
                    decided => return Ok(decided),
                }
            }
            Ok(Flow::End)
        }
    })
}

/// Branch on a predicate: `then_handler` when it holds, `else_handler`
/// (or a bare end) otherwise.
#[must_use]
pub fn conditional(
    predicate: impl Fn(&Event, &FlowContext) -> bool + Send + Sync + 'static,
    then_handler: Handler,
    else_handler: Option<Handler>,
) -> Handler {
    let predicate: Predicate = Arc::new(predicate);
    handler_fn(move |event: Event, ctx: FlowContext| {
        let predicate = predicate.clone();
        let then_handler = then_handler.clone();
        let else_handler = else_handler.clone();
        async move {
            if predicate(&event, &ctx) {
                Ok(Flow::Continue(then_handler))
            } else {
                Ok(else_handler.map_or(Flow::End, Flow::Continue))
            }
        }
    })
}

/// Invoke a side-effect, then continue with `next` or end the flow.
#[must_use]
pub fn tap<F, Fut>(side_effect: F, next: Option<Handler>) -> Handler
where
    F: Fn(Event, FlowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let side_effect = Arc::new(side_effect);
    handler_fn(move |event: Event, ctx: FlowContext| {
        let side_effect = side_effect.clone();
        let next = next.clone();
        async move {
            side_effect(event, ctx).await;
            Ok(next.map_or(Flow::End, Flow::Continue))
        }
    })
}

/// Run `handler`; on failure, record the error branch on the context and
/// let `on_error` decide the replacement flow step.
#[must_use]
pub fn with_error_handler(handler: Handler, on_error: ErrorHandler) -> Handler {
    handler_fn(move |event: Event, ctx: FlowContext| {
        let handler = handler.clone();
        let on_error = on_error.clone();
        async move {
            match handler(event.clone(), ctx.clone()).await {
                Ok(flow) => Ok(flow),
                Err(err) => {
                    ctx.set_error(err.to_string());
                    on_error(err, event, ctx).await
                }
            }
        }
    })
}

/// Wrap an async closure as an `ErrorHandler`.
pub fn error_handler_fn<F, Fut>(f: F) -> ErrorHandler
where
    F: Fn(FlowError, Event, FlowContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, FlowError>> + Send + 'static,
{
    Arc::new(move |err, event, ctx| Box::pin(f(err, event, ctx)))
}
