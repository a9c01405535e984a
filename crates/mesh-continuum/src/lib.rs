//! # Mesh Continuum - Handler Chaining
//!
//! The flow-control protocol driving every event delivery: a handler's
//! return value selects the next stage. Returning another handler
//! continues the chain with the same event and shared context; a lazy
//! sequence streams values back to the requester; a value ends the flow
//! with a result; a bare end produces nothing.
//!
//! ```text
//! while let Continue(next) = current {
//!     current = next(event, context).await?;
//! }
//! ```
//!
//! The context is scoped to one top-level dispatch and is never shared
//! across event boundaries.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod combinators;
pub mod context;
pub mod flow;
pub mod stream;

// Re-export main types
pub use combinators::{compose, conditional, error_handler_fn, tap, with_error_handler};
pub use context::FlowContext;
pub use flow::{handler_fn, run, Flow, FlowError, FlowOutcome, Handler, HandlerFuture};
pub use stream::LazySequence;
