//! # Lazy Sequences
//!
//! A producer of values consumed on demand. Finite or infinite, never
//! restartable; dropping the handle cancels the producer.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

/// A lazy sequence of values returned from a handler.
pub struct LazySequence {
    inner: Pin<Box<dyn Stream<Item = Value> + Send + Sync>>,
}

impl LazySequence {
    /// Wrap any stream of values.
    pub fn from_stream(inner: impl Stream<Item = Value> + Send + Sync + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }

    /// A finite sequence from an iterator.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + Sync + 'static,
    {
        Self::from_stream(stream::iter(items))
    }

    /// A generator-style sequence: the closure is polled for each value
    /// until it returns `None`. May never return `None` (infinite).
    pub fn from_fn(mut produce: impl FnMut() -> Option<Value> + Send + Sync + 'static) -> Self {
        Self::from_stream(stream::poll_fn(move |_| {
            std::task::Poll::Ready(produce())
        }))
    }

    /// Pull the next value; `None` signals end-of-sequence.
    pub async fn next(&mut self) -> Option<Value> {
        self.inner.next().await
    }

    /// Drain a finite sequence into a vector. Never call this on an
    /// infinite producer.
    pub async fn collect(mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(value) = self.next().await {
            out.push(value);
        }
        out
    }

    /// Drain at most `limit` values.
    pub async fn take(mut self, limit: usize) -> Vec<Value> {
        let mut out = Vec::with_capacity(limit);
        while out.len() < limit {
            match self.next().await {
                Some(value) => out.push(value),
                None => break,
            }
        }
        out
    }
}

impl std::fmt::Debug for LazySequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LazySequence(..)")
    }
}
