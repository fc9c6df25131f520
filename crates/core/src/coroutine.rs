//! Coroutine-side primitives used by the bridge.
//!
//! A coroutine only ever sees the context it was created with. Spawned work
//! is owned by a [`ScopedTask`], so dropping the request that started it
//! aborts it instead of leaving it running detached.

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::{JoinError, JoinHandle};

use crate::context::Context;

/// The view a coroutine body has of its creation-time context.
#[derive(Debug, Clone, Default)]
pub struct CoroutineScope {
    context: Option<Context>,
}

impl CoroutineScope {
    pub fn new(context: Option<Context>) -> Self {
        Self { context }
    }

    /// The context given at creation, or an empty one.
    pub fn context(&self) -> Context {
        self.context.clone().unwrap_or_default()
    }
}

/// A spawned task that is aborted when its handle is dropped.
pub struct ScopedTask<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> ScopedTask<T> {
    pub fn spawn<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = T> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    pub async fn join(mut self) -> Result<T, JoinError> {
        (&mut self.handle).await
    }
}

impl<T> Drop for ScopedTask<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run blocking work from whatever thread we are on.
///
/// On a multi-threaded runtime the worker is handed off with
/// `block_in_place` so other tasks keep running. A current-thread runtime
/// simply stalls for the duration.
pub(crate) fn park<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}
