//! Lazily evaluated, context-carrying pipelines.
//!
//! A [`Pipeline`] describes a single-valued asynchronous computation. Nothing
//! runs until [`Pipeline::subscribe`] is called, and the [`Context`] given to
//! `subscribe` is handed to every stage explicitly. There is no ambient lookup:
//! a stage can only see the context its subscriber passed in, or a context an
//! upstream [`Pipeline::context_write`] derived from it.

use futures::future::{self, BoxFuture, FutureExt};
use std::future::Future;

use crate::context::Context;
use crate::error::{Error, Result};

type Stage<T> = Box<dyn FnOnce(Context) -> BoxFuture<'static, Result<T>> + Send>;

/// A single-valued asynchronous computation evaluated per subscription.
pub struct Pipeline<T> {
    stage: Stage<T>,
}

impl<T: Send + 'static> Pipeline<T> {
    fn from_stage<F>(stage: F) -> Self
    where
        F: FnOnce(Context) -> BoxFuture<'static, Result<T>> + Send + 'static,
    {
        Self {
            stage: Box::new(stage),
        }
    }

    /// A pipeline that yields `value` on subscription.
    pub fn just(value: T) -> Self {
        Self::from_stage(move |_| future::ready(Ok(value)).boxed())
    }

    /// A pipeline that fails with `err` on subscription.
    pub fn error(err: Error) -> Self {
        Self::from_stage(move |_| future::ready(Err(err)).boxed())
    }

    pub fn from_result(result: Result<T>) -> Self {
        Self::from_stage(move |_| future::ready(result).boxed())
    }

    /// Wrap an already-built future. The future ignores the subscriber
    /// context; it is only polled once the pipeline is subscribed.
    pub fn from_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::from_stage(move |_| fut.boxed())
    }

    /// Build the pipeline at subscription time from the subscriber context.
    pub fn defer_contextual<F>(build: F) -> Self
    where
        F: FnOnce(&Context) -> Pipeline<T> + Send + 'static,
    {
        Self::from_stage(move |ctx| {
            let next = build(&ctx);
            (next.stage)(ctx)
        })
    }

    pub fn map<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Pipeline::from_stage(move |ctx| {
            let upstream = (self.stage)(ctx);
            async move { upstream.await.map(f) }.boxed()
        })
    }

    pub fn map_err<F>(self, f: F) -> Self
    where
        F: FnOnce(Error) -> Error + Send + 'static,
    {
        Self::from_stage(move |ctx| {
            let upstream = (self.stage)(ctx);
            async move { upstream.await.map_err(f) }.boxed()
        })
    }

    /// Flat-map: the inner pipeline is subscribed with the same context as
    /// this one, after this one has produced its value.
    pub fn and_then<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Pipeline<U> + Send + 'static,
    {
        Pipeline::from_stage(move |ctx| {
            let upstream = (self.stage)(ctx.clone());
            async move {
                let value = upstream.await?;
                (f(value).stage)(ctx).await
            }
            .boxed()
        })
    }

    /// Run this pipeline for its completion, then continue with `next`.
    pub fn then<U: Send + 'static>(self, next: Pipeline<U>) -> Pipeline<U> {
        self.and_then(move |_| next)
    }

    /// Derive the context seen by this pipeline (and everything upstream of
    /// it) from the subscriber's context.
    pub fn context_write<F>(self, f: F) -> Self
    where
        F: FnOnce(Context) -> Context + Send + 'static,
    {
        Self::from_stage(move |ctx| (self.stage)(f(ctx)))
    }

    /// Evaluate the pipeline with `ctx` as the subscriber context.
    pub async fn subscribe(self, ctx: Context) -> Result<T> {
        (self.stage)(ctx).await
    }

    /// Evaluate the pipeline with an empty subscriber context.
    pub async fn await_single(self) -> Result<T> {
        self.subscribe(Context::empty()).await
    }
}

impl Pipeline<Context> {
    /// A pipeline yielding the context it was subscribed with.
    pub fn context() -> Self {
        Self::from_stage(|ctx| future::ready(Ok(ctx)).boxed())
    }
}
