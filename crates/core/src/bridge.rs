//! The context propagation bridge.
//!
//! Moves a [`Context`] from a pipeline into a second concurrency model under
//! an explicit [`BridgePolicy`]. Whatever the far side observes is exactly
//! what was threaded into it when it was created: nothing, the pipeline's own
//! context (retrieved first), or a fabricated one.
//!
//! Two crossing mechanisms exist:
//! - a *blocking* bridge that parks the calling thread while a nested
//!   current-thread runtime drives a coroutine on its own thread;
//! - a *future* bridge that schedules the work as a spawned task and joins
//!   it without blocking.
//!
//! Blocking bridges are gated by [`BlockingMode`] and counted so callers can
//! assert they never happen on a given path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::coroutine::{CoroutineScope, ScopedTask, park};
use crate::error::{BridgeError, Error, Result};
use crate::pipeline::Pipeline;

/// How a context crosses into the nested computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgePolicy {
    /// Blocking bridge, no context given.
    NoContext,
    /// Blocking bridge seeded with the pipeline's own context.
    BridgedOriginal,
    /// Blocking bridge seeded with a fabricated context.
    BridgedFabricated,
    /// Fire-and-forget completion primitive; carries no context.
    FutureBridgeNoContext,
    /// Spawned coroutine seeded with the pipeline's own context.
    FutureBridgeBridged,
}

impl BridgePolicy {
    pub const ALL: [BridgePolicy; 5] = [
        Self::NoContext,
        Self::BridgedOriginal,
        Self::BridgedFabricated,
        Self::FutureBridgeNoContext,
        Self::FutureBridgeBridged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoContext => "no-context",
            Self::BridgedOriginal => "bridged-original",
            Self::BridgedFabricated => "bridged-fabricated",
            Self::FutureBridgeNoContext => "future-bridge-no-context",
            Self::FutureBridgeBridged => "future-bridge-bridged",
        }
    }

    /// Whether this policy parks the calling thread.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            Self::NoContext | Self::BridgedOriginal | Self::BridgedFabricated
        )
    }
}

impl fmt::Display for BridgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BridgePolicy {
    type Err = BridgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| BridgeError::UnknownPolicy(s.to_string()))
    }
}

/// Whether blocking bridges may run at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockingMode {
    #[default]
    Allowed,
    Forbidden,
}

impl FromStr for BlockingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "allowed" => Ok(Self::Allowed),
            "forbidden" => Ok(Self::Forbidden),
            other => Err(format!("blocking mode must be 'allowed' or 'forbidden', got '{other}'")),
        }
    }
}

/// Runtime settings for a [`Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub blocking: BlockingMode,
    pub timeout: Duration,
    /// Context seeded by [`BridgePolicy::BridgedFabricated`].
    pub fabricated: Context,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            blocking: BlockingMode::Allowed,
            timeout: Duration::from_secs(5),
            fabricated: Context::of("key", "otherValue"),
        }
    }
}

/// Crosses contexts between pipelines and coroutines.
///
/// Cheap to clone; clones share the blocking-call counter.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    options: Arc<BridgeOptions>,
    blocking_calls: Arc<AtomicU64>,
}

impl Bridge {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            options: Arc::new(options),
            blocking_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of blocking bridges entered so far.
    pub fn blocking_calls(&self) -> u64 {
        self.blocking_calls.load(Ordering::Relaxed)
    }

    /// Cross under `policy`, retrieving the pipeline's context from the
    /// subscriber when the policy needs it.
    pub fn observe(&self, policy: BridgePolicy) -> Pipeline<Context> {
        self.observe_from(policy, Pipeline::context())
    }

    /// Cross under `policy` and yield the context the far side observed.
    ///
    /// `source` is the retrieval step for policies that carry the original
    /// context; it is fully evaluated before the nested computation is
    /// created. Other policies never subscribe to it.
    pub fn observe_from(&self, policy: BridgePolicy, source: Pipeline<Context>) -> Pipeline<Context> {
        let bridge = self.clone();
        let crossed = match policy {
            BridgePolicy::NoContext => Pipeline::defer_contextual(move |_| {
                Pipeline::from_result(bridge.block_on_observe(policy, None))
            }),
            BridgePolicy::BridgedOriginal => retrieve(source).and_then(move |ctx| {
                Pipeline::from_result(bridge.block_on_observe(policy, Some(ctx)))
            }),
            BridgePolicy::BridgedFabricated => Pipeline::defer_contextual(move |_| {
                let fabricated = bridge.options.fabricated.clone();
                Pipeline::from_result(bridge.block_on_observe(policy, Some(fabricated)))
            }),
            BridgePolicy::FutureBridgeNoContext => bridge.complete_async(Pipeline::context),
            BridgePolicy::FutureBridgeBridged => retrieve(source)
                .and_then(move |ctx| bridge.future_with_context(ctx, Pipeline::context)),
        };

        crossed.map(move |observed| {
            debug!(policy = %policy, observed = %observed, "Bridge crossed");
            observed
        })
    }

    /// Block the calling thread until `body` finishes on a nested runtime.
    ///
    /// `body` sees `seed` through its [`CoroutineScope`] and nothing else.
    pub fn run_blocking<T, F, Fut>(&self, seed: Option<Context>, body: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(CoroutineScope) -> Fut + Send + 'static,
        Fut: Future<Output = T> + 'static,
    {
        self.block_on_coroutine("run-blocking", seed, body)
            .map_err(Error::from)
    }

    /// Schedule `supplier`'s pipeline as detached work.
    ///
    /// The completion primitive has no notion of context, so the nested
    /// pipeline is always subscribed with an empty one.
    pub fn complete_async<T, F>(&self, supplier: F) -> Pipeline<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Pipeline<T> + Send + 'static,
    {
        self.spawn_nested(BridgePolicy::FutureBridgeNoContext, Context::empty(), supplier)
    }

    /// Schedule `supplier`'s pipeline as a coroutine carrying `ctx`.
    pub fn future_with_context<T, F>(&self, ctx: Context, supplier: F) -> Pipeline<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Pipeline<T> + Send + 'static,
    {
        self.spawn_nested(BridgePolicy::FutureBridgeBridged, ctx, supplier)
    }

    fn block_on_observe(
        &self,
        policy: BridgePolicy,
        seed: Option<Context>,
    ) -> Result<Context> {
        self.block_on_coroutine(policy.as_str(), seed, |scope| async move { scope.context() })
            .map_err(Error::from)
    }

    fn block_on_coroutine<T, F, Fut>(
        &self,
        label: &str,
        seed: Option<Context>,
        body: F,
    ) -> std::result::Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(CoroutineScope) -> Fut + Send + 'static,
        Fut: Future<Output = T> + 'static,
    {
        if self.options.blocking == BlockingMode::Forbidden {
            warn!(bridge = label, "Blocking bridge refused");
            return Err(BridgeError::BlockingForbidden);
        }

        self.blocking_calls.fetch_add(1, Ordering::Relaxed);
        warn!(
            bridge = label,
            seeded = seed.is_some(),
            "Entering blocking bridge; calling thread is parked"
        );

        let timeout = self.options.timeout;
        let cancelled = || BridgeError::Cancelled {
            policy: label.to_string(),
        };

        let spawned = std::thread::Builder::new()
            .name("ctxbridge-coroutine".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                let scope = CoroutineScope::new(seed);
                Ok::<_, std::io::Error>(
                    runtime.block_on(async move { tokio::time::timeout(timeout, body(scope)).await }),
                )
            });

        let handle = spawned.map_err(|e| {
            error!(bridge = label, error = %e, "Failed to start coroutine thread");
            cancelled()
        })?;

        match park(|| handle.join()) {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(_elapsed))) => Err(BridgeError::Timeout {
                policy: label.to_string(),
                timeout_ms: duration_ms(timeout),
            }),
            Ok(Err(e)) => {
                error!(bridge = label, error = %e, "Failed to build coroutine runtime");
                Err(cancelled())
            }
            Err(_panic) => {
                error!(bridge = label, "Coroutine panicked");
                Err(cancelled())
            }
        }
    }

    fn spawn_nested<T, F>(&self, policy: BridgePolicy, ctx: Context, supplier: F) -> Pipeline<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Pipeline<T> + Send + 'static,
    {
        let timeout = self.options.timeout;
        Pipeline::from_future(async move {
            let task = ScopedTask::spawn(async move { supplier().subscribe(ctx).await });
            match tokio::time::timeout(timeout, task.join()).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => {
                    error!(policy = %policy, error = %join_err, "Nested task did not complete");
                    Err(BridgeError::Cancelled {
                        policy: policy.to_string(),
                    }
                    .into())
                }
                Err(_elapsed) => Err(BridgeError::Timeout {
                    policy: policy.to_string(),
                    timeout_ms: duration_ms(timeout),
                }
                .into()),
            }
        })
    }
}

/// Evaluate the retrieval step, tagging its failure distinctly.
fn retrieve(source: Pipeline<Context>) -> Pipeline<Context> {
    source.map_err(|e| {
        BridgeError::ContextRetrievalFailed {
            reason: e.to_string(),
        }
        .into()
    })
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn populated() -> Context {
        Context::of("key", "value")
    }

    fn bridge_with(blocking: BlockingMode, timeout: Duration) -> Bridge {
        Bridge::new(BridgeOptions {
            blocking,
            timeout,
            ..BridgeOptions::default()
        })
    }

    #[test]
    fn policy_names_roundtrip() {
        for policy in BridgePolicy::ALL {
            assert_eq!(policy.as_str().parse::<BridgePolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn unknown_policy_rejected() {
        let err = "teleport".parse::<BridgePolicy>().unwrap_err();
        assert_eq!(err, BridgeError::UnknownPolicy("teleport".into()));
    }

    #[test]
    fn blocking_mode_parses() {
        assert_eq!("forbidden".parse::<BlockingMode>().unwrap(), BlockingMode::Forbidden);
        assert!("sometimes".parse::<BlockingMode>().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_context_observes_empty_even_when_pipeline_is_populated() {
        let bridge = Bridge::default();
        let observed = bridge
            .observe(BridgePolicy::NoContext)
            .subscribe(populated())
            .await
            .unwrap();
        assert!(observed.is_empty());
        assert_eq!(bridge.blocking_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bridged_original_carries_every_key() {
        let bridge = Bridge::default();
        let ctx = populated().with("tenant", "acme").with("trace", "t-1");
        let observed = bridge
            .observe(BridgePolicy::BridgedOriginal)
            .subscribe(ctx.clone())
            .await
            .unwrap();
        assert_eq!(observed, ctx);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bridged_fabricated_ignores_enclosing_context() {
        let bridge = Bridge::default();
        let observed = bridge
            .observe(BridgePolicy::BridgedFabricated)
            .subscribe(populated().with("tenant", "acme"))
            .await
            .unwrap();
        assert_eq!(observed, Context::of("key", "otherValue"));
    }

    #[tokio::test]
    async fn future_bridge_without_context_observes_empty() {
        let bridge = Bridge::default();
        let observed = bridge
            .observe(BridgePolicy::FutureBridgeNoContext)
            .subscribe(populated())
            .await
            .unwrap();
        assert!(observed.is_empty());
        assert_eq!(bridge.blocking_calls(), 0);
    }

    #[tokio::test]
    async fn future_bridge_bridged_observes_original() {
        let bridge = Bridge::default();
        let observed = bridge
            .observe(BridgePolicy::FutureBridgeBridged)
            .subscribe(populated())
            .await
            .unwrap();
        assert_eq!(observed, populated());
        assert_eq!(bridge.blocking_calls(), 0);
    }

    #[tokio::test]
    async fn forbidden_mode_refuses_blocking_policies() {
        let bridge = bridge_with(BlockingMode::Forbidden, Duration::from_secs(1));
        for policy in BridgePolicy::ALL.into_iter().filter(|p| p.is_blocking()) {
            let result = bridge.observe(policy).subscribe(populated()).await;
            assert!(matches!(
                result,
                Err(Error::Bridge(BridgeError::BlockingForbidden))
            ));
        }
        assert_eq!(bridge.blocking_calls(), 0);
    }

    #[tokio::test]
    async fn forbidden_mode_still_allows_future_bridges() {
        let bridge = bridge_with(BlockingMode::Forbidden, Duration::from_secs(1));
        let observed = bridge
            .observe(BridgePolicy::FutureBridgeBridged)
            .subscribe(populated())
            .await
            .unwrap();
        assert_eq!(observed, populated());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_retrieval_never_starts_the_bridge() {
        let bridge = Bridge::default();
        let result = bridge
            .observe_from(
                BridgePolicy::BridgedOriginal,
                Pipeline::error(Error::pipeline("upstream failed")),
            )
            .subscribe(populated())
            .await;

        match result {
            Err(Error::Bridge(BridgeError::ContextRetrievalFailed { reason })) => {
                assert!(reason.contains("upstream failed"));
            }
            other => panic!("expected retrieval failure, got {other:?}"),
        }
        assert_eq!(bridge.blocking_calls(), 0);
    }

    #[tokio::test]
    async fn failed_retrieval_for_future_bridge() {
        let bridge = Bridge::default();
        let result = bridge
            .observe_from(
                BridgePolicy::FutureBridgeBridged,
                Pipeline::error(Error::pipeline("gone")),
            )
            .await_single()
            .await;
        assert!(matches!(
            result,
            Err(Error::Bridge(BridgeError::ContextRetrievalFailed { .. }))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_blocking_times_out() {
        let bridge = bridge_with(BlockingMode::Allowed, Duration::from_millis(50));
        let result = bridge.run_blocking(None, |_| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
        });
        assert!(matches!(
            result,
            Err(Error::Bridge(BridgeError::Timeout { timeout_ms: 50, .. }))
        ));
    }

    #[test]
    fn run_blocking_panic_is_cancellation() {
        let bridge = Bridge::default();
        let result: Result<()> = bridge.run_blocking(None, |_| async { panic!("coroutine died") });
        assert!(matches!(
            result,
            Err(Error::Bridge(BridgeError::Cancelled { .. }))
        ));
    }

    #[test]
    fn run_blocking_outside_runtime_sees_seed() {
        let bridge = Bridge::default();
        let seen = bridge
            .run_blocking(Some(populated()), |scope| async move { scope.context() })
            .unwrap();
        assert_eq!(seen, populated());
    }

    #[tokio::test]
    async fn future_bridge_times_out() {
        let bridge = bridge_with(BlockingMode::Allowed, Duration::from_millis(50));
        let result = bridge
            .future_with_context(populated(), || {
                Pipeline::from_future(async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(())
                })
            })
            .await_single()
            .await;
        assert!(matches!(
            result,
            Err(Error::Bridge(BridgeError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn panicking_nested_task_is_cancellation() {
        let bridge = Bridge::default();
        let result: Result<()> = bridge
            .complete_async(|| Pipeline::defer_contextual(|_| panic!("nested task died")))
            .await_single()
            .await;
        assert!(matches!(
            result,
            Err(Error::Bridge(BridgeError::Cancelled { .. }))
        ));
    }

    fn flagging_sleeper(done: Arc<AtomicBool>) -> Pipeline<()> {
        Pipeline::from_future(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            done.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn dropping_future_bridge_aborts_nested_work() {
        let bridge = Bridge::default();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let pending = bridge
            .future_with_context(populated(), move || flagging_sleeper(flag))
            .subscribe(Context::empty());

        assert!(
            tokio::time::timeout(Duration::from_millis(20), pending)
                .await
                .is_err()
        );
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn timed_out_completion_aborts_nested_work() {
        let bridge = bridge_with(BlockingMode::Allowed, Duration::from_millis(20));
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let result = bridge
            .complete_async(move || flagging_sleeper(flag))
            .await_single()
            .await;
        assert!(matches!(
            result,
            Err(Error::Bridge(BridgeError::Timeout { .. }))
        ));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!done.load(Ordering::SeqCst));
    }
}
