//! # ctxbridge Core
//!
//! Context store, pipelines, and the propagation bridge that carries a
//! request-scoped [`Context`] (or deliberately fails to) across a boundary
//! between a lazily evaluated pipeline and a separately scheduled coroutine.
//!
//! Context is always passed explicitly. A stage sees the context its
//! subscriber handed it; a bridged coroutine sees the context it was created
//! with. Nothing is looked up from an ambient slot.

// Panicking coroutines and nested tasks surface as `BridgeError::Cancelled`,
// which needs unwinding.
#[cfg(panic = "abort")]
compile_error!("ctxbridge-core requires panic = \"unwind\"");

pub mod error;
pub mod context;
pub mod pipeline;
pub mod sequence;
pub mod coroutine;
pub mod bridge;
pub mod response;

// Re-export key types at crate root for ergonomics
pub use error::{BridgeError, Error, Result};
pub use context::Context;
pub use pipeline::Pipeline;
pub use sequence::Sequence;
pub use coroutine::{CoroutineScope, ScopedTask};
pub use bridge::{BlockingMode, Bridge, BridgeOptions, BridgePolicy};
pub use response::{ContextResponse, DEMO_KEY};
