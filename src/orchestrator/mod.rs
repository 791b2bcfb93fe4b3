//! The orchestrator — the core engine. Consumes the data model,
//! session store, transition table, provider registry, and config
//! resolution, plus the `Profile` and `StandardsProvider` external
//! interfaces. Single-threaded per session; a command runs to
//! completion (paused or terminal) and returns.

mod actions;
mod engine;
mod gate;

pub use engine::Orchestrator;

pub(crate) type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
