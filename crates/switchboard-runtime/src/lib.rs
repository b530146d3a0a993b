//! Switchboard Runtime - the engine that ties adapters, plugins and the
//! command processor together.
//!
//! This crate provides:
//! - The central engine loop and its lifecycle (`Engine`, `EngineBuilder`)
//! - A fixed-size worker pool over a bounded task queue (`WorkerPool`)
//! - Concurrent, failure-isolated response fan-out (`ResponseDispatcher`)
//! - Session resolution and expiry (`SessionStore`)
//! - Layered configuration and logging setup
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchboard_runtime::Engine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Loads switchboard.toml / SWITCHBOARD_* and initializes logging
//!     let engine = Engine::builder().build()?;
//!
//!     engine.register_plugin(Arc::new(MyPlugin), &[]);
//!     engine.register_adapter(Arc::new(MyAdapter::new()));
//!
//!     // Run until Ctrl+C
//!     engine.run_until_signal().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod logging;
pub mod reporter;
pub mod session;
pub mod worker_pool;

#[cfg(test)]
mod testing;

// Re-exports
pub use adapter::AdapterManager;
pub use config::{ConfigError, ConfigLoader, ConfigResult, EngineConfig, LoggingConfig};
pub use dispatcher::ResponseDispatcher;
pub use engine::{Engine, EngineBuilder, EngineState};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use reporter::{AdapterOperation, BoxedReporter, ErrorReporter, TracingReporter};
pub use session::SessionStore;
pub use worker_pool::{Task, TaskPermit, WorkerPool};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
