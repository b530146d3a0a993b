//! # Switchboard
//!
//! An event-routing core for bots that live on several platforms at once.
//!
//! ## Overview
//!
//! Adapters turn platform traffic into normalized events. The engine parses
//! command-looking text, resolves it against a tree of commands contributed
//! by plugins, runs the handler on a worker pool and fans the response back
//! out to every adapter.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌─────────────┐     ┌────────┐     ┌─────────────┐     ┌──────────┐
//! │  Adapter  │────▶│ event queue │────▶│ Engine │────▶│ worker pool │────▶│ Command  │
//! └───────────┘     └─────────────┘     └────────┘     └─────────────┘     │ handlers │
//!       ▲                                                                  └────┬─────┘
//!       └──────────────── fan-out ◀──── response queue ◀────────────────────────┘
//! ```
//!
//! - **Adapters**: platform bridges ([`core::Adapter`])
//! - **Plugins**: contribute command subtrees ([`framework::Plugin`])
//! - **Commands**: nested, aliased, middleware-wrapped handlers ([`framework::Command`])
//! - **Engine**: queues, workers, sessions and shutdown ([`runtime::Engine`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchboard::prelude::*;
//!
//! async fn ping(ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
//!     ctx.reply_text("pong");
//!     Ok(())
//! }
//!
//! struct PingPlugin;
//!
//! impl Plugin for PingPlugin {
//!     fn name(&self) -> &str {
//!         "ping"
//!     }
//!
//!     fn register_commands(&self, registry: &CommandRegistry, middlewares: &[Middleware]) {
//!         registry.register(Command::builder("ping").handler_fn(ping), middlewares);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Engine::builder().build()?;
//!     engine.register_plugin(Arc::new(PingPlugin), &[]);
//!     engine.register_adapter(Arc::new(MyAdapter::new()));
//!     engine.run_until_signal().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: Load `switchboard.toml` (default)
//! - `yaml-config`: Load `switchboard.yaml`
//! - `json-log`: JSON log output

pub use switchboard_core as core;
pub use switchboard_framework as framework;
pub use switchboard_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use switchboard::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use switchboard_runtime::{Engine, EngineBuilder, EngineConfig, EngineState};

    // Commands and plugins
    pub use switchboard_framework::{
        BoxError, Command, CommandContext, CommandRegistry, Middleware, Next, Plugin,
        middleware_fn,
    };

    // Adapter contract and data model
    pub use switchboard_core::{
        Adapter, AdapterError, AdapterResult, CancellationToken, Event, EventSender, Response,
        ResponseType, Session,
    };
}
