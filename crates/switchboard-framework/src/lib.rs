//! # Switchboard Framework
//!
//! Command routing for Switchboard applications.
//!
//! This layer provides:
//! - A hierarchical command tree with aliases ([`Command`])
//! - The shared top-level namespace ([`CommandRegistry`])
//! - Middleware composed once at registration time ([`Middleware`])
//! - The plugin contract and its manager ([`Plugin`], [`PluginManager`])
//! - The event processor that turns events into responses ([`EventProcessor`])
//!
//! The framework layer knows nothing about queues or adapters; the runtime
//! drives it one event at a time.

pub mod command;
pub mod context;
pub mod error;
pub mod handler;
pub mod manager;
pub mod plugin;
pub mod processor;
pub mod registry;

pub use command::{Command, CommandBuilder, PATH_SEPARATOR};
pub use context::CommandContext;
pub use error::{CommandError, CommandResult};
pub use handler::{
    BoxError, CommandHandler, CommandRequest, HandlerService, Layer, Middleware, Next, compose,
    handler_fn, middleware_fn,
};
pub use manager::PluginManager;
pub use plugin::{BoxedPlugin, Plugin};
pub use processor::{DEFAULT_PREFIX, EventProcessor, parse_command};
pub use registry::CommandRegistry;
