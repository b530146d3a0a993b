//! The plugin capability.
//!
//! A plugin contributes commands to the shared [`CommandRegistry`]. It is
//! asked to do so exactly once, when it is registered with the
//! [`PluginManager`](crate::manager::PluginManager).
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn register_commands(&self, registry: &CommandRegistry, middlewares: &[Middleware]) {
//!         registry.register(Command::builder("hello").handler_fn(hello), middlewares);
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::handler::Middleware;
use crate::registry::CommandRegistry;

/// A contributor of commands.
pub trait Plugin: Send + Sync {
    /// Unique plugin name; registration is idempotent by this name.
    fn name(&self) -> &str;

    /// Attaches the plugin's commands to `registry`, wrapping them with
    /// `middlewares`.
    fn register_commands(&self, registry: &CommandRegistry, middlewares: &[Middleware]);
}

/// A shared plugin trait object.
pub type BoxedPlugin = Arc<dyn Plugin>;
