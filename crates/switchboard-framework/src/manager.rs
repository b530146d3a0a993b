//! Plugin bookkeeping.
//!
//! [`PluginManager`] owns the registered plugins and the [`CommandRegistry`]
//! they contribute to. Registering a plugin immediately calls its
//! [`Plugin::register_commands`]; a second plugin with the same name is
//! ignored.
//!
//! ```rust,ignore
//! let manager = PluginManager::new(Arc::new(CommandRegistry::new()));
//! manager.register(Arc::new(AdminPlugin), &[audit_middleware()]);
//! assert_eq!(manager.plugin_names(), ["admin"]);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::handler::Middleware;
use crate::plugin::BoxedPlugin;
use crate::registry::CommandRegistry;

/// Holds plugins in registration order.
pub struct PluginManager {
    plugins: RwLock<Vec<BoxedPlugin>>,
    registry: Arc<CommandRegistry>,
}

impl PluginManager {
    /// Creates a manager feeding `registry`.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            registry,
        }
    }

    /// Registers `plugin` and lets it attach its commands.
    ///
    /// Returns `false` (and does nothing) if a plugin with the same name is
    /// already registered.
    pub fn register(&self, plugin: BoxedPlugin, middlewares: &[Middleware]) -> bool {
        {
            let mut plugins = self.plugins.write();
            if plugins.iter().any(|p| p.name() == plugin.name()) {
                warn!(plugin = %plugin.name(), "Plugin already registered, ignoring");
                return false;
            }
            plugins.push(Arc::clone(&plugin));
        }

        // Outside the lock: plugins may inspect the manager while registering.
        plugin.register_commands(&self.registry, middlewares);
        info!(
            plugin = %plugin.name(),
            commands = self.registry.len(),
            "Plugin registered"
        );
        true
    }

    /// The shared command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Names of registered plugins, in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.read().len()
    }

    /// Snapshot of the registered plugins.
    pub fn plugins(&self) -> Vec<BoxedPlugin> {
        self.plugins.read().clone()
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.plugin_names())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::command::Command;
    use crate::plugin::Plugin;

    struct CountingPlugin {
        name: &'static str,
        command: &'static str,
        calls: AtomicUsize,
    }

    impl CountingPlugin {
        fn new(name: &'static str, command: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                command,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Plugin for CountingPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn register_commands(&self, registry: &CommandRegistry, middlewares: &[Middleware]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            registry.register(Command::builder(self.command), middlewares);
        }
    }

    #[test]
    fn test_register_attaches_commands() {
        let manager = PluginManager::new(Arc::new(CommandRegistry::new()));
        let admin = CountingPlugin::new("admin", "admin");
        let echo = CountingPlugin::new("echo", "echo");

        assert!(manager.register(admin.clone(), &[]));
        assert!(manager.register(echo, &[]));

        assert_eq!(manager.plugin_names(), ["admin", "echo"]);
        assert_eq!(manager.plugin_count(), 2);
        assert!(manager.registry().contains("admin"));
        assert!(manager.registry().contains("echo"));
        assert_eq!(admin.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_is_idempotent_by_name() {
        let manager = PluginManager::new(Arc::new(CommandRegistry::new()));
        let first = CountingPlugin::new("admin", "admin");
        let second = CountingPlugin::new("admin", "other");

        assert!(manager.register(first.clone(), &[]));
        assert!(!manager.register(second.clone(), &[]));

        assert_eq!(manager.plugin_count(), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert!(!manager.registry().contains("other"));
    }
}
