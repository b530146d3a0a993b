//! The registry of top-level commands.
//!
//! [`CommandRegistry`] is the root of the command namespace. It keeps a flat
//! index from every top-level name and alias to its command; resolution below
//! the first token is delegated to [`Command::find`].
//!
//! Registration is where paths are fixed and middleware is composed, so it
//! costs O(subtree size) once; resolution is O(depth) and never backtracks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::command::Command;
use crate::handler::Middleware;

/// An entry in the flat index.
#[derive(Clone)]
enum Slot {
    Name(Arc<Command>),
    Alias(Arc<Command>),
}

impl Slot {
    fn command(&self) -> &Arc<Command> {
        match self {
            Slot::Name(command) | Slot::Alias(command) => command,
        }
    }
}

/// The shared, thread-safe command namespace.
///
/// # Example
///
/// ```rust,ignore
/// let registry = CommandRegistry::new();
/// registry.register(Command::builder("ping").handler_fn(ping), &[]);
///
/// let args = vec!["ping".to_string()];
/// let (cmd, rest) = registry.find(&args).unwrap();
/// assert_eq!(cmd.full_path(), "ping");
/// assert!(rest.is_empty());
/// ```
#[derive(Default)]
pub struct CommandRegistry {
    index: RwLock<HashMap<String, Slot>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-level command together with its subtree.
    ///
    /// Idempotent by name: if a command called `command.name()` is already
    /// registered, that instance is returned and nothing changes. Otherwise
    /// full paths are assigned across the subtree and every handler in it is
    /// wrapped with `middlewares`, the first one outermost.
    ///
    /// Aliases that collide with an existing name or alias are skipped.
    /// A new command's name replaces another command's alias of the same
    /// spelling.
    pub fn register(
        &self,
        command: impl Into<Arc<Command>>,
        middlewares: &[Middleware],
    ) -> Arc<Command> {
        let command = command.into();
        let mut index = self.index.write();

        if let Some(Slot::Name(existing)) = index.get(command.name()) {
            debug!(command = %command.name(), "Command already registered, keeping the first");
            return Arc::clone(existing);
        }

        command.assign_full_paths(command.name().to_string());
        command.wrap_handlers(middlewares);

        if let Some(Slot::Alias(owner)) =
            index.insert(command.name().to_string(), Slot::Name(Arc::clone(&command)))
        {
            warn!(
                command = %command.name(),
                shadowed = %owner.name(),
                "Command name replaces an existing alias"
            );
        }

        for alias in command.aliases() {
            if let Some(slot) = index.get(alias) {
                warn!(
                    command = %command.name(),
                    alias = %alias,
                    owner = %slot.command().name(),
                    "Ignoring alias already in use"
                );
                continue;
            }
            index.insert(alias.clone(), Slot::Alias(Arc::clone(&command)));
        }

        debug!(
            command = %command.name(),
            aliases = ?command.aliases(),
            middlewares = middlewares.len(),
            "Registered command"
        );
        command
    }

    /// Resolves `args` to a command and the tokens left for its handler.
    ///
    /// Returns `None` if `args` is empty or the first token names no
    /// top-level command.
    pub fn find<'a>(&self, args: &'a [String]) -> Option<(Arc<Command>, &'a [String])> {
        let (first, rest) = args.split_first()?;
        let root = self.index.read().get(first.as_str())?.command().clone();
        Some(root.find(rest))
    }

    /// Returns the top-level command registered under `name`, or via alias.
    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.index.read().get(name).map(|slot| slot.command().clone())
    }

    /// Returns `true` if `name` is a registered top-level name or alias.
    pub fn contains(&self, name: &str) -> bool {
        self.index.read().contains_key(name)
    }

    /// Distinct top-level commands, sorted by name.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<_> = self
            .index
            .read()
            .values()
            .filter_map(|slot| match slot {
                Slot::Name(command) => Some(Arc::clone(command)),
                Slot::Alias(_) => None,
            })
            .collect();
        commands.sort_by(|a, b| a.name().cmp(b.name()));
        commands
    }

    /// Number of top-level commands.
    pub fn len(&self) -> usize {
        self.index
            .read()
            .values()
            .filter(|slot| matches!(slot, Slot::Name(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field(
                "commands",
                &self
                    .commands()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;
    use crate::handler::{BoxError, CommandRequest, Next};
    use parking_lot::Mutex;
    use switchboard_core::{CancellationToken, Event};
    use tower::ServiceExt;

    async fn noop(_ctx: Arc<CommandContext>, _args: Vec<String>) -> Result<(), BoxError> {
        Ok(())
    }

    fn tokens(input: &str) -> Vec<String> {
        input.split_whitespace().map(String::from).collect()
    }

    fn admin() -> Arc<Command> {
        Command::builder("admin")
            .alias("adm")
            .subcommand(Command::builder("ban").alias("b").handler_fn(noop))
            .build()
    }

    fn marker(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> Middleware {
        Middleware::from_fn(move |req: CommandRequest, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(label.to_string());
                next.run(req).await
            }
        })
    }

    async fn invoke(command: &Arc<Command>) {
        let ctx = CommandContext::new(
            CancellationToken::new(),
            Arc::new(Event::message("test")),
            Arc::clone(command),
        );
        let handler = command.handler().unwrap();
        handler
            .oneshot(CommandRequest::new(Arc::new(ctx), Vec::new()))
            .await
            .unwrap();
    }

    #[test]
    fn test_greedy_resolution_through_aliases() {
        let registry = CommandRegistry::new();
        registry.register(admin(), &[]);

        let args = tokens("admin b userX");
        let (cmd, rest) = registry.find(&args).unwrap();
        assert_eq!(cmd.full_path(), "admin ban");
        assert_eq!(rest, ["userX"]);

        let args = tokens("adm ban");
        let (cmd, rest) = registry.find(&args).unwrap();
        assert_eq!(cmd.name(), "ban");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_find_misses() {
        let registry = CommandRegistry::new();
        registry.register(admin(), &[]);

        assert!(registry.find(&[]).is_none());
        let args = tokens("help");
        assert!(registry.find(&args).is_none());
    }

    #[tokio::test]
    async fn test_register_is_idempotent_by_name() {
        let registry = CommandRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.register(admin(), &[marker(log.clone(), "first")]);
        let second = registry.register(
            Command::builder("admin").handler_fn(noop),
            &[marker(log.clone(), "second")],
        );
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        let args = tokens("admin ban");
        let (ban, _) = registry.find(&args).unwrap();
        invoke(&ban).await;
        assert_eq!(*log.lock(), ["first"]);
    }

    #[tokio::test]
    async fn test_middlewares_wrap_whole_subtree() {
        let registry = CommandRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let root = Command::builder("root")
            .handler_fn(noop)
            .subcommand(
                Command::builder("mid")
                    .subcommand(Command::builder("leaf").handler_fn(noop)),
            )
            .build();
        registry.register(root, &[marker(log.clone(), "a"), marker(log.clone(), "b")]);

        let args = tokens("root mid leaf");
        let (leaf, _) = registry.find(&args).unwrap();
        assert_eq!(leaf.full_path(), "root mid leaf");
        invoke(&leaf).await;

        let args = tokens("root");
        let (root, _) = registry.find(&args).unwrap();
        invoke(&root).await;

        let args = tokens("root mid");
        let (mid, _) = registry.find(&args).unwrap();
        assert!(mid.has_handler());
        invoke(&mid).await;

        assert_eq!(*log.lock(), ["a", "b", "a", "b", "a", "b"]);
    }

    #[test]
    fn test_alias_collisions_keep_first() {
        let registry = CommandRegistry::new();
        registry.register(Command::builder("first").alias("x"), &[]);
        registry.register(Command::builder("second").aliases(["x", "first"]), &[]);

        assert_eq!(registry.get("x").unwrap().name(), "first");
        assert_eq!(registry.get("first").unwrap().name(), "first");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_name_replaces_alias() {
        let registry = CommandRegistry::new();
        registry.register(Command::builder("list").alias("ls"), &[]);
        registry.register(Command::builder("ls"), &[]);

        assert_eq!(registry.get("ls").unwrap().name(), "ls");
        let names: Vec<_> = registry
            .commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, ["list", "ls"]);
    }

    #[test]
    fn test_concurrent_lookups() {
        let registry = Arc::new(CommandRegistry::new());
        registry.register(admin(), &[]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let args = tokens("admin b someone");
                    for _ in 0..1000 {
                        let (cmd, rest) = registry.find(&args).unwrap();
                        assert_eq!(cmd.name(), "ban");
                        assert_eq!(rest.len(), 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
